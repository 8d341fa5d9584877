//! Type System for viewc

use std::collections::HashMap;
use std::fmt;

use crate::frontend::ast::{Component, EnumDef, Program, StructDef, TypeExpr};
use crate::types::schema::TypeSchema;
use crate::utils::{Error, Result, Span};

/// Primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    Int8, Int16, Int32, Int64,
    UInt8, UInt16, UInt32, UInt64,
    Float32, Float64,
    Bool,
}

impl PrimitiveType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint8" => Self::UInt8,
            "uint16" => Self::UInt16,
            "uint32" => Self::UInt32,
            "uint64" => Self::UInt64,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "bool" => Self::Bool,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Bool => "bool",
        }
    }

    /// Width in bits
    pub fn bits(&self) -> u32 {
        match self {
            Self::Int8 | Self::UInt8 | Self::Bool => 8,
            Self::Int16 | Self::UInt16 => 16,
            Self::Int32 | Self::UInt32 | Self::Float32 => 32,
            Self::Int64 | Self::UInt64 | Self::Float64 => 64,
        }
    }

    /// Check if this is a signed integer type
    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 |
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64
        )
    }

    /// Check if this is a floating-point type
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Inclusive value range of an integer type
    pub fn int_range(&self) -> Option<(i128, i128)> {
        if !self.is_integer() {
            return None;
        }
        let bits = self.bits();
        Some(if self.is_signed() {
            (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
        } else {
            (0, (1i128 << bits) - 1)
        })
    }

    /// Implicit, lossless conversion from `self` to `target`.
    ///
    /// Only ever narrow to wide; equal types are handled by the caller.
    pub fn widens_to(&self, target: PrimitiveType) -> bool {
        if self.is_integer() && target.is_integer() {
            if self.is_signed() == target.is_signed() {
                return target.bits() > self.bits();
            }
            // unsigned fits a strictly wider signed type, never the reverse
            return !self.is_signed() && target.is_signed() && target.bits() > self.bits();
        }
        match target {
            Self::Float32 => self.is_integer() && self.bits() <= 16,
            Self::Float64 => (self.is_integer() && self.bits() <= 32) || *self == Self::Float32,
            _ => false,
        }
    }
}

/// Canonical type (after normalization)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(PrimitiveType),
    String,
    Void,
    /// Dynamic array `T[]`
    Array(Box<Type>),
    /// Fixed-size array `T[N]`
    FixedArray(Box<Type>, usize),
    /// Host-runtime handle from the schema
    Handle(String),
    Struct(String),
    Enum(String),
    Component(String),
    /// Callable taking the listed parameters (methods and callback props)
    Callback(Vec<Type>),
    /// Element type of an empty array literal
    Unknown,
}

impl Type {
    pub const BOOL: Self = Self::Primitive(PrimitiveType::Bool);
    pub const INT: Self = Self::Primitive(PrimitiveType::Int32);
    pub const INT64: Self = Self::Primitive(PrimitiveType::Int64);
    pub const FLOAT32: Self = Self::Primitive(PrimitiveType::Float32);
    pub const FLOAT: Self = Self::Primitive(PrimitiveType::Float64);

    pub fn array(elem: Type) -> Self {
        Self::Array(Box::new(elem))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self {
            Self::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.as_primitive().map(|p| p.is_integer()).unwrap_or(false)
    }

    pub fn is_numeric(&self) -> bool {
        self.as_primitive().map(|p| p.is_numeric()).unwrap_or(false)
    }

    pub fn is_bool(&self) -> bool {
        *self == Self::BOOL
    }

    /// Element type of an array of either kind
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Self::Array(e) | Self::FixedArray(e, _) => Some(e),
            _ => None,
        }
    }

    /// Types usable as loop keys
    pub fn is_key_type(&self) -> bool {
        matches!(self, Self::Primitive(_) | Self::String | Self::Enum(_))
    }

    /// Name used for schema lookups (`string` and arrays are builtin entries)
    pub fn schema_name(&self) -> Option<String> {
        match self {
            Self::String => Some("string".to_string()),
            Self::Array(_) | Self::FixedArray(..) => Some("array".to_string()),
            Self::Handle(n) => Some(n.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{}", p.name()),
            Self::String => write!(f, "string"),
            Self::Void => write!(f, "void"),
            Self::Array(e) => write!(f, "{}[]", e),
            Self::FixedArray(e, n) => write!(f, "{}[{}]", e, n),
            Self::Handle(n) | Self::Struct(n) | Self::Enum(n) | Self::Component(n) => write!(f, "{}", n),
            Self::Callback(params) => {
                write!(f, "def(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            Self::Unknown => write!(f, "?"),
        }
    }
}

/// Language-level aliases that are not schema data
fn builtin_alias(name: &str) -> Option<&'static str> {
    Some(match name {
        "int" => "int32",
        "uint" => "uint32",
        "float" => "float64",
        "byte" => "uint8",
        "long" => "int64",
        "double" => "float64",
        _ => return None,
    })
}

/// Is `source` usable where `target` is expected?
pub fn is_compatible(source: &Type, target: &Type, schema: &TypeSchema) -> bool {
    if source == target {
        return true;
    }
    match (source, target) {
        (Type::Primitive(s), Type::Primitive(t)) => s.widens_to(*t),
        (Type::FixedArray(s, _), Type::Array(t)) => s == t,
        (Type::Array(s), Type::Array(_)) | (Type::Array(s), Type::FixedArray(..)) => **s == Type::Unknown,
        (Type::Handle(s), Type::Handle(t)) => schema.inherits_from(s, t),
        _ => false,
    }
}

/// Can the integer literal `value` initialize a `target`?
pub fn literal_fits(value: i128, target: &Type) -> bool {
    match target {
        Type::Primitive(p) if p.is_float() => true,
        Type::Primitive(p) => p
            .int_range()
            .map(|(lo, hi)| value >= lo && value <= hi)
            .unwrap_or(false),
        _ => false,
    }
}

/// The narrowest type both operands convert to, if any
pub fn common_type(a: &Type, b: &Type, schema: &TypeSchema) -> Option<Type> {
    if is_compatible(a, b, schema) {
        Some(b.clone())
    } else if is_compatible(b, a, schema) {
        Some(a.clone())
    } else {
        None
    }
}

/// Named user types plus the schema; everything a `TypeExpr` can refer to
pub struct TypeEnv<'a> {
    pub schema: &'a TypeSchema,
    structs: HashMap<&'a str, &'a StructDef>,
    enums: HashMap<&'a str, &'a EnumDef>,
    components: HashMap<&'a str, &'a Component>,
}

impl<'a> TypeEnv<'a> {
    pub fn new(program: &'a Program, schema: &'a TypeSchema) -> Self {
        let structs = program.structs.iter().map(|s| (s.name.as_str(), s)).collect();
        let enums = program.enums.iter().map(|e| (e.name.as_str(), e)).collect();
        let components = program.components.iter().map(|c| (c.name.as_str(), c)).collect();
        Self { schema, structs, enums, components }
    }

    pub fn component(&self, name: &str) -> Option<&'a Component> {
        self.components.get(name).copied()
    }

    /// Struct lookup, component-local definitions first
    pub fn struct_def<'s>(&'s self, name: &str, local: Option<&'s Component>) -> Option<&'s StructDef> {
        local
            .and_then(|c| c.structs.iter().find(|s| s.name == name))
            .or_else(|| self.structs.get(name).copied())
    }

    pub fn enum_def<'s>(&'s self, name: &str, local: Option<&'s Component>) -> Option<&'s EnumDef> {
        local
            .and_then(|c| c.enums.iter().find(|e| e.name == name))
            .or_else(|| self.enums.get(name).copied())
    }

    /// Map a source type to its canonical form
    pub fn normalize(&self, ty: &TypeExpr, local: Option<&Component>, span: Span) -> Result<Type> {
        match ty {
            TypeExpr::Array(elem) => Ok(Type::array(self.normalize(elem, local, span)?)),
            TypeExpr::FixedArray(elem, n) => {
                Ok(Type::FixedArray(Box::new(self.normalize(elem, local, span)?), *n))
            }
            TypeExpr::Named(name) => self.normalize_name(name, local, span, 0),
        }
    }

    fn normalize_name(&self, name: &str, local: Option<&Component>, span: Span, depth: u32) -> Result<Type> {
        let name = builtin_alias(name).unwrap_or(name);
        if let Some(p) = PrimitiveType::from_name(name) {
            return Ok(Type::Primitive(p));
        }
        match name {
            "string" => return Ok(Type::String),
            "void" => return Ok(Type::Void),
            _ => {}
        }
        let resolved = self.schema.resolve_alias(name);
        if resolved != name {
            // a cycle stops on an alias entry; long chains through arrays are broken too
            let cyclic = self.schema.lookup_type(resolved).is_some_and(|e| e.alias_of.is_some());
            if cyclic || depth > 16 {
                return Err(Error::UnknownType { name: name.to_string(), span });
            }
            let target: TypeExpr = resolved.parse()?;
            return match target {
                TypeExpr::Named(n) => self.normalize_name(&n, local, span, depth + 1),
                other => self.normalize(&other, local, span),
            };
        }
        if self.struct_def(name, local).is_some() {
            return Ok(Type::Struct(name.to_string()));
        }
        if self.enum_def(name, local).is_some() {
            return Ok(Type::Enum(name.to_string()));
        }
        if self.components.contains_key(name) {
            return Ok(Type::Component(name.to_string()));
        }
        if self.schema.is_handle(name) {
            return Ok(Type::Handle(name.to_string()));
        }
        Err(Error::UnknownType { name: name.to_string(), span })
    }

    pub fn is_compatible(&self, source: &Type, target: &Type) -> bool {
        is_compatible(source, target, self.schema)
    }

    /// Nocopy values are handles (or arrays of them) marked nocopy in the schema
    pub fn is_nocopy(&self, ty: &Type) -> bool {
        match ty {
            Type::Handle(n) => self.schema.is_nocopy(n),
            Type::Array(e) | Type::FixedArray(e, _) => self.is_nocopy(e),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::schema::TypeEntry;
    use pretty_assertions::assert_eq;

    fn handle(name: &str) -> Type {
        Type::Handle(name.to_string())
    }

    #[test]
    fn test_widening_is_one_directional() {
        use PrimitiveType::*;
        assert!(Int8.widens_to(Int32));
        assert!(!Int32.widens_to(Int8));
        assert!(UInt8.widens_to(Int16));
        assert!(!UInt16.widens_to(Int16));
        assert!(!Int8.widens_to(UInt64));
        assert!(Int16.widens_to(Float32));
        assert!(!Int32.widens_to(Float32));
        assert!(Int32.widens_to(Float64));
        assert!(Float32.widens_to(Float64));
        assert!(!Float64.widens_to(Float32));
        assert!(!Int64.widens_to(Float64));
        assert!(!Bool.widens_to(Int32));
    }

    #[test]
    fn test_arrays_have_no_element_covariance() {
        let schema = TypeSchema::empty();
        let ints = Type::array(Type::INT);
        let longs = Type::array(Type::INT64);
        assert!(is_compatible(&ints, &ints, &schema));
        assert!(!is_compatible(&ints, &longs, &schema));
        assert!(is_compatible(&Type::FixedArray(Box::new(Type::INT), 4), &ints, &schema));
        assert!(!is_compatible(&ints, &Type::FixedArray(Box::new(Type::INT), 4), &schema));
        assert!(is_compatible(&Type::array(Type::Unknown), &longs, &schema));
    }

    #[test]
    fn test_inheritance_partial_order() {
        let schema = TypeSchema::from_entries(vec![
            TypeEntry::handle("C"),
            TypeEntry::handle("B").extends("C"),
            TypeEntry::handle("A").extends("B"),
        ]);
        let (a, b, c) = (handle("A"), handle("B"), handle("C"));
        assert!(is_compatible(&a, &b, &schema));
        assert!(is_compatible(&a, &c, &schema));
        assert!(!is_compatible(&c, &a, &schema));
        assert!(!is_compatible(&b, &a, &schema));
        assert!(is_compatible(&a, &a, &schema));
    }

    #[test]
    fn test_literal_fits() {
        assert!(literal_fits(255, &Type::Primitive(PrimitiveType::UInt8)));
        assert!(!literal_fits(256, &Type::Primitive(PrimitiveType::UInt8)));
        assert!(!literal_fits(-1, &Type::Primitive(PrimitiveType::UInt32)));
        assert!(literal_fits(-128, &Type::Primitive(PrimitiveType::Int8)));
        assert!(literal_fits(3, &Type::FLOAT32));
        assert!(!literal_fits(1, &Type::BOOL));
    }

    #[test]
    fn test_normalization() {
        let schema = TypeSchema::from_json(
            r#"{ "types": [ { "name": "Canvas" }, { "name": "i32", "alias_of": "int" } ] }"#,
        )
        .unwrap();
        let program = Program {
            structs: vec![StructDef { name: "Todo".into(), fields: vec![], span: Span::dummy() }],
            ..Default::default()
        };
        let env = TypeEnv::new(&program, &schema);
        let norm = |s: &str| env.normalize(&s.parse().unwrap(), None, Span::dummy());

        assert_eq!(norm("int").unwrap(), Type::INT);
        assert_eq!(norm("double").unwrap(), Type::FLOAT);
        assert_eq!(norm("i32").unwrap(), Type::INT);
        assert_eq!(norm("Todo[]").unwrap(), Type::array(Type::Struct("Todo".into())));
        assert_eq!(norm("Canvas").unwrap(), handle("Canvas"));
        assert_eq!(norm("byte[4]").unwrap().to_string(), "uint8[4]");
        assert!(matches!(norm("Missing"), Err(Error::UnknownType { .. })));
    }

    #[test]
    fn test_alias_chains_and_cycles() {
        let schema = TypeSchema::from_json(
            r#"{ "types": [
                { "name": "Score", "alias_of": "Points" },
                { "name": "Points", "alias_of": "int64" },
                { "name": "Scores", "alias_of": "Score[]" },
                { "name": "A", "alias_of": "B" },
                { "name": "B", "alias_of": "C" },
                { "name": "C", "alias_of": "B" }
            ] }"#,
        )
        .unwrap();
        let program = Program::default();
        let env = TypeEnv::new(&program, &schema);
        let norm = |s: &str| env.normalize(&s.parse().unwrap(), None, Span::dummy());

        assert_eq!(norm("Score").unwrap(), Type::INT64);
        assert_eq!(norm("Scores").unwrap(), Type::array(Type::INT64));
        assert!(matches!(norm("A"), Err(Error::UnknownType { .. })));
        assert!(matches!(norm("B"), Err(Error::UnknownType { .. })));
    }

    #[test]
    fn test_common_type() {
        let schema = TypeSchema::empty();
        assert_eq!(common_type(&Type::INT, &Type::INT64, &schema), Some(Type::INT64));
        assert_eq!(common_type(&Type::INT64, &Type::INT, &schema), Some(Type::INT64));
        assert_eq!(common_type(&Type::String, &Type::INT, &schema), None);
    }
}
