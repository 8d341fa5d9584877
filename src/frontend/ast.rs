//! Abstract Syntax Tree definitions for viewc
//!
//! The tree is produced by the external parser and handed to the compiler
//! as JSON. Every node owns its children exclusively; nothing in here is
//! shared or cyclic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::{Error, Span};

/// A complete program: every component of every input file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Further parser-output files, relative to this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
}

impl Program {
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }
}

// ==================== Types ====================

/// A type as written in source (`int`, `string[]`, `float[4]`, `Canvas`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeExpr {
    Named(String),
    Array(Box<TypeExpr>),
    FixedArray(Box<TypeExpr>, usize),
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named(name.to_string())
    }
}

impl FromStr for TypeExpr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let base_end = s.find('[').unwrap_or(s.len());
        let base = s[..base_end].trim();
        if base.is_empty() {
            return Err(Error::Input(format!("malformed type '{}'", s)));
        }
        let mut ty = TypeExpr::Named(base.to_string());
        let mut rest = &s[base_end..];
        while !rest.is_empty() {
            let close = rest
                .find(']')
                .ok_or_else(|| Error::Input(format!("malformed type '{}'", s)))?;
            let size = rest[1..close].trim();
            ty = if size.is_empty() {
                TypeExpr::Array(Box::new(ty))
            } else {
                let n = size
                    .parse::<usize>()
                    .map_err(|_| Error::Input(format!("malformed array size in '{}'", s)))?;
                TypeExpr::FixedArray(Box::new(ty), n)
            };
            rest = rest[close + 1..].trim_start();
        }
        Ok(ty)
    }
}

impl TryFrom<String> for TypeExpr {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TypeExpr> for String {
    fn from(t: TypeExpr) -> String {
        t.to_string()
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(n) => write!(f, "{}", n),
            TypeExpr::Array(e) => write!(f, "{}[]", e),
            TypeExpr::FixedArray(e, n) => write!(f, "{}[{}]", e, n),
        }
    }
}

// ==================== Definitions ====================

/// Struct definition (`data` block in source)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub span: Span,
}

/// Struct field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

/// Enum definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub variants: Vec<String>,
    #[serde(default)]
    pub span: Span,
}

/// Component declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub state: Vec<StateVar>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    #[serde(default)]
    pub view: Vec<ViewNode>,
    #[serde(default)]
    pub span: Span,
}

impl Component {
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn state_var(&self, name: &str) -> Option<&StateVar> {
        self.state.iter().find(|v| v.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Component state variable: `[pub] [mut] Type name = init;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVar {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub mutable: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub init: Option<Expr>,
    #[serde(default)]
    pub span: Span,
}

/// Component parameter (prop)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    /// Declared type; for callbacks this is the return type (`void`)
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub mutable: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_reference: bool,
    /// `def name(T1, T2)` parameters carry their argument types here
    #[serde(default)]
    pub callback: Option<Vec<TypeExpr>>,
    #[serde(default)]
    pub default: Option<Expr>,
    #[serde(default)]
    pub span: Span,
}

impl Param {
    pub fn is_callback(&self) -> bool {
        self.callback.is_some()
    }
}

/// Component method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub params: Vec<MethodParam>,
    #[serde(default)]
    pub ret: Option<TypeExpr>,
    #[serde(default)]
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub span: Span,
}

/// Run once before the first mount
pub const INIT_METHOD: &str = "init";
/// Run once the view is in the document
pub const MOUNT_METHOD: &str = "mount";
/// Run every frame, optionally with the elapsed seconds
pub const TICK_METHOD: &str = "tick";

impl Method {
    /// Position of a parameter, falling back to the method's own
    pub fn param_span(&self, param: &MethodParam) -> Span {
        if param.span.is_known() {
            param.span
        } else {
            self.span
        }
    }
}

/// Method parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub mutable: bool,
    #[serde(default)]
    pub span: Span,
}

// ==================== Statements ====================

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Stmt {
    /// `[mut] Type name = init;`
    VarDecl {
        name: String,
        #[serde(rename = "type", default)]
        ty: Option<TypeExpr>,
        #[serde(default)]
        mutable: bool,
        #[serde(default)]
        init: Option<Expr>,
        #[serde(default)]
        span: Span,
    },
    /// `name = value;` or `name += value;`
    Assign {
        target: String,
        value: Expr,
        #[serde(default)]
        op: Option<BinOp>,
        #[serde(default)]
        span: Span,
    },
    /// `array[index] = value;`
    IndexAssign {
        array: Expr,
        index: Expr,
        value: Expr,
        #[serde(default)]
        op: Option<BinOp>,
        #[serde(default)]
        span: Span,
    },
    /// `object.member = value;`
    MemberAssign {
        object: Expr,
        member: String,
        value: Expr,
        #[serde(default)]
        op: Option<BinOp>,
        #[serde(default)]
        span: Span,
    },
    Expr {
        expr: Expr,
        #[serde(default)]
        span: Span,
    },
    Return {
        #[serde(default)]
        value: Option<Expr>,
        #[serde(default)]
        span: Span,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        #[serde(default)]
        else_branch: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    ForRange {
        var: String,
        start: Expr,
        end: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    ForEach {
        var: String,
        iterable: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Block {
        stmts: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::IndexAssign { span, .. }
            | Stmt::MemberAssign { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::If { span, .. }
            | Stmt::ForRange { span, .. }
            | Stmt::ForEach { span, .. }
            | Stmt::Block { span, .. } => *span,
        }
    }
}

// ==================== Expressions ====================

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Expr {
    Int {
        value: i64,
        #[serde(default)]
        span: Span,
    },
    Float {
        value: f64,
        #[serde(default)]
        span: Span,
    },
    Bool {
        value: bool,
        #[serde(default)]
        span: Span,
    },
    /// String literal, possibly interpolating `{expr}` parts
    Str {
        parts: Vec<StrPart>,
        #[serde(default)]
        span: Span,
    },
    Ident {
        name: String,
        #[serde(default)]
        span: Span,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Postfix {
        op: PostfixOp,
        operand: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    /// `object.member`
    Member {
        object: Box<Expr>,
        member: String,
        #[serde(default)]
        span: Span,
    },
    /// `array[index]`
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    /// `callee(args)`; the callee is a name or a member path
    Call {
        callee: Box<Expr>,
        #[serde(default)]
        args: Vec<CallArg>,
        #[serde(default)]
        span: Span,
    },
    /// `Component(&name = value, other := value)`
    Construct {
        component: String,
        #[serde(default)]
        args: Vec<CallArg>,
        #[serde(default)]
        span: Span,
    },
    Ternary {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Array {
        elements: Vec<Expr>,
        #[serde(default)]
        span: Span,
    },
    /// `[value; count]`
    ArrayRepeat {
        value: Box<Expr>,
        count: usize,
        #[serde(default)]
        span: Span,
    },
    /// `Mode::Idle`
    EnumAccess {
        enum_name: String,
        variant: String,
        #[serde(default)]
        span: Span,
    },
}

/// Part of an interpolated string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrPart {
    Text(String),
    Expr(Expr),
}

/// Function call or construction argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallArg {
    /// Empty for positional arguments
    #[serde(default)]
    pub name: Option<String>,
    pub value: Expr,
    #[serde(default)]
    pub is_reference: bool,
    #[serde(default)]
    pub is_move: bool,
}

impl CallArg {
    pub fn positional(value: Expr) -> Self {
        Self { name: None, value, is_reference: false, is_move: false }
    }
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Int { span, .. }
            | Expr::Float { span, .. }
            | Expr::Bool { span, .. }
            | Expr::Str { span, .. }
            | Expr::Ident { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Postfix { span, .. }
            | Expr::Member { span, .. }
            | Expr::Index { span, .. }
            | Expr::Call { span, .. }
            | Expr::Construct { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Array { span, .. }
            | Expr::ArrayRepeat { span, .. }
            | Expr::EnumAccess { span, .. } => *span,
        }
    }

    /// Is this a compile-time constant?
    pub fn is_static(&self) -> bool {
        match self {
            Expr::Int { .. } | Expr::Float { .. } | Expr::Bool { .. } | Expr::EnumAccess { .. } => true,
            Expr::Str { parts, .. } => parts.iter().all(|p| match p {
                StrPart::Text(_) => true,
                StrPart::Expr(e) => e.is_static(),
            }),
            Expr::Unary { op, operand, .. } => {
                matches!(op, UnOp::Neg | UnOp::Not) && operand.is_static()
            }
            Expr::Binary { left, right, .. } => left.is_static() && right.is_static(),
            Expr::Ternary { cond, then_expr, else_expr, .. } => {
                cond.is_static() && then_expr.is_static() && else_expr.is_static()
            }
            Expr::Array { elements, .. } => elements.iter().all(Expr::is_static),
            Expr::ArrayRepeat { value, .. } => value.is_static(),
            Expr::Ident { .. }
            | Expr::Postfix { .. }
            | Expr::Member { .. }
            | Expr::Index { .. }
            | Expr::Call { .. }
            | Expr::Construct { .. } => false,
        }
    }

    /// Name of a plain identifier expression
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Source syntax, fully parenthesized
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int { value, .. } => write!(f, "{}", value),
            Expr::Float { value, .. } => write!(f, "{:?}", value),
            Expr::Bool { value, .. } => write!(f, "{}", value),
            Expr::Str { parts, .. } => {
                write!(f, "\"")?;
                for part in parts {
                    match part {
                        StrPart::Text(t) => write!(f, "{}", t.escape_default())?,
                        StrPart::Expr(e) => write!(f, "{{{}}}", e)?,
                    }
                }
                write!(f, "\"")
            }
            Expr::Ident { name, .. } => write!(f, "{}", name),
            Expr::Binary { op, left, right, .. } => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Unary { op, operand, .. } => write!(f, "{}{}", op.symbol(), operand),
            Expr::Postfix { op, operand, .. } => write!(f, "{}{}", operand, op.symbol()),
            Expr::Member { object, member, .. } => write!(f, "{}.{}", object, member),
            Expr::Index { array, index, .. } => write!(f, "{}[{}]", array, index),
            Expr::Call { callee, args, .. } => {
                write!(f, "{}(", callee)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Expr::Construct { component, args, .. } => {
                write!(f, "{}(", component)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Expr::Ternary { cond, then_expr, else_expr, .. } => {
                write!(f, "({} ? {} : {})", cond, then_expr, else_expr)
            }
            Expr::Array { elements, .. } => {
                write!(f, "[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, "]")
            }
            Expr::ArrayRepeat { value, count, .. } => write!(f, "[{}; {}]", value, count),
            Expr::EnumAccess { enum_name, variant, .. } => write!(f, "{}::{}", enum_name, variant),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[CallArg]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        if arg.is_reference {
            write!(f, "&")?;
        }
        match &arg.name {
            Some(name) if arg.is_move => write!(f, "{} := ", name)?,
            Some(name) => write!(f, "{} = ", name)?,
            None => {}
        }
        write!(f, "{}", arg.value)?;
    }
    Ok(())
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "<<")]
    Shl,
    #[serde(rename = ">>")]
    Shr,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr)
    }
}

/// Prefix operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "++")]
    PreInc,
    #[serde(rename = "--")]
    PreDec,
}

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Not => "!",
            UnOp::PreInc => "++",
            UnOp::PreDec => "--",
        }
    }

    pub fn is_increment(self) -> bool {
        matches!(self, UnOp::PreInc | UnOp::PreDec)
    }
}

/// Postfix operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostfixOp {
    #[serde(rename = "++")]
    Inc,
    #[serde(rename = "--")]
    Dec,
}

impl PostfixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            PostfixOp::Inc => "++",
            PostfixOp::Dec => "--",
        }
    }
}

// ==================== View Tree ====================

/// Node of a component's view tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ViewNode {
    /// Literal text
    Text {
        text: String,
        #[serde(default)]
        span: Span,
    },
    /// `{expr}` between tags
    Expr {
        expr: Expr,
        #[serde(default)]
        span: Span,
    },
    Element(HtmlElement),
    Component(ComponentInstantiation),
    If {
        cond: Expr,
        #[serde(default)]
        then_children: Vec<ViewNode>,
        #[serde(default)]
        else_children: Vec<ViewNode>,
        #[serde(default)]
        span: Span,
    },
    ForRange {
        var: String,
        start: Expr,
        end: Expr,
        #[serde(default)]
        children: Vec<ViewNode>,
        #[serde(default)]
        span: Span,
    },
    ForEach {
        var: String,
        iterable: Expr,
        #[serde(default)]
        key: Option<Expr>,
        #[serde(default)]
        children: Vec<ViewNode>,
        #[serde(default)]
        span: Span,
    },
}

impl ViewNode {
    pub fn span(&self) -> Span {
        match self {
            ViewNode::Text { span, .. }
            | ViewNode::Expr { span, .. }
            | ViewNode::If { span, .. }
            | ViewNode::ForRange { span, .. }
            | ViewNode::ForEach { span, .. } => *span,
            ViewNode::Element(el) => el.span,
            ViewNode::Component(c) => c.span,
        }
    }
}

/// `<tag attr={expr}>children</tag>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlElement {
    pub tag: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub children: Vec<ViewNode>,
    /// `&={var}` binds the created element handle to a state variable
    #[serde(default)]
    pub ref_binding: Option<String>,
    #[serde(default)]
    pub span: Span,
}

/// Element attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: Expr,
    #[serde(default)]
    pub span: Span,
}

impl Attribute {
    /// Event attributes register handlers instead of binding values
    pub fn event_kind(&self) -> Option<EventKind> {
        EventKind::from_attribute(&self.name)
    }
}

/// DOM events the runtime dispatches to element handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Click,
    Input,
    Change,
    KeyDown,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [EventKind::Click, EventKind::Input, EventKind::Change, EventKind::KeyDown];

    pub fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "onclick" => Some(Self::Click),
            "oninput" => Some(Self::Input),
            "onchange" => Some(Self::Change),
            "onkeydown" => Some(Self::KeyDown),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Input => "input",
            Self::Change => "change",
            Self::KeyDown => "keydown",
        }
    }

    /// Arguments the runtime passes to a handler for this event
    pub fn handler_params(self) -> &'static [&'static str] {
        match self {
            Self::Click => &[],
            Self::Input | Self::Change => &["string"],
            Self::KeyDown => &["int"],
        }
    }
}

/// `<Child prop={value} &ref={value} />`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstantiation {
    pub component: String,
    #[serde(default)]
    pub props: Vec<PropArg>,
    #[serde(default)]
    pub span: Span,
}

/// Prop passed to a child component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropArg {
    pub name: String,
    pub value: Expr,
    #[serde(default)]
    pub is_reference: bool,
    #[serde(default)]
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_expr_parsing() {
        assert_eq!("int".parse::<TypeExpr>().unwrap(), TypeExpr::named("int"));
        assert_eq!(
            "string[]".parse::<TypeExpr>().unwrap(),
            TypeExpr::Array(Box::new(TypeExpr::named("string")))
        );
        assert_eq!(
            "float[4][]".parse::<TypeExpr>().unwrap(),
            TypeExpr::Array(Box::new(TypeExpr::FixedArray(Box::new(TypeExpr::named("float")), 4)))
        );
        assert!("[3]".parse::<TypeExpr>().is_err());
        assert!("int[x]".parse::<TypeExpr>().is_err());
        assert_eq!("int[4]".parse::<TypeExpr>().unwrap().to_string(), "int[4]");
    }

    #[test]
    fn test_static_expressions() {
        let lit = Expr::Int { value: 3, span: Span::dummy() };
        let id = Expr::Ident { name: "count".into(), span: Span::dummy() };
        assert!(lit.is_static());
        assert!(!id.is_static());

        let sum = Expr::Binary {
            op: BinOp::Add,
            left: Box::new(lit.clone()),
            right: Box::new(id.clone()),
            span: Span::dummy(),
        };
        assert!(!sum.is_static());

        let text = Expr::Str { parts: vec![StrPart::Text("hi".into())], span: Span::dummy() };
        assert!(text.is_static());
        let interp = Expr::Str {
            parts: vec![StrPart::Text("n = ".into()), StrPart::Expr(id)],
            span: Span::dummy(),
        };
        assert!(!interp.is_static());
        assert_eq!(interp.to_string(), "\"n = {count}\"");
        assert_eq!(sum.to_string(), "(3 + count)");
    }

    #[test]
    fn test_component_from_json() {
        let json = serde_json::json!({
            "name": "Counter",
            "state": [
                { "name": "count", "type": "int", "mutable": true,
                  "init": { "kind": "Int", "value": 0 }, "span": { "line": 2 } }
            ],
            "methods": [{
                "name": "inc",
                "body": [{ "kind": "Expr", "expr": {
                    "kind": "Postfix", "op": "++",
                    "operand": { "kind": "Ident", "name": "count" } } }]
            }],
            "view": [{
                "kind": "Element", "tag": "button",
                "attributes": [{ "name": "onclick", "value": { "kind": "Ident", "name": "inc" } }],
                "children": [{ "kind": "Expr", "expr": { "kind": "Ident", "name": "count" } }]
            }]
        });
        let comp: Component = serde_json::from_value(json).unwrap();
        assert_eq!(comp.name, "Counter");
        assert_eq!(comp.state[0].ty, TypeExpr::named("int"));
        assert!(comp.state[0].mutable);
        assert_eq!(comp.state[0].span.line, 2);
        assert!(comp.method("inc").is_some());
        match &comp.view[0] {
            ViewNode::Element(el) => {
                assert_eq!(el.tag, "button");
                assert_eq!(el.children.len(), 1);
            }
            other => panic!("unexpected node {:?}", other),
        }
    }
}
