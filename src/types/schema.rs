//! External type schema
//!
//! Host-runtime types (handles such as `Canvas` or `DOMElement`), their
//! methods, inheritance edges and aliases. The schema is loaded once and
//! only queried afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::frontend::ast::TypeExpr;
use crate::utils::{Error, Result};

/// One type of the host runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    /// Builtin types (string, array) extend language types instead of
    /// describing a handle
    #[serde(default)]
    pub builtin: bool,
    /// Values can only be moved or referenced, never copied
    #[serde(default)]
    pub nocopy: bool,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub alias_of: Option<String>,
    #[serde(default)]
    pub methods: Vec<MethodEntry>,
}

impl TypeEntry {
    pub fn handle(name: &str) -> Self {
        Self {
            name: name.to_string(),
            builtin: false,
            nocopy: false,
            extends: None,
            alias_of: None,
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.extends = Some(parent.to_string());
        self
    }

    pub fn with_method(mut self, method: MethodEntry) -> Self {
        self.methods.push(method);
        self
    }
}

/// Method of a schema type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodEntry {
    pub name: String,
    #[serde(default)]
    pub params: Vec<SchemaParam>,
    #[serde(default)]
    pub returns: Option<TypeExpr>,
    /// Called on the type itself (`System.log(..)`) rather than a value
    #[serde(default)]
    pub shared: bool,
    /// Calling it modifies the receiver
    #[serde(default)]
    pub mutates: bool,
}

impl MethodEntry {
    pub fn new(name: &str, params: &[(&str, &str)], returns: Option<&str>) -> Result<Self> {
        let params = params
            .iter()
            .map(|(name, ty)| {
                Ok(SchemaParam { name: name.to_string(), ty: ty.parse()? })
            })
            .collect::<Result<Vec<_>>>()?;
        let returns = returns.map(str::parse).transpose()?;
        Ok(Self { name: name.to_string(), params, returns, shared: false, mutates: false })
    }

    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
}

#[derive(Debug, Default, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    types: Vec<TypeEntry>,
}

/// Read-only lookup service over the host runtime's types
#[derive(Debug, Clone, Default)]
pub struct TypeSchema {
    types: HashMap<String, TypeEntry>,
}

impl TypeSchema {
    /// Schema with no host types; language primitives are still known
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = TypeEntry>) -> Self {
        let types = entries.into_iter().map(|e| (e.name.clone(), e)).collect();
        Self { types }
    }

    pub fn from_json(source: &str) -> Result<Self> {
        let file: SchemaFile = serde_json::from_str(source)?;
        Ok(Self::from_entries(file.types))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        let schema = Self::from_json(&source)?;
        log::debug!("loaded {} schema types from {}", schema.len(), path.display());
        Ok(schema)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn lookup_type(&self, name: &str) -> Option<&TypeEntry> {
        self.types.get(name)
    }

    /// Find a method on a type or any of its ancestors
    pub fn lookup_method(&self, type_name: &str, method: &str) -> Option<&MethodEntry> {
        let mut seen = HashSet::new();
        let mut current = Some(type_name);
        while let Some(name) = current {
            if !seen.insert(name) {
                break;
            }
            let entry = self.types.get(name)?;
            if let Some(m) = entry.methods.iter().find(|m| m.name == method) {
                return Some(m);
            }
            current = entry.extends.as_deref();
        }
        None
    }

    /// Is `base` a strict transitive ancestor of `derived`?
    pub fn inherits_from(&self, derived: &str, base: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = self.types.get(derived).and_then(|e| e.extends.as_deref());
        while let Some(name) = current {
            if name == base {
                return true;
            }
            if !seen.insert(name) {
                return false;
            }
            current = self.types.get(name).and_then(|e| e.extends.as_deref());
        }
        false
    }

    /// A type is nocopy if it or any ancestor is marked nocopy
    pub fn is_nocopy(&self, type_name: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(type_name);
        while let Some(name) = current {
            if !seen.insert(name) {
                return false;
            }
            match self.types.get(name) {
                Some(entry) if entry.nocopy => return true,
                Some(entry) => current = entry.extends.as_deref(),
                None => return false,
            }
        }
        false
    }

    /// Follow alias entries to the canonical name
    pub fn resolve_alias<'a>(&'a self, type_name: &'a str) -> &'a str {
        let mut seen = HashSet::new();
        let mut current = type_name;
        while let Some(target) = self.types.get(current).and_then(|e| e.alias_of.as_deref()) {
            if !seen.insert(current) {
                break;
            }
            current = target;
        }
        current
    }

    /// Handles are schema types that are neither aliases nor builtin extensions
    pub fn is_handle(&self, type_name: &str) -> bool {
        self.types
            .get(type_name)
            .map(|e| !e.builtin && e.alias_of.is_none())
            .unwrap_or(false)
    }

    /// Lookup that reports a missing entry as a schema error
    pub fn require_method(
        &self,
        type_name: &str,
        method: &str,
        span: crate::utils::Span,
    ) -> Result<&MethodEntry> {
        self.lookup_method(type_name, method).ok_or_else(|| Error::SchemaLookup {
            type_name: type_name.to_string(),
            member: Some(method.to_string()),
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom_schema() -> TypeSchema {
        TypeSchema::from_json(
            r#"{ "types": [
                { "name": "Node" },
                { "name": "DOMElement", "extends": "Node", "methods": [
                    { "name": "setText", "params": [{ "name": "text", "type": "string" }], "mutates": true }
                ] },
                { "name": "CanvasElement", "extends": "DOMElement", "nocopy": true },
                { "name": "Canvas", "nocopy": true, "methods": [
                    { "name": "width", "returns": "int" },
                    { "name": "create", "shared": true, "returns": "Canvas" }
                ] },
                { "name": "i32", "alias_of": "int32" }
            ] }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_inheritance_is_transitive_and_strict() {
        let schema = dom_schema();
        assert!(schema.inherits_from("CanvasElement", "DOMElement"));
        assert!(schema.inherits_from("CanvasElement", "Node"));
        assert!(!schema.inherits_from("Node", "CanvasElement"));
        assert!(!schema.inherits_from("Node", "Node"));
    }

    #[test]
    fn test_method_lookup_walks_parents() {
        let schema = dom_schema();
        assert!(schema.lookup_method("CanvasElement", "setText").is_some());
        assert!(schema.lookup_method("Node", "setText").is_none());
        let err = schema.require_method("Canvas", "draw", crate::utils::Span::line(3)).unwrap_err();
        assert_eq!(err.kind(), crate::utils::ErrorKind::SchemaLookupError);
    }

    #[test]
    fn test_nocopy_and_aliases() {
        let schema = dom_schema();
        assert!(schema.is_nocopy("Canvas"));
        assert!(!schema.is_nocopy("DOMElement"));
        assert_eq!(schema.resolve_alias("i32"), "int32");
        assert_eq!(schema.resolve_alias("Canvas"), "Canvas");
        assert!(schema.is_handle("Canvas"));
        assert!(!schema.is_handle("i32"));
    }

    #[test]
    fn test_alias_cycles_terminate() {
        let schema = TypeSchema::from_json(
            r#"{ "types": [ { "name": "A", "alias_of": "B" }, { "name": "B", "alias_of": "A" } ] }"#,
        )
        .unwrap();
        let resolved = schema.resolve_alias("A");
        assert!(resolved == "A" || resolved == "B");
    }
}
