//! Frontend module - AST, input loading, semantic analysis

pub mod ast;
pub mod module;
pub mod mutability;
pub mod semantic;
pub mod view_check;
