//! Backend module - Lifecycle planning and code generation

pub mod codegen;
pub mod cpp;
pub mod lifecycle;

pub use codegen::CodeGen;
pub use cpp::CppCodeGen;
pub use lifecycle::{plan_components, ComponentPlan};
