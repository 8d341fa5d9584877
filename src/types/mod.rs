//! Type system and external schema

pub mod schema;
pub mod type_system;

pub use schema::TypeSchema;
pub use type_system::{is_compatible, PrimitiveType, Type, TypeEnv};
