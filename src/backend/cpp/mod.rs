//! C++ Backend - Render lifecycle plans for the webcc host runtime
//!
//! The output is a single translation unit; an external toolchain compiles
//! it and links it against the runtime.

mod cpp_codegen;
mod expr;

pub use cpp_codegen::{updater_name, CppCodeGen};
