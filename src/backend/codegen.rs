//! Code Generation trait - Backend abstraction
//!
//! Backends turn lifecycle plans into source text for some host runtime.

use crate::backend::lifecycle::ComponentPlan;
use crate::utils::Result;

/// Code generation backend trait
pub trait CodeGen {
    /// Render the plans, already in dependency order, as one source file
    fn generate(&mut self, plans: &[ComponentPlan]) -> Result<String>;

    /// Get the backend name
    fn name(&self) -> &str;
}
