//! Middle-end module - dependencies, component ordering and reactive regions

pub mod deps;
pub mod graph;
pub mod region_printer;
pub mod regions;
pub mod update_plan;
