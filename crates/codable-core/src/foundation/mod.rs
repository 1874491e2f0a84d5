//! Foundation layer: config nodes, field descriptors, the class catalog and
//! key interning.

pub mod catalog;
pub mod descriptor;
pub mod intern;
pub mod node;
