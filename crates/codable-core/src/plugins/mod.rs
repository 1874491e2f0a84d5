//! Plugin layer: per-category registries that map labels to classes.

pub mod registries;
pub mod registry;
