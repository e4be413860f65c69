//! # PSL Domain Models
//!
//! Entity and container types for parts structures reconstructed from
//! Parts Structure List exports.
//!
//! ## Key Models
//!
//! - **Entity**: an assembly, sub-assembly or part with identity, description,
//!   optional reference designator and optional provenance tag
//! - **Structure**: the container capability that lets an entity own children
//! - **EntityTree**: arena holding every entity of one parse, addressed by
//!   stable `EntityId` handles
//! - **EntityNode**: owned nested snapshot used for output and deep comparison

pub mod entity;
pub mod tree;

#[cfg(test)]
pub mod property_tests;

pub use entity::*;
pub use tree::*;
