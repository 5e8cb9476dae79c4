//! Canonical mesh data model for ANSYS CDB archive tooling.
//!
//! This crate provides the shared vocabulary between the archive codec and
//! the mesh-quality evaluator:
//! - [`CellType`]: shape-agnostic cell tags with VTK-compatible ids
//! - [`Mesh`]: nodes, CSR cell connectivity, attributes, and components
//! - [`topology`]: node reorder/duplication recipes between the vendor's
//!   degenerate slot layouts and the canonical corner-then-midside ordering
//! - [`components`]: CMBLOCK run-length compression helpers

pub mod cell_type;
pub mod components;
pub mod mesh;
pub mod topology;

pub use cell_type::CellType;
pub use mesh::{ElementTypeInfo, Mesh, RealConstantSet};
