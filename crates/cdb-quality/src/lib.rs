//! Mesh quality metrics for decoded archive meshes.
//!
//! Currently one metric: the minimum scaled Jacobian per cell, generic
//! over `f32`/`f64` point arrays and computed cell-parallel.

pub mod scaled_jacobian;

pub use scaled_jacobian::{
    Orientation, cell_quality, quality, quality_f32, quality_f64, quality_from_arrays,
};
