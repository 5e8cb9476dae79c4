//! Minimum scaled Jacobian per cell.
//!
//! At each corner of a cell the three (for solids) or two (for surface
//! cells) edge vectors leaving that corner span a parallelepiped; the
//! scaled Jacobian is its signed volume divided by the product of the
//! edge lengths, a dimensionless value in [-1, 1]. The cell's quality is
//! the minimum over its corners: 1 for an ideal right-angled corner
//! configuration, 0 or negative for collapsed or inverted cells.

use cdb_model::cell_type::CellType;
use cdb_model::mesh::Mesh;
use nalgebra::{Matrix3, RealField, Vector3};
use rayon::prelude::*;

/// Sign convention of the input grid.
///
/// Structured grids order their cell corners with the opposite
/// handedness from the unstructured convention used here, so their
/// Jacobians come out negated. The flag makes that a caller-facing
/// choice instead of an input-type heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    UnstructuredGrid,
    /// Negate every quality value.
    StructuredGrid,
}

/// For each solid corner: the corner itself, then the three adjacent
/// corners whose edges form a right-handed frame in the ideal shape.
const HEX_CORNERS: [[usize; 4]; 8] = [
    [0, 1, 3, 4],
    [1, 2, 0, 5],
    [2, 3, 1, 6],
    [3, 0, 2, 7],
    [4, 7, 5, 0],
    [5, 4, 6, 1],
    [6, 5, 7, 2],
    [7, 6, 4, 3],
];

const TET_CORNERS: [[usize; 4]; 4] = [
    [0, 1, 2, 3],
    [1, 2, 0, 3],
    [2, 0, 1, 3],
    [3, 2, 1, 0],
];

const WEDGE_CORNERS: [[usize; 4]; 6] = [
    [0, 2, 1, 3],
    [1, 0, 2, 4],
    [2, 1, 0, 5],
    [3, 4, 5, 0],
    [4, 5, 3, 1],
    [5, 3, 4, 2],
];

/// Base corners only; the apex has no well-defined edge frame.
const PYRAMID_CORNERS: [[usize; 4]; 4] = [
    [0, 1, 3, 4],
    [1, 2, 0, 4],
    [2, 3, 1, 4],
    [3, 0, 2, 4],
];

/// For each surface corner: the corner itself, then the two adjacent
/// corners in counterclockwise order.
const TRI_CORNERS: [[usize; 3]; 3] = [[0, 1, 2], [1, 2, 0], [2, 0, 1]];

const QUAD_CORNERS: [[usize; 3]; 4] = [[0, 1, 3], [1, 2, 0], [2, 3, 1], [3, 0, 2]];

fn solid_corner_table(cell_type: CellType) -> &'static [[usize; 4]] {
    match cell_type.linear() {
        CellType::Hex8 => &HEX_CORNERS,
        CellType::Tet4 => &TET_CORNERS,
        CellType::Wedge6 => &WEDGE_CORNERS,
        CellType::Pyramid5 => &PYRAMID_CORNERS,
        _ => unreachable!("surface and null types are dispatched separately"),
    }
}

fn surface_corner_table(cell_type: CellType) -> &'static [[usize; 3]] {
    match cell_type.linear() {
        CellType::Tri3 => &TRI_CORNERS,
        CellType::Quad4 => &QUAD_CORNERS,
        _ => unreachable!("solid and null types are dispatched separately"),
    }
}

fn point<T: RealField + Copy>(points: &[[T; 3]], cell: &[usize], corner: usize) -> Vector3<T> {
    Vector3::from(points[cell[corner]])
}

fn clamp_unit<T: RealField + Copy>(q: T) -> T {
    q.min(T::one()).max(-T::one())
}

fn solid_quality<T: RealField + Copy>(
    table: &[[usize; 4]],
    cell: &[usize],
    points: &[[T; 3]],
) -> T {
    let mut min = T::one();
    for &[corner, a, b, c] in table {
        let origin = point(points, cell, corner);
        let e1 = point(points, cell, a) - origin;
        let e2 = point(points, cell, b) - origin;
        let e3 = point(points, cell, c) - origin;
        let denom = e1.norm() * e2.norm() * e3.norm();
        let q = if denom == T::zero() {
            T::zero()
        } else {
            Matrix3::from_columns(&[e1, e2, e3]).determinant() / denom
        };
        min = min.min(q);
    }
    clamp_unit(min)
}

/// Surface cells measure the corner cross products against the cell's
/// own normal at corner 0, so a flipped corner counts as negative rather
/// than folding back to a positive area.
fn surface_quality<T: RealField + Copy>(
    table: &[[usize; 3]],
    cell: &[usize],
    points: &[[T; 3]],
) -> T {
    let [corner, a, b] = table[0];
    let origin = point(points, cell, corner);
    let reference = (point(points, cell, a) - origin).cross(&(point(points, cell, b) - origin));
    let reference_norm = reference.norm();
    if reference_norm == T::zero() {
        return T::zero();
    }
    let reference = reference / reference_norm;

    let mut min = T::one();
    for &[corner, a, b] in table {
        let origin = point(points, cell, corner);
        let e1 = point(points, cell, a) - origin;
        let e2 = point(points, cell, b) - origin;
        let denom = e1.norm() * e2.norm();
        let q = if denom == T::zero() {
            T::zero()
        } else {
            e1.cross(&e2).dot(&reference) / denom
        };
        min = min.min(q);
    }
    clamp_unit(min)
}

/// Quality of a single cell; `cell` holds point indices in canonical
/// corner-then-midside order. Midside nodes do not enter the metric.
pub fn cell_quality<T: RealField + Copy>(
    cell_type: CellType,
    cell: &[usize],
    points: &[[T; 3]],
) -> T {
    match cell_type {
        // Placeholder cells count as valid by convention.
        CellType::Null => T::one(),
        ct if ct.is_surface() => surface_quality(surface_corner_table(ct), cell, points),
        ct => solid_quality(solid_corner_table(ct), cell, points),
    }
}

/// Quality of every cell in a CSR cell array, computed cell-parallel.
pub fn quality_from_arrays<T: RealField + Copy + Send + Sync>(
    celltypes: &[CellType],
    cells: &[usize],
    offsets: &[usize],
    points: &[[T; 3]],
    orientation: Orientation,
) -> Vec<T> {
    let sign = match orientation {
        Orientation::UnstructuredGrid => T::one(),
        Orientation::StructuredGrid => -T::one(),
    };
    celltypes
        .par_iter()
        .enumerate()
        .map(|(i, &cell_type)| {
            let cell = &cells[offsets[i]..offsets[i + 1]];
            let q = cell_quality(cell_type, cell, points);
            // Null cells stay exactly 1 under either convention.
            if cell_type == CellType::Null { q } else { sign * q }
        })
        .collect()
}

/// Double-precision entry point.
pub fn quality_f64(
    celltypes: &[CellType],
    cells: &[usize],
    offsets: &[usize],
    points: &[[f64; 3]],
    orientation: Orientation,
) -> Vec<f64> {
    quality_from_arrays(celltypes, cells, offsets, points, orientation)
}

/// Single-precision entry point.
pub fn quality_f32(
    celltypes: &[CellType],
    cells: &[usize],
    offsets: &[usize],
    points: &[[f32; 3]],
    orientation: Orientation,
) -> Vec<f32> {
    quality_from_arrays(celltypes, cells, offsets, points, orientation)
}

/// Quality of every cell of a decoded mesh.
pub fn quality(mesh: &Mesh, orientation: Orientation) -> Vec<f64> {
    quality_from_arrays(
        &mesh.celltypes,
        &mesh.cells,
        &mesh.offsets,
        &mesh.points,
        orientation,
    )
}
