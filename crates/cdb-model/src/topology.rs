//! Element Topology Table: node reorder/duplication recipes.
//!
//! ANSYS stores degenerate solids by packing a simpler shape into a more
//! complex shape's node slots and duplicating node ids into the unused
//! slots (a tetrahedron in an 8- or 20-slot hex record, a triangle in a
//! 4-slot quad record, ...). The tables here describe, per canonical cell
//! type, which record slot each canonical node lives in. The decoder reads
//! through them and the encoder writes through their inverses, so the two
//! directions cannot drift apart.

use crate::cell_type::CellType;

/// Shape of a solid element record, recovered from its duplicate-node
/// pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolidShape {
    Hex,
    Wedge,
    Pyramid,
    Tet,
}

/// Classify an 8- or 20-slot solid record by testing the documented
/// duplicate-node slots.
///
/// The tests mirror the vendor's packing convention: a collapsed L slot
/// marks a wedge or tet, a collapsed top face marks a pyramid or tet.
pub fn classify_solid(nodes: &[i32]) -> SolidShape {
    if nodes[6] != nodes[7] {
        SolidShape::Hex
    } else if nodes[5] != nodes[6] {
        SolidShape::Wedge
    } else if nodes[2] != nodes[3] {
        SolidShape::Pyramid
    } else {
        SolidShape::Tet
    }
}

/// Record slots holding the corner nodes of a solid packed in the
/// hex-shaped layout, in canonical corner order.
pub fn solid_corner_slots(shape: SolidShape) -> &'static [usize] {
    match shape {
        SolidShape::Hex => &[0, 1, 2, 3, 4, 5, 6, 7],
        SolidShape::Wedge => &[2, 1, 0, 6, 5, 4],
        SolidShape::Pyramid => &[0, 1, 2, 3, 4],
        SolidShape::Tet => &[0, 1, 2, 4],
    }
}

/// Record slots holding the midside nodes of a solid packed in the
/// 20-slot hex-shaped layout, in canonical midside order.
pub fn solid_midside_slots(shape: SolidShape) -> &'static [usize] {
    match shape {
        SolidShape::Hex => &[8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19],
        SolidShape::Wedge => &[9, 8, 11, 13, 12, 15, 18, 17, 16],
        SolidShape::Pyramid => &[8, 9, 10, 11, 16, 17, 18, 19],
        SolidShape::Tet => &[8, 9, 11, 16, 17, 18],
    }
}

/// Corner slots of a tetrahedron stored in its native 10-slot layout
/// (SOLID187-style records).
pub const TET_NATIVE_CORNER_SLOTS: [usize; 4] = [0, 1, 2, 3];

/// Midside slots of a tetrahedron stored in its native 10-slot layout.
pub const TET_NATIVE_MIDSIDE_SLOTS: [usize; 6] = [4, 5, 6, 7, 8, 9];

/// Canonical node slots of a triangle packed in a 4-slot quad record
/// (third corner doubled).
pub const TRI_IN_QUAD_SLOTS: [usize; 3] = [0, 1, 2];

/// Canonical node slots of a quadratic triangle packed in an 8-slot quad
/// record: corners 0-2, then midsides of edges (0,1), (1,2), (2,0).
pub const TRI6_IN_QUAD_SLOTS: [usize; 6] = [0, 1, 2, 4, 5, 7];

/// Whether a 4- or 8-slot shell record holds a (possibly quadratic)
/// triangle rather than a quad.
pub fn shell_is_triangle(nodes: &[i32]) -> bool {
    nodes[2] == nodes[3]
}

/// Write recipe: for each record slot, the canonical node index to emit.
///
/// This is the inverse of the corner/midside slot tables above; duplicate
/// entries realize the degenerate-shape padding. `Tet10` maps to its
/// native 187 layout here; use [`TET10_AS_186_PATTERN`] when the cell is
/// typed as a 186.
pub fn write_pattern(cell_type: CellType) -> Option<&'static [usize]> {
    match cell_type {
        CellType::Tet4 => Some(&[0, 1, 2, 2, 3, 3, 3, 3]),
        CellType::Tet10 => Some(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]),
        CellType::Hex8 => Some(&[0, 1, 2, 3, 4, 5, 6, 7]),
        CellType::Hex20 => Some(&[
            0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19,
        ]),
        CellType::Wedge6 => Some(&[2, 1, 0, 0, 5, 4, 3, 3]),
        CellType::Wedge15 => Some(&[
            2, 1, 0, 0, 5, 4, 3, 3, 7, 6, 0, 8, 10, 9, 3, 11, 14, 13, 12, 12,
        ]),
        CellType::Pyramid5 => Some(&[0, 1, 2, 3, 4, 4, 4, 4]),
        CellType::Pyramid13 => Some(&[
            0, 1, 2, 3, 4, 4, 4, 4, 5, 6, 7, 8, 4, 4, 4, 4, 9, 10, 11, 12,
        ]),
        CellType::Tri3 => Some(&[0, 1, 2, 2]),
        CellType::Quad4 => Some(&[0, 1, 2, 3]),
        CellType::Tri6 => Some(&[0, 1, 2, 2, 3, 4, 2, 5]),
        CellType::Quad8 => Some(&[0, 1, 2, 3, 4, 5, 6, 7]),
        CellType::Null => None,
    }
}

/// Write recipe for a quadratic tetrahedron packed into the 20-slot
/// hex-shaped layout of a type-186 record.
pub const TET10_AS_186_PATTERN: [usize; 20] = [
    0, 1, 2, 2, 3, 3, 3, 3, 4, 5, 3, 6, 3, 3, 3, 3, 7, 8, 9, 9,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_solid_shapes() {
        assert_eq!(classify_solid(&[1, 2, 3, 4, 5, 6, 7, 8]), SolidShape::Hex);
        assert_eq!(classify_solid(&[3, 2, 1, 1, 6, 5, 4, 4]), SolidShape::Wedge);
        assert_eq!(
            classify_solid(&[1, 2, 3, 4, 5, 5, 5, 5]),
            SolidShape::Pyramid
        );
        assert_eq!(classify_solid(&[1, 2, 3, 3, 4, 4, 4, 4]), SolidShape::Tet);
    }

    #[test]
    fn write_patterns_invert_read_slots() {
        // Reading back what the write recipe emits must restore the
        // canonical ordering for every solid shape.
        let cases = [
            (CellType::Tet4, SolidShape::Tet),
            (CellType::Hex8, SolidShape::Hex),
            (CellType::Wedge6, SolidShape::Wedge),
            (CellType::Pyramid5, SolidShape::Pyramid),
            (CellType::Hex20, SolidShape::Hex),
            (CellType::Wedge15, SolidShape::Wedge),
            (CellType::Pyramid13, SolidShape::Pyramid),
        ];
        for (ct, shape) in cases {
            let pattern = write_pattern(ct).unwrap();
            let corners = solid_corner_slots(shape);
            let midsides = solid_midside_slots(shape);
            for (canonical, &slot) in corners.iter().chain(midsides.iter()).enumerate() {
                if slot < pattern.len() {
                    assert_eq!(
                        pattern[slot], canonical,
                        "{ct:?}: slot {slot} should hold canonical node {canonical}"
                    );
                }
            }
        }
    }

    #[test]
    fn tet10_as_186_matches_documented_duplication() {
        // Canonical node 2 fills slots 2 and 3; canonical node 3 fills the
        // collapsed top face and its midsides.
        let p = &TET10_AS_186_PATTERN;
        assert_eq!(p[2], 2);
        assert_eq!(p[3], 2);
        for &slot in &[4, 5, 6, 7, 12, 13, 14, 15] {
            assert_eq!(p[slot], 3);
        }
        // Reading the 186 pattern back through the tet slot tables yields
        // the identity.
        for (canonical, &slot) in solid_corner_slots(SolidShape::Tet)
            .iter()
            .chain(solid_midside_slots(SolidShape::Tet))
            .enumerate()
        {
            assert_eq!(p[slot], canonical);
        }
    }

    #[test]
    fn triangle_packing() {
        assert!(shell_is_triangle(&[1, 2, 3, 3]));
        assert!(!shell_is_triangle(&[1, 2, 3, 4]));
        assert_eq!(write_pattern(CellType::Tri3).unwrap(), &[0, 1, 2, 2]);
        assert_eq!(
            write_pattern(CellType::Tri6).unwrap(),
            &[0, 1, 2, 2, 3, 4, 2, 5]
        );
    }
}
