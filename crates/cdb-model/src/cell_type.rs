//! Canonical cell type tags.

use serde::{Deserialize, Serialize};

/// Canonical polyhedral cell type, independent of the vendor's numeric
/// element-type ids (185/186/187/181/...).
///
/// The numeric values match the VTK unstructured-grid cell type codes so
/// the mesh can cross the interchange boundary without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellType {
    /// Placeholder for an element that was filtered out but kept to
    /// preserve cell numbering.
    Null = 0,
    /// 3-node triangle
    Tri3 = 5,
    /// 4-node quadrilateral
    Quad4 = 9,
    /// 4-node tetrahedron
    Tet4 = 10,
    /// 8-node hexahedron
    Hex8 = 12,
    /// 6-node wedge
    Wedge6 = 13,
    /// 5-node pyramid
    Pyramid5 = 14,
    /// 6-node quadratic triangle
    Tri6 = 22,
    /// 8-node quadratic quadrilateral
    Quad8 = 23,
    /// 10-node quadratic tetrahedron
    Tet10 = 24,
    /// 20-node quadratic hexahedron
    Hex20 = 25,
    /// 15-node quadratic wedge
    Wedge15 = 26,
    /// 13-node quadratic pyramid
    Pyramid13 = 27,
}

impl CellType {
    /// All cell types the codec supports, in ascending VTK id order.
    pub const ALL: [CellType; 12] = [
        CellType::Tri3,
        CellType::Quad4,
        CellType::Tet4,
        CellType::Hex8,
        CellType::Wedge6,
        CellType::Pyramid5,
        CellType::Tri6,
        CellType::Quad8,
        CellType::Tet10,
        CellType::Hex20,
        CellType::Wedge15,
        CellType::Pyramid13,
    ];

    /// Number of nodes in the canonical connectivity of this cell type.
    pub fn num_nodes(&self) -> usize {
        match self {
            CellType::Null => 0,
            CellType::Tri3 => 3,
            CellType::Quad4 => 4,
            CellType::Tet4 => 4,
            CellType::Hex8 => 8,
            CellType::Wedge6 => 6,
            CellType::Pyramid5 => 5,
            CellType::Tri6 => 6,
            CellType::Quad8 => 8,
            CellType::Tet10 => 10,
            CellType::Hex20 => 20,
            CellType::Wedge15 => 15,
            CellType::Pyramid13 => 13,
        }
    }

    /// Number of corner nodes (quadratic cells share corners with their
    /// linear variant).
    pub fn num_corners(&self) -> usize {
        self.linear().num_nodes()
    }

    /// Whether this cell type carries midside nodes.
    pub fn is_quadratic(&self) -> bool {
        matches!(
            self,
            CellType::Tri6
                | CellType::Quad8
                | CellType::Tet10
                | CellType::Hex20
                | CellType::Wedge15
                | CellType::Pyramid13
        )
    }

    /// Whether this cell is a surface (shell) cell rather than a solid.
    pub fn is_surface(&self) -> bool {
        matches!(
            self,
            CellType::Tri3 | CellType::Quad4 | CellType::Tri6 | CellType::Quad8
        )
    }

    /// The linear variant of this cell type (identity for linear cells).
    pub fn linear(&self) -> CellType {
        match self {
            CellType::Tri6 => CellType::Tri3,
            CellType::Quad8 => CellType::Quad4,
            CellType::Tet10 => CellType::Tet4,
            CellType::Hex20 => CellType::Hex8,
            CellType::Wedge15 => CellType::Wedge6,
            CellType::Pyramid13 => CellType::Pyramid5,
            other => *other,
        }
    }

    /// VTK unstructured-grid cell type code.
    pub fn vtk_id(&self) -> u8 {
        *self as u8
    }

    /// Map a VTK cell type code back to a canonical cell type.
    pub fn from_vtk_id(id: u8) -> Option<CellType> {
        match id {
            0 => Some(CellType::Null),
            5 => Some(CellType::Tri3),
            9 => Some(CellType::Quad4),
            10 => Some(CellType::Tet4),
            12 => Some(CellType::Hex8),
            13 => Some(CellType::Wedge6),
            14 => Some(CellType::Pyramid5),
            22 => Some(CellType::Tri6),
            23 => Some(CellType::Quad8),
            24 => Some(CellType::Tet10),
            25 => Some(CellType::Hex20),
            26 => Some(CellType::Wedge15),
            27 => Some(CellType::Pyramid13),
            _ => None,
        }
    }

    /// Default vendor element type number used when an archive is written
    /// without caller-supplied element types.
    pub fn default_vendor_type(&self) -> Option<i32> {
        match self {
            CellType::Hex8 | CellType::Tet4 | CellType::Wedge6 | CellType::Pyramid5 => Some(185),
            CellType::Hex20 | CellType::Wedge15 | CellType::Pyramid13 => Some(186),
            CellType::Tet10 => Some(187),
            CellType::Tri3 | CellType::Quad4 => Some(181),
            CellType::Tri6 | CellType::Quad8 => Some(281),
            CellType::Null => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_counts() {
        assert_eq!(CellType::Tet4.num_nodes(), 4);
        assert_eq!(CellType::Tet10.num_nodes(), 10);
        assert_eq!(CellType::Hex20.num_nodes(), 20);
        assert_eq!(CellType::Pyramid13.num_nodes(), 13);
        assert_eq!(CellType::Null.num_nodes(), 0);
    }

    #[test]
    fn linear_variants() {
        assert_eq!(CellType::Hex20.linear(), CellType::Hex8);
        assert_eq!(CellType::Tet10.linear(), CellType::Tet4);
        assert_eq!(CellType::Quad4.linear(), CellType::Quad4);
        assert!(CellType::Wedge15.is_quadratic());
        assert!(!CellType::Wedge6.is_quadratic());
    }

    #[test]
    fn vtk_ids_round_trip() {
        for ct in CellType::ALL {
            assert_eq!(CellType::from_vtk_id(ct.vtk_id()), Some(ct));
        }
        assert_eq!(CellType::from_vtk_id(42), None);
    }

    #[test]
    fn default_vendor_types() {
        assert_eq!(CellType::Hex8.default_vendor_type(), Some(185));
        assert_eq!(CellType::Hex20.default_vendor_type(), Some(186));
        assert_eq!(CellType::Tet10.default_vendor_type(), Some(187));
        assert_eq!(CellType::Quad4.default_vendor_type(), Some(181));
    }
}
