//! Mesh container shared by the archive codec and quality evaluator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cell_type::CellType;

/// One entry of the element type key table: a local type-reference number
/// bound to a vendor element number (e.g. `ET, 1, 186`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementTypeInfo {
    /// Local type-reference number used by element records.
    pub etype_ref: i32,
    /// Vendor element number (185, 186, 187, 181, ...).
    pub type_num: i32,
}

/// A real constant set decoded from an RLBLOCK record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealConstantSet {
    /// Real constant set number.
    pub index: i32,
    /// Constant values, in record order.
    pub values: Vec<f64>,
}

/// An unstructured finite-element mesh.
///
/// Cells are stored CSR-style: `cells[offsets[i]..offsets[i + 1]]` are the
/// point indices of cell `i`, ordered canonically (corners then midsides)
/// for the cell's [`CellType`]. Node and element numbers preserve the
/// order they were read in; id lookup goes through a sorted side index.
///
/// The per-cell attribute vectors (`elem_num`, `material`, ...) are either
/// empty (no data) or one entry per cell, with `-1` marking individual
/// missing values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    /// ANSYS node numbers, in file order.
    pub node_num: Vec<i32>,
    /// Node coordinates, corresponding to `node_num`.
    pub points: Vec<[f64; 3]>,
    /// Per-node rotation angles, present only if the node block carried
    /// angle fields.
    pub angles: Option<Vec<[f64; 3]>>,

    /// Flattened cell connectivity (point indices).
    pub cells: Vec<usize>,
    /// Cell offsets into `cells`; always `num_cells() + 1` entries.
    pub offsets: Vec<usize>,
    /// Canonical cell type per cell.
    pub celltypes: Vec<CellType>,

    /// ANSYS element numbers per cell.
    pub elem_num: Vec<i32>,
    /// Material id per cell.
    pub material: Vec<i32>,
    /// Real constant set id per cell.
    pub real_constant: Vec<i32>,
    /// Element type-reference number per cell.
    pub etype_ref: Vec<i32>,
    /// Vendor element type number per cell.
    pub type_num: Vec<i32>,

    /// Element type key table, in first-seen order.
    pub element_types: Vec<ElementTypeInfo>,
    /// Real constant sets, in file order.
    pub real_constants: Vec<RealConstantSet>,

    /// Named node components (selection groups), id lists sorted ascending.
    pub node_components: BTreeMap<String, Vec<i32>>,
    /// Named element components, id lists sorted ascending.
    pub element_components: BTreeMap<String, Vec<i32>>,

    /// Permutation of node positions sorted by node number, used for id
    /// lookup. Rebuild with [`Mesh::rebuild_node_index`] after editing
    /// `node_num`.
    pub node_order: Vec<u32>,
}

impl Mesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points (nodes).
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Number of cells.
    pub fn num_cells(&self) -> usize {
        self.celltypes.len()
    }

    /// Point indices of cell `i`.
    pub fn cell(&self, i: usize) -> &[usize] {
        &self.cells[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Rebuild the sorted-by-id node lookup permutation.
    pub fn rebuild_node_index(&mut self) {
        let mut order: Vec<u32> = (0..self.node_num.len() as u32).collect();
        order.sort_unstable_by_key(|&i| self.node_num[i as usize]);
        self.node_order = order;
    }

    /// Position of the node with ANSYS number `id`, via binary search over
    /// the sorted index.
    pub fn node_index(&self, id: i32) -> Option<usize> {
        debug_assert_eq!(self.node_order.len(), self.node_num.len());
        self.node_order
            .binary_search_by_key(&id, |&i| self.node_num[i as usize])
            .ok()
            .map(|pos| self.node_order[pos] as usize)
    }

    /// Largest node number, or 0 for an empty mesh.
    pub fn max_node_num(&self) -> i32 {
        self.node_num.iter().copied().max().unwrap_or(0)
    }

    /// Check the structural invariants of the mesh.
    pub fn validate(&self) -> Result<(), String> {
        if self.points.len() != self.node_num.len() {
            return Err(format!(
                "{} node numbers but {} coordinate triples",
                self.node_num.len(),
                self.points.len()
            ));
        }
        if let Some(angles) = &self.angles {
            if angles.len() != self.points.len() {
                return Err("angle array length does not match point count".to_string());
            }
        }

        let mut sorted = self.node_num.clone();
        sorted.sort_unstable();
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            return Err("duplicate node numbers".to_string());
        }

        let ncells = self.num_cells();
        if self.offsets.len() != ncells + 1 {
            return Err(format!(
                "expected {} offsets for {} cells, found {}",
                ncells + 1,
                ncells,
                self.offsets.len()
            ));
        }
        if self.offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err("offsets are not monotonically non-decreasing".to_string());
        }
        if *self.offsets.last().unwrap_or(&0) != self.cells.len() {
            return Err("last offset does not match connectivity length".to_string());
        }
        if let Some(&bad) = self.cells.iter().find(|&&p| p >= self.points.len()) {
            return Err(format!("cell references out-of-range point {bad}"));
        }
        for i in 0..ncells {
            let expected = self.celltypes[i].num_nodes();
            let actual = self.offsets[i + 1] - self.offsets[i];
            if actual != expected {
                return Err(format!(
                    "cell {i} of type {:?} has {actual} nodes but expected {expected}",
                    self.celltypes[i]
                ));
            }
        }

        for attr in [
            &self.elem_num,
            &self.material,
            &self.real_constant,
            &self.etype_ref,
            &self.type_num,
        ] {
            if !attr.is_empty() && attr.len() != ncells {
                return Err("cell attribute array length does not match cell count".to_string());
            }
        }
        if !self.elem_num.is_empty() {
            let mut enums: Vec<i32> = self.elem_num.iter().copied().filter(|&e| e != -1).collect();
            enums.sort_unstable();
            if enums.windows(2).any(|w| w[0] == w[1]) {
                return Err("duplicate element numbers".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_tet() -> Mesh {
        let mut mesh = Mesh {
            node_num: vec![1, 2, 3, 4],
            points: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            cells: vec![0, 1, 2, 3],
            offsets: vec![0, 4],
            celltypes: vec![CellType::Tet4],
            elem_num: vec![1],
            ..Mesh::default()
        };
        mesh.rebuild_node_index();
        mesh
    }

    #[test]
    fn valid_mesh_passes_validation() {
        assert!(single_tet().validate().is_ok());
    }

    #[test]
    fn node_lookup_by_id() {
        let mut mesh = single_tet();
        mesh.node_num = vec![10, 2, 30, 4];
        mesh.rebuild_node_index();
        assert_eq!(mesh.node_index(30), Some(2));
        assert_eq!(mesh.node_index(2), Some(1));
        assert_eq!(mesh.node_index(99), None);
    }

    #[test]
    fn detects_duplicate_node_numbers() {
        let mut mesh = single_tet();
        mesh.node_num[1] = 1;
        assert!(mesh.validate().unwrap_err().contains("duplicate node"));
    }

    #[test]
    fn detects_bad_offsets() {
        let mut mesh = single_tet();
        mesh.offsets = vec![0, 3];
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn detects_out_of_range_connectivity() {
        let mut mesh = single_tet();
        mesh.cells[3] = 9;
        assert!(mesh.validate().unwrap_err().contains("out-of-range"));
    }

    #[test]
    fn detects_wrong_node_count_for_type() {
        let mut mesh = single_tet();
        mesh.celltypes = vec![CellType::Hex8];
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn serializes_through_json() {
        let mesh = single_tet();
        let text = serde_json::to_string(&mesh).expect("serialize");
        let back: Mesh = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back.node_num, mesh.node_num);
        assert_eq!(back.celltypes, mesh.celltypes);
        assert!(back.validate().is_ok());
    }
}
