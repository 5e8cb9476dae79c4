//! Archive read path: scan the blocked text, then lower the raw blocks
//! into a canonical [`Mesh`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use cdb_model::cell_type::CellType;
use cdb_model::mesh::{ElementTypeInfo, Mesh, RealConstantSet};
use cdb_model::topology::{
    self, SolidShape, TET_NATIVE_CORNER_SLOTS, TET_NATIVE_MIDSIDE_SLOTS, TRI_IN_QUAD_SLOTS,
    TRI6_IN_QUAD_SLOTS,
};

use crate::blocks::{self, ComponentKind, ElementRecord, NodeBlock};
use crate::error::{ArchiveError, Result};

/// Options for the raw text scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Also collect `*SET` parameter assignments. Accessing
    /// [`Archive::parameters`] without having requested this is an error.
    pub read_parameters: bool,
}

/// Options for lowering the raw blocks into a mesh.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Decode quadratic records as their linear variants.
    pub force_linear: bool,
    /// Cell types to keep; `None` keeps every supported type.
    pub allowable_types: Option<Vec<CellType>>,
    /// Store filtered-out elements as null placeholder cells instead of
    /// dropping them, preserving cell numbering.
    pub null_unallowed: bool,
    /// Fail on an element whose type has no supported shape instead of
    /// dropping it.
    pub strict_shapes: bool,
}

/// A scalar parameter from a `*SET` assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Number(f64),
    Text(String),
}

/// A scanned CDB archive: raw blocks, not yet lowered to a mesh.
///
/// Unknown block types in the file are skipped, not errors. Later
/// redefinitions of an `ET` type reference overwrite earlier ones.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    pub node_block: Option<NodeBlock>,
    pub elements: Vec<ElementRecord>,
    pub element_types: Vec<ElementTypeInfo>,
    pub real_constants: Vec<RealConstantSet>,
    pub node_components: BTreeMap<String, Vec<i32>>,
    pub element_components: BTreeMap<String, Vec<i32>>,
    parameters: Option<BTreeMap<String, ParameterValue>>,
}

impl Archive {
    /// Scan an archive file.
    pub fn from_file(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Archive> {
        let text = fs::read_to_string(path)?;
        Self::from_text(&text, options)
    }

    /// Scan archive text.
    ///
    /// Fails with [`ArchiveError::EmptyArchive`] when the text contains
    /// neither a node block nor an element block.
    pub fn from_text(text: &str, options: &ReadOptions) -> Result<Archive> {
        let lines: Vec<&str> = text.lines().collect();
        let mut archive = Archive {
            parameters: options.read_parameters.then(BTreeMap::new),
            ..Archive::default()
        };

        let mut cursor = 0;
        let mut saw_block = false;
        while cursor < lines.len() {
            let line = lines[cursor];
            let keyword = line.trim_start();
            if keyword.starts_with("ET,") {
                archive.record_element_type(keyword, cursor + 1)?;
                cursor += 1;
            } else if keyword.starts_with("NBLOCK") {
                archive.node_block = Some(blocks::parse_nblock(&lines, &mut cursor)?);
                saw_block = true;
            } else if keyword.starts_with("EBLOCK") {
                archive.elements = blocks::parse_eblock(&lines, &mut cursor)?;
                saw_block = true;
            } else if keyword.starts_with("CMBLOCK") {
                let block = blocks::parse_cmblock(&lines, &mut cursor)?;
                let mut items = block.items;
                items.sort_unstable();
                items.dedup();
                match block.kind {
                    ComponentKind::Node => archive.node_components.insert(block.name, items),
                    ComponentKind::Element => archive.element_components.insert(block.name, items),
                };
            } else if keyword.starts_with("RLBLOCK") {
                archive.real_constants = blocks::parse_rlblock(&lines, &mut cursor)?;
            } else if keyword.starts_with("*SET,") {
                if let Some(params) = &mut archive.parameters {
                    record_parameter(params, keyword);
                }
                cursor += 1;
            } else {
                cursor += 1;
            }
        }

        if !saw_block {
            return Err(ArchiveError::EmptyArchive);
        }
        debug!(
            "scanned archive: {} nodes, {} elements, {} node components, {} element components",
            archive.node_block.as_ref().map_or(0, |b| b.node_num.len()),
            archive.elements.len(),
            archive.node_components.len(),
            archive.element_components.len()
        );
        Ok(archive)
    }

    /// Parameters collected from `*SET` lines.
    ///
    /// Errors unless the archive was scanned with
    /// [`ReadOptions::read_parameters`]; an archive without any `*SET`
    /// lines yields an empty map, not an error.
    pub fn parameters(&self) -> Result<&BTreeMap<String, ParameterValue>> {
        self.parameters
            .as_ref()
            .ok_or(ArchiveError::ParametersNotRequested)
    }

    fn record_element_type(&mut self, line: &str, lineno: usize) -> Result<()> {
        let mut fields = line.split(',').skip(1);
        let etype_ref: i32 = fields
            .next()
            .map(str::trim)
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| ArchiveError::format(lineno, "bad ET type reference"))?;
        let type_num: i32 = fields
            .next()
            .map(str::trim)
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| ArchiveError::format(lineno, "bad ET element number"))?;
        let entry = ElementTypeInfo {
            etype_ref,
            type_num,
        };
        match self
            .element_types
            .iter_mut()
            .find(|e| e.etype_ref == etype_ref)
        {
            Some(existing) => *existing = entry,
            None => self.element_types.push(entry),
        }
        Ok(())
    }

    /// Lower the raw blocks into a canonical mesh.
    pub fn to_mesh(&self, options: &ParseOptions) -> Result<Mesh> {
        let mut mesh = Mesh::new();
        if let Some(block) = &self.node_block {
            mesh.node_num = block.node_num.clone();
            mesh.points = block.points.clone();
            mesh.angles = block.angles.clone();
        }
        mesh.rebuild_node_index();

        let type_map: BTreeMap<i32, i32> = self
            .element_types
            .iter()
            .map(|e| (e.etype_ref, e.type_num))
            .collect();

        mesh.offsets.push(0);
        for record in &self.elements {
            let type_num = type_map.get(&record.etype_ref).copied().unwrap_or(-1);
            let decoded = match decode_record(record, type_num, options.force_linear) {
                Some(decoded) => decoded,
                None => {
                    if options.strict_shapes {
                        return Err(ArchiveError::UnsupportedShape(format!(
                            "element {} has unsupported type {} with {} nodes",
                            record.elem_num,
                            type_num,
                            record.nodes.len()
                        )));
                    }
                    debug!(
                        "dropping element {} with unsupported type {}",
                        record.elem_num, type_num
                    );
                    if options.null_unallowed {
                        push_null_cell(&mut mesh, record, type_num);
                    }
                    continue;
                }
            };

            let allowed = options
                .allowable_types
                .as_ref()
                .is_none_or(|types| types.contains(&decoded.cell_type));
            if !allowed {
                if options.null_unallowed {
                    push_null_cell(&mut mesh, record, type_num);
                }
                continue;
            }

            for &node_id in &decoded.nodes {
                let index = mesh.node_index(node_id).ok_or_else(|| {
                    ArchiveError::InvalidMesh(format!(
                        "element {} references unknown node {node_id}",
                        record.elem_num
                    ))
                })?;
                mesh.cells.push(index);
            }
            mesh.offsets.push(mesh.cells.len());
            mesh.celltypes.push(decoded.cell_type);
            push_attributes(&mut mesh, record, type_num);
        }

        mesh.element_types = self.element_types.clone();
        mesh.real_constants = self.real_constants.clone();
        mesh.node_components = self.node_components.clone();
        mesh.element_components = self.element_components.clone();
        Ok(mesh)
    }
}

fn push_attributes(mesh: &mut Mesh, record: &ElementRecord, type_num: i32) {
    mesh.elem_num.push(record.elem_num);
    mesh.material.push(record.material);
    mesh.real_constant.push(record.real_constant);
    mesh.etype_ref.push(record.etype_ref);
    mesh.type_num.push(type_num);
}

fn push_null_cell(mesh: &mut Mesh, record: &ElementRecord, type_num: i32) {
    mesh.offsets.push(mesh.cells.len());
    mesh.celltypes.push(CellType::Null);
    push_attributes(mesh, record, type_num);
}

/// Broad shape family of a vendor element type number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementClass {
    /// Hex-shaped solid records holding hex, wedge, pyramid or tet via
    /// duplicate-node degeneracy.
    Solid,
    /// Native 4/10-slot tetrahedral records.
    TetDirect,
    /// 4/8-slot surface records holding quads or collapsed triangles.
    Shell,
}

pub(crate) fn element_class(type_num: i32) -> Option<ElementClass> {
    match type_num {
        45 | 95 | 185 | 186 | 190 | 278 | 279 => Some(ElementClass::Solid),
        92 | 187 | 285 => Some(ElementClass::TetDirect),
        41 | 43 | 63 | 93 | 143 | 154 | 181 | 281 => Some(ElementClass::Shell),
        _ => None,
    }
}

struct DecodedCell {
    cell_type: CellType,
    nodes: Vec<i32>,
}

fn gather(nodes: &[i32], slots: &[usize]) -> Vec<i32> {
    slots.iter().map(|&s| nodes[s]).collect()
}

fn midsides_present(nodes: &[i32], slots: &[usize]) -> bool {
    slots.iter().any(|&s| nodes[s] != 0)
}

/// Decode one raw record into its canonical cell type and node ordering,
/// or `None` when the type/node-count combination has no supported shape.
fn decode_record(record: &ElementRecord, type_num: i32, force_linear: bool) -> Option<DecodedCell> {
    let nodes = record.nodes.as_slice();
    match element_class(type_num)? {
        ElementClass::Solid => {
            if nodes.len() != 8 && nodes.len() != 20 {
                return None;
            }
            let shape = topology::classify_solid(nodes);
            let corners = gather(nodes, topology::solid_corner_slots(shape));
            let midside_slots = topology::solid_midside_slots(shape);
            if nodes.len() == 8 || force_linear || !midsides_present(nodes, midside_slots) {
                Some(DecodedCell {
                    cell_type: solid_linear_type(shape),
                    nodes: corners,
                })
            } else {
                let mut all = corners;
                all.extend(gather(nodes, midside_slots));
                Some(DecodedCell {
                    cell_type: solid_quadratic_type(shape),
                    nodes: all,
                })
            }
        }
        ElementClass::TetDirect => match nodes.len() {
            4 => Some(DecodedCell {
                cell_type: CellType::Tet4,
                nodes: nodes.to_vec(),
            }),
            10 => {
                let corners = gather(nodes, &TET_NATIVE_CORNER_SLOTS);
                if force_linear || !midsides_present(nodes, &TET_NATIVE_MIDSIDE_SLOTS) {
                    Some(DecodedCell {
                        cell_type: CellType::Tet4,
                        nodes: corners,
                    })
                } else {
                    let mut all = corners;
                    all.extend(gather(nodes, &TET_NATIVE_MIDSIDE_SLOTS));
                    Some(DecodedCell {
                        cell_type: CellType::Tet10,
                        nodes: all,
                    })
                }
            }
            _ => None,
        },
        ElementClass::Shell => match nodes.len() {
            4 => {
                if topology::shell_is_triangle(nodes) {
                    Some(DecodedCell {
                        cell_type: CellType::Tri3,
                        nodes: gather(nodes, &TRI_IN_QUAD_SLOTS),
                    })
                } else {
                    Some(DecodedCell {
                        cell_type: CellType::Quad4,
                        nodes: nodes.to_vec(),
                    })
                }
            }
            8 => {
                let is_tri = topology::shell_is_triangle(nodes);
                let quadratic = !force_linear && midsides_present(nodes, &[4, 5, 6, 7]);
                match (is_tri, quadratic) {
                    (true, true) => Some(DecodedCell {
                        cell_type: CellType::Tri6,
                        nodes: gather(nodes, &TRI6_IN_QUAD_SLOTS),
                    }),
                    (true, false) => Some(DecodedCell {
                        cell_type: CellType::Tri3,
                        nodes: gather(nodes, &TRI_IN_QUAD_SLOTS),
                    }),
                    (false, true) => Some(DecodedCell {
                        cell_type: CellType::Quad8,
                        nodes: nodes.to_vec(),
                    }),
                    (false, false) => Some(DecodedCell {
                        cell_type: CellType::Quad4,
                        nodes: nodes[..4].to_vec(),
                    }),
                }
            }
            _ => None,
        },
    }
}

fn solid_linear_type(shape: SolidShape) -> CellType {
    match shape {
        SolidShape::Hex => CellType::Hex8,
        SolidShape::Wedge => CellType::Wedge6,
        SolidShape::Pyramid => CellType::Pyramid5,
        SolidShape::Tet => CellType::Tet4,
    }
}

fn solid_quadratic_type(shape: SolidShape) -> CellType {
    match shape {
        SolidShape::Hex => CellType::Hex20,
        SolidShape::Wedge => CellType::Wedge15,
        SolidShape::Pyramid => CellType::Pyramid13,
        SolidShape::Tet => CellType::Tet10,
    }
}

fn record_parameter(params: &mut BTreeMap<String, ParameterValue>, line: &str) {
    // *SET,NAME,VALUE with a possibly quoted string value.
    let mut fields = line.splitn(3, ',').skip(1);
    let (Some(name), Some(raw)) = (fields.next(), fields.next()) else {
        return;
    };
    let raw = raw.trim();
    let value = match raw.parse::<f64>() {
        Ok(number) => ParameterValue::Number(number),
        Err(_) => ParameterValue::Text(raw.trim_matches('\'').to_string()),
    };
    params.insert(name.trim().to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(etype_ref: i32, elem_num: i32, nodes: Vec<i32>) -> ElementRecord {
        ElementRecord {
            material: 1,
            etype_ref,
            real_constant: 1,
            section: 1,
            elem_num,
            nodes,
        }
    }

    const TET_ARCHIVE: &str = "\
/PREP7
ET, 1, 185
NBLOCK,6,SOLID,         4,         4
(3i8,3e20.13)
       1       0       0 0.0000000000000E+00 0.0000000000000E+00 0.0000000000000E+00
       2       0       0 1.0000000000000E+00 0.0000000000000E+00 0.0000000000000E+00
       3       0       0 1.0000000000000E+00 1.0000000000000E+00 0.0000000000000E+00
       4       0       0 0.0000000000000E+00 0.0000000000000E+00 1.0000000000000E+00
N,R5.3,LOC,       -1,
EBLOCK,19,SOLID,         1,         1
(19i8)
       1       1       1       1       0       0       0       0       8       0       1       1       2       3       3       4       4       4       4
      -1
";

    #[test]
    fn decodes_minimal_tet_archive() {
        let archive = Archive::from_text(TET_ARCHIVE, &ReadOptions::default()).unwrap();
        let mesh = archive.to_mesh(&ParseOptions::default()).unwrap();
        mesh.validate().unwrap();
        assert_eq!(mesh.node_num, vec![1, 2, 3, 4]);
        assert_eq!(mesh.celltypes, vec![CellType::Tet4]);
        assert_eq!(mesh.cell(0), &[0, 1, 2, 3]);
        assert_eq!(mesh.elem_num, vec![1]);
        assert_eq!(mesh.type_num, vec![185]);
    }

    #[test]
    fn empty_text_is_an_empty_archive() {
        assert!(matches!(
            Archive::from_text("/PREP7\nFINISH\n", &ReadOptions::default()),
            Err(ArchiveError::EmptyArchive)
        ));
    }

    #[test]
    fn unknown_blocks_are_skipped() {
        let text = format!("WPROTA,0,0,0\n{TET_ARCHIVE}CSYS,0\n");
        let archive = Archive::from_text(&text, &ReadOptions::default()).unwrap();
        assert_eq!(archive.elements.len(), 1);
    }

    #[test]
    fn later_et_redefinitions_overwrite() {
        let text = format!("ET, 1, 186\n{TET_ARCHIVE}");
        let archive = Archive::from_text(&text, &ReadOptions::default()).unwrap();
        assert_eq!(archive.element_types.len(), 1);
        assert_eq!(archive.element_types[0].type_num, 185);
    }

    #[test]
    fn parameters_require_opt_in() {
        let text = format!("*SET,LENGTH,  2.500000000000E+00\n{TET_ARCHIVE}");
        let archive = Archive::from_text(&text, &ReadOptions::default()).unwrap();
        assert!(matches!(
            archive.parameters(),
            Err(ArchiveError::ParametersNotRequested)
        ));

        let opts = ReadOptions {
            read_parameters: true,
        };
        let archive = Archive::from_text(&text, &opts).unwrap();
        let params = archive.parameters().unwrap();
        assert_eq!(params["LENGTH"], ParameterValue::Number(2.5));
    }

    #[test]
    fn text_parameters_keep_their_quotes_stripped() {
        let mut params = BTreeMap::new();
        record_parameter(&mut params, "*SET,JOBNAME,'plate'");
        assert_eq!(
            params["JOBNAME"],
            ParameterValue::Text("plate".to_string())
        );
    }

    #[test]
    fn tet10_packed_as_186_decodes_to_canonical_order() {
        // Canonical tet10 nodes 1..=10 written through the 186-shaped
        // 20-slot duplication pattern.
        let packed = vec![1, 2, 3, 3, 4, 4, 4, 4, 5, 6, 4, 7, 4, 4, 4, 4, 8, 9, 10, 10];
        let decoded = decode_record(&record(1, 1, packed), 186, false).unwrap();
        assert_eq!(decoded.cell_type, CellType::Tet10);
        assert_eq!(decoded.nodes, (1..=10).collect::<Vec<i32>>());
    }

    #[test]
    fn wedge_packed_as_185_decodes_to_canonical_order() {
        let packed = vec![3, 2, 1, 1, 6, 5, 4, 4];
        let decoded = decode_record(&record(1, 1, packed), 185, false).unwrap();
        assert_eq!(decoded.cell_type, CellType::Wedge6);
        assert_eq!(decoded.nodes, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn zero_midsides_fall_back_to_linear() {
        let mut packed = vec![1, 2, 3, 3, 4, 4, 4, 4];
        packed.extend([0; 12]);
        let decoded = decode_record(&record(1, 1, packed), 186, false).unwrap();
        assert_eq!(decoded.cell_type, CellType::Tet4);
        assert_eq!(decoded.nodes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn force_linear_strips_midsides() {
        let nodes = (1..=10).collect();
        let decoded = decode_record(&record(1, 1, nodes), 187, true).unwrap();
        assert_eq!(decoded.cell_type, CellType::Tet4);
        assert_eq!(decoded.nodes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn shell_triangle_degeneracy() {
        let tri = decode_record(&record(1, 1, vec![1, 2, 3, 3]), 181, false).unwrap();
        assert_eq!(tri.cell_type, CellType::Tri3);
        assert_eq!(tri.nodes, vec![1, 2, 3]);

        let quad = decode_record(&record(1, 1, vec![1, 2, 3, 4]), 181, false).unwrap();
        assert_eq!(quad.cell_type, CellType::Quad4);

        let tri6 = decode_record(&record(1, 1, vec![1, 2, 3, 3, 4, 5, 3, 6]), 281, false).unwrap();
        assert_eq!(tri6.cell_type, CellType::Tri6);
        assert_eq!(tri6.nodes, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn unsupported_types_drop_null_or_raise() {
        let text = TET_ARCHIVE.replace("ET, 1, 185", "ET, 1, 300");
        let archive = Archive::from_text(&text, &ReadOptions::default()).unwrap();

        let mesh = archive.to_mesh(&ParseOptions::default()).unwrap();
        assert_eq!(mesh.num_cells(), 0);

        let nulled = archive
            .to_mesh(&ParseOptions {
                null_unallowed: true,
                ..ParseOptions::default()
            })
            .unwrap();
        assert_eq!(nulled.celltypes, vec![CellType::Null]);
        assert_eq!(nulled.elem_num, vec![1]);

        assert!(matches!(
            archive.to_mesh(&ParseOptions {
                strict_shapes: true,
                ..ParseOptions::default()
            }),
            Err(ArchiveError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn allowable_types_filter() {
        let archive = Archive::from_text(TET_ARCHIVE, &ReadOptions::default()).unwrap();
        let mesh = archive
            .to_mesh(&ParseOptions {
                allowable_types: Some(vec![CellType::Hex8]),
                ..ParseOptions::default()
            })
            .unwrap();
        assert_eq!(mesh.num_cells(), 0);

        let kept = archive
            .to_mesh(&ParseOptions {
                allowable_types: Some(vec![CellType::Tet4]),
                ..ParseOptions::default()
            })
            .unwrap();
        assert_eq!(kept.num_cells(), 1);
    }
}
