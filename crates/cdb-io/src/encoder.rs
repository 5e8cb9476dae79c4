//! Archive write path: emit NBLOCK/EBLOCK/CMBLOCK text byte-compatible
//! with the vendor's own writer.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{info, warn};

use cdb_model::cell_type::CellType;
use cdb_model::components;
use cdb_model::mesh::Mesh;
use cdb_model::topology::{self, TET10_AS_186_PATTERN};

use crate::blocks::ComponentKind;
use crate::decoder::{ElementClass, element_class};
use crate::error::{ArchiveError, Result};
use crate::format::{fmt_exp, fmt_int};

/// Numbering and layout policy for a full archive write.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Material number assigned to cells without one.
    pub mtype_start: i32,
    /// First element type reference used when types are assigned by shape.
    pub etype_start: i32,
    /// Real constant number assigned to cells without one.
    pub real_constant_start: i32,
    /// Lowest node number assigned when node numbers are missing.
    pub nnum_start: i32,
    /// Lowest element number assigned when element numbers are missing.
    pub enum_start: i32,
    /// Emit `ET,<ref>,<num>` header lines.
    pub include_etype_header: bool,
    /// Ignore element types carried by the mesh and reassign them from
    /// each cell's shape.
    pub reset_etype: bool,
    /// Fill in missing (`-1`) node/element numbers instead of failing.
    pub allow_missing: bool,
    /// Emit the node block.
    pub write_node_block: bool,
    /// Emit CMBLOCKs for the mesh's named components.
    pub write_components: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            mtype_start: 1,
            etype_start: 1,
            real_constant_start: 1,
            nnum_start: 1,
            enum_start: 1,
            include_etype_header: true,
            reset_etype: false,
            allow_missing: true,
            write_node_block: true,
            write_components: true,
        }
    }
}

/// Write a mesh as a blocked archive file.
pub fn save_as_archive(
    path: impl AsRef<Path>,
    mesh: &Mesh,
    options: &WriteOptions,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_archive(&mut writer, mesh, options)?;
    writer.flush()?;
    Ok(())
}

/// Write a mesh as blocked archive text to a caller-owned sink.
///
/// Numbering and element types are resolved before the first byte is
/// written; an error after that point leaves the sink truncated and the
/// caller should discard it.
pub fn write_archive<W: Write>(writer: &mut W, mesh: &Mesh, options: &WriteOptions) -> Result<()> {
    mesh.validate().map_err(ArchiveError::InvalidMesh)?;
    let ncells = mesh.num_cells();

    let node_num = resolve_node_numbers(mesh, options)?;
    let elem_num = resolve_elem_numbers(mesh, options)?;
    let material = resolve_attribute(&mesh.material, ncells, options.mtype_start, "material");
    let real_constant = resolve_attribute(
        &mesh.real_constant,
        ncells,
        options.real_constant_start,
        "real constant",
    );
    let types = resolve_element_types(mesh, options)?;

    writeln!(writer, "/PREP7")?;
    if options.include_etype_header {
        for &(etype_ref, type_num) in &types.header {
            writeln!(writer, "ET, {etype_ref}, {type_num}")?;
        }
    }

    if options.write_node_block {
        write_nblock_to(writer, &node_num, &mesh.points, mesh.angles.as_deref())?;
    }

    if ncells > 0 {
        writeln!(
            writer,
            "EBLOCK,19,SOLID,{},{}",
            fmt_int(*elem_num.last().unwrap_or(&0) as i64, 10),
            fmt_int(ncells as i64, 10)
        )?;
        writeln!(writer, "(19i8)")?;

        for i in 0..ncells {
            let pattern = cell_pattern(mesh.celltypes[i], types.type_num[i])?;
            let cell = mesh.cell(i);

            let mut line = String::with_capacity(19 * 8 + 1);
            for value in [
                material[i],
                types.etype_ref[i],
                real_constant[i],
                1, // section number
                0, // element coordinate system
                0, // birth/death flag
                0,
                0,
                pattern.len() as i32,
                0,
                elem_num[i],
            ] {
                line.push_str(&fmt_int(value as i64, 8));
            }
            for (written, &slot) in pattern.iter().enumerate() {
                if written == 8 {
                    line.push('\n');
                }
                line.push_str(&fmt_int(node_num[cell[slot]] as i64, 8));
            }
            line.push('\n');
            writer.write_all(line.as_bytes())?;
        }
        writeln!(writer, "      -1")?;
    }

    if options.write_components {
        write_component_map(writer, &mesh.node_components, ComponentKind::Node)?;
        write_component_map(writer, &mesh.element_components, ComponentKind::Element)?;
    }
    Ok(())
}

fn write_component_map<W: Write>(
    writer: &mut W,
    map: &BTreeMap<String, Vec<i32>>,
    kind: ComponentKind,
) -> Result<()> {
    for (name, items) in map {
        write_cmblock_to(writer, items, name, kind, 10)?;
    }
    Ok(())
}

/// Write a node block to a new file at `path`.
pub fn write_nblock(
    path: impl AsRef<Path>,
    node_num: &[i32],
    points: &[[f64; 3]],
    angles: Option<&[[f64; 3]]>,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_nblock_to(&mut writer, node_num, points, angles)?;
    writer.flush()?;
    Ok(())
}

/// Write a node block to a caller-owned sink; rows are sorted by node
/// number regardless of input order.
pub fn write_nblock_to<W: Write>(
    writer: &mut W,
    node_num: &[i32],
    points: &[[f64; 3]],
    angles: Option<&[[f64; 3]]>,
) -> Result<()> {
    if node_num.len() != points.len() {
        return Err(ArchiveError::InvalidMesh(
            "node number and point counts differ".to_string(),
        ));
    }
    if let Some(angles) = angles {
        if angles.len() != points.len() {
            return Err(ArchiveError::InvalidMesh(
                "angle and point counts differ".to_string(),
            ));
        }
    }

    let max_num = node_num.iter().copied().max().unwrap_or(0);
    writeln!(
        writer,
        "NBLOCK,6,SOLID,{},{}",
        fmt_int(max_num as i64, 10),
        fmt_int(points.len() as i64, 10)
    )?;
    let floats = if angles.is_some() { 6 } else { 3 };
    writeln!(writer, "(3i8,{floats}e20.13)")?;

    let mut order: Vec<usize> = (0..node_num.len()).collect();
    order.sort_unstable_by_key(|&i| node_num[i]);

    let mut line = String::with_capacity(24 + floats * 20 + 1);
    for &i in &order {
        line.clear();
        line.push_str(&fmt_int(node_num[i] as i64, 8));
        line.push_str("       0       0");
        for value in points[i] {
            line.push_str(&fmt_exp(value, 20, 12));
        }
        if let Some(angles) = angles {
            for value in angles[i] {
                line.push_str(&fmt_exp(value, 20, 12));
            }
        }
        line.push('\n');
        writer.write_all(line.as_bytes())?;
    }
    writeln!(writer, "N,R5.3,LOC,       -1, ")?;
    Ok(())
}

/// Write a component block to a new file at `path`.
pub fn write_cmblock(
    path: impl AsRef<Path>,
    items: &[i32],
    name: &str,
    kind: ComponentKind,
    digit_width: usize,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_cmblock_to(&mut writer, items, name, kind, digit_width)?;
    writer.flush()?;
    Ok(())
}

/// Write a component block to a caller-owned sink, run-length compressing
/// the (sorted, deduplicated) id list.
pub fn write_cmblock_to<W: Write>(
    writer: &mut W,
    items: &[i32],
    name: &str,
    kind: ComponentKind,
    digit_width: usize,
) -> Result<()> {
    let packed = components::compress(items);
    writeln!(
        writer,
        "CMBLOCK,{},{},{}",
        name.to_ascii_uppercase(),
        kind.keyword(),
        fmt_int(packed.len() as i64, 8)
    )?;
    writeln!(writer, "(8i{digit_width})")?;

    for chunk in packed.chunks(8) {
        let mut line = String::with_capacity(chunk.len() * digit_width + 1);
        for &value in chunk {
            line.push_str(&fmt_int(value as i64, digit_width));
        }
        line.push('\n');
        writer.write_all(line.as_bytes())?;
    }
    Ok(())
}

fn resolve_node_numbers(mesh: &Mesh, options: &WriteOptions) -> Result<Vec<i32>> {
    let mut node_num = if mesh.node_num.is_empty() {
        info!(
            "no node numbers set in input, adding default range starting from {}",
            options.nnum_start
        );
        (options.nnum_start..options.nnum_start + mesh.num_points() as i32).collect()
    } else {
        mesh.node_num.clone()
    };
    fill_missing_numbers(&mut node_num, options.nnum_start, options.allow_missing, "node")?;
    Ok(node_num)
}

fn resolve_elem_numbers(mesh: &Mesh, options: &WriteOptions) -> Result<Vec<i32>> {
    let mut elem_num = if mesh.elem_num.is_empty() {
        info!(
            "no element numbers set in input, adding default range starting from {}",
            options.enum_start
        );
        (options.enum_start..options.enum_start + mesh.num_cells() as i32).collect()
    } else {
        mesh.elem_num.clone()
    };
    fill_missing_numbers(&mut elem_num, options.enum_start, options.allow_missing, "element")?;
    Ok(elem_num)
}

/// Replace `-1` sentinels with a fresh contiguous run placed strictly
/// after the current maximum, never touching valid numbers.
fn fill_missing_numbers(
    numbers: &mut [i32],
    start_option: i32,
    allow_missing: bool,
    what: &'static str,
) -> Result<()> {
    let missing = numbers.iter().filter(|&&n| n == -1).count();
    if missing == 0 {
        return Ok(());
    }
    if !allow_missing {
        return Err(ArchiveError::MissingNumbering(what));
    }
    let mut next = numbers
        .iter()
        .copied()
        .max()
        .unwrap_or(0)
        .saturating_add(1)
        .max(start_option);
    info!(
        "{missing} missing {what} numbers, numbering from {next} to {}",
        next + missing as i32 - 1
    );
    for number in numbers.iter_mut().filter(|n| **n == -1) {
        *number = next;
        next += 1;
    }
    Ok(())
}

fn resolve_attribute(values: &[i32], ncells: usize, fill: i32, what: &str) -> Vec<i32> {
    if values.is_empty() {
        info!("no {what} numbers set in input, using {fill}");
        return vec![fill; ncells];
    }
    let mut resolved = values.to_vec();
    if resolved.iter().any(|&v| v == -1) {
        info!("some {what} numbers missing, filling with {fill}");
        for value in resolved.iter_mut().filter(|v| **v == -1) {
            *value = fill;
        }
    }
    resolved
}

struct ResolvedTypes {
    etype_ref: Vec<i32>,
    type_num: Vec<i32>,
    /// Distinct (etype_ref, type_num) pairs in first-seen order.
    header: Vec<(i32, i32)>,
}

fn resolve_element_types(mesh: &Mesh, options: &WriteOptions) -> Result<ResolvedTypes> {
    let ncells = mesh.num_cells();
    let carried = !options.reset_etype
        && mesh.etype_ref.len() == ncells
        && mesh.type_num.len() == ncells
        && !mesh.etype_ref.iter().any(|&e| e == -1)
        && !mesh.type_num.iter().any(|&t| t == -1)
        && ncells > 0;

    if carried {
        let mut header = Vec::new();
        for pair in mesh.etype_ref.iter().copied().zip(mesh.type_num.iter().copied()) {
            if !header.contains(&pair) {
                header.push(pair);
            }
        }
        return Ok(ResolvedTypes {
            etype_ref: mesh.etype_ref.clone(),
            type_num: mesh.type_num.clone(),
            header,
        });
    }

    if !mesh.etype_ref.is_empty() && !options.reset_etype {
        warn!("element type data incomplete, reassigning types by cell shape");
    }

    // One type reference per vendor class, allocated consecutively from
    // etype_start in a fixed order.
    let refs = [
        (186, options.etype_start),
        (187, options.etype_start + 1),
        (185, options.etype_start + 2),
        (181, options.etype_start + 3),
        (281, options.etype_start + 4),
    ];
    let ref_for = |vendor: i32| refs.iter().find(|&&(v, _)| v == vendor).map(|&(_, r)| r);

    let mut etype_ref = Vec::with_capacity(ncells);
    let mut type_num = Vec::with_capacity(ncells);
    let mut header = Vec::new();
    for &cell_type in &mesh.celltypes {
        let vendor = cell_type.default_vendor_type().ok_or_else(|| {
            ArchiveError::UnsupportedShape("cannot write a null placeholder cell".to_string())
        })?;
        let r = ref_for(vendor)
            .ok_or_else(|| ArchiveError::UnsupportedShape(format!("vendor type {vendor}")))?;
        if !header.contains(&(r, vendor)) {
            header.push((r, vendor));
        }
        etype_ref.push(r);
        type_num.push(vendor);
    }
    header.sort_unstable();
    Ok(ResolvedTypes {
        etype_ref,
        type_num,
        header,
    })
}

/// Record slot pattern used to emit one cell, honoring the vendor type
/// the cell carries: native-tet types take unpadded 4/10-slot records,
/// everything else the degenerate-hex packing.
fn cell_pattern(cell_type: CellType, type_num: i32) -> Result<&'static [usize]> {
    let native_tet = element_class(type_num) == Some(ElementClass::TetDirect);
    match cell_type {
        CellType::Tet4 if native_tet => Ok(&[0, 1, 2, 3]),
        CellType::Tet10 if !native_tet => Ok(&TET10_AS_186_PATTERN),
        _ => topology::write_pattern(cell_type).ok_or_else(|| {
            ArchiveError::UnsupportedShape("cannot write a null placeholder cell".to_string())
        }),
    }
}
