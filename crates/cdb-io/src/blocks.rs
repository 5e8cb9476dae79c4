//! Line-level parsers for the NBLOCK, EBLOCK, CMBLOCK and RLBLOCK
//! sub-blocks of a CDB archive.
//!
//! Each parser is handed the full line slice of the archive together with
//! a cursor positioned at the block's header line, and leaves the cursor
//! on the first line after the block. Field widths come from the block's
//! own format line, never from assumptions.

use std::str::FromStr;

use cdb_model::RealConstantSet;
use cdb_model::components;

use crate::error::{ArchiveError, Result};
use crate::format::{
    self, IntFormat, NodeFormat, fields_on_line, fixed_float, fixed_int, try_fixed_int,
};

/// Decoded contents of one NBLOCK.
#[derive(Debug, Clone, Default)]
pub struct NodeBlock {
    pub node_num: Vec<i32>,
    pub points: Vec<[f64; 3]>,
    /// Present only when the block's format line declared angle fields.
    pub angles: Option<Vec<[f64; 3]>>,
}

/// One raw element record from an EBLOCK, node ids exactly as written
/// (including degenerate-shape duplicates).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRecord {
    pub material: i32,
    pub etype_ref: i32,
    pub real_constant: i32,
    pub section: i32,
    pub elem_num: i32,
    pub nodes: Vec<i32>,
}

/// Whether a component block selects nodes or elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Node,
    Element,
}

impl ComponentKind {
    /// Keyword written in the CMBLOCK header.
    pub fn keyword(&self) -> &'static str {
        match self {
            ComponentKind::Node => "NODE",
            ComponentKind::Element => "ELEMENT",
        }
    }
}

impl FromStr for ComponentKind {
    type Err = ArchiveError;

    /// Case-insensitive; accepts the `ELEM` spelling some writers use.
    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "NODE" => Ok(ComponentKind::Node),
            "ELEM" | "ELEMENT" => Ok(ComponentKind::Element),
            _ => Err(ArchiveError::InvalidComponentType(s.trim().to_string())),
        }
    }
}

/// Decoded contents of one CMBLOCK, run-length expansion already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentBlock {
    pub name: String,
    pub kind: ComponentKind,
    pub items: Vec<i32>,
}

fn line_at<'a>(lines: &[&'a str], cursor: usize, what: &str) -> Result<&'a str> {
    lines.get(cursor).copied().ok_or_else(|| {
        ArchiveError::format(cursor + 1, format!("unexpected end of file inside {what}"))
    })
}

/// Comma-separated header fields, comment tail (after `!`) removed.
fn header_fields(line: &str) -> Vec<&str> {
    let body = line.split('!').next().unwrap_or(line);
    body.split(',').map(str::trim).collect()
}

/// Parse an NBLOCK starting at `*cursor` (the `NBLOCK,...` header line).
pub fn parse_nblock(lines: &[&str], cursor: &mut usize) -> Result<NodeBlock> {
    *cursor += 1; // header carries only redundant counts
    let fmt_line = line_at(lines, *cursor, "NBLOCK")?;
    let fmt: NodeFormat = format::parse_node_format(fmt_line, *cursor + 1)?;
    *cursor += 1;

    let has_angles = fmt.float_fields > 3;
    let mut block = NodeBlock {
        angles: has_angles.then(Vec::new),
        ..NodeBlock::default()
    };

    loop {
        let line = line_at(lines, *cursor, "NBLOCK")?;
        let lineno = *cursor + 1;
        // Footer is either the `N,R5.3,LOC,...,-1` record or a bare -1.
        if line.trim_start().starts_with("N,") || try_fixed_int(line, 0, fmt.int_width) == Some(-1)
        {
            *cursor += 1;
            return Ok(block);
        }

        let id = fixed_int(line, 0, fmt.int_width, lineno)?;
        block.node_num.push(id);

        // Trailing zero fields may be omitted from the line.
        let base = fmt.int_fields * fmt.int_width;
        let mut values = [0.0f64; 6];
        let line_len = line.trim_end().len();
        for (j, value) in values.iter_mut().enumerate().take(fmt.float_fields) {
            let start = base + j * fmt.float_width;
            if start >= line_len {
                break;
            }
            *value = fixed_float(line, start, fmt.float_width, lineno)?;
        }
        block.points.push([values[0], values[1], values[2]]);
        if let Some(angles) = &mut block.angles {
            angles.push([values[3], values[4], values[5]]);
        }
        *cursor += 1;
    }
}

/// Parse an EBLOCK starting at `*cursor` (the `EBLOCK,...` header line).
///
/// Each logical record is 11 integer header fields followed by the node
/// ids, wrapped onto continuation lines when the node count exceeds the
/// first line's remaining fields.
pub fn parse_eblock(lines: &[&str], cursor: &mut usize) -> Result<Vec<ElementRecord>> {
    *cursor += 1;
    let fmt_line = line_at(lines, *cursor, "EBLOCK")?;
    let fmt: IntFormat = format::parse_int_format(fmt_line, *cursor + 1)?;
    *cursor += 1;

    let w = fmt.width;
    let mut records = Vec::new();
    loop {
        let line = line_at(lines, *cursor, "EBLOCK")?;
        let lineno = *cursor + 1;
        if try_fixed_int(line, 0, w) == Some(-1) {
            *cursor += 1;
            return Ok(records);
        }

        let mut header = [0i32; 11];
        for (i, field) in header.iter_mut().enumerate() {
            *field = fixed_int(line, i * w, w, lineno)?;
        }
        if header[8] < 0 {
            return Err(ArchiveError::format(
                lineno,
                format!("element {} declares a negative node count {}", header[10], header[8]),
            ));
        }
        let num_nodes = header[8] as usize;

        let mut nodes = Vec::with_capacity(num_nodes.min(20));
        let available = fields_on_line(line, w).saturating_sub(11);
        for i in 0..available.min(num_nodes) {
            nodes.push(fixed_int(line, (11 + i) * w, w, lineno)?);
        }
        *cursor += 1;

        while nodes.len() < num_nodes {
            let cont = line_at(lines, *cursor, "EBLOCK")?;
            let lineno = *cursor + 1;
            let remaining = num_nodes - nodes.len();
            let present = fields_on_line(cont, w);
            if present == 0 || try_fixed_int(cont, 0, w) == Some(-1) {
                return Err(ArchiveError::format(
                    lineno,
                    format!(
                        "element {} ended after {} of {} nodes",
                        header[10],
                        nodes.len(),
                        num_nodes
                    ),
                ));
            }
            for i in 0..present.min(remaining) {
                nodes.push(fixed_int(cont, i * w, w, lineno)?);
            }
            *cursor += 1;
        }

        records.push(ElementRecord {
            material: header[0],
            etype_ref: header[1],
            real_constant: header[2],
            section: header[3],
            elem_num: header[10],
            nodes,
        });
    }
}

/// Parse a CMBLOCK starting at `*cursor` (the `CMBLOCK,...` header line).
pub fn parse_cmblock(lines: &[&str], cursor: &mut usize) -> Result<ComponentBlock> {
    let header = line_at(lines, *cursor, "CMBLOCK")?;
    let lineno = *cursor + 1;
    let fields = header_fields(header);
    if fields.len() < 4 {
        return Err(ArchiveError::format(
            lineno,
            format!("malformed CMBLOCK header {header:?}"),
        ));
    }
    let name = fields[1].to_string();
    let kind: ComponentKind = fields[2].parse()?;
    let count: usize = fields[3].parse().map_err(|_| {
        ArchiveError::format(lineno, format!("bad CMBLOCK item count {:?}", fields[3]))
    })?;
    *cursor += 1;

    let fmt_line = line_at(lines, *cursor, "CMBLOCK")?;
    let fmt = format::parse_int_format(fmt_line, *cursor + 1)?;
    *cursor += 1;

    // The declared count is untrusted; the read loop bounds the real size.
    let mut packed = Vec::with_capacity(count.min(4096));
    while packed.len() < count {
        let line = line_at(lines, *cursor, "CMBLOCK")?;
        let lineno = *cursor + 1;
        let remaining = count - packed.len();
        for i in 0..fmt.fields_per_line.min(remaining) {
            packed.push(fixed_int(line, i * fmt.width, fmt.width, lineno)?);
        }
        *cursor += 1;
    }

    Ok(ComponentBlock {
        name,
        kind,
        items: components::expand(&packed),
    })
}

/// Parse an RLBLOCK starting at `*cursor` (the `RLBLOCK,...` header line).
///
/// Layout: header with the set count, two fixed format lines
/// (`(2i8,6g16.9)` and `(7g16.9)`), then per-set records of set number and
/// value count followed by up to 6 values, continuing at 7 values per
/// line.
pub fn parse_rlblock(lines: &[&str], cursor: &mut usize) -> Result<Vec<RealConstantSet>> {
    let header = line_at(lines, *cursor, "RLBLOCK")?;
    let lineno = *cursor + 1;
    let fields = header_fields(header);
    let num_sets: usize = fields
        .get(1)
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| ArchiveError::format(lineno, "bad RLBLOCK set count"))?;
    *cursor += 3; // header plus the two fixed format lines

    let mut sets = Vec::with_capacity(num_sets.min(256));
    for _ in 0..num_sets {
        let line = line_at(lines, *cursor, "RLBLOCK")?;
        let lineno = *cursor + 1;
        let index = fixed_int(line, 0, 8, lineno)?;
        let declared = fixed_int(line, 8, 8, lineno)?;
        if declared < 0 {
            return Err(ArchiveError::format(
                lineno,
                format!("real constant set {index} declares a negative value count {declared}"),
            ));
        }
        let mut remaining = declared as usize;

        let mut values = Vec::with_capacity(remaining.min(64));
        let first = remaining.min(6);
        for i in 0..first {
            values.push(fixed_float(line, 16 + 16 * i, 16, lineno)?);
        }
        remaining -= first;
        *cursor += 1;

        while remaining > 0 {
            let cont = line_at(lines, *cursor, "RLBLOCK")?;
            let lineno = *cursor + 1;
            let chunk = remaining.min(7);
            for i in 0..chunk {
                values.push(fixed_float(cont, 16 * i, 16, lineno)?);
            }
            remaining -= chunk;
            *cursor += 1;
        }

        sets.push(RealConstantSet { index, values });
    }
    Ok(sets)
}
