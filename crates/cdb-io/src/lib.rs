//! Reader and writer for blocked ASCII archive (CDB) files.
//!
//! The decoder scans the blocked text into raw node/element/component
//! blocks ([`Archive`]) and lowers them into a canonical
//! [`cdb_model::Mesh`]; the encoder writes a mesh back out
//! byte-compatible with the vendor's own archive writer. Both directions
//! share the permutation tables in [`cdb_model::topology`], so the
//! degenerate-shape packing cannot drift between them.

pub mod blocks;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;

pub use blocks::{ComponentBlock, ComponentKind, ElementRecord, NodeBlock};
pub use decoder::{Archive, ParameterValue, ParseOptions, ReadOptions};
pub use encoder::{
    WriteOptions, save_as_archive, write_archive, write_cmblock, write_cmblock_to, write_nblock,
    write_nblock_to,
};
pub use error::{ArchiveError, Result};
