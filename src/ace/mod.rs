//! ACE cross-section tables.
//!
//! An ACE table is a header, a 16-integer NXS array, a 32-integer JXS
//! pointer array, and a flat XSS payload of doubles. Typed blocks are read
//! out of XSS at the positions JXS points to; after any in-memory edit a
//! re-layout recomputes every pointer. Reading and dumping are symmetric so
//! tables round-trip.

pub mod blocks;
pub mod data;
pub mod io;
pub mod table;

pub use blocks::{Block, BlockTag, NuForm, ReactionXs};
pub use data::{shift_jxs_array, AceHeader, TableKind, XssCursor, JXS_LEN, NXS_LEN};
pub use io::{read_ace, read_ace_file, write_ace, write_ace_file};
pub use table::AceTable;
