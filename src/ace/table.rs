//! The ACE table: header, pointer arrays, and its typed blocks.

use crate::ace::blocks::{Block, BlockTag};
use crate::ace::data::{
    shift_jxs_array, AceHeader, TableKind, XssCursor, JXS_LEN, NXS_LEN,
};
use crate::error::{HeliosError, Result};
use serde::{Deserialize, Serialize};

/// A fully parsed ACE table.
///
/// Blocks keep copies of their fields; XSS itself is not retained after
/// construction. `dump` re-lays the table out and recomputes every JXS
/// pointer, so `from_raw(dump(t)) == t` for any table in canonical layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AceTable {
    /// Table header.
    pub header: AceHeader,
    /// Table class, derived from the zaid suffix.
    pub kind: TableKind,
    /// The 16 NXS integers; `nxs[0]` is the XSS length.
    pub nxs: [i64; NXS_LEN],
    /// The 32 JXS pointers, 1-based into XSS; 0 marks an absent block.
    pub jxs: [i64; JXS_LEN],
    /// Blocks in deterministic layout order.
    pub blocks: Vec<Block>,
}

impl AceTable {
    /// Parse a table from its raw arrays.
    ///
    /// Walks every known JXS slot in layout order; a zero pointer means the
    /// block is absent.
    pub fn from_raw(
        header: AceHeader,
        nxs: [i64; NXS_LEN],
        jxs: [i64; JXS_LEN],
        xss: &[f64],
    ) -> Result<Self> {
        let kind = TableKind::from_zaid(&header.zaid)?;
        if nxs[0] != xss.len() as i64 {
            return Err(HeliosError::AceParseError {
                offset: 0,
                reason: format!(
                    "NXS declares {} XSS words but {} are present",
                    nxs[0],
                    xss.len()
                ),
            });
        }
        let mut blocks = Vec::new();
        for tag in BlockTag::ALL {
            let pointer = jxs[tag.jxs_slot()];
            if pointer == 0 {
                continue;
            }
            let mut cursor = XssCursor::at_pointer(xss, pointer)?;
            blocks.push(Block::parse(tag, &mut cursor)?);
        }
        let table = Self {
            header,
            kind,
            nxs,
            jxs,
            blocks,
        };
        table.check_esz_count()?;
        Ok(table)
    }

    /// Build a table in canonical layout directly from blocks.
    ///
    /// NXS and JXS are computed by an immediate re-layout; blocks must be in
    /// layout order.
    pub fn from_blocks(header: AceHeader, blocks: Vec<Block>) -> Result<Self> {
        let kind = TableKind::from_zaid(&header.zaid)?;
        let mut last_tag: Option<BlockTag> = None;
        for block in &blocks {
            let tag = block.tag();
            if let Some(previous) = last_tag {
                if tag.jxs_slot() <= previous.jxs_slot() {
                    return Err(HeliosError::AceParseError {
                        offset: 0,
                        reason: format!(
                            "blocks out of layout order: {tag:?} after {previous:?}"
                        ),
                    });
                }
            }
            last_tag = Some(tag);
        }
        let mut table = Self {
            header,
            kind,
            nxs: [0; NXS_LEN],
            jxs: [0; JXS_LEN],
            blocks,
        };
        let (nxs, jxs, _) = table.dump();
        table.nxs = nxs;
        table.jxs = jxs;
        Ok(table)
    }

    /// The block with the given tag, if present.
    pub fn block(&self, tag: BlockTag) -> Option<&Block> {
        self.blocks.iter().find(|block| block.tag() == tag)
    }

    /// Re-layout: emit every block in deterministic order, recording each
    /// starting index to produce a fresh JXS, and update the NXS length.
    pub fn dump(&self) -> ([i64; NXS_LEN], [i64; JXS_LEN], Vec<f64>) {
        let mut xss = Vec::new();
        let mut jxs = [0_i64; JXS_LEN];
        for block in &self.blocks {
            jxs[block.tag().jxs_slot()] = xss.len() as i64 + 1;
            block.dump(&mut xss);
        }
        let mut nxs = self.nxs;
        nxs[0] = xss.len() as i64;
        if let Some(Block::Esz { energies, .. }) = self.block(BlockTag::Esz) {
            nxs[2] = energies.len() as i64;
        }
        (nxs, jxs, xss)
    }

    /// Parse this table's own dump; the result must equal `self` for any
    /// table in canonical layout.
    pub fn rebuild(&self) -> Result<AceTable> {
        let (nxs, jxs, xss) = self.dump();
        AceTable::from_raw(self.header.clone(), nxs, jxs, &xss)
    }

    /// Replace the block sharing `block`'s tag, propagating the size change
    /// to every JXS pointer laid out after it.
    pub fn replace_block(&mut self, block: Block) -> Result<()> {
        let tag = block.tag();
        let existing = self
            .blocks
            .iter_mut()
            .find(|candidate| candidate.tag() == tag)
            .ok_or_else(|| HeliosError::AceParseError {
                offset: 0,
                reason: format!("table has no {tag:?} block to replace"),
            })?;
        let delta = block.size() as i64 - existing.size() as i64;
        *existing = block;

        let jxs_old = self.jxs;
        shift_jxs_array(&jxs_old, &mut self.jxs, tag.jxs_slot(), delta);
        self.nxs[0] += delta;
        if let Some(Block::Esz { energies, .. }) = self.block(BlockTag::Esz) {
            self.nxs[2] = energies.len() as i64;
        }
        self.check_esz_count()
    }

    fn check_esz_count(&self) -> Result<()> {
        if let Some(Block::Esz { energies, .. }) = self.block(BlockTag::Esz) {
            if self.nxs[2] != 0 && self.nxs[2] != energies.len() as i64 {
                return Err(HeliosError::AceParseError {
                    offset: 0,
                    reason: format!(
                        "NXS declares {} grid points but ESZ holds {}",
                        self.nxs[2],
                        energies.len()
                    ),
                });
            }
        }
        Ok(())
    }
}
