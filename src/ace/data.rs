//! Raw ACE data plumbing: header, NXS/JXS arrays, and the XSS read cursor.

use crate::error::{HeliosError, Result};
use serde::{Deserialize, Serialize};

/// Number of NXS integers per table.
pub const NXS_LEN: usize = 16;
/// Number of JXS pointers per table.
pub const JXS_LEN: usize = 32;

/// Per-table header preceding the NXS/JXS arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AceHeader {
    /// Table identifier, e.g. `92235.70c`.
    pub zaid: String,
    /// Atomic weight ratio to the neutron mass.
    pub atomic_weight_ratio: f64,
    /// Temperature as kT in MeV.
    pub temperature: f64,
    /// Processing date string.
    pub date: String,
    /// Free-form comment line.
    pub comment: String,
    /// Source identifier (the material line).
    pub material: String,
}

/// Which family of blocks a table carries, decided by its zaid suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    /// Continuous-energy neutron table (`...c`).
    ContinuousEnergy,
    /// Thermal scattering table (`...t`).
    Thermal,
}

impl TableKind {
    /// Classify a zaid by its trailing class letter.
    pub fn from_zaid(zaid: &str) -> Result<TableKind> {
        match zaid.chars().last() {
            Some('c') => Ok(TableKind::ContinuousEnergy),
            Some('t') => Ok(TableKind::Thermal),
            other => Err(HeliosError::AceParseError {
                offset: 0,
                reason: format!("zaid '{zaid}' has unsupported class suffix {other:?}"),
            }),
        }
    }
}

/// A read cursor over the flat XSS payload.
///
/// Every read error carries the word offset it happened at so schema
/// violations point back into the file.
#[derive(Debug)]
pub struct XssCursor<'a> {
    data: &'a [f64],
    position: usize,
}

impl<'a> XssCursor<'a> {
    /// Cursor over `data` starting at word `position` (0-based).
    pub fn new(data: &'a [f64], position: usize) -> Self {
        Self { data, position }
    }

    /// Cursor positioned from a 1-based JXS pointer.
    pub fn at_pointer(data: &'a [f64], pointer: i64) -> Result<Self> {
        if pointer < 1 || pointer as usize > data.len() {
            return Err(HeliosError::AceParseError {
                offset: 0,
                reason: format!(
                    "JXS pointer {pointer} outside XSS of length {}",
                    data.len()
                ),
            });
        }
        Ok(Self::new(data, pointer as usize - 1))
    }

    /// Current word offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Read one word.
    pub fn read(&mut self) -> Result<f64> {
        let value = self.data.get(self.position).copied().ok_or_else(|| {
            HeliosError::AceParseError {
                offset: self.position,
                reason: "read past the end of XSS".to_string(),
            }
        })?;
        self.position += 1;
        Ok(value)
    }

    /// Read one word as an integer, rejecting non-integral values.
    pub fn read_int(&mut self) -> Result<i64> {
        let offset = self.position;
        let value = self.read()?;
        let rounded = value.round();
        if (value - rounded).abs() > 1e-6 || !rounded.is_finite() {
            return Err(HeliosError::AceParseError {
                offset,
                reason: format!("expected an integer word, got {value}"),
            });
        }
        Ok(rounded as i64)
    }

    /// Read one word as a non-negative array length.
    pub fn read_count(&mut self) -> Result<usize> {
        let offset = self.position;
        let value = self.read_int()?;
        usize::try_from(value).map_err(|_| HeliosError::AceParseError {
            offset,
            reason: format!("negative count {value}"),
        })
    }

    /// Read `count` consecutive words.
    pub fn read_array(&mut self, count: usize) -> Result<Vec<f64>> {
        if self.position + count > self.data.len() {
            return Err(HeliosError::AceParseError {
                offset: self.position,
                reason: format!(
                    "array of {count} words overruns XSS of length {}",
                    self.data.len()
                ),
            });
        }
        let slice = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(slice.to_vec())
    }
}

/// Propagate a block's size change to every pointer after it.
///
/// Adds `delta` to each `jxs_new[j]` whose original pointer `jxs_old[j]`
/// lies beyond `jxs_old[slot]`, i.e. to every block laid out after the one
/// that changed. Absent blocks (pointer 0) are untouched.
pub fn shift_jxs_array(
    jxs_old: &[i64; JXS_LEN],
    jxs_new: &mut [i64; JXS_LEN],
    slot: usize,
    delta: i64,
) {
    let pivot = jxs_old[slot];
    for index in 0..JXS_LEN {
        if jxs_old[index] > pivot {
            jxs_new[index] += delta;
        }
    }
}
