//! Typed ACE blocks.
//!
//! Each block tag has a fixed schema: counts first, then parallel arrays.
//! `parse` and `dump` are exact mirrors, and `size` equals the number of
//! words `dump` emits; the table layer relies on this when rebuilding JXS.

use crate::ace::data::XssCursor;
use crate::error::{HeliosError, Result};
use serde::{Deserialize, Serialize};

/// Number of cosine bin boundaries per incident energy in the ANG block.
pub const ANG_BIN_BOUNDS: usize = 33;

/// The known block tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockTag {
    /// Principal cross sections on the main energy grid.
    Esz,
    /// Fission neutron multiplicity.
    Nu,
    /// Per-reaction cross sections.
    Sig,
    /// Angular distributions as equiprobable cosine bins.
    Ang,
    /// Secondary energy distribution.
    Dlw,
    /// Incoherent inelastic thermal incident-energy grid.
    Itie,
    /// Incoherent inelastic thermal outgoing table.
    Itix,
    /// Coherent elastic thermal grid.
    Itce,
}

impl BlockTag {
    /// Every known tag in deterministic layout order.
    ///
    /// A tag's position in this list is its fixed JXS slot; a table carries
    /// whichever subset its data provides (continuous-energy tables the
    /// first five, thermal tables the last three).
    pub const ALL: [BlockTag; 8] = [
        BlockTag::Esz,
        BlockTag::Nu,
        BlockTag::Sig,
        BlockTag::Ang,
        BlockTag::Dlw,
        BlockTag::Itie,
        BlockTag::Itix,
        BlockTag::Itce,
    ];

    /// The fixed JXS slot of this tag.
    pub fn jxs_slot(self) -> usize {
        BlockTag::ALL
            .iter()
            .position(|&tag| tag == self)
            .expect("every tag appears in ALL")
    }
}

/// Fission multiplicity representation inside the NU block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NuForm {
    /// Polynomial in energy: `nu(E) = sum c_k E^k`.
    Polynomial(Vec<f64>),
    /// Tabulated `(energy, nu)` pairs.
    Tabular {
        /// Incident energies.
        energies: Vec<f64>,
        /// Multiplicities at those energies.
        values: Vec<f64>,
    },
}

/// One reaction entry of the SIG block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionXs {
    /// ENDF MT reaction number.
    pub mt: i64,
    /// 1-based index of the first tabulated energy on the main grid.
    pub first_index: usize,
    /// Cross-section values from that index onward.
    pub values: Vec<f64>,
}

/// A typed ACE block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    /// ESZ: `[NES, E, total, absorption, elastic, heating]`.
    Esz {
        /// Main energy grid, strictly ascending.
        energies: Vec<f64>,
        /// Total cross section.
        total: Vec<f64>,
        /// Absorption cross section.
        absorption: Vec<f64>,
        /// Elastic scattering cross section.
        elastic: Vec<f64>,
        /// Average heating numbers.
        heating: Vec<f64>,
    },
    /// NU: `[LNU, ...]` with a polynomial or tabular payload.
    Nu {
        /// The multiplicity representation.
        form: NuForm,
    },
    /// SIG: `[NMT, (MT, IE, NE, values)...]`.
    Sig {
        /// Per-reaction cross sections.
        reactions: Vec<ReactionXs>,
    },
    /// ANG: `[NE, E, 33 cosine bin bounds per energy]`.
    Ang {
        /// Incident energies.
        energies: Vec<f64>,
        /// Equiprobable cosine bin boundaries, one row per energy.
        cosine_bins: Vec<Vec<f64>>,
    },
    /// DLW: `[LAW, NE, E, values]`.
    Dlw {
        /// ENDF law number of the stored distribution.
        law: i64,
        /// Incident energies.
        energies: Vec<f64>,
        /// Law parameter per energy.
        values: Vec<f64>,
    },
    /// ITIE: `[NE, E, sigma]` (so `size` is `2 NE + 1`).
    Itie {
        /// Incident energies, strictly ascending.
        energies: Vec<f64>,
        /// Total inelastic cross sections.
        cross_sections: Vec<f64>,
    },
    /// ITIX: `[N, E_out, mu]` outgoing energy/cosine table.
    Itix {
        /// Outgoing energies.
        outgoing_energies: Vec<f64>,
        /// Corresponding discrete cosines.
        cosines: Vec<f64>,
    },
    /// ITCE: `[NE, E, P]` coherent elastic grid.
    Itce {
        /// Bragg edge energies.
        energies: Vec<f64>,
        /// Cumulative structure factors.
        cross_sections: Vec<f64>,
    },
}

fn check_ascending(tag: BlockTag, offset: usize, energies: &[f64]) -> Result<()> {
    let ascending = energies.windows(2).all(|pair| pair[0] < pair[1]);
    if !ascending {
        return Err(HeliosError::AceParseError {
            offset,
            reason: format!("{tag:?} energy grid is not strictly ascending"),
        });
    }
    Ok(())
}

impl Block {
    /// The tag of this block.
    pub fn tag(&self) -> BlockTag {
        match self {
            Block::Esz { .. } => BlockTag::Esz,
            Block::Nu { .. } => BlockTag::Nu,
            Block::Sig { .. } => BlockTag::Sig,
            Block::Ang { .. } => BlockTag::Ang,
            Block::Dlw { .. } => BlockTag::Dlw,
            Block::Itie { .. } => BlockTag::Itie,
            Block::Itix { .. } => BlockTag::Itix,
            Block::Itce { .. } => BlockTag::Itce,
        }
    }

    /// Parse the block for `tag` at the cursor position.
    pub fn parse(tag: BlockTag, cursor: &mut XssCursor<'_>) -> Result<Block> {
        match tag {
            BlockTag::Esz => {
                let start = cursor.position();
                let count = cursor.read_count()?;
                let energies = cursor.read_array(count)?;
                check_ascending(tag, start, &energies)?;
                Ok(Block::Esz {
                    energies,
                    total: cursor.read_array(count)?,
                    absorption: cursor.read_array(count)?,
                    elastic: cursor.read_array(count)?,
                    heating: cursor.read_array(count)?,
                })
            }
            BlockTag::Nu => {
                let start = cursor.position();
                let lnu = cursor.read_int()?;
                let form = match lnu {
                    1 => {
                        let count = cursor.read_count()?;
                        NuForm::Polynomial(cursor.read_array(count)?)
                    }
                    2 => {
                        let count = cursor.read_count()?;
                        NuForm::Tabular {
                            energies: cursor.read_array(count)?,
                            values: cursor.read_array(count)?,
                        }
                    }
                    other => {
                        return Err(HeliosError::AceParseError {
                            offset: start,
                            reason: format!("NU form flag must be 1 or 2, got {other}"),
                        });
                    }
                };
                Ok(Block::Nu { form })
            }
            BlockTag::Sig => {
                let reaction_count = cursor.read_count()?;
                let mut reactions = Vec::with_capacity(reaction_count);
                for _ in 0..reaction_count {
                    let mt = cursor.read_int()?;
                    let first_index = cursor.read_count()?;
                    let count = cursor.read_count()?;
                    reactions.push(ReactionXs {
                        mt,
                        first_index,
                        values: cursor.read_array(count)?,
                    });
                }
                Ok(Block::Sig { reactions })
            }
            BlockTag::Ang => {
                let count = cursor.read_count()?;
                let energies = cursor.read_array(count)?;
                let mut cosine_bins = Vec::with_capacity(count);
                for _ in 0..count {
                    cosine_bins.push(cursor.read_array(ANG_BIN_BOUNDS)?);
                }
                Ok(Block::Ang {
                    energies,
                    cosine_bins,
                })
            }
            BlockTag::Dlw => {
                let law = cursor.read_int()?;
                let count = cursor.read_count()?;
                Ok(Block::Dlw {
                    law,
                    energies: cursor.read_array(count)?,
                    values: cursor.read_array(count)?,
                })
            }
            BlockTag::Itie => {
                let start = cursor.position();
                let count = cursor.read_count()?;
                let energies = cursor.read_array(count)?;
                check_ascending(tag, start, &energies)?;
                Ok(Block::Itie {
                    energies,
                    cross_sections: cursor.read_array(count)?,
                })
            }
            BlockTag::Itix => {
                let count = cursor.read_count()?;
                Ok(Block::Itix {
                    outgoing_energies: cursor.read_array(count)?,
                    cosines: cursor.read_array(count)?,
                })
            }
            BlockTag::Itce => {
                let start = cursor.position();
                let count = cursor.read_count()?;
                let energies = cursor.read_array(count)?;
                check_ascending(tag, start, &energies)?;
                Ok(Block::Itce {
                    energies,
                    cross_sections: cursor.read_array(count)?,
                })
            }
        }
    }

    /// Append this block's words to `xss` in the exact parse order.
    pub fn dump(&self, xss: &mut Vec<f64>) {
        match self {
            Block::Esz {
                energies,
                total,
                absorption,
                elastic,
                heating,
            } => {
                xss.push(energies.len() as f64);
                xss.extend_from_slice(energies);
                xss.extend_from_slice(total);
                xss.extend_from_slice(absorption);
                xss.extend_from_slice(elastic);
                xss.extend_from_slice(heating);
            }
            Block::Nu { form } => match form {
                NuForm::Polynomial(coefficients) => {
                    xss.push(1.0);
                    xss.push(coefficients.len() as f64);
                    xss.extend_from_slice(coefficients);
                }
                NuForm::Tabular { energies, values } => {
                    xss.push(2.0);
                    xss.push(energies.len() as f64);
                    xss.extend_from_slice(energies);
                    xss.extend_from_slice(values);
                }
            },
            Block::Sig { reactions } => {
                xss.push(reactions.len() as f64);
                for reaction in reactions {
                    xss.push(reaction.mt as f64);
                    xss.push(reaction.first_index as f64);
                    xss.push(reaction.values.len() as f64);
                    xss.extend_from_slice(&reaction.values);
                }
            }
            Block::Ang {
                energies,
                cosine_bins,
            } => {
                xss.push(energies.len() as f64);
                xss.extend_from_slice(energies);
                for row in cosine_bins {
                    xss.extend_from_slice(row);
                }
            }
            Block::Dlw {
                law,
                energies,
                values,
            } => {
                xss.push(*law as f64);
                xss.push(energies.len() as f64);
                xss.extend_from_slice(energies);
                xss.extend_from_slice(values);
            }
            Block::Itie {
                energies,
                cross_sections,
            }
            | Block::Itce {
                energies,
                cross_sections,
            } => {
                xss.push(energies.len() as f64);
                xss.extend_from_slice(energies);
                xss.extend_from_slice(cross_sections);
            }
            Block::Itix {
                outgoing_energies,
                cosines,
            } => {
                xss.push(outgoing_energies.len() as f64);
                xss.extend_from_slice(outgoing_energies);
                xss.extend_from_slice(cosines);
            }
        }
    }

    /// Number of words `dump` emits.
    pub fn size(&self) -> usize {
        match self {
            Block::Esz { energies, .. } => 1 + 5 * energies.len(),
            Block::Nu { form } => match form {
                NuForm::Polynomial(coefficients) => 2 + coefficients.len(),
                NuForm::Tabular { energies, .. } => 2 + 2 * energies.len(),
            },
            Block::Sig { reactions } => {
                1 + reactions
                    .iter()
                    .map(|reaction| 3 + reaction.values.len())
                    .sum::<usize>()
            }
            Block::Ang { energies, .. } => 1 + energies.len() * (1 + ANG_BIN_BOUNDS),
            Block::Dlw { energies, .. } => 2 + 2 * energies.len(),
            Block::Itie { energies, .. } | Block::Itce { energies, .. } => {
                1 + 2 * energies.len()
            }
            Block::Itix {
                outgoing_energies, ..
            } => 1 + 2 * outgoing_energies.len(),
        }
    }
}
