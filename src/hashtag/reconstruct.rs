//! Full `k`-of-`n` decoding by matrix inversion
//!
//! The `k × k` rows of the generator `[I; C]` belonging to the chosen sources are
//! inverted once and applied to every row of subchunks. Early rows decode
//! directly. Late rows first have their hashtag terms stripped from any parity
//! source, which is possible because those terms only involve early-row data
//! that has already been decoded.

use super::HashTagCodec;
use crate::error::{CodecError, Result};
use crate::galois::{mul_add_slice, mul_slice, Galois8};
use crate::matrix::Matrix;
use crate::shards::{ShardArena, ShardSet};
use log::debug;
use rayon::prelude::*;

impl HashTagCodec {
    /// Regenerate the data shards from exactly `k` source shards.
    ///
    /// Every data shard not listed in `sources` is overwritten; sources and
    /// parity shards are left untouched. The result does not depend on which
    /// valid source set is chosen.
    pub fn reconstruct(&self, shards: &mut ShardArena, sources: &[usize]) -> Result<()> {
        self.check_geometry(shards)?;
        self.check_sources(sources)?;

        let k = self.data_shards();
        let source_set: ShardSet = sources.iter().copied().collect();
        let missing: Vec<usize> = (0..k).filter(|&d| !source_set.contains(d)).collect();
        if missing.is_empty() || shards.subchunk_size() == 0 {
            return Ok(());
        }

        let decode = self.generator.select_rows(sources).invert(sources)?;
        let decoded = self.decode_data(shards, sources, &decode);

        let shard_len = shards.shard_len();
        for &d in &missing {
            shards
                .shard_mut(d)
                .copy_from_slice(&decoded[d * shard_len..(d + 1) * shard_len]);
        }

        debug!(
            "Reconstructed data shards {:?} from sources {:?}",
            missing, sources
        );
        Ok(())
    }

    fn check_sources(&self, sources: &[usize]) -> Result<()> {
        let set: ShardSet = sources
            .iter()
            .copied()
            .filter(|&s| s < self.total_shards())
            .collect();
        if sources.len() != self.data_shards() || set.len() != sources.len() {
            return Err(CodecError::InvalidSources {
                sources: sources.to_vec(),
                required: self.data_shards(),
            });
        }
        Ok(())
    }

    /// All `k` data shards, contiguous, decoded from `sources`
    fn decode_data(&self, shards: &ShardArena, sources: &[usize], decode: &Matrix) -> Vec<u8> {
        let k = self.data_shards();
        let alpha = self.subchunk_count();
        let early = self.early_rows();
        let subchunk_size = shards.subchunk_size();
        let shard_len = shards.shard_len();
        let mut decoded = vec![0u8; k * shard_len];

        // Early rows carry no hashtag terms
        decoded
            .par_chunks_mut(shard_len)
            .enumerate()
            .for_each(|(d, out)| {
                for row in 0..early {
                    let out_sub = &mut out[row * subchunk_size..(row + 1) * subchunk_size];
                    combine_into(decode.row(d), out_sub, |q| shards.subchunk(sources[q], row));
                }
            });

        if early == alpha {
            return decoded;
        }

        // Late rows of hashtag-carrying parity sources, with the hashtags removed
        let stripped: Vec<Option<Vec<u8>>> = sources
            .iter()
            .map(|&source| self.strip_hashtags(shards, source, &decoded))
            .collect();

        decoded
            .par_chunks_mut(shard_len)
            .enumerate()
            .for_each(|(d, out)| {
                for row in early..alpha {
                    let range = row * subchunk_size..(row + 1) * subchunk_size;
                    combine_into(decode.row(d), &mut out[range.clone()], |q| {
                        match &stripped[q] {
                            Some(bytes) => &bytes[range.clone()],
                            None => shards.subchunk(sources[q], row),
                        }
                    });
                }
            });

        decoded
    }

    /// Copy of parity shard `source` with hashtag terms removed, or `None` when
    /// the shard carries none
    fn strip_hashtags(
        &self,
        shards: &ShardArena,
        source: usize,
        decoded: &[u8],
    ) -> Option<Vec<u8>> {
        let k = self.data_shards();
        if source <= k || self.layout.slots().is_empty() {
            return None;
        }
        let parity = source - k;
        let subchunk_size = shards.subchunk_size();
        let shard_len = shards.shard_len();
        let mut bytes = shards.shard(source).to_vec();

        for row in self.early_rows()..self.subchunk_count() {
            let Some(slot) = self.layout.slot_at(parity, row) else {
                continue;
            };
            let out = &mut bytes[row * subchunk_size..(row + 1) * subchunk_size];
            for &(l, r) in &slot.members {
                let start = l * shard_len + r * subchunk_size;
                mul_add_slice(Galois8::ONE, &decoded[start..start + subchunk_size], out);
            }
        }
        Some(bytes)
    }
}

/// `out = Σ coefficients[q] · source(q)`
fn combine_into<'a, F>(coefficients: &[Galois8], out: &mut [u8], source: F)
where
    F: Fn(usize) -> &'a [u8],
{
    let Some((&first, rest)) = coefficients.split_first() else {
        out.fill(0);
        return;
    };
    mul_slice(first, source(0), out);
    for (q, &coefficient) in rest.iter().enumerate() {
        mul_add_slice(coefficient, source(q + 1), out);
    }
}
