//! Bandwidth-efficient repair of failed shards
//!
//! Each lost subchunk is rebuilt from the terms the [`RepairSchedule`] lists for
//! it. The failed shard's buffer is isolated from the rest of the arena, so the
//! surviving shards are only ever read and the failed one only ever written.
//!
//! [`RepairSchedule`]: super::RepairSchedule

use super::{HashTagCodec, REPAIR_MULTIPLICITY};
use crate::error::{CodecError, Result};
use crate::galois::{mul_add_slice, mul_slice};
use crate::shards::{ShardArena, ShardSet};
use log::{debug, trace};
use rayon::prelude::*;

/// Outcome of a successful repair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Shards rebuilt in place
    pub repaired: ShardSet,
    /// Distinct surviving subchunks read
    pub subchunks_read: usize,
    /// Surviving bytes read (`subchunks_read * subchunk_size`)
    pub bytes_read: u64,
}

impl HashTagCodec {
    /// Rebuild every shard in `failed` in place.
    ///
    /// Buffers of shards not in `failed` are never written. Fails with
    /// [`CodecError::Unrepairable`] when more than [`REPAIR_MULTIPLICITY`]
    /// shards are missing; the caller should then fall back to
    /// [`HashTagCodec::reconstruct`].
    pub fn repair(&self, failed: &ShardSet, shards: &mut ShardArena) -> Result<RepairReport> {
        self.check_geometry(shards)?;
        self.check_indices(failed)?;
        if failed.len() > REPAIR_MULTIPLICITY {
            return Err(CodecError::Unrepairable {
                failed: failed.len(),
                tolerated: REPAIR_MULTIPLICITY,
            });
        }

        let subchunk_size = shards.subchunk_size();
        let mut report = RepairReport::default();

        for shard in failed.iter() {
            let reads = self.schedule.read_set(shard);
            debug_assert!(reads.iter().all(|&(s, _)| !failed.contains(s)));

            if subchunk_size > 0 {
                self.repair_shard(shard, shards);
            }

            trace!("Shard {} rebuilt from {:?}", shard, reads);
            report.repaired.insert(shard);
            report.subchunks_read += reads.len();
            report.bytes_read += (reads.len() * subchunk_size) as u64;
        }

        debug!(
            "Repaired shards {} reading {} subchunks ({} bytes)",
            report.repaired, report.subchunks_read, report.bytes_read
        );
        Ok(report)
    }

    fn repair_shard(&self, shard: usize, shards: &mut ShardArena) {
        let subchunk_size = shards.subchunk_size();
        let (survivors, target) = shards.isolate_shard(shard);

        target
            .par_chunks_mut(subchunk_size)
            .enumerate()
            .for_each(|(subchunk, out)| {
                let terms = self.schedule.terms(shard, subchunk);
                let Some((first, rest)) = terms.split_first() else {
                    out.fill(0);
                    return;
                };
                mul_slice(
                    first.coefficient(),
                    survivors.subchunk(first.shard(), first.subchunk()),
                    out,
                );
                for term in rest {
                    mul_add_slice(
                        term.coefficient(),
                        survivors.subchunk(term.shard(), term.subchunk()),
                        out,
                    );
                }
            });
    }
}
