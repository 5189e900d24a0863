//! HashTag erasure codec
//!
//! A systematic `(k, m)` code over GF(2^8) whose shards are split into `alpha`
//! subchunks. Any `k` shards reconstruct the object (MDS), while a single lost
//! data shard is rebuilt from noticeably less than `k` shards' worth of reads.
//!
//! ## Pipeline
//!
//! ```text
//! split -> encode -> (nodes fail) -> repair -> reconstruct -> join
//! ```
//!
//! [`HashTagCodec::repair`] handles up to [`REPAIR_MULTIPLICITY`] failures using
//! the precomputed [`RepairSchedule`]. Beyond that the caller falls back to
//! [`HashTagCodec::reconstruct`] with any `k` surviving shards.

pub mod layout;
pub mod schedule;

mod encode;
mod join;
mod reconstruct;
mod repair;

pub use layout::{HashTagLayout, HashTagSlot, MAX_SUBCHUNKS};
pub use repair::RepairReport;
pub use schedule::{RepairSchedule, RepairTerm};

use crate::error::{CodecError, Result};
use crate::matrix::Matrix;
use crate::shards::{ShardArena, ShardSet, MAX_SHARDS};
use log::debug;

/// Number of simultaneous failures the repair schedule is built for
pub const REPAIR_MULTIPLICITY: usize = 1;

/// Immutable codec configuration derived from `(k, m)`
#[derive(Debug, Clone)]
pub struct HashTagCodec {
    layout: HashTagLayout,
    /// `m × k` normalised Cauchy matrix; row `j` generates parity `j`
    parity_matrix: Matrix,
    /// `(k + m) × k` systematic generator `[I; C]`
    generator: Matrix,
    schedule: RepairSchedule,
}

impl HashTagCodec {
    /// Build the codec for `data_shards` data and `parity_shards` parity shards
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<Self> {
        if data_shards < 1 {
            return Err(CodecError::Config(
                "at least one data shard is required".to_string(),
            ));
        }
        if parity_shards < 1 {
            return Err(CodecError::Config(
                "at least one parity shard is required".to_string(),
            ));
        }
        if data_shards + parity_shards > MAX_SHARDS {
            return Err(CodecError::Config(format!(
                "{} data + {} parity shards exceeds the field capacity of {}",
                data_shards, parity_shards, MAX_SHARDS
            )));
        }

        let layout = HashTagLayout::new(data_shards, parity_shards);
        let parity_matrix = Matrix::cauchy(parity_shards, data_shards);
        let generator = Matrix::stack(&Matrix::identity(data_shards), &parity_matrix);
        let schedule = RepairSchedule::build(&layout, &parity_matrix);

        debug!(
            "HashTag codec k={} m={}: alpha={}, early rows={}, hashtag slots={}",
            data_shards,
            parity_shards,
            layout.subchunk_count(),
            layout.early_rows(),
            layout.slots().len()
        );

        Ok(Self {
            layout,
            parity_matrix,
            generator,
            schedule,
        })
    }

    #[inline]
    pub fn data_shards(&self) -> usize {
        self.layout.data_shards()
    }

    #[inline]
    pub fn parity_shards(&self) -> usize {
        self.layout.parity_shards()
    }

    #[inline]
    pub fn total_shards(&self) -> usize {
        self.data_shards() + self.parity_shards()
    }

    /// Subchunks per shard (`alpha`)
    #[inline]
    pub fn subchunk_count(&self) -> usize {
        self.layout.subchunk_count()
    }

    #[inline]
    pub fn early_rows(&self) -> usize {
        self.layout.early_rows()
    }

    pub fn layout(&self) -> &HashTagLayout {
        &self.layout
    }

    /// Distinct `(shard, subchunk)` regions a single-failure repair of `shard`
    /// reads
    pub fn repair_reads(&self, shard: usize) -> Vec<(usize, usize)> {
        self.schedule.read_set(shard)
    }

    /// An empty arena laid out for this codec
    pub fn new_arena(&self, subchunk_size: usize) -> ShardArena {
        ShardArena::new(self.total_shards(), self.subchunk_count(), subchunk_size)
    }

    /// Lowest `k` shard indices not in `failed`
    pub fn select_sources(&self, failed: &ShardSet) -> Result<Vec<usize>> {
        let survivors: Vec<usize> = (0..self.total_shards())
            .filter(|&i| !failed.contains(i))
            .collect();
        if survivors.len() < self.data_shards() {
            return Err(CodecError::InsufficientShards {
                available: survivors.len(),
                required: self.data_shards(),
            });
        }
        Ok(survivors[..self.data_shards()].to_vec())
    }

    fn check_geometry(&self, shards: &ShardArena) -> Result<()> {
        if shards.shard_count() != self.total_shards()
            || shards.subchunk_count() != self.subchunk_count()
        {
            return Err(CodecError::GeometryMismatch {
                shards: shards.shard_count(),
                subchunks: shards.subchunk_count(),
                expected_shards: self.total_shards(),
                expected_subchunks: self.subchunk_count(),
            });
        }
        Ok(())
    }

    fn check_indices(&self, set: &ShardSet) -> Result<()> {
        match set.max() {
            Some(index) if index >= self.total_shards() => Err(CodecError::InvalidShardIndex {
                index,
                total: self.total_shards(),
            }),
            _ => Ok(()),
        }
    }
}
