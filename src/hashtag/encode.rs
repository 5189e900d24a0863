//! Splitting an object into data shards and computing parity shards

use super::HashTagCodec;
use crate::error::Result;
use crate::galois::{mul_add_slice, Galois8};
use crate::shards::ShardArena;
use log::debug;
use rayon::prelude::*;

impl HashTagCodec {
    /// Subchunk size needed to hold `length` bytes in the data shards
    pub fn subchunk_size_for(&self, length: usize) -> usize {
        length
            .div_ceil(self.data_shards() * self.subchunk_count())
            .max(1)
    }

    /// Lay `data` out across the data shards, zero-padding the tail.
    ///
    /// Bytes fill shard 0 subchunk 0 first, then the rest of shard 0, then
    /// shard 1, matching the order [`HashTagCodec::join`] reads them back in.
    /// Parity shards are left zeroed; call [`HashTagCodec::encode`] next.
    pub fn split(&self, data: &[u8]) -> ShardArena {
        let mut arena = self.new_arena(self.subchunk_size_for(data.len()));
        let (_, all) = arena.split_at_shard_mut(0);
        all[..data.len()].copy_from_slice(data);
        arena
    }

    /// Compute every parity shard from the data shards
    pub fn encode(&self, shards: &mut ShardArena) -> Result<()> {
        self.check_geometry(shards)?;
        let subchunk_size = shards.subchunk_size();
        if subchunk_size == 0 {
            return Ok(());
        }

        let k = self.data_shards();
        let shard_len = shards.shard_len();
        let (data, parity) = shards.split_at_shard_mut(k);
        let data_subchunk = move |shard: usize, row: usize| {
            let start = shard * shard_len + row * subchunk_size;
            &data[start..start + subchunk_size]
        };

        parity
            .par_chunks_mut(shard_len)
            .enumerate()
            .for_each(|(j, out)| {
                for (row, out_sub) in out.chunks_mut(subchunk_size).enumerate() {
                    out_sub.fill(0);
                    for l in 0..k {
                        let coefficient = self.parity_matrix.get(j, l);
                        mul_add_slice(coefficient, data_subchunk(l, row), out_sub);
                    }
                    if let Some(slot) = self.layout.slot_at(j, row) {
                        for &(l, r) in &slot.members {
                            mul_add_slice(Galois8::ONE, data_subchunk(l, r), out_sub);
                        }
                    }
                }
            });

        debug!(
            "Encoded {} parity shards of {} bytes",
            self.parity_shards(),
            shard_len
        );
        Ok(())
    }
}
