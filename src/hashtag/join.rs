//! Reassembling the original byte stream from the data shards

use super::HashTagCodec;
use crate::error::{CodecError, Result};
use crate::shards::ShardArena;
use std::io::Write;

impl HashTagCodec {
    /// Write the data shards to `output` in (shard, subchunk) order, stopping
    /// after `total_length` bytes so the zero padding added by
    /// [`HashTagCodec::split`] is dropped. Parity shards are never read.
    ///
    /// Returns the number of bytes written.
    pub fn join<W: Write>(
        &self,
        output: &mut W,
        shards: &ShardArena,
        total_length: u64,
    ) -> Result<u64> {
        self.check_geometry(shards)?;

        let data = shards.shards_range(0..self.data_shards());
        let available = data.len() as u64;
        if total_length > available {
            return Err(CodecError::LengthOutOfRange {
                requested: total_length,
                available,
            });
        }

        output.write_all(&data[..total_length as usize])?;
        output.flush()?;
        Ok(total_length)
    }
}
