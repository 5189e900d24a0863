//! Integrity record stored next to the shards
//!
//! The codec itself trusts whatever bytes it is handed. Callers that want to
//! detect corrupted or reordered shards persist this record when splitting and
//! check it before decoding: it pins the original file size, the codec
//! parameters and a CRC32 for every shard in shard order.

use crate::hashtag::HashTagCodec;
use crate::shards::{ShardArena, ShardSet};
use binrw::{binrw, BinRead, BinWrite};
use std::io::Cursor;
use thiserror::Error;

/// Errors reading or validating a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Malformed manifest: {0}")]
    Parse(#[from] binrw::Error),

    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest describes k={k} m={m} alpha={alpha}, codec is k={codec_k} m={codec_m} alpha={codec_alpha}")]
    CodecMismatch {
        k: usize,
        m: usize,
        alpha: usize,
        codec_k: usize,
        codec_m: usize,
        codec_alpha: usize,
    },

    #[error("Manifest subchunk size {subchunk_size} does not match a {file_size}-byte object")]
    InconsistentSize { subchunk_size: u64, file_size: u64 },
}

/// Caller-owned metadata for one encoded object
#[binrw]
#[brw(little, magic = b"HTAGMAN\0")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardManifest {
    pub data_shards: u8,
    pub parity_shards: u8,
    pub subchunk_count: u16,
    pub subchunk_size: u64,
    /// Original object length before padding
    pub file_size: u64,
    #[br(count = data_shards as usize + parity_shards as usize)]
    pub shard_crcs: Vec<u32>,
}

impl ShardManifest {
    /// Record the current contents of `shards`
    pub fn new(codec: &HashTagCodec, shards: &ShardArena, file_size: u64) -> Self {
        Self {
            data_shards: codec.data_shards() as u8,
            parity_shards: codec.parity_shards() as u8,
            subchunk_count: codec.subchunk_count() as u16,
            subchunk_size: shards.subchunk_size() as u64,
            file_size,
            shard_crcs: (0..codec.total_shards())
                .map(|i| crc32fast::hash(shards.shard(i)))
                .collect(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ManifestError> {
        Ok(Self::read(&mut Cursor::new(bytes))?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        let mut cursor = Cursor::new(Vec::new());
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn total_shards(&self) -> usize {
        self.data_shards as usize + self.parity_shards as usize
    }

    /// Bytes per shard recorded at split time
    pub fn shard_len(&self) -> u64 {
        self.subchunk_count as u64 * self.subchunk_size
    }

    /// Hex rendering of a shard's CRC32, as shown in logs
    pub fn shard_crc_hex(&self, shard: usize) -> String {
        hex::encode(self.shard_crcs[shard].to_be_bytes())
    }

    /// Confirm the record was written for the same `(k, m)` and `alpha`
    pub fn check_codec(&self, codec: &HashTagCodec) -> Result<(), ManifestError> {
        if self.data_shards as usize != codec.data_shards()
            || self.parity_shards as usize != codec.parity_shards()
            || self.subchunk_count as usize != codec.subchunk_count()
        {
            return Err(ManifestError::CodecMismatch {
                k: self.data_shards as usize,
                m: self.parity_shards as usize,
                alpha: self.subchunk_count as usize,
                codec_k: codec.data_shards(),
                codec_m: codec.parity_shards(),
                codec_alpha: codec.subchunk_count(),
            });
        }

        // Split derives the subchunk size from the object length alone
        let expected = usize::try_from(self.file_size)
            .ok()
            .map(|len| codec.subchunk_size_for(len) as u64);
        if expected != Some(self.subchunk_size) {
            return Err(ManifestError::InconsistentSize {
                subchunk_size: self.subchunk_size,
                file_size: self.file_size,
            });
        }
        Ok(())
    }

    /// Shards outside `skip` whose contents no longer match their CRC32
    pub fn corrupted_shards(&self, shards: &ShardArena, skip: &ShardSet) -> ShardSet {
        (0..self.total_shards().min(shards.shard_count()))
            .filter(|&i| !skip.contains(i))
            .filter(|&i| crc32fast::hash(shards.shard(i)) != self.shard_crcs[i])
            .collect()
    }
}
