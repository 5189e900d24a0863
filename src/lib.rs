//! HashTag erasure coding
//!
//! A systematic `(k, m)` MDS code over GF(2^8) with subchunked shards and a
//! bandwidth-efficient single-failure repair path. See [`hashtag`] for the
//! codec itself; [`manifest`] and [`file_ops`] support the `hashtag` binary.

pub mod args;
pub mod error;
pub mod file_ops;
pub mod galois;
pub mod hashtag;
pub mod manifest;
pub mod matrix;
pub mod shards;

pub use error::{CodecError, Result};
pub use galois::Galois8;
pub use hashtag::{HashTagCodec, RepairReport, REPAIR_MULTIPLICITY};
pub use manifest::{ManifestError, ShardManifest};
pub use shards::{ShardArena, ShardSet, MAX_SHARDS};
