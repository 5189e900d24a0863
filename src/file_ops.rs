//! Shard files on disk
//!
//! Shard `i` of `movie.mkv` lives in `movie.mkv.i`, the integrity record in
//! `movie.mkv.manifest`. Absent or wrongly sized shard files are reported as
//! failed rather than as errors, so the codec can rebuild them.

use crate::error::{CodecError, Result};
use crate::hashtag::HashTagCodec;
use crate::manifest::{ManifestError, ShardManifest};
use crate::shards::{ShardArena, ShardSet};
use log::{debug, warn};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

pub fn shard_path(base: &Path, shard: usize) -> PathBuf {
    with_suffix(base, &format!(".{shard}"))
}

pub fn manifest_path(base: &Path) -> PathBuf {
    with_suffix(base, ".manifest")
}

/// Default destination for a decoded object.
///
/// `dir/name.ext` becomes `dir/name_Reconstructed.ext`. Only the last
/// extension is split off and a name without one just gains the suffix.
pub fn output_file_name(base: &Path) -> PathBuf {
    let stem = base.file_stem().unwrap_or_default().to_string_lossy();
    let name = match base.extension() {
        Some(ext) => format!("{}_Reconstructed.{}", stem, ext.to_string_lossy()),
        None => format!("{}_Reconstructed", stem),
    };
    base.with_file_name(name)
}

/// Write every shard of `shards` next to `base`
pub fn write_shards(base: &Path, shards: &ShardArena) -> Result<()> {
    for i in 0..shards.shard_count() {
        let path = shard_path(base, i);
        fs::write(&path, shards.shard(i))?;
        debug!("Wrote {} ({} bytes)", path.display(), shards.shard_len());
    }
    Ok(())
}

pub fn write_manifest(
    base: &Path,
    manifest: &ShardManifest,
) -> std::result::Result<(), ManifestError> {
    fs::write(manifest_path(base), manifest.to_bytes()?)?;
    Ok(())
}

/// The manifest for `base`, or `None` when no manifest file exists
pub fn read_manifest(base: &Path) -> std::result::Result<Option<ShardManifest>, ManifestError> {
    match fs::read(manifest_path(base)) {
        Ok(bytes) => Ok(Some(ShardManifest::from_bytes(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Shard files currently present for `base`
pub fn probe_shards(base: &Path, total_shards: usize) -> ShardSet {
    (0..total_shards)
        .filter(|&i| shard_path(base, i).is_file())
        .collect()
}

/// Load every shard of `base` into a fresh arena.
///
/// The subchunk size comes from `subchunk_size` when known, otherwise from
/// the first shard file whose length is a multiple of `alpha`. Missing and
/// wrongly sized shards are left zeroed and returned as failed. Nothing is
/// allocated unless at least `k` shard files have the expected length.
pub fn load_shards(
    codec: &HashTagCodec,
    base: &Path,
    subchunk_size: Option<usize>,
) -> Result<(ShardArena, ShardSet)> {
    let present = probe_shards(base, codec.total_shards());
    let subchunk_size = match subchunk_size {
        Some(size) => size,
        None => infer_subchunk_size(codec, base, &present)?,
    };

    let intact = subchunk_size
        .checked_mul(codec.subchunk_count())
        .map(|shard_len| {
            present
                .iter()
                .filter(|&i| file_len(base, i) == Some(shard_len as u64))
                .count()
        })
        .unwrap_or(0);
    if intact < codec.data_shards() {
        return Err(CodecError::InsufficientShards {
            available: intact,
            required: codec.data_shards(),
        });
    }

    let mut arena = codec.new_arena(subchunk_size);
    let mut failed = ShardSet::new();
    for i in 0..codec.total_shards() {
        if !present.contains(i) {
            warn!("Shard {} is missing", shard_path(base, i).display());
            failed.insert(i);
            continue;
        }
        let bytes = fs::read(shard_path(base, i))?;
        match arena.load_shard(i, &bytes) {
            Ok(()) => {}
            Err(CodecError::ShortBuffer {
                expected, actual, ..
            }) => {
                warn!(
                    "Shard {} is {} bytes, expected {}",
                    shard_path(base, i).display(),
                    actual,
                    expected
                );
                failed.insert(i);
            }
            Err(e) => return Err(e),
        }
    }
    Ok((arena, failed))
}

fn file_len(base: &Path, shard: usize) -> Option<u64> {
    fs::metadata(shard_path(base, shard)).ok().map(|meta| meta.len())
}

fn infer_subchunk_size(codec: &HashTagCodec, base: &Path, present: &ShardSet) -> Result<usize> {
    let alpha = codec.subchunk_count() as u64;
    present
        .iter()
        .filter_map(|i| file_len(base, i))
        .find(|&len| len > 0 && len % alpha == 0)
        .map(|len| (len / alpha) as usize)
        .ok_or(CodecError::InsufficientShards {
            available: 0,
            required: codec.data_shards(),
        })
}
