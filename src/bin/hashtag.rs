//! `hashtag` binary - split files into HashTag shards and rebuild them

use anyhow::{Context, Result};
use hashtagrs::args::{parse_args, CodecOptions};
use hashtagrs::file_ops::{
    load_shards, output_file_name, read_manifest, shard_path, write_manifest, write_shards,
};
use hashtagrs::{HashTagCodec, ShardManifest, REPAIR_MULTIPLICITY};
use log::{info, warn};
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let matches = parse_args();
    match matches.subcommand() {
        Some(("split", sub_matches)) => {
            let file = sub_matches
                .get_one::<PathBuf>("file")
                .context("file is required")?;
            handle_split(file, &CodecOptions::from_matches(sub_matches))
        }
        Some(("decode", sub_matches)) => {
            let base = sub_matches
                .get_one::<PathBuf>("basefile")
                .context("basefile is required")?;
            let out = sub_matches.get_one::<PathBuf>("out");
            handle_decode(base, out, &CodecOptions::from_matches(sub_matches))
        }
        _ => {
            eprintln!("Error: No command specified");
            eprintln!("\nUse 'hashtag --help' for usage information");
            std::process::exit(1);
        }
    }
}

fn configure_threads(threads: usize) {
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .unwrap_or_else(|_| {
                warn!(
                    "Could not set thread count to {}, using default",
                    threads
                );
            });
    }
}

fn build_codec(options: &CodecOptions) -> Result<HashTagCodec> {
    configure_threads(options.threads);
    HashTagCodec::new(options.data_shards, options.parity_shards).with_context(|| {
        format!(
            "Invalid shard counts k={} m={}",
            options.data_shards, options.parity_shards
        )
    })
}

fn handle_split(file: &Path, options: &CodecOptions) -> Result<()> {
    let codec = build_codec(options)?;
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let mut shards = codec.split(&data);
    codec.encode(&mut shards)?;
    write_shards(file, &shards)
        .with_context(|| format!("Failed to write shards for {}", file.display()))?;

    let manifest = ShardManifest::new(&codec, &shards, data.len() as u64);
    write_manifest(file, &manifest)?;

    info!(
        "Split {} ({} bytes) into {} shards of {} bytes",
        file.display(),
        data.len(),
        codec.total_shards(),
        shards.shard_len()
    );
    if !options.quiet {
        println!(
            "Wrote {} data + {} parity shards ({} subchunks of {} bytes each)",
            codec.data_shards(),
            codec.parity_shards(),
            codec.subchunk_count(),
            shards.subchunk_size()
        );
    }
    Ok(())
}

fn handle_decode(base: &Path, out: Option<&PathBuf>, options: &CodecOptions) -> Result<()> {
    let codec = build_codec(options)?;
    let manifest = read_manifest(base)
        .with_context(|| format!("Failed to read manifest for {}", base.display()))?;
    if let Some(manifest) = &manifest {
        manifest.check_codec(&codec)?;
    } else {
        warn!(
            "No manifest for {}: shard contents cannot be verified and padding is kept",
            base.display()
        );
    }

    let subchunk_size = manifest.as_ref().map(|m| m.subchunk_size as usize);
    let (mut shards, mut failed) = load_shards(&codec, base, subchunk_size)
        .with_context(|| format!("Failed to load shards for {}", base.display()))?;

    if let Some(manifest) = &manifest {
        for shard in manifest.corrupted_shards(&shards, &failed).iter() {
            warn!(
                "Shard {} does not match checksum {}",
                shard_path(base, shard).display(),
                manifest.shard_crc_hex(shard)
            );
            failed.insert(shard);
        }
    }

    if failed.len() <= REPAIR_MULTIPLICITY {
        let report = codec.repair(&failed, &mut shards)?;
        if !options.quiet && !report.repaired.is_empty() {
            println!(
                "Repaired shards {} reading {} bytes",
                report.repaired, report.bytes_read
            );
        }
    } else {
        let sources = codec.select_sources(&failed)?;
        codec.reconstruct(&mut shards, &sources)?;
        codec.encode(&mut shards)?;
        if !options.quiet {
            println!("Reconstructed shards {} from {:?}", failed, sources);
        }
    }

    if let Some(manifest) = &manifest {
        let still_bad = manifest.corrupted_shards(&shards, &Default::default());
        anyhow::ensure!(
            still_bad.is_empty(),
            "Shards {} still fail verification after decoding",
            still_bad
        );
    }

    for shard in failed.iter() {
        fs::write(shard_path(base, shard), shards.shard(shard))
            .with_context(|| format!("Failed to restore {}", shard_path(base, shard).display()))?;
    }

    let output_path = out.cloned().unwrap_or_else(|| output_file_name(base));
    let total_length = match &manifest {
        Some(manifest) => manifest.file_size,
        None => (codec.data_shards() * shards.shard_len()) as u64,
    };
    let file = fs::File::create(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let written = codec.join(&mut BufWriter::new(file), &shards, total_length)?;

    if !options.quiet {
        println!("Wrote {} ({} bytes)", output_path.display(), written);
    }
    Ok(())
}
