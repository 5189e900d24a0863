//! End-to-end tests for the HashTag codec
//!
//! Exercises the full split -> encode -> fail -> repair/reconstruct -> join
//! pipeline across a range of `(k, m)` configurations.

use hashtagrs::{CodecError, HashTagCodec, ShardArena, ShardSet, REPAIR_MULTIPLICITY};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded random payload of `len` bytes
fn payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

fn encoded(k: usize, m: usize, data: &[u8]) -> (HashTagCodec, ShardArena) {
    let codec = HashTagCodec::new(k, m).unwrap();
    let mut shards = codec.split(data);
    codec.encode(&mut shards).unwrap();
    (codec, shards)
}

fn joined(codec: &HashTagCodec, shards: &ShardArena, len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    codec.join(&mut out, shards, len as u64).unwrap();
    out
}

fn set(indices: &[usize]) -> ShardSet {
    indices.iter().copied().collect()
}

/// All `size`-element subsets of `0..n`, in lexicographic order
fn subsets(n: usize, size: usize) -> Vec<Vec<usize>> {
    fn walk(
        start: usize,
        n: usize,
        size: usize,
        current: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        if current.len() == size {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            walk(i + 1, n, size, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    walk(0, n, size, &mut Vec::new(), &mut out);
    out
}

// =============================================================================
// Concrete scenario
// =============================================================================

#[test]
fn test_four_two_lose_shard_two() {
    let data = payload(1024, 1);
    let (codec, original) = encoded(4, 2, &data);
    assert_eq!(codec.subchunk_count(), 4);
    assert_eq!(original.shard_len(), 256);

    let mut shards = original.clone();
    shards.clear_shard(2);
    let report = codec.repair(&set(&[2]), &mut shards).unwrap();

    assert_eq!(shards, original);
    assert_eq!(report.subchunks_read, 13);
    assert_eq!(report.bytes_read, 832);
    assert!(report.bytes_read < 4 * 256);
    assert_eq!(joined(&codec, &shards, 1024), data);
}

// =============================================================================
// Single-failure repair
// =============================================================================

const CONFIGS: &[(usize, usize)] = &[
    (1, 1),
    (1, 3),
    (2, 1),
    (2, 2),
    (3, 2),
    (3, 3),
    (4, 2),
    (5, 3),
    (6, 4),
    (8, 1),
    (8, 3),
    (10, 4),
    (12, 6),
];

#[test]
fn test_repair_every_shard_every_config() {
    for (i, &(k, m)) in CONFIGS.iter().enumerate() {
        let data = payload(3000 + i * 17, i as u64);
        let (codec, original) = encoded(k, m, &data);
        for lost in 0..k + m {
            let mut shards = original.clone();
            shards.shard_mut(lost).fill(0xC3);
            codec.repair(&set(&[lost]), &mut shards).unwrap();
            assert_eq!(shards, original, "k={k} m={m} lost={lost}");
            assert_eq!(joined(&codec, &shards, data.len()), data);
        }
    }
}

#[test]
fn test_data_shard_repair_reads_less_than_k_shards() {
    for &(k, m) in &[
        (2, 2),
        (2, 3),
        (3, 2),
        (3, 3),
        (4, 2),
        (5, 3),
        (6, 4),
        (8, 3),
        (10, 4),
    ] {
        let (codec, original) = encoded(k, m, &payload(k * 16 * 40, 7));
        let full = (k * original.shard_len()) as u64;
        for lost in 0..k {
            let mut shards = original.clone();
            let report = codec.repair(&set(&[lost]), &mut shards).unwrap();
            assert!(
                report.bytes_read < full,
                "k={k} m={m} lost={lost}: read {} of {full}",
                report.bytes_read
            );
            assert_eq!(
                report.bytes_read,
                (codec.repair_reads(lost).len() * original.subchunk_size()) as u64
            );
        }
    }
}

#[test]
fn test_parity_shard_repair_reads_all_data() {
    for &(k, m) in CONFIGS {
        let codec = HashTagCodec::new(k, m).unwrap();
        let alpha = codec.subchunk_count();
        for j in 0..m {
            let reads = codec.repair_reads(k + j);
            assert_eq!(reads.len(), k * alpha, "k={k} m={m} parity={j}");
            assert!(reads.iter().all(|&(s, _)| s < k));
        }
    }
}

#[test]
fn test_no_hashtags_reads_exactly_k_shards() {
    for &(k, m) in &[(1, 1), (1, 3), (2, 1), (8, 1)] {
        let codec = HashTagCodec::new(k, m).unwrap();
        for lost in 0..k {
            assert_eq!(
                codec.repair_reads(lost).len(),
                k * codec.subchunk_count(),
                "k={k} m={m}"
            );
        }
    }
}

#[test]
fn test_repair_never_reads_more_than_k_shards() {
    for &(k, m) in CONFIGS {
        let codec = HashTagCodec::new(k, m).unwrap();
        for shard in 0..k + m {
            let reads = codec.repair_reads(shard);
            assert!(reads.len() <= k * codec.subchunk_count(), "k={k} m={m}");
            assert!(reads.iter().all(|&(s, _)| s != shard));
        }
    }
}

// =============================================================================
// Multiplicity boundary and reconstruction fallback
// =============================================================================

#[test]
fn test_multiple_failures_fall_back_to_reconstruct() {
    let data = payload(5000, 3);
    let (codec, original) = encoded(5, 3, &data);
    assert_eq!(REPAIR_MULTIPLICITY, 1);

    for failed in subsets(8, 3) {
        let failed = set(&failed);
        let mut shards = original.clone();
        for shard in failed.iter() {
            shards.clear_shard(shard);
        }

        assert!(matches!(
            codec.repair(&failed, &mut shards),
            Err(CodecError::Unrepairable {
                failed: 3,
                tolerated: 1
            })
        ));

        let sources = codec.select_sources(&failed).unwrap();
        codec.reconstruct(&mut shards, &sources).unwrap();
        codec.encode(&mut shards).unwrap();
        assert_eq!(shards, original, "failed {failed}");
    }
}

#[test]
fn test_too_many_failures() {
    let (codec, _) = encoded(4, 2, &payload(100, 4));
    assert!(matches!(
        codec.select_sources(&set(&[0, 1, 5])),
        Err(CodecError::InsufficientShards {
            available: 3,
            required: 4
        })
    ));
}

#[test]
fn test_reconstruct_independent_of_source_choice() {
    for &(k, m) in &[(4, 2), (5, 3), (3, 3)] {
        let data = payload(k * 100 + 3, 11);
        let (codec, original) = encoded(k, m, &data);
        for sources in subsets(k + m, k) {
            let mut shards = original.clone();
            for shard in (0..k + m).filter(|s| !sources.contains(s)) {
                shards.shard_mut(shard).fill(0x5A);
            }
            codec.reconstruct(&mut shards, &sources).unwrap();
            for d in 0..k {
                assert_eq!(
                    shards.shard(d),
                    original.shard(d),
                    "k={k} m={m} {sources:?}"
                );
            }
        }
    }
}

// =============================================================================
// Join
// =============================================================================

#[test]
fn test_join_is_idempotent() {
    let data = payload(777, 5);
    let (codec, shards) = encoded(6, 2, &data);
    let first = joined(&codec, &shards, data.len());
    let second = joined(&codec, &shards, data.len());
    assert_eq!(first, second);
    assert_eq!(first, data);
}

#[test]
fn test_join_prefix_and_empty() {
    let data = payload(400, 6);
    let (codec, shards) = encoded(3, 2, &data);
    assert_eq!(joined(&codec, &shards, 123), &data[..123]);
    assert!(joined(&codec, &shards, 0).is_empty());
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_construction_across_parameter_grid() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut configs: Vec<(usize, usize)> = (1..=12)
        .flat_map(|k| (1..=8).map(move |m| (k, m)))
        .collect();
    configs.extend([(1, 254), (254, 1), (200, 55), (128, 127)]);
    for _ in 0..20 {
        let k = rng.random_range(1..200);
        let m = rng.random_range(1..=255 - k);
        configs.push((k, m));
    }

    for (k, m) in configs {
        let codec = HashTagCodec::new(k, m).unwrap();
        let alpha = codec.subchunk_count();
        assert!((1..=16).contains(&alpha), "k={k} m={m}");
        assert!(codec.early_rows() < alpha);
        if m == 1 {
            assert_eq!(alpha, 1);
        }
    }
}

#[test]
fn test_large_config_single_repair() {
    let data = payload(255 * 16 * 2, 8);
    let (codec, original) = encoded(200, 55, &data);
    for lost in [0, 99, 199, 200, 254] {
        let mut shards = original.clone();
        shards.clear_shard(lost);
        codec.repair(&set(&[lost]), &mut shards).unwrap();
        assert_eq!(shards, original, "lost={lost}");
    }
}
