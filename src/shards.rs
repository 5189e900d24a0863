//! Shard bookkeeping: failure sets and the per-invocation shard arena
//!
//! A shard is stored as `alpha` contiguous subchunks with no header. The arena
//! keeps every shard of one object in a single allocation so any subchunk is
//! addressed by `(shard, subchunk)` without per-shard containers.

use crate::error::{CodecError, Result};

/// Maximum number of shards the GF(2^8) codec can address
pub const MAX_SHARDS: usize = 255;

/// Set of shard indices, stored as a 256-bit mask.
///
/// Indices of 256 or more cannot be stored. The largest such index is kept
/// aside and reported by [`ShardSet::max`] so codec calls reject the set with
/// [`CodecError::InvalidShardIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShardSet {
    bits: [u64; 4],
    out_of_range: Option<usize>,
}

impl ShardSet {
    pub const fn new() -> Self {
        Self {
            bits: [0; 4],
            out_of_range: None,
        }
    }

    /// Returns true if the index was stored and not already present
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= 256 {
            self.out_of_range = self.out_of_range.max(Some(index));
            return false;
        }
        let (word, bit) = (index / 64, 1u64 << (index % 64));
        let absent = self.bits[word] & bit == 0;
        self.bits[word] |= bit;
        absent
    }

    pub fn remove(&mut self, index: usize) -> bool {
        if index >= 256 {
            return false;
        }
        let (word, bit) = (index / 64, 1u64 << (index % 64));
        let present = self.bits[word] & bit != 0;
        self.bits[word] &= !bit;
        present
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index < 256 && self.bits[index / 64] & (1u64 << (index % 64)) != 0
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    /// Highest index inserted, including one too large to store
    pub fn max(&self) -> Option<usize> {
        self.out_of_range.or_else(|| self.iter().last())
    }

    /// Indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..256).filter(move |&i| self.contains(i))
    }
}

impl FromIterator<usize> for ShardSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = ShardSet::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

impl std::fmt::Display for ShardSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let indices: Vec<String> = self.iter().map(|i| i.to_string()).collect();
        write!(f, "{{{}}}", indices.join(", "))
    }
}

/// Fixed-size buffer holding every subchunk of every shard of one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardArena {
    shard_count: usize,
    subchunk_count: usize,
    subchunk_size: usize,
    data: Vec<u8>,
}

impl ShardArena {
    /// Zero-filled arena
    pub fn new(shard_count: usize, subchunk_count: usize, subchunk_size: usize) -> Self {
        Self {
            shard_count,
            subchunk_count,
            subchunk_size,
            data: vec![0u8; shard_count * subchunk_count * subchunk_size],
        }
    }

    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    #[inline]
    pub fn subchunk_count(&self) -> usize {
        self.subchunk_count
    }

    #[inline]
    pub fn subchunk_size(&self) -> usize {
        self.subchunk_size
    }

    /// Bytes per shard (`alpha * subchunk_size`)
    #[inline]
    pub fn shard_len(&self) -> usize {
        self.subchunk_count * self.subchunk_size
    }

    #[inline]
    pub fn shard(&self, shard: usize) -> &[u8] {
        let len = self.shard_len();
        &self.data[shard * len..(shard + 1) * len]
    }

    #[inline]
    pub fn shard_mut(&mut self, shard: usize) -> &mut [u8] {
        let len = self.shard_len();
        &mut self.data[shard * len..(shard + 1) * len]
    }

    #[inline]
    pub fn subchunk(&self, shard: usize, subchunk: usize) -> &[u8] {
        let start = shard * self.shard_len() + subchunk * self.subchunk_size;
        &self.data[start..start + self.subchunk_size]
    }

    /// Copy a whole shard into the arena
    pub fn load_shard(&mut self, shard: usize, bytes: &[u8]) -> Result<()> {
        if shard >= self.shard_count {
            return Err(CodecError::InvalidShardIndex {
                index: shard,
                total: self.shard_count,
            });
        }
        if bytes.len() != self.shard_len() {
            return Err(CodecError::ShortBuffer {
                shard,
                expected: self.shard_len(),
                actual: bytes.len(),
            });
        }
        self.shard_mut(shard).copy_from_slice(bytes);
        Ok(())
    }

    /// Zero a shard, e.g. to mark its contents as lost
    pub fn clear_shard(&mut self, shard: usize) {
        self.shard_mut(shard).fill(0);
    }

    /// Contiguous bytes of shards `range`
    pub(crate) fn shards_range(&self, range: std::ops::Range<usize>) -> &[u8] {
        let len = self.shard_len();
        &self.data[range.start * len..range.end * len]
    }

    /// Split into a read-only view of the first `split` shards and mutable
    /// access to the rest
    pub(crate) fn split_at_shard_mut(&mut self, split: usize) -> (&[u8], &mut [u8]) {
        let len = self.shard_len();
        let (head, tail) = self.data.split_at_mut(split * len);
        (&*head, tail)
    }

    /// Mutable access to one shard alongside a view of every other shard
    pub(crate) fn isolate_shard(&mut self, shard: usize) -> (SurvivorView<'_>, &mut [u8]) {
        let len = self.shard_len();
        let subchunk_size = self.subchunk_size;
        let (before, rest) = self.data.split_at_mut(shard * len);
        let (target, after) = rest.split_at_mut(len);
        (
            SurvivorView {
                excluded: shard,
                shard_len: len,
                subchunk_size,
                before: &*before,
                after: &*after,
            },
            target,
        )
    }
}

/// Read access to every shard except one
pub(crate) struct SurvivorView<'a> {
    excluded: usize,
    shard_len: usize,
    subchunk_size: usize,
    before: &'a [u8],
    after: &'a [u8],
}

impl<'a> SurvivorView<'a> {
    /// Panics if asked for the excluded shard
    #[inline]
    pub(crate) fn subchunk(&self, shard: usize, subchunk: usize) -> &'a [u8] {
        assert_ne!(shard, self.excluded, "read of excluded shard {shard}");
        let offset = subchunk * self.subchunk_size;
        if shard < self.excluded {
            let start = shard * self.shard_len + offset;
            &self.before[start..start + self.subchunk_size]
        } else {
            let start = (shard - self.excluded - 1) * self.shard_len + offset;
            &self.after[start..start + self.subchunk_size]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_set_basic_operations() {
        let mut set = ShardSet::new();
        assert!(set.is_empty());
        assert!(set.insert(3));
        assert!(!set.insert(3));
        assert!(set.insert(200));
        assert!(set.insert(64));
        assert_eq!(set.len(), 3);
        assert!(set.contains(64));
        assert!(!set.contains(65));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 64, 200]);
        assert_eq!(set.max(), Some(200));
        assert!(set.remove(64));
        assert!(!set.remove(64));
        assert_eq!(set.to_string(), "{3, 200}");
    }

    #[test]
    fn test_shard_set_keeps_out_of_range_index_aside() {
        let mut set: ShardSet = [2, 300].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert!(!set.contains(300));
        assert_eq!(set.max(), Some(300));
        assert!(!set.insert(1000));
        assert_eq!(set.max(), Some(1000));
        assert!(!set.insert(256));
        assert_eq!(set.max(), Some(1000));
    }

    #[test]
    fn test_shard_set_from_iterator() {
        let set: ShardSet = [5, 1, 5, 0].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 1, 5]);
        assert!(!set.contains(999));
    }

    #[test]
    fn test_arena_addressing() {
        let mut arena = ShardArena::new(3, 2, 4);
        assert_eq!(arena.shard_len(), 8);
        arena
            .load_shard(1, &[1, 2, 3, 4, 5, 6, 7, 8])
            .unwrap();
        assert_eq!(arena.subchunk(1, 0), &[1, 2, 3, 4]);
        assert_eq!(arena.subchunk(1, 1), &[5, 6, 7, 8]);
        assert_eq!(arena.shard(0), &[0; 8]);
        arena.clear_shard(1);
        assert_eq!(arena.shard(1), &[0; 8]);
    }

    #[test]
    fn test_load_shard_rejects_wrong_length() {
        let mut arena = ShardArena::new(2, 4, 16);
        match arena.load_shard(0, &[0u8; 63]) {
            Err(CodecError::ShortBuffer {
                shard,
                expected,
                actual,
            }) => {
                assert_eq!((shard, expected, actual), (0, 64, 63));
            }
            other => panic!("expected ShortBuffer, got {other:?}"),
        }
        assert!(matches!(
            arena.load_shard(2, &[0u8; 64]),
            Err(CodecError::InvalidShardIndex { index: 2, total: 2 })
        ));
    }

    #[test]
    fn test_isolate_shard_view() {
        let mut arena = ShardArena::new(3, 2, 2);
        for shard in 0..3 {
            let bytes: Vec<u8> = (0..4).map(|b| (shard * 10 + b) as u8).collect();
            arena.load_shard(shard, &bytes).unwrap();
        }
        let (view, target) = arena.isolate_shard(1);
        assert_eq!(target, &[10, 11, 12, 13]);
        assert_eq!(view.subchunk(0, 1), &[2, 3]);
        assert_eq!(view.subchunk(2, 0), &[20, 21]);
        target.fill(0xFF);
        assert_eq!(arena.shard(1), &[0xFF; 4]);
    }

    #[test]
    #[should_panic(expected = "read of excluded shard")]
    fn test_isolate_shard_refuses_excluded_reads() {
        let mut arena = ShardArena::new(2, 1, 1);
        let (view, _target) = arena.isolate_shard(0);
        let _ = view.subchunk(0, 0);
    }
}
