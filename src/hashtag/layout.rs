//! Sub-chunk layout of a HashTag code
//!
//! Each shard holds `alpha` subchunks, one per *row*. Every row is an
//! independent Cauchy Reed-Solomon codeword. Rows `0..e` are early rows and stay
//! untouched; in the late rows `e..alpha`, parities `1..m` additionally carry
//! *hashtag terms*: the XOR of a small group of early-row data subchunks.
//!
//! Because hashtag terms only ever reference early rows, a full decode can
//! always solve the early rows first, strip the hashtag terms and then solve the
//! late rows. Single data-shard repair reads whole late rows (k subchunks each)
//! and recovers each lost early subchunk from one hashtag parity subchunk plus
//! the other members of its group, instead of a further k subchunks.

use smallvec::SmallVec;

/// Upper bound on `alpha`; keeps subchunks large enough for efficient I/O
pub const MAX_SUBCHUNKS: usize = 16;

/// One (parity, late row) position that carries a hashtag group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashTagSlot {
    /// Parity number in `1..m` (shard index `k + parity`)
    pub parity: usize,
    /// Late row holding the hashtag terms
    pub row: usize,
    /// Early-row data subchunks `(shard, row)` summed into this slot
    pub members: SmallVec<[(usize, usize); 4]>,
}

#[derive(Debug, Clone)]
pub struct HashTagLayout {
    data_shards: usize,
    parity_shards: usize,
    subchunk_count: usize,
    early_rows: usize,
    slots: Vec<HashTagSlot>,
}

/// HashTag sub-packetization `m^⌈k/m⌉`, capped at [`MAX_SUBCHUNKS`].
///
/// With two parities and two or more data shards the exponent is at least 2:
/// `alpha = 2` leaves no split with a late row to carry a hashtag group.
pub fn subchunk_count(data_shards: usize, parity_shards: usize) -> usize {
    let mut exponent = data_shards.div_ceil(parity_shards);
    if parity_shards == 2 && data_shards >= 2 {
        exponent = exponent.max(2);
    }
    let mut alpha = 1usize;
    for _ in 0..exponent {
        alpha = alpha.saturating_mul(parity_shards);
        if alpha >= MAX_SUBCHUNKS {
            return MAX_SUBCHUNKS;
        }
    }
    alpha
}

#[inline]
fn slot_count(parity_shards: usize, alpha: usize, early_rows: usize) -> usize {
    (parity_shards - 1) * (alpha - early_rows)
}

/// Early elements are dealt round-robin in (row, shard) order
#[inline]
fn slot_for(data_shards: usize, shard: usize, row: usize, slots: usize) -> usize {
    (row * data_shards + shard) % slots
}

/// Greatest common divisor (Euclid)
pub fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Group size of every slot for a given split
fn group_sizes(data_shards: usize, early_rows: usize, slots: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; slots];
    for shard in 0..data_shards {
        for row in 0..early_rows {
            sizes[slot_for(data_shards, shard, row, slots)] += 1;
        }
    }
    sizes
}

/// Subchunks read to repair every data shard once, for a given split
fn total_repair_reads(
    data_shards: usize,
    alpha: usize,
    early_rows: usize,
    sizes: &[usize],
) -> usize {
    // Each element of a group of size g costs g reads: its hashtag parity
    // subchunk plus the g - 1 other members.
    let late_reads = data_shards * data_shards * (alpha - early_rows);
    late_reads + sizes.iter().map(|g| g * g).sum::<usize>()
}

impl HashTagLayout {
    /// Choose `alpha` and the early/late split for `(k, m)`.
    ///
    /// Callers validate `k >= 1`, `m >= 1`.
    pub fn new(data_shards: usize, parity_shards: usize) -> Self {
        let alpha = subchunk_count(data_shards, parity_shards);

        let mut best = (total_repair_reads(data_shards, alpha, 0, &[]), 0usize);
        if parity_shards > 1 {
            for early_rows in 1..alpha {
                let slots = slot_count(parity_shards, alpha, early_rows);
                if early_rows > slots {
                    break;
                }
                // A shard may appear at most once per slot: its elements step
                // through the slots by k, which visits slots / gcd(k, slots)
                // distinct slots before repeating.
                if early_rows > slots / gcd(data_shards, slots) {
                    continue;
                }
                let sizes = group_sizes(data_shards, early_rows, slots);
                let reads = total_repair_reads(data_shards, alpha, early_rows, &sizes);
                if reads < best.0 {
                    best = (reads, early_rows);
                }
            }
        }
        let early_rows = best.1;

        let mut slots = Vec::new();
        if early_rows > 0 {
            let count = slot_count(parity_shards, alpha, early_rows);
            slots = (0..count)
                .map(|s| HashTagSlot {
                    parity: 1 + s % (parity_shards - 1),
                    row: early_rows + s / (parity_shards - 1),
                    members: SmallVec::new(),
                })
                .collect();
            for row in 0..early_rows {
                for shard in 0..data_shards {
                    slots[slot_for(data_shards, shard, row, count)]
                        .members
                        .push((shard, row));
                }
            }
        }

        Self {
            data_shards,
            parity_shards,
            subchunk_count: alpha,
            early_rows,
            slots,
        }
    }

    #[inline]
    pub fn data_shards(&self) -> usize {
        self.data_shards
    }

    #[inline]
    pub fn parity_shards(&self) -> usize {
        self.parity_shards
    }

    #[inline]
    pub fn subchunk_count(&self) -> usize {
        self.subchunk_count
    }

    /// Number of early rows `e`; rows `e..alpha` are late rows
    #[inline]
    pub fn early_rows(&self) -> usize {
        self.early_rows
    }

    pub fn slots(&self) -> &[HashTagSlot] {
        &self.slots
    }

    /// Slot carried by parity `parity` (in `0..m`) at `row`, if any
    pub fn slot_at(&self, parity: usize, row: usize) -> Option<&HashTagSlot> {
        if parity == 0 || row < self.early_rows || self.slots.is_empty() {
            return None;
        }
        let index = (row - self.early_rows) * (self.parity_shards - 1) + (parity - 1);
        self.slots.get(index)
    }

    /// Slot holding the early data subchunk `(shard, row)`
    pub fn slot_of(&self, shard: usize, row: usize) -> Option<&HashTagSlot> {
        if row >= self.early_rows {
            return None;
        }
        self.slots
            .get(slot_for(self.data_shards, shard, row, self.slots.len()))
    }
}
