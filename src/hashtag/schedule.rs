//! Repair schedule derivation
//!
//! For every `(shard, subchunk)` the schedule lists the surviving subchunks and
//! coefficients whose GF(2^8) linear combination equals the lost subchunk,
//! assuming that shard is the only failure.
//!
//! With the normalised Cauchy parity matrix `C` (row 0 and column 0 all ones)
//! parity 0 of any row is the plain XOR of that row's data, so for a lost data
//! shard `i`:
//!
//! ```text
//! late row t:   x_i[t] = p_0[t] + Σ_{l≠i} x_l[t]
//! early row r:  x_i[r] = p_j[t] + C[j][i]·p_0[t] + Σ_{l≠i} (C[j][l] + C[j][i])·x_l[t]
//!                        + Σ_{other members (l, r')} x_l[r']
//! ```
//!
//! where `(j, t)` is the hashtag slot holding `(i, r)`. All late rows are read
//! anyway, so the early-row formula costs one parity subchunk plus the other
//! group members.

use super::layout::HashTagLayout;
use crate::galois::Galois8;
use crate::matrix::Matrix;
use rustc_hash::FxHashSet as HashSet;

/// One term of a repair combination: `coefficient * subchunk(shard, subchunk)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairTerm {
    shard: u8,
    subchunk: u8,
    coefficient: Galois8,
}

impl RepairTerm {
    fn new(shard: usize, subchunk: usize, coefficient: Galois8) -> Self {
        debug_assert!(shard < 256 && subchunk < 256);
        Self {
            shard: shard as u8,
            subchunk: subchunk as u8,
            coefficient,
        }
    }

    #[inline]
    pub fn shard(&self) -> usize {
        self.shard as usize
    }

    #[inline]
    pub fn subchunk(&self) -> usize {
        self.subchunk as usize
    }

    #[inline]
    pub fn coefficient(&self) -> Galois8 {
        self.coefficient
    }
}

/// Precomputed single-failure repair combinations for every subchunk
#[derive(Debug, Clone)]
pub struct RepairSchedule {
    subchunk_count: usize,
    terms: Vec<Vec<RepairTerm>>,
}

impl RepairSchedule {
    pub(crate) fn build(layout: &HashTagLayout, parity_matrix: &Matrix) -> Self {
        let k = layout.data_shards();
        let m = layout.parity_shards();
        let alpha = layout.subchunk_count();
        let mut terms = Vec::with_capacity((k + m) * alpha);

        for shard in 0..k {
            for row in 0..alpha {
                terms.push(data_terms(layout, parity_matrix, shard, row));
            }
        }
        for parity in 0..m {
            for row in 0..alpha {
                terms.push(parity_terms(layout, parity_matrix, parity, row));
            }
        }

        Self {
            subchunk_count: alpha,
            terms,
        }
    }

    /// Terms rebuilding `subchunk` of `shard`
    #[inline]
    pub fn terms(&self, shard: usize, subchunk: usize) -> &[RepairTerm] {
        &self.terms[shard * self.subchunk_count + subchunk]
    }

    /// Distinct `(shard, subchunk)` regions read to rebuild all of `shard`,
    /// sorted
    pub fn read_set(&self, shard: usize) -> Vec<(usize, usize)> {
        let mut seen = HashSet::default();
        for subchunk in 0..self.subchunk_count {
            for term in self.terms(shard, subchunk) {
                seen.insert((term.shard(), term.subchunk()));
            }
        }
        let mut reads: Vec<_> = seen.into_iter().collect();
        reads.sort_unstable();
        reads
    }
}

fn data_terms(layout: &HashTagLayout, c: &Matrix, shard: usize, row: usize) -> Vec<RepairTerm> {
    let k = layout.data_shards();

    let Some(slot) = layout.slot_of(shard, row) else {
        // Late row (or no hashtags at all): XOR of parity 0 and the other data
        let mut terms = Vec::with_capacity(k);
        terms.push(RepairTerm::new(k, row, Galois8::ONE));
        terms.extend(
            (0..k)
                .filter(|&l| l != shard)
                .map(|l| RepairTerm::new(l, row, Galois8::ONE)),
        );
        return terms;
    };

    let own = c.get(slot.parity, shard);
    let mut terms = Vec::with_capacity(k + slot.members.len() + 1);
    terms.push(RepairTerm::new(k + slot.parity, slot.row, Galois8::ONE));
    terms.push(RepairTerm::new(k, slot.row, own));
    for l in (0..k).filter(|&l| l != shard) {
        let coefficient = c.get(slot.parity, l) + own;
        if !coefficient.is_zero() {
            terms.push(RepairTerm::new(l, slot.row, coefficient));
        }
    }
    terms.extend(
        slot.members
            .iter()
            .filter(|&&member| member != (shard, row))
            .map(|&(l, r)| RepairTerm::new(l, r, Galois8::ONE)),
    );
    terms
}

fn parity_terms(layout: &HashTagLayout, c: &Matrix, parity: usize, row: usize) -> Vec<RepairTerm> {
    let k = layout.data_shards();
    let mut terms: Vec<RepairTerm> = (0..k)
        .map(|l| RepairTerm::new(l, row, c.get(parity, l)))
        .collect();
    if let Some(slot) = layout.slot_at(parity, row) {
        terms.extend(
            slot.members
                .iter()
                .map(|&(l, r)| RepairTerm::new(l, r, Galois8::ONE)),
        );
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(k: usize, m: usize) -> (HashTagLayout, RepairSchedule) {
        let layout = HashTagLayout::new(k, m);
        let c = Matrix::cauchy(m, k);
        let schedule = RepairSchedule::build(&layout, &c);
        (layout, schedule)
    }

    #[test]
    fn test_schedule_never_reads_the_lost_shard() {
        for (k, m) in [(4, 2), (6, 3), (1, 3), (5, 1), (10, 4)] {
            let (layout, schedule) = schedule(k, m);
            for shard in 0..k + m {
                for subchunk in 0..layout.subchunk_count() {
                    let terms = schedule.terms(shard, subchunk);
                    assert!(!terms.is_empty());
                    assert!(terms.iter().all(|t| t.shard() != shard));
                    assert!(terms.iter().all(|t| !t.coefficient().is_zero()));
                }
            }
        }
    }

    #[test]
    fn test_four_two_shard_two_reads() {
        let (_, schedule) = schedule(4, 2);

        // Late rows 1..4: parity 0 plus data shards 0, 1, 3
        for row in 1..4 {
            let mut shards: Vec<usize> = schedule.terms(2, row).iter().map(|t| t.shard()).collect();
            shards.sort_unstable();
            assert_eq!(shards, vec![0, 1, 3, 4]);
        }

        // Early row 0 lives alone in the slot at (parity 1, row 3)
        let early = schedule.terms(2, 0);
        assert_eq!(early[0].shard(), 5);
        assert_eq!(early[0].subchunk(), 3);
        assert!(early.iter().all(|t| t.subchunk() == 3));

        // 3 late rows of 4 subchunks, plus the hashtag parity subchunk
        assert_eq!(schedule.read_set(2).len(), 13);
        assert_eq!(schedule.read_set(0).len(), 14);
    }

    #[test]
    fn test_parity_reads_cover_all_data() {
        let (_, schedule) = schedule(4, 2);
        let reads = schedule.read_set(5);
        assert_eq!(reads.len(), 16);
        assert!(reads.iter().all(|&(shard, _)| shard < 4));
    }
}
