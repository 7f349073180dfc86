// Copyright 2024 The gearsieve authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Smooth records collected by the sweep workers.
//!
//! A record pairs a product of factor-base primes (reduced mod N) with its
//! exponent vector modulo 2. The store keeps the two halves in parallel
//! vectors; the first |factor base| rows are the standard-basis seed rows
//! (p_i, e_i) anchoring Gaussian elimination.

use bitvec_simd::BitVec;

use crate::fbase::FBase;
use crate::Uint;

pub struct SmoothSet {
    pub keys: Vec<Uint>,
    pub vecs: Vec<BitVec>,
    // Rows below this index are seed rows and are never struck.
    pub seed_rows: usize,
    pub n_appended: usize,
    pub n_struck: usize,
}

impl SmoothSet {
    pub fn new(fbase: &FBase) -> Self {
        let mut keys = Vec::with_capacity(fbase.len());
        let mut vecs = Vec::with_capacity(fbase.len());
        for idx in 0..fbase.len() {
            keys.push(Uint::from(fbase.p(idx)));
            let mut e = BitVec::zeros(fbase.len());
            e.set(idx, true);
            vecs.push(e);
        }
        SmoothSet {
            seed_rows: fbase.len(),
            keys,
            vecs,
            n_appended: 0,
            n_struck: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Append a record, reducing the key mod n so that later products stay
    /// inside the working width.
    pub fn push(&mut self, key: Uint, vec: BitVec, n: &Uint) {
        self.keys.push(key % *n);
        self.vecs.push(vec);
        self.n_appended += 1;
    }

    /// Remove tried rows after a scan. Seed rows are kept; indices must be
    /// collected during the scan and struck afterwards.
    pub fn strike(&mut self, indices: &mut Vec<usize>) {
        indices.sort_unstable();
        indices.dedup();
        for &i in indices.iter().rev() {
            if i < self.seed_rows {
                continue;
            }
            self.keys.remove(i);
            self.vecs.remove(i);
            self.n_struck += 1;
        }
        indices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sieve::primes_up_to;
    use num_traits::One;

    #[test]
    fn test_seed_rows() {
        let n = Uint::from(10403u64);
        let ps = primes_up_to(500);
        let fb = FBase::select(&n, &ps, 13, 16);
        let set = SmoothSet::new(&fb);
        assert_eq!(set.len(), fb.len());
        for idx in 0..fb.len() {
            assert_eq!(set.keys[idx], Uint::from(fb.p(idx)));
            let mut e = BitVec::zeros(fb.len());
            e.set(idx, true);
            assert_eq!(set.vecs[idx], e);
        }
    }

    #[test]
    fn test_push_and_strike() {
        let n = Uint::from(10403u64);
        let ps = primes_up_to(500);
        let fb = FBase::select(&n, &ps, 13, 8);
        let mut set = SmoothSet::new(&fb);
        let seeds = set.seed_rows;

        for k in 0..4u64 {
            set.push(
                Uint::from(20000 + k),
                BitVec::zeros(fb.len()),
                &n,
            );
        }
        // Keys are stored reduced.
        assert_eq!(set.keys[seeds], Uint::from(20000u64) % n);
        assert_eq!(set.len(), seeds + 4);

        // Strike ignores seed rows and duplicate indices.
        let mut tried = vec![seeds + 1, 0, seeds + 3, seeds + 1];
        set.strike(&mut tried);
        assert!(tried.is_empty());
        assert_eq!(set.len(), seeds + 2);
        assert_eq!(set.keys[seeds], Uint::from(20000u64) % n);
        assert_eq!(set.keys[seeds + 1], Uint::from(20002u64) % n);
        assert_eq!(set.keys[0], Uint::from(fb.p(0)));
    }

    #[test]
    fn test_key_reduction() {
        let n = Uint::from(101u64);
        let ps = primes_up_to(500);
        let fb = FBase::select(&n, &ps, 13, 4);
        let mut set = SmoothSet::new(&fb);
        let big = (Uint::one() << 200) + Uint::from(17u64);
        set.push(big, BitVec::zeros(fb.len()), &n);
        assert_eq!(set.keys[set.len() - 1], big % n);
        assert!(set.keys[set.len() - 1] < n);
    }
}
