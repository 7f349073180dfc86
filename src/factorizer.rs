// Copyright 2024 The gearsieve authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Shared factoring state and the sweep workers.
//!
//! Workers walk the residue indices coprime to the wheel radius in batches
//! of one gear period, applying the gear increments to skip the remaining
//! small-prime multiples. The brute-force worker tests each guess for exact
//! divisibility; the smooth-congruence worker additionally buffers every
//! guess as a candidate B-smooth number and periodically converts the
//! buffer into rows of the shared exponent matrix.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use bitvec_simd::BitVec;
use num_traits::{One, Zero};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::arith::{self, Num};
use crate::fbase::FBase;
use crate::relations::SmoothSet;
use crate::wheel::{wheel_increment, Gear, Wheel};
use crate::Uint;

pub struct Factorizer {
    pub n: Uint,
    pub sqrt_n: Uint,
    wheel: Wheel,
    // This node's slice of the global batch space.
    batch_offset: Uint,
    batch_end: Uint,
    issued: Mutex<Uint>,
    // Residue indices per batch, one full gear period.
    wheel_entry_count: u64,
    smooth_parts_limit: usize,
    // Product bound when combining smooth parts (sqrt(N) in duplicate-row
    // mode, N in full-elimination mode).
    smooth_limit: Uint,
    running: AtomicBool,
    pub smooths: Mutex<SmoothSet>,
    pub fbase: FBase,
}

impl Factorizer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n: Uint,
        sqrt_n: Uint,
        wheel: Wheel,
        batch_offset: Uint,
        batch_end: Uint,
        wheel_entry_count: u64,
        smooth_parts_limit: usize,
        smooth_limit: Uint,
        fbase: FBase,
    ) -> Self {
        let smooths = Mutex::new(SmoothSet::new(&fbase));
        Factorizer {
            n,
            sqrt_n,
            wheel,
            batch_offset,
            batch_end,
            issued: Mutex::new(Uint::zero()),
            wheel_entry_count,
            smooth_parts_limit,
            smooth_limit,
            running: AtomicBool::new(true),
            smooths,
            fbase,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn exhausted(&self) -> bool {
        let issued = self.issued.lock().unwrap();
        self.batch_offset + *issued >= self.batch_end
    }

    fn range(&self) -> Uint {
        self.batch_end - self.batch_offset
    }

    // Hand out batches from the top of the node's range downward: for a
    // balanced semiprime the factors sit near sqrt(N).
    fn next_batch(&self) -> Option<Uint> {
        if !self.is_running() {
            return None;
        }
        let mut issued = self.issued.lock().unwrap();
        if *issued >= self.range() {
            return None;
        }
        let b = self.batch_end - Uint::one() - *issued;
        *issued = *issued + Uint::one();
        Some(b)
    }

    // Alternate both ends of the node's range toward its middle, so that
    // cooperating workers spread over the whole slice without hot-spotting
    // either end.
    fn next_alt_batch(&self) -> Option<Uint> {
        if !self.is_running() {
            return None;
        }
        let mut issued = self.issued.lock().unwrap();
        if *issued >= self.range() {
            return None;
        }
        let half = *issued >> 1;
        let b = if issued.low_u64() & 1 == 1 {
            self.batch_end - Uint::one() - half
        } else {
            self.batch_offset + half
        };
        *issued = *issued + Uint::one();
        Some(b)
    }

    /// Walk batches testing every guess for exact divisibility. Returns a
    /// nontrivial factor, or 1 when the node's range is exhausted.
    pub fn brute_force(&self, gears: &mut [Gear]) -> Uint {
        while let Some(batch) = self.next_batch() {
            for g in gears.iter_mut() {
                g.reset();
            }
            let w = Uint::from(self.wheel_entry_count);
            let mut p = batch * w;
            let end = (batch + Uint::one()) * w;
            while p < end {
                p = p + Uint::from(wheel_increment(gears));
                let guess = self.wheel.forward(&p);
                if guess > Uint::one() && guess < self.n && (self.n % guess).is_zero() {
                    self.stop();
                    return guess;
                }
            }
        }
        Uint::one()
    }

    /// Same walk, but every guess coprime to N is buffered as a semi-smooth
    /// part. After the batch that fills the buffer, the worker flushes it
    /// into the shared matrix and returns 1 so the driver can interleave
    /// the linear-algebra stage.
    pub fn smooth_congruences(&self, gears: &mut [Gear], rng: &mut StdRng) -> Uint {
        let mut parts: Vec<Uint> = Vec::with_capacity(self.smooth_parts_limit);
        while let Some(batch) = self.next_alt_batch() {
            for g in gears.iter_mut() {
                g.reset();
            }
            let w = Uint::from(self.wheel_entry_count);
            let mut p = batch * w;
            let end = (batch + Uint::one()) * w;
            while p < end {
                p = p + Uint::from(wheel_increment(gears));
                let guess = self.wheel.forward(&p);
                let d = arith::gcd(guess, self.n);
                if !d.is_one() {
                    // The last batches overshoot sqrt(N), so a guess can be
                    // a multiple of N itself; only a proper divisor ends
                    // the search.
                    if d < self.n {
                        self.stop();
                        return d;
                    }
                } else if guess > Uint::one() {
                    parts.push(guess);
                }
            }
            if parts.len() >= self.smooth_parts_limit {
                self.make_smooth_numbers(&mut parts, rng);
                return Uint::one();
            }
        }
        self.make_smooth_numbers(&mut parts, rng);
        Uint::one()
    }

    /// Factor the buffered parts over the factor base, shuffle the
    /// survivors, and combine them into products above the configured
    /// limit, XOR-accumulating the exponent vectors. The surviving pairs
    /// are appended to the shared matrix under its mutex.
    pub fn make_smooth_numbers(&self, parts: &mut Vec<Uint>, rng: &mut StdRng) {
        let mut records: Vec<(Uint, BitVec)> = parts
            .drain(..)
            .filter_map(|v| self.fbase.factorization_vector(&v).map(|vec| (v, vec)))
            .collect();
        if records.is_empty() {
            return;
        }
        records.shuffle(rng);

        let mut out = vec![];
        let mut prod = Uint::one();
        let mut acc = BitVec::zeros(self.fbase.len());
        for (v, vec) in records {
            prod = prod * v;
            acc.xor_inplace(&vec);
            if prod > self.smooth_limit {
                out.push((prod, acc));
                prod = Uint::one();
                acc = BitVec::zeros(self.fbase.len());
            }
        }
        if out.is_empty() {
            return;
        }
        let mut set = self.smooths.lock().unwrap();
        for (key, vec) in out {
            set.push(key, vec, &self.n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sieve::primes_up_to;
    use crate::wheel::gear_seqs;
    use rand::SeedableRng;

    fn small_factorizer(n: u64, gauss: bool) -> Factorizer {
        let n = Uint::from(n);
        let sqrt_n = arith::isqrt(n);
        let wheel = Wheel::W11;
        let w = wheel.entry_count();
        let total_idx = wheel.coprime_count(&sqrt_n);
        let w_uint = Uint::from(w);
        let batches = (total_idx + w_uint - Uint::one()) / w_uint;
        let ps = primes_up_to(500);
        let fbase = FBase::select(&n, &ps, 13, 24);
        let limit = if gauss { n } else { sqrt_n };
        Factorizer::new(n, sqrt_n, wheel, Uint::zero(), batches, w, 1 << 12, limit, fbase)
    }

    #[test]
    fn test_batch_order() {
        let f = small_factorizer(10403, false);
        // Descending from the top of the range.
        let mut f2 = small_factorizer(10403, false);
        f2.batch_offset = Uint::from(3u64);
        f2.batch_end = Uint::from(7u64);
        let seq: Vec<u64> = std::iter::from_fn(|| f2.next_batch())
            .map(|b| b.low_u64())
            .collect();
        assert_eq!(seq, vec![6, 5, 4, 3]);
        assert!(f2.exhausted());
        assert!(!f.exhausted());
    }

    #[test]
    fn test_alt_batch_order() {
        let mut f = small_factorizer(10403, false);
        f.batch_offset = Uint::from(3u64);
        f.batch_end = Uint::from(8u64);
        let seq: Vec<u64> = std::iter::from_fn(|| f.next_alt_batch())
            .map(|b| b.low_u64())
            .collect();
        // Both ends toward the middle, each batch exactly once.
        assert_eq!(seq, vec![3, 7, 4, 6, 5]);
        assert!(f.exhausted());
    }

    #[test]
    fn test_brute_force_small() {
        let f = small_factorizer(10403, false);
        let mut gears: Vec<Gear> = vec![];
        assert_eq!(f.brute_force(&mut gears), Uint::from(101u64));
        // The terminal flag is cleared for the other workers.
        assert!(!f.is_running());
    }

    #[test]
    fn test_brute_force_with_gears() {
        let n = Uint::from(101u64 * 103);
        let gear_primes = primes_up_to(13);
        let mut gears = gear_seqs(&gear_primes, &n).split_off(5);
        let wheel = Wheel::W11;
        let radius: u64 = gear_primes.iter().product();
        let radius = std::cmp::min(radius, 101 * 103);
        let w = wheel.coprime_count_u64(radius);
        let total_idx = wheel.coprime_count(&arith::isqrt(n));
        let w_uint = Uint::from(w);
        let batches = (total_idx + w_uint - Uint::one()) / w_uint;
        let ps = primes_up_to(500);
        let fbase = FBase::select(&n, &ps, 13, 24);
        let f = Factorizer::new(
            n,
            arith::isqrt(n),
            wheel,
            Uint::zero(),
            batches,
            w,
            1 << 12,
            n,
            fbase,
        );
        assert_eq!(f.brute_force(&mut gears), Uint::from(101u64));
    }

    #[test]
    fn test_smooth_congruences_gcd_exit() {
        let f = small_factorizer(10403, true);
        let mut gears: Vec<Gear> = vec![];
        let mut rng = StdRng::seed_from_u64(1);
        let d = f.smooth_congruences(&mut gears, &mut rng);
        assert_eq!(d, Uint::from(101u64));
    }

    #[test]
    fn test_make_smooth_numbers() {
        let f = small_factorizer(10403, false);
        let seeds = f.fbase.len();
        let (p0, p1) = (f.fbase.p(0), f.fbase.p(1));
        // With a tiny limit every surviving part becomes its own row;
        // unfactorable parts are dropped.
        let mut f = f;
        f.smooth_limit = Uint::one();
        let mut parts = vec![
            Uint::from(p0),
            Uint::from(p0 * p1),
            Uint::from(999_983u64),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        f.make_smooth_numbers(&mut parts, &mut rng);
        assert!(parts.is_empty());
        let set = f.smooths.lock().unwrap();
        assert_eq!(set.len(), seeds + 2);
        let mut keys: Vec<Uint> = set.keys[seeds..].to_vec();
        keys.sort();
        let mut expect = vec![Uint::from(p0), Uint::from(p0 * p1) % f.n];
        expect.sort();
        assert_eq!(keys, expect);
        for v in &set.vecs[seeds..] {
            assert!(v.any());
        }
    }
}
