// Copyright 2024 The gearsieve authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Wheel-factorized Sieve of Eratosthenes.
//!
//! The flat sieve keeps one bit per integer coprime to {2,3,5} (a 4/15
//! density bitmap indexed through the radius-30 wheel) and walks candidates
//! over the radius-6 wheel with gears for 5 and 7, so composite marking is
//! the only work proportional to the bound. Above a cache-sized bound, the
//! segmented variant sweeps fixed windows of the same index space and marks
//! window chunks in parallel.

use rayon::prelude::*;

use crate::params::SEGMENT_SPAN;
use crate::wheel::{gear_seqs, wheel_increment, Wheel};
use crate::Uint;

/// All primes up to `n`, ascending.
pub fn primes_up_to(n: u64) -> Vec<u64> {
    if n <= SEGMENT_SPAN {
        simple_sieve(n)
    } else {
        segmented_sieve(n, SEGMENT_SPAN)
    }
}

fn simple_sieve(n: u64) -> Vec<u64> {
    let mut known: Vec<u64> = vec![2, 3, 5, 7];
    if n < 2 {
        return vec![];
    }
    if n < 11 {
        known.retain(|&p| p <= n);
        return known;
    }

    // One bit per integer coprime to {2,3,5}.
    let w5 = Wheel::W5;
    let cardinality = w5.coprime_count_u64(n) as usize;
    let mut composite = vec![false; cardinality + 1];

    // Candidates walk the radius-6 wheel, with gears skipping the
    // multiples of 5 and 7. Phase 1: the residue 1 is consumed up front.
    let w3 = Wheel::W3;
    let mut gears = gear_seqs(&[2, 3, 5, 7], &Uint::from(n)).split_off(2);
    for g in gears.iter_mut() {
        g.set_phase(1);
    }

    let mut o: u64 = 1;
    loop {
        o += wheel_increment(&mut gears);
        let p = w3.forward_u64(o);
        if (p as u128) * (p as u128) > n as u128 {
            break;
        }
        if composite[w5.backward_u64(p) as usize] {
            continue;
        }
        known.push(p);
        mark_multiples(&mut composite, p, n);
    }

    // Collect the remaining primes with the same walk.
    loop {
        let p = w3.forward_u64(o);
        if p > n {
            break;
        }
        o += wheel_increment(&mut gears);
        if !composite[w5.backward_u64(p) as usize] {
            known.push(p);
        }
    }
    known
}

// Mark odd multiples of p in the coprime-to-30 bitmap.
// p is coprime to 3, so stepping 4p/2p from p*p skips the multiples
// of 3; when p = 2 mod 3 a half-iteration aligns the pattern first.
fn mark_multiples(composite: &mut [bool], p: u64, n: u64) {
    let w5 = Wheel::W5;
    let p2 = p << 1;
    let p4 = p << 2;
    let mut i = p * p;
    if p % 3 == 2 {
        composite[w5.backward_u64(i) as usize] = true;
        i += p2;
        if i > n {
            return;
        }
    }
    loop {
        if i % 5 != 0 {
            composite[w5.backward_u64(i) as usize] = true;
        }
        i += p4;
        if i > n {
            return;
        }
        if i % 5 != 0 {
            composite[w5.backward_u64(i) as usize] = true;
        }
        i += p2;
        if i > n {
            return;
        }
    }
}

// Chunk length for parallel window marking, in residue indices.
const MARK_CHUNK: usize = 1 << 14;

fn segmented_sieve(n: u64, span: u64) -> Vec<u64> {
    if span >= n {
        return simple_sieve(n);
    }
    let w5 = Wheel::W5;
    let mut known = simple_sieve(span);
    let n_cardinality = w5.coprime_count_u64(n);

    // Windows advance over residue indices; index low+1+j of window j maps
    // to forward(low+1+j) in the integers.
    let mut low = w5.coprime_count_u64(span);
    while low < n_cardinality {
        let high = std::cmp::min(low + span, n_cardinality);
        let cardinality = (high - low) as usize;
        let window_top = w5.forward_u64(high);
        let sqrt_top = num_integer::sqrt(window_top) + 1;
        let sqrt_index = known.partition_point(|&p| p <= sqrt_top);
        let primes = &known[3..sqrt_index];

        let mut composite = vec![false; cardinality];
        composite
            .par_chunks_mut(MARK_CHUNK)
            .enumerate()
            .for_each(|(c, chunk)| {
                // Global residue indices [glo, ghi) owned by this chunk.
                let glo = low + 1 + (c * MARK_CHUNK) as u64;
                let ghi = glo + chunk.len() as u64;
                let first = w5.forward_u64(glo);
                let top = w5.forward_u64(ghi);
                for &p in primes {
                    // Smallest odd multiple of p at or after the chunk.
                    let mut i = (first + p - 1) / p * p;
                    if i & 1 == 0 {
                        i += p;
                    }
                    let p2 = p << 1;
                    while i < top {
                        if i % 3 != 0 && i % 5 != 0 {
                            chunk[(w5.backward_u64(i) - glo) as usize] = true;
                        }
                        i += p2;
                    }
                }
            });

        for (j, &c) in composite.iter().enumerate() {
            if !c {
                known.push(w5.forward_u64(low + 1 + j as u64));
            }
        }
        low += span;
    }
    known
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(n: u64) -> Vec<u64> {
        let mut ps = vec![];
        for c in 2..=n {
            if (2..c).take_while(|d| d * d <= c).all(|d| c % d != 0) {
                ps.push(c);
            }
        }
        ps
    }

    #[test]
    fn test_simple_sieve() {
        for n in [0, 1, 2, 3, 4, 7, 10, 11, 12, 120, 121, 122, 1000] {
            assert_eq!(simple_sieve(n), naive(n), "bound {}", n);
        }
    }

    #[test]
    fn test_sieve_counts() {
        let ps = primes_up_to(100_000);
        assert_eq!(ps.len(), 9592);
        assert_eq!(ps.last(), Some(&99991));
        assert!(ps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_segmented_matches_simple() {
        // Small spans force several windows and the prime-append path.
        for span in [1 << 12, 1 << 14] {
            let seg = segmented_sieve(300_000, span);
            let flat = simple_sieve(300_000);
            assert_eq!(seg, flat, "span {}", span);
        }
    }
}
