// Copyright 2024 The gearsieve authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Linear algebra modulo 2 over the shared smooth-record matrix.
//!
//! Each row pairs an exponent vector with a big-integer key. XOR-ing two
//! rows is mirrored by multiplying their keys mod N, so "the vector is the
//! exponent parity of the key" stays true through the whole elimination.
//! Rows whose vector cancels to zero carry keys congruent to perfect
//! squares, the raw material of a congruence of squares.

use num_traits::One;
use rayon::prelude::*;

use crate::arith;
use crate::relations::SmoothSet;
use crate::Uint;

/// Row-reduce the matrix in place. For each column, the pivot row is
/// swapped into the diagonal position and cleared from every other row;
/// the row-update pass is spread over the thread pool.
pub fn gaussian_elimination(set: &mut SmoothSet, n: &Uint) {
    let rows = set.len();
    let cols = set.seed_rows;
    for c in 0..cols.min(rows) {
        let Some(r) = (c..rows).find(|&r| set.vecs[r].get_unchecked(c)) else {
            continue;
        };
        set.vecs.swap(c, r);
        set.keys.swap(c, r);
        let pivot_vec = set.vecs[c].clone();
        let pivot_key = set.keys[c];
        set.vecs
            .par_iter_mut()
            .zip(set.keys.par_iter_mut())
            .enumerate()
            .for_each(|(i, (vec, key))| {
                if i != c && vec.get_unchecked(c) {
                    vec.xor_inplace(&pivot_vec);
                    *key = *key * pivot_key % *n;
                }
            });
    }
}

/// With y = x^(N/2) mod N, test both gcd(N, x+y) and gcd(N, x-y) and
/// return the first nontrivial divisor, or 1.
pub fn check_perfect_square(x: &Uint, n: &Uint) -> Uint {
    let x = *x % *n;
    let y = arith::pow_mod(x, *n >> 1, *n);
    let d = arith::gcd(*n, x + y);
    if d > Uint::one() && d < *n {
        return d;
    }
    let diff = if x > y { x - y } else { y - x };
    let d = arith::gcd(*n, diff);
    if d > Uint::one() && d < *n {
        return d;
    }
    Uint::one()
}

/// Eliminate, then probe the dependency rows (zero vector past the pivot
/// block). Probed rows are struck after the pass.
pub fn find_factor(set: &mut SmoothSet, n: &Uint) -> Uint {
    gaussian_elimination(set, n);
    let mut tried = vec![];
    let mut result = Uint::one();
    for i in set.seed_rows..set.len() {
        if !set.vecs[i].none() {
            continue;
        }
        tried.push(i);
        let d = check_perfect_square(&set.keys[i], n);
        if d > Uint::one() {
            result = d;
            break;
        }
    }
    set.strike(&mut tried);
    result
}

/// The lighter path: two rows with equal exponent vectors multiply to a
/// square without any elimination. Matches are struck after the scan.
pub fn find_duplicate_rows(set: &mut SmoothSet, n: &Uint) -> Uint {
    let rows = set.len();
    let mut tried = vec![];
    let mut result = Uint::one();
    'scan: for i in 0..rows {
        for j in (i + 1).max(set.seed_rows)..rows {
            if set.vecs[i] != set.vecs[j] {
                continue;
            }
            tried.push(i);
            tried.push(j);
            let x = set.keys[i] * set.keys[j] % *n;
            let d = check_perfect_square(&x, n);
            if d > Uint::one() {
                result = d;
                break 'scan;
            }
        }
    }
    set.strike(&mut tried);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fbase::FBase;
    use crate::sieve::primes_up_to;
    use bitvec_simd::BitVec;
    use num_traits::Zero;

    fn test_set(n: &Uint, size: usize) -> (FBase, SmoothSet) {
        let ps = primes_up_to(2000);
        let fb = FBase::select(n, &ps, 13, size);
        let set = SmoothSet::new(&fb);
        (fb, set)
    }

    #[test]
    fn test_check_perfect_square() {
        let n = Uint::from(10403u64); // 101 * 103
        // floor(N/2) = 1 mod 100, so y = x mod 101 for every x and the
        // gcd splits off 101 whenever x and y differ mod 103.
        assert_eq!(check_perfect_square(&Uint::from(4u64), &n), Uint::from(101u64));
        assert_eq!(check_perfect_square(&Uint::from(2u64), &n), Uint::from(101u64));
        // x = 0 mod N yields nothing.
        assert_eq!(check_perfect_square(&n, &n), Uint::one());
    }

    #[test]
    fn test_elimination_zeroes_dependencies() {
        let n = Uint::from(1000003u64);
        let (fb, mut set) = test_set(&n, 24);
        assert!(fb.len() >= 8);
        // Append rows built from genuine factor-base products; all of them
        // lie in the span of the seed rows.
        let mut seed = 0x12345u64;
        for _ in 0..12 {
            let mut key = Uint::one();
            let mut vec = BitVec::zeros(fb.len());
            for _ in 0..5 {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
                let idx = (seed >> 33) as usize % fb.len();
                key = key * Uint::from(fb.p(idx)) % n;
                vec.set(idx, !vec.get_unchecked(idx));
            }
            set.push(key, vec, &n);
        }
        let rows = set.len();
        gaussian_elimination(&mut set, &n);
        assert_eq!(set.len(), rows);
        for i in set.seed_rows..rows {
            assert!(set.vecs[i].none(), "row {} not reduced", i);
            // The mirrored key is a square residue: n is prime here, so
            // Euler's criterion decides.
            let key = set.keys[i];
            if key.is_zero() {
                continue;
            }
            let e = arith::pow_mod(key, (n - Uint::one()) >> 1, n);
            assert!(e.is_one(), "key {} is not a square mod {}", key, n);
        }
    }

    #[test]
    fn test_find_factor_splits() {
        let n = Uint::from(10403u64);
        let (fb, mut set) = test_set(&n, 16);
        // A zero-parity row is already a dependency; its key 2 is not a
        // square but the modular-exponent probe still splits this N.
        set.push(Uint::from(2u64), BitVec::zeros(fb.len()), &n);
        let d = find_factor(&mut set, &n);
        assert_eq!(d, Uint::from(101u64));
        // The probed row was struck.
        assert_eq!(set.len(), set.seed_rows);
    }

    #[test]
    fn test_find_duplicate_rows() {
        let n = Uint::from(10403u64);
        let (fb, mut set) = test_set(&n, 16);
        set.push(Uint::from(2u64), BitVec::zeros(fb.len()), &n);
        set.push(Uint::from(2u64), BitVec::zeros(fb.len()), &n);
        let d = find_duplicate_rows(&mut set, &n);
        assert_eq!(d, Uint::from(101u64));
        assert_eq!(set.len(), set.seed_rows);

        // A row equal to a seed row pairs with it, but the seed must
        // survive the strike.
        set.push(Uint::from(3u64), BitVec::zeros(fb.len()), &n);
        let mut one_bit = BitVec::zeros(fb.len());
        one_bit.set(0, true);
        set.push(Uint::from(5u64), one_bit, &n);
        let _ = find_duplicate_rows(&mut set, &n);
        assert_eq!(set.len(), set.seed_rows + 1);
        assert_eq!(set.keys[0], Uint::from(fb.p(0)));
    }
}
