// Copyright 2024 The gearsieve authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The factor base of the congruence-of-squares stage.
//!
//! Candidate smooth numbers are decomposed over the primes above the gear
//! level for which N is a quadratic residue. To help with memory locality,
//! each additional information is held in a separate vector.

use bitvec_simd::BitVec;
use num_traits::One;

use crate::arith::{self, Num};
use crate::Uint;

#[derive(Clone, Debug)]
pub struct FBase {
    pub primes: Vec<u64>,
    divs: Vec<arith::Divider64>,
    // Partial primorials, each kept below half the working width, so the
    // gcd prefilter of factorization_vector never overflows.
    chunks: Vec<(std::ops::Range<usize>, Uint)>,
}

impl FBase {
    /// Select up to `size` primes above `gear_level` from the sieved list,
    /// keeping those for which n is a quadratic residue. The caller warns
    /// when fewer than `size` are available.
    pub fn select(n: &Uint, primes: &[u64], gear_level: u64, size: usize) -> Self {
        let mut chosen = vec![];
        let mut divs = vec![];
        for &p in primes {
            if p <= gear_level {
                continue;
            }
            if chosen.len() >= size {
                break;
            }
            let div = arith::Divider64::new(p);
            let np = div.mod_uint(n);
            if arith::sqrt_mod(np, p).is_some() {
                chosen.push(p);
                divs.push(div);
            }
        }

        let mut chunks = vec![];
        let mut start = 0;
        let mut prod = Uint::one();
        for (i, &p) in chosen.iter().enumerate() {
            if prod.bits() + 64 > 512 {
                chunks.push((start..i, prod));
                start = i;
                prod = Uint::one();
            }
            prod = prod * Uint::from(p);
        }
        if start < chosen.len() {
            chunks.push((start..chosen.len(), prod));
        }
        FBase {
            primes: chosen,
            divs,
            chunks,
        }
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    pub fn p(&self, idx: usize) -> u64 {
        self.primes[idx]
    }

    pub fn smalls(&self) -> &[u64] {
        if self.len() >= 10 {
            &self.primes[..10]
        } else {
            &self.primes
        }
    }

    /// Exponent vector of n modulo 2 over the factor base, or None when a
    /// residual cofactor survives. A chunk whose primorial is coprime to n
    /// is skipped wholesale; otherwise only the primes dividing the chunk
    /// gcd are divided out.
    pub fn factorization_vector(&self, n: &Uint) -> Option<BitVec> {
        let mut vec = BitVec::zeros(self.primes.len());
        let mut n = *n;
        for (range, prod) in &self.chunks {
            if n.is_one() {
                break;
            }
            let d = arith::gcd(*prod, n);
            if d.is_one() {
                continue;
            }
            for idx in range.clone() {
                let div = &self.divs[idx];
                if div.mod_uint(&d) != 0 {
                    continue;
                }
                loop {
                    let (q, r) = div.divmod_uint(&n);
                    if r != 0 {
                        break;
                    }
                    n = q;
                    vec.set(idx, !vec.get_unchecked(idx));
                }
            }
        }
        if n.is_one() {
            Some(vec)
        } else {
            None
        }
    }
}
