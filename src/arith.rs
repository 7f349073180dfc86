// Copyright 2024 The gearsieve authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! A collection of functions working on multi-precision
//! and/or modular arithmetic.

use std::ops::{Shl, Shr};
use std::str::FromStr;

pub use num_integer::sqrt as isqrt;
use num_integer::Integer;
use num_traits::{One, ToPrimitive};

pub use bnum::types::U1024;
use bnum::BUint;

/// Trait for types that can be used for integer-like arithmetic.
pub trait Num:
    Integer
    + One
    + Copy
    + Clone
    + Shl<usize, Output = Self>
    + Shr<usize, Output = Self>
    + From<u64>
    + FromStr
{
    fn bits(&self) -> u32;

    fn to_u64(&self) -> Option<u64>;
    fn low_u64(&self) -> u64;
}

impl Num for u64 {
    fn bits(&self) -> u32 {
        u64::BITS - u64::leading_zeros(*self)
    }

    fn to_u64(&self) -> Option<u64> {
        Some(*self)
    }
    fn low_u64(&self) -> u64 {
        *self
    }
}

impl<const N: usize> Num for BUint<N> {
    fn bits(&self) -> u32 {
        Self::bits(self)
    }

    fn to_u64(&self) -> Option<u64> {
        ToPrimitive::to_u64(self)
    }

    fn low_u64(&self) -> u64 {
        self.digits()[0]
    }
}

/// Greatest common divisor, by the plain Euclidean loop.
/// gcd(a, 0) == a so either argument may be zero.
pub fn gcd<T: Num>(a: T, b: T) -> T {
    let (mut a, mut b) = (a, b);
    while !b.is_zero() {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Modular exponentiation by square-and-multiply.
pub fn pow_mod<T: Num>(n: T, k: T, p: T) -> T {
    let mut res: T = T::one();
    let zero = T::zero();
    let mut nn = n % p;
    let mut k = k;
    while k > zero {
        if k.low_u64() % 2 == 1 {
            res = (res * nn) % p;
        }
        nn = (nn * nn) % p;
        k = k >> 1;
    }
    res
}

fn mulmod<T: Num>(a: T, b: T, p: T) -> T {
    (a * b) % p
}

/// Square root modulo a prime number p
pub fn sqrt_mod<N, T: Num>(n: N, p: T) -> Option<T>
where
    N: std::ops::Rem<T, Output = T>,
{
    let n: T = n % p;
    if n == T::zero() {
        return Some(T::zero());
    }
    let one = T::one();
    if p == T::from(2) {
        Some(n % p)
    } else if p % T::from(4) == T::from(3) {
        // n = r^2
        // n^((p+1)/2) = r^((p+1)/4) = n^1/2
        let r = pow_mod(n, (p >> 2) + one, p);
        if mulmod(r, r, p) == n {
            Some(r)
        } else {
            None
        }
    } else {
        // p>>1 is (p-1)/2
        if pow_mod(n, p >> 1, p) != one {
            None
        } else {
            let exp2 = (p.low_u64() - 1).trailing_zeros();
            assert!(exp2 < 24);
            // Simplified Tonelli-Shanks
            // O(2^k log(p)) where p-1 = q*2^k
            let mut q = p >> 1;
            while q.low_u64() % 2 == 0 {
                q = q >> 1
            }
            let q1 = (q >> 1) + one; // (q+1)/2
            for k in 1..(1 << 24) {
                // n*k*k has order q with probability q/(p-1)
                // Some k must satisfy that property.
                let k = T::from(k);
                let nk = mulmod(mulmod(n, k, p), k, p);
                let root = pow_mod(nk, q1, p);
                if mulmod(root, root, p) == nk {
                    return Some(mulmod(root, pow_mod(k, p - T::from(2), p), p));
                }
            }
            unreachable!("sqrt_mod fail")
        }
    }
}

/// A precomputed structure to divide by a static prime number
/// via Barrett reduction. The 64-bit multiplier can only exactly
/// divide 63-bit integers, and the multi-word path needs p*p to
/// fit a word, so p must stay below 32 bits.
#[derive(Clone, Copy, Debug)]
pub struct Divider64 {
    pub p: u64,
    m64: u64,
    s64: u32,
}

impl Divider64 {
    // Compute m and s such that x/p = (x*m) >> s
    // p is assumed to be a prime number.
    //
    // https://gmplib.org/~tege/divcnst-pldi94.pdf
    pub const fn new(p: u64) -> Self {
        // Compute 2^127 / p
        let m127 = (1_u128 << 127) / p as u128;
        let sz = u128::BITS - u128::leading_zeros(m127);
        let m64 = (m127 >> (sz - 64)) as u64 + 1; // 64 bits
        let s64 = 127 + 64 - sz; // m64 >> s64 = m127 >> 127
        Divider64 { p, m64, s64 }
    }

    #[inline]
    pub fn divmod64(&self, n: u64) -> (u64, u64) {
        let nm = (n as u128) * (self.m64 as u128);
        let q = (nm >> self.s64) as u64;
        let qp = q * self.p;
        if qp > n {
            (q - 1, self.p - (qp - n))
        } else {
            (q, n - qp)
        }
    }

    pub fn divmod_uint<const N: usize>(&self, n: &BUint<N>) -> (BUint<N>, u64) {
        if self.p == 2 {
            return (n >> 1, n.digits()[0] & 1);
        }
        let mut digits = *n.digits();
        let rem = self.divmod_uint_inplace(&mut digits);
        (BUint::from_digits(digits), rem)
    }

    pub fn mod_uint<const N: usize>(&self, n: &BUint<N>) -> u64 {
        if self.p == 2 {
            return n.digits()[0] & 1;
        }
        let mut digits = *n.digits();
        self.divmod_uint_inplace(&mut digits)
    }

    #[inline]
    fn divmod_uint_inplace<const N: usize>(&self, digits: &mut [u64; N]) -> u64 {
        // Remainder of 2^64 by p, to propagate carries downward.
        let r64 = ((1_u128 << 64) % (self.p as u128)) as u64;
        // The actual quotient of 2^64 by p.
        let m64 = (self.m64 - 1) >> (self.s64 - 64);
        let mut carry: u64 = 0;
        for i in 0..N {
            let i = N - 1 - i;
            let d = digits[i];
            if d == 0 && carry == 0 {
                continue;
            }
            let (mut q, r) = self.divmod64(d);
            debug_assert!(q == d / self.p);
            if carry != 0 {
                q += carry * m64;
                let (cq, cr) = self.divmod64(carry * r64 + r);
                q += cq;
                carry = cr;
            } else {
                carry = r;
            }
            digits[i] = q;
        }
        carry
    }
}
