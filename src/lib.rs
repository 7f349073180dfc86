// Copyright 2024 The gearsieve authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Find a single nontrivial factor of a positive integer.
//!
//! Two cooperating engines share one residue sweep: a wheel/gear-factorized
//! "reverse trial division" walking the integers coprime to the first few
//! primes up to sqrt(N), and an optional congruence-of-squares stage that
//! recycles the sweep's guesses as candidate smooth numbers, accumulates
//! their exponent vectors modulo 2 and looks for square congruences by
//! Gaussian elimination over GF(2).
//!
//! The search is budgeted: exhausting a node's share of the index space
//! without a hit yields the in-band result 1. Cooperating processes split
//! the space with `node_count`/`node_id` and need no communication.

pub mod arith;
pub mod factorizer;
pub mod fbase;
pub mod matrix;
pub mod params;
pub mod relations;
pub mod sieve;
pub mod wheel;

use std::fmt;
use std::str::FromStr;

use num_traits::One;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::arith::{isqrt, Num};
use crate::factorizer::Factorizer;
use crate::fbase::FBase;
use crate::wheel::Wheel;

// We need to multiply residues modulo the input number, so inputs are
// capped at half this width.
pub type Uint = arith::U1024;

pub const MAX_INPUT_BITS: u32 = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent,
    Info,
    Verbose,
    Debug,
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "silent" | "0" => Ok(Verbosity::Silent),
            "info" | "1" => Ok(Verbosity::Info),
            "verbose" | "2" => Ok(Verbosity::Verbose),
            "debug" | "3" => Ok(Verbosity::Debug),
            _ => Err(format!("invalid verbosity {s}")),
        }
    }
}

/// Search parameters. The defaults factor general inputs; distributed runs
/// set `node_count`/`node_id` to partition the sweep statically.
#[derive(Clone, Debug)]
pub struct Preferences {
    /// Collect smooth congruences instead of pure brute force.
    pub use_congruence_of_squares: bool,
    /// Full Gaussian elimination instead of the duplicate-row heuristic.
    pub use_gauss_elimination: bool,
    pub node_count: u64,
    pub node_id: u64,
    /// Bound for the initial trial-division sieve.
    pub trial_division_level: u64,
    /// Largest prime driving a gear bitset (clamped to [wheel, 47]).
    pub gear_factorization_level: u64,
    /// Largest prime baked into the wheel table (clamped to [1, 11]).
    pub wheel_factorization_level: u64,
    /// Factor base size is multiplier * log2(N).
    pub smoothness_bound_multiplier: f64,
    /// Scales the semi-smooth flush threshold.
    pub batch_size_multiplier: f64,
    /// Worker threads; defaults to the hardware thread count.
    pub threads: Option<usize>,
    /// Seed for the per-worker shuffles, for reproducible runs.
    pub shuffle_seed: Option<u64>,
    pub verbosity: Verbosity,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            use_congruence_of_squares: false,
            use_gauss_elimination: false,
            node_count: 1,
            node_id: 0,
            trial_division_level: 1 << 16,
            gear_factorization_level: 13,
            wheel_factorization_level: 11,
            smoothness_bound_multiplier: 1.0,
            batch_size_multiplier: 1.0,
            threads: None,
            shuffle_seed: None,
            verbosity: Verbosity::Silent,
        }
    }
}

impl Preferences {
    pub fn verbose(&self, v: Verbosity) -> bool {
        self.verbosity >= v
    }
}

#[derive(Debug)]
pub enum Error {
    /// The input is not a positive decimal integer.
    InvalidNumber(String),
    /// The input exceeds the supported width.
    TooLarge(u32),
    /// node_id must be below node_count.
    BadNode { node_id: u64, node_count: u64 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidNumber(s) => write!(f, "invalid number {s:?}"),
            Error::TooLarge(bits) => {
                write!(f, "number has {bits} bits, max is {MAX_INPUT_BITS}")
            }
            Error::BadNode {
                node_id,
                node_count,
            } => write!(f, "node id {node_id} out of range for {node_count} nodes"),
        }
    }
}

impl std::error::Error for Error {}

/// The external entry point: find a nontrivial factor of the decimal
/// number `to_factor`, or "1" when none was found within the node's share
/// of the search space.
pub fn find_a_factor(to_factor: &str, prefs: &Preferences) -> Result<String, Error> {
    let n = Uint::from_str(to_factor.trim())
        .map_err(|_| Error::InvalidNumber(to_factor.into()))?;
    if n.bits() > MAX_INPUT_BITS {
        return Err(Error::TooLarge(n.bits()));
    }
    if prefs.node_count == 0 || prefs.node_id >= prefs.node_count {
        return Err(Error::BadNode {
            node_id: prefs.node_id,
            node_count: prefs.node_count,
        });
    }
    Ok(factor(n, prefs).to_string())
}

/// Typed driver behind `find_a_factor`.
pub fn factor(n: Uint, prefs: &Preferences) -> Uint {
    if n < Uint::from(2u64) {
        return Uint::one();
    }
    let sqrt_n = isqrt(n);
    if sqrt_n * sqrt_n == n {
        return sqrt_n;
    }

    let threads = prefs.threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|t| t.get())
            .unwrap_or(1)
    });
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .expect("cannot create thread pool");

    // Trial division over the sieved primes, in parallel batches of 64.
    let wheel_level = params::clamp_wheel_level(prefs.wheel_factorization_level);
    if wheel_level != prefs.wheel_factorization_level && prefs.verbose(Verbosity::Info) {
        eprintln!(
            "WARNING: wheel factorization level clamped to {}",
            wheel_level
        );
    }
    let gear_level = params::clamp_gear_level(prefs.gear_factorization_level, wheel_level);
    if gear_level != prefs.gear_factorization_level && prefs.verbose(Verbosity::Info) {
        eprintln!("WARNING: gear factorization level clamped to {}", gear_level);
    }
    let trial_bound = match sqrt_n.to_u64() {
        Some(s) => prefs.trial_division_level.min(s),
        None => prefs.trial_division_level,
    };
    let primes = sieve::primes_up_to(trial_bound.max(gear_level));
    let trial_primes = &primes[..primes.partition_point(|&p| p <= trial_bound)];
    if prefs.verbose(Verbosity::Info) {
        eprintln!("Trial division by {} primes", trial_primes.len());
    }
    let found = pool.install(|| {
        trial_primes.par_chunks(64).find_map_any(|chunk| {
            chunk
                .iter()
                .find(|&&p| arith::Divider64::new(p).mod_uint(&n) == 0)
                .copied()
        })
    });
    if let Some(p) = found {
        return Uint::from(p);
    }
    // The trial bound covered sqrt(N): N is prime within this budget.
    let lvl = Uint::from(prefs.trial_division_level);
    if lvl * lvl >= n {
        return Uint::one();
    }

    // Partition the primes into wheel, gear and factor-base ranges.
    let wheel = Wheel::for_level(wheel_level);
    let wheel_prime_count = primes.partition_point(|&p| p <= wheel_level);
    let gear_primes: Vec<u64> = primes
        .iter()
        .copied()
        .take_while(|&p| p <= gear_level)
        .collect();

    let fb_size = params::factor_base_size(&n, prefs.smoothness_bound_multiplier);
    let fbase = FBase::select(&n, &primes, gear_level, fb_size);
    if prefs.use_congruence_of_squares && fbase.len() < fb_size && prefs.verbose(Verbosity::Info) {
        eprintln!(
            "WARNING: factor base truncated to {} of {} primes",
            fbase.len(),
            fb_size
        );
    }
    let con_of_sqr = prefs.use_congruence_of_squares && !fbase.is_empty();
    if prefs.use_congruence_of_squares && fbase.is_empty() && prefs.verbose(Verbosity::Info) {
        eprintln!("WARNING: empty factor base, using brute force only");
    }
    if con_of_sqr && prefs.verbose(Verbosity::Info) {
        eprintln!("Factor base size {} ({:?})", fbase.len(), fbase.smalls());
    }

    // Gear bitsets for the primes past the wheel; the wheel's own primes
    // are handled by the residue table.
    let gears = wheel::gear_seqs(&gear_primes, &n).split_off(wheel_prime_count);

    // One batch spans a full gear period of wheel-coprime residues.
    let mut gear_radius = Uint::one();
    for &p in &gear_primes {
        gear_radius = gear_radius * Uint::from(p);
    }
    let gear_radius = std::cmp::min(gear_radius, n);
    let wheel_entry_count = wheel.coprime_count(&gear_radius).to_u64().unwrap();

    let total_idx = wheel.coprime_count(&sqrt_n);
    let w = Uint::from(wheel_entry_count);
    let total_batches = (total_idx + w - Uint::one()) / w;
    let node_count = Uint::from(prefs.node_count.max(1));
    let per_node = (total_batches + node_count - Uint::one()) / node_count;
    let batch_offset = Uint::from(prefs.node_id) * per_node;
    let batch_end = std::cmp::min(batch_offset + per_node, total_batches);
    let batch_end = std::cmp::max(batch_end, batch_offset);

    let smooth_limit = if prefs.use_gauss_elimination { n } else { sqrt_n };
    let fac = Factorizer::new(
        n,
        sqrt_n,
        wheel,
        batch_offset,
        batch_end,
        wheel_entry_count,
        params::smooth_parts_limit(wheel_entry_count, prefs.batch_size_multiplier),
        smooth_limit,
        fbase,
    );
    if prefs.verbose(Verbosity::Info) {
        eprintln!(
            "Sweeping {} batches of {} residues over {} threads",
            batch_end - batch_offset,
            wheel_entry_count,
            threads
        );
    }

    if !con_of_sqr {
        let result = pool.install(|| {
            (0..threads)
                .into_par_iter()
                .map(|_| {
                    let mut g = gears.clone();
                    fac.brute_force(&mut g)
                })
                .reduce(Uint::one, std::cmp::max)
        });
        return if result > Uint::one() && result < n {
            result
        } else {
            Uint::one()
        };
    }

    // Rounds of sweeping interleaved with linear algebra; workers return
    // after one buffer flush so the matrix is only reshaped while they are
    // all quiescent.
    loop {
        let swept = pool.install(|| {
            (0..threads)
                .into_par_iter()
                .map(|widx| {
                    let mut g = gears.clone();
                    let mut rng = match prefs.shuffle_seed {
                        Some(s) => StdRng::seed_from_u64(s.wrapping_add(widx as u64)),
                        None => StdRng::from_entropy(),
                    };
                    fac.smooth_congruences(&mut g, &mut rng)
                })
                .reduce(Uint::one, std::cmp::max)
        });
        if swept > Uint::one() && swept < n {
            return swept;
        }
        let exhausted = fac.exhausted();
        let found = {
            let mut set = fac.smooths.lock().unwrap();
            if prefs.verbose(Verbosity::Verbose) {
                eprintln!(
                    "Linear algebra over {} rows ({} collected, {} tried)",
                    set.len(),
                    set.n_appended,
                    set.n_struck
                );
            }
            if prefs.use_gauss_elimination {
                let set = &mut *set;
                pool.install(|| matrix::find_factor(set, &n))
            } else {
                matrix::find_duplicate_rows(&mut set, &n)
            }
        };
        if found > Uint::one() && found < n {
            return found;
        }
        if exhausted || !fac.is_running() {
            return Uint::one();
        }
    }
}
