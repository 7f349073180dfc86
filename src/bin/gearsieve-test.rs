// Copyright 2024 The gearsieve authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Random semiprime testing.

use std::time::Instant;

use rand::{self, Rng};

use gearsieve::{factor, sieve, Preferences, Uint};

fn main() {
    let arg = arguments::parse(std::env::args()).unwrap();
    if arg.get::<bool>("help").is_some() {
        eprintln!("Usage: gearsieve-test [OPTIONS]");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --help       show this help");
        eprintln!("  --bits B     semiprime size in bits (max 62, default 40)");
        eprintln!("  --count C    how many inputs to factor (default 20)");
        eprintln!("  --csqr       enable the congruence-of-squares stage");
        eprintln!("  --gauss      full Gaussian elimination (implies --csqr)");
        return;
    }
    let bits = arg.get::<u32>("bits").unwrap_or(40).clamp(16, 62);
    let count = arg.get::<u64>("count").unwrap_or(20);
    let gauss = arg.get::<bool>("gauss").is_some();
    let csqr = gauss || arg.get::<bool>("csqr").is_some();

    // Enough primes to certify factors below 2^31.
    let small = sieve::primes_up_to(1 << 16);
    let mut rng = rand::thread_rng();
    let mut random_prime = |b: u32| -> u64 {
        loop {
            let c: u64 = (rng.gen::<u64>() >> (64 - b)) | (1 << (b - 1)) | 1;
            if small.iter().take_while(|&&p| p * p <= c).all(|&p| c % p != 0) {
                return c;
            }
        }
    };

    let prefs = Preferences {
        // Force the sweep: keep the trial stage well below the factors.
        trial_division_level: 1 << 10,
        use_congruence_of_squares: csqr,
        use_gauss_elimination: gauss,
        ..Preferences::default()
    };
    let t0 = Instant::now();
    for i in 0..count {
        let p = random_prime(bits / 2);
        let q = random_prime(bits - bits / 2);
        let n = Uint::from(p) * Uint::from(q);
        let t = Instant::now();
        let d = factor(n, &prefs);
        assert!(
            d == Uint::from(p) || d == Uint::from(q),
            "wrong divisor {} for {} * {}",
            d,
            p,
            q
        );
        eprintln!(
            "{}: {} = {} * {} ({:.3}s)",
            i,
            n,
            p,
            q,
            t.elapsed().as_secs_f64()
        );
    }
    eprintln!(
        "Factored {} semiprimes of {} bits in {:.3}s",
        count,
        bits,
        t0.elapsed().as_secs_f64()
    );
}
