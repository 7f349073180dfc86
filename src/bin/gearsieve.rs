// Copyright 2024 The gearsieve authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Command-line front end for the factoring kernel.

use std::str::FromStr;

use gearsieve::{find_a_factor, Preferences, Verbosity};

fn main() {
    let arg = arguments::parse(std::env::args()).unwrap();
    if arg.get::<bool>("help").is_some() || arg.orphans.len() != 1 {
        eprintln!("Usage: gearsieve [OPTIONS] NUMBER");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --help                 show this help");
        eprintln!("  --csqr                 collect smooth congruences of squares");
        eprintln!("  --gauss                full Gaussian elimination (implies --csqr)");
        eprintln!("  --nodes N --node-id I  static partition over N cooperating nodes");
        eprintln!("  --trial L              trial division bound (default 65536)");
        eprintln!("  --wheel W              wheel factorization level, 1..11");
        eprintln!("  --gear G               gear factorization level, >= wheel");
        eprintln!("  --smooth-mult F        factor base size multiplier");
        eprintln!("  --batch-mult F         semi-smooth flush threshold multiplier");
        eprintln!("  --threads T            worker thread count");
        eprintln!("  --seed S               shuffle seed for reproducible runs");
        eprintln!("  --verbose LEVEL        silent|info|verbose|debug");
        return;
    }
    let mut prefs = Preferences {
        verbosity: Verbosity::Info,
        ..Preferences::default()
    };
    if arg.get::<bool>("csqr").is_some() {
        prefs.use_congruence_of_squares = true;
    }
    if arg.get::<bool>("gauss").is_some() {
        prefs.use_congruence_of_squares = true;
        prefs.use_gauss_elimination = true;
    }
    if let Some(n) = arg.get::<u64>("nodes") {
        prefs.node_count = n;
    }
    if let Some(i) = arg.get::<u64>("node-id") {
        prefs.node_id = i;
    }
    if let Some(l) = arg.get::<u64>("trial") {
        prefs.trial_division_level = l;
    }
    if let Some(w) = arg.get::<u64>("wheel") {
        prefs.wheel_factorization_level = w;
    }
    if let Some(g) = arg.get::<u64>("gear") {
        prefs.gear_factorization_level = g;
    }
    if let Some(m) = arg.get::<f64>("smooth-mult") {
        prefs.smoothness_bound_multiplier = m;
    }
    if let Some(m) = arg.get::<f64>("batch-mult") {
        prefs.batch_size_multiplier = m;
    }
    prefs.threads = arg.get::<usize>("threads");
    prefs.shuffle_seed = arg.get::<u64>("seed");
    if let Some(v) = arg.get::<String>("verbose") {
        match Verbosity::from_str(&v) {
            Ok(v) => prefs.verbosity = v,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }

    match find_a_factor(&arg.orphans[0], &prefs) {
        Ok(d) => println!("{}", d),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
