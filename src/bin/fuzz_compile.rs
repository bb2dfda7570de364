// src/bin/fuzz_compile.rs
// Generate random-but-valid pass bodies, compile each under both backends twice,
// and check that output is deterministic and diagnostic-free.
//   FUZZ_SEED=<u64>    base seed (default: time based)
//   FUZZ_CASES=<n>     number of passes (default 200)
//   FUZZ_LEN=<n>       size knob handed to the generator (default 6)

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Result, bail};
use rand::{SeedableRng, rngs::StdRng};
use shaderlabc::{
    Backend,
    CompileOptions,
    compile_with_diagnostics,
    config::env_usize,
    dev::gen_valid_pass,
};

fn main() -> Result<()> {
    let seed = std::env::var("FUZZ_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });
    let cases = env_usize("FUZZ_CASES", 200);
    let len = env_usize("FUZZ_LEN", 6);
    println!("[fuzz_compile] seed={seed} cases={cases} len={len}");

    let mut rng = StdRng::seed_from_u64(seed);
    let t0 = Instant::now();
    let mut failures = 0usize;
    for case in 0..cases {
        let src = gen_valid_pass(&mut rng, len);
        for backend in Backend::ALL {
            let options = CompileOptions {
                backend,
                ..CompileOptions::default()
            };
            let first = compile_with_diagnostics(&src, &options);
            let second = compile_with_diagnostics(&src, &options);
            let problem = match (&first, &second) {
                (Err(e), _) | (_, Err(e)) => Some(format!("fatal: {e}")),
                (Ok(a), Ok(_)) if !a.diagnostics.is_empty() => {
                    let msgs: Vec<String> = a.diagnostics.iter().map(|d| d.to_string()).collect();
                    Some(msgs.join("; "))
                }
                (Ok(a), Ok(b)) if a.output != b.output => Some("non-deterministic output".into()),
                _ => None,
            };
            if let Some(problem) = problem {
                failures += 1;
                eprintln!("[fuzz_compile] case {case} ({backend}): {problem}\n{src}");
            }
        }
        if (case + 1) % 50 == 0 {
            println!("[fuzz_compile] {} / {cases} cases, {failures} failures", case + 1);
        }
    }
    println!(
        "[fuzz_compile] done: {cases} cases, {failures} failures, {:.2} s",
        t0.elapsed().as_secs_f64()
    );
    if failures > 0 {
        bail!("{failures} failing cases (seed {seed})");
    }
    Ok(())
}
