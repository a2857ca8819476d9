use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use clap::{Parser, ValueEnum};
use hdrhistogram::Histogram;

use keygate::{
    CapacityHint, MaxCount, MaxStoreSize, ReclaimBatch, Tracker, TrackerError, TrackerOptions,
    WindowSeconds,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KeyDist {
    Hot,
    Uniform,
    Skewed,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Mode {
    Max,
    TargetQps,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "keygate-stress", about = "Load test / benchmark harness for keygate")]
struct Args {
    #[arg(long, value_enum, default_value_t = KeyDist::Uniform)]
    key_dist: KeyDist,

    #[arg(long, value_enum, default_value_t = Mode::Max)]
    mode: Mode,

    #[arg(long, default_value_t = 8)]
    threads: usize,

    #[arg(long, default_value_t = 30)]
    duration_s: u64,

    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    window_s: u64,

    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    max_count: u64,

    #[arg(long, default_value_t = 100_000)]
    key_space: usize,

    #[arg(long, default_value_t = 0.8)]
    hot_fraction: f64,

    /// `0` disables the admit-triggered reclamation.
    #[arg(long, default_value_t = 16_384)]
    max_store_size: usize,

    #[arg(
        long,
        default_value_t = 20,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    reclaim_batch: usize,

    /// Also run the periodic reclaim loop at this interval.
    #[arg(long)]
    reclaim_loop_ms: Option<u64>,

    #[arg(long, default_value_t = 100)]
    sample_every: u64,

    #[arg(long)]
    target_qps: Option<u64>,
}

#[derive(Default)]
struct Counts {
    admitted: AtomicU64,
    denied: AtomicU64,
}

fn build_options(args: &Args) -> Result<TrackerOptions, TrackerError> {
    Ok(TrackerOptions {
        max_count: MaxCount::try_from(args.max_count)?,
        window_seconds: WindowSeconds::try_from(args.window_s)?,
        capacity_hint: CapacityHint::try_from(args.key_space.max(1))?,
        max_store_size: MaxStoreSize::from(args.max_store_size),
        reclaim_batch: ReclaimBatch::try_from(args.reclaim_batch)?,
    })
}

fn build_keys(args: &Args) -> Vec<String> {
    let n = match args.key_dist {
        KeyDist::Hot => 1,
        _ => args.key_space.max(1),
    };
    (0..n).map(|i| format!("user_{i}")).collect()
}

fn should_sample(iter: u64, sample_every: u64) -> bool {
    if sample_every <= 1 {
        return true;
    }

    iter.is_multiple_of(sample_every)
}

fn qps_for_now(args: &Args) -> Option<u64> {
    if args.mode == Mode::Max {
        return None;
    }

    args.target_qps
}

fn pick_key<'a>(args: &Args, keys: &'a [String], thread_rng: &mut impl FnMut() -> u64) -> &'a str {
    match args.key_dist {
        KeyDist::Hot => &keys[0],
        KeyDist::Uniform => {
            let idx = (thread_rng() as usize) % keys.len();
            &keys[idx]
        }
        KeyDist::Skewed => {
            let r = (thread_rng() % 10_000) as f64 / 10_000.0;
            if r < args.hot_fraction {
                &keys[0]
            } else {
                let idx = 1 + ((thread_rng() as usize) % (keys.len().saturating_sub(1).max(1)));
                &keys[idx % keys.len()]
            }
        }
    }
}

fn print_results(
    args: &Args,
    elapsed: Duration,
    ops: u64,
    hist: &Histogram<u64>,
    counts: &Counts,
    tracker: &Tracker<String>,
) {
    let ops_s = ops as f64 / elapsed.as_secs_f64();

    println!(
        "threads={} duration_s={} window_s={} max_count={} key_dist={:?} key_space={}",
        args.threads, args.duration_s, args.window_s, args.max_count, args.key_dist, args.key_space
    );
    println!(
        "max_store_size={} reclaim_batch={} reclaim_loop_ms={:?}",
        args.max_store_size, args.reclaim_batch, args.reclaim_loop_ms
    );
    println!(
        "elapsed_s={:.3} ops={} ops_per_s={:.0}",
        elapsed.as_secs_f64(),
        ops,
        ops_s
    );
    println!(
        "admitted={} denied={} tracked_keys={}",
        counts.admitted.load(Ordering::Relaxed),
        counts.denied.load(Ordering::Relaxed),
        tracker.len()
    );
    if !hist.is_empty() {
        println!(
            "lat_us p50={} p95={} p99={} p999={} max={}",
            hist.value_at_quantile(0.50),
            hist.value_at_quantile(0.95),
            hist.value_at_quantile(0.99),
            hist.value_at_quantile(0.999),
            hist.max()
        );
        println!("sample_every={} samples={}", args.sample_every, hist.len());
    } else {
        println!("no latency samples collected");
    }
}

fn main() {
    let args = Args::parse();

    if args.mode == Mode::TargetQps && args.target_qps.is_none() {
        eprintln!("note: --mode target-qps without --target-qps behaves like --mode max");
    }

    let keys = Arc::new(build_keys(&args));
    let options = match build_options(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };
    let tracker: Tracker<String> = Tracker::new(options);

    if let Some(interval_ms) = args.reclaim_loop_ms {
        tracker.run_reclaim_loop_with_interval(interval_ms);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let counts = Arc::new(Counts::default());
    let total_ops = Arc::new(AtomicU64::new(0));

    let started = Instant::now();
    let deadline = started + Duration::from_secs(args.duration_s);

    let mut handles = Vec::with_capacity(args.threads);
    for t in 0..args.threads {
        let tracker = tracker.clone();
        let keys = Arc::clone(&keys);
        let stop = Arc::clone(&stop);
        let counts = Arc::clone(&counts);
        let total_ops = Arc::clone(&total_ops);
        let args = args.clone();

        handles.push(std::thread::spawn(move || {
            let mut hist = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();
            let mut i = 0_u64;
            let mut seed = (t as u64 + 1) * 0x9E37_79B9_7F4A_7C15;
            let mut next_deadline = Instant::now();

            let mut rng_u64 = || {
                // xorshift64*
                seed ^= seed >> 12;
                seed ^= seed << 25;
                seed ^= seed >> 27;
                seed = seed.wrapping_mul(0x2545_F491_4F6C_DD1D);
                seed
            };

            while !stop.load(Ordering::Relaxed) {
                if Instant::now() >= deadline {
                    break;
                }

                if let Some(qps) = qps_for_now(&args) {
                    let per_op_ns = 1_000_000_000u64 / qps.max(1);
                    let now = Instant::now();
                    if now < next_deadline {
                        std::thread::sleep(next_deadline - now);
                    }
                    next_deadline += Duration::from_nanos(per_op_ns);
                }

                i = i.wrapping_add(1);
                let k = pick_key(&args, &keys, &mut rng_u64);
                let sample = should_sample(i, args.sample_every);
                let t0 = if sample { Some(Instant::now()) } else { None };

                let admitted = tracker.try_admit(k);

                if let Some(t0) = t0 {
                    let us = t0.elapsed().as_micros() as u64;
                    let _ = hist.record(us.max(1));
                }

                total_ops.fetch_add(1, Ordering::Relaxed);
                if admitted {
                    counts.admitted.fetch_add(1, Ordering::Relaxed);
                } else {
                    counts.denied.fetch_add(1, Ordering::Relaxed);
                }
            }

            hist
        }));
    }

    std::thread::sleep(Duration::from_secs(args.duration_s));
    stop.store(true, Ordering::Relaxed);

    let mut merged = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();
    for h in handles {
        let hist = h.join().unwrap();
        merged.add(&hist).unwrap();
    }

    tracker.stop_reclaim_loop();

    let elapsed = started.elapsed();
    let ops = total_ops.load(Ordering::Relaxed);
    print_results(&args, elapsed, ops, &merged, &counts, &tracker);
}
