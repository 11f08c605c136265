//! Parallel Quicksort Comparison Harness
//!
//! This application compares the two-phase parallel quicksort against the
//! standard library sort and rayon's parallel sort on random `u32` data.

use parallel_quicksort::{sort_keys, SortOrder};
use rand::Rng;
use rayon::prelude::*;
use std::time::Instant;

/// Default array size for benchmarking
const DEFAULT_ARRAY_SIZE: usize = 1 << 20; // 1 million elements

fn main() {
    println!("Parallel Quicksort");
    println!("==================\n");

    // Parse command line arguments for array size
    let args: Vec<String> = std::env::args().collect();
    let array_size = if args.len() > 1 {
        args[1].parse().unwrap_or(DEFAULT_ARRAY_SIZE)
    } else {
        DEFAULT_ARRAY_SIZE
    };

    println!(
        "Array size: {} elements ({} MB)",
        array_size,
        array_size * 4 / 1_000_000
    );

    // Generate random data
    println!("\nGenerating random data...");
    let mut rng = rand::thread_rng();
    let data: Vec<u32> = (0..array_size).map(|_| rng.gen()).collect();

    // Single-threaded baseline
    println!("\n--- CPU Sorting (std::sort unstable) ---");
    let mut cpu_data = data.clone();
    let cpu_start = Instant::now();
    cpu_data.sort_unstable();
    let cpu_duration = cpu_start.elapsed();
    println!(
        "CPU sort time: {:.3} ms",
        cpu_duration.as_secs_f64() * 1000.0
    );
    assert!(is_sorted(&cpu_data), "CPU sort failed!");

    // Parallel comparison sort baseline
    println!("\n--- Parallel CPU Sorting (rayon pdqsort) ---");
    let mut par_data = data.clone();
    let par_start = Instant::now();
    par_data.par_sort_unstable();
    let par_duration = par_start.elapsed();
    println!(
        "Parallel sort time: {:.3} ms",
        par_duration.as_secs_f64() * 1000.0
    );

    // Two-phase parallel quicksort
    println!("\n--- Parallel Quicksort (two-phase partition) ---");
    let mut qs_data = data.clone();
    let qs_start = Instant::now();
    match sort_keys(&mut qs_data, SortOrder::Ascending) {
        Ok(()) => {
            let qs_duration = qs_start.elapsed();
            println!(
                "Parallel quicksort time: {:.3} ms",
                qs_duration.as_secs_f64() * 1000.0
            );

            if is_sorted(&qs_data) {
                println!("Parallel quicksort verified: OK");

                if qs_data == cpu_data {
                    println!("Results match CPU sort: OK");
                } else {
                    println!("WARNING: Results differ from CPU sort!");
                }

                println!("\n--- Performance Comparison ---");
                let speedup = cpu_duration.as_secs_f64() / qs_duration.as_secs_f64();
                if speedup > 1.0 {
                    println!("Parallel quicksort is {:.2}x faster than CPU", speedup);
                } else {
                    println!(
                        "CPU is {:.2}x faster than parallel quicksort",
                        1.0 / speedup
                    );
                }
            } else {
                println!("ERROR: Parallel quicksort failed verification!");
            }
        }
        Err(e) => {
            println!("Parallel quicksort error: {}", e);
        }
    }

    // Run multiple sizes for comprehensive benchmark
    if args.len() > 2 && args[2] == "--benchmark" {
        run_benchmark();
    }
}

/// Check if a slice is sorted in ascending order.
fn is_sorted(data: &[u32]) -> bool {
    data.windows(2).all(|w| w[0] <= w[1])
}

/// Run benchmarks across multiple array sizes
fn run_benchmark() {
    println!("\n\n====================================");
    println!("Running comprehensive benchmark...");
    println!("====================================\n");

    let sizes: Vec<usize> = vec![
        1 << 10, // 1K
        1 << 12, // 4K
        1 << 14, // 16K
        1 << 16, // 64K
        1 << 18, // 256K
        1 << 20, // 1M
        1 << 22, // 4M
        1 << 24, // 16M
    ];

    println!(
        "{:>12} | {:>12} | {:>14} | {:>10}",
        "Size", "CPU (ms)", "Quicksort (ms)", "Speedup"
    );
    println!("{:-<12}-+-{:-<12}-+-{:-<14}-+-{:-<10}", "", "", "", "");

    let mut rng = rand::thread_rng();

    for &size in &sizes {
        let data: Vec<u32> = (0..size).map(|_| rng.gen()).collect();

        // CPU benchmark
        let mut cpu_data = data.clone();
        let cpu_start = Instant::now();
        cpu_data.sort_unstable();
        let cpu_ms = cpu_start.elapsed().as_secs_f64() * 1000.0;

        // Parallel quicksort benchmark
        let mut qs_data = data.clone();
        let qs_start = Instant::now();
        let (qs_ms, speedup) =
            if sort_keys(&mut qs_data, SortOrder::Ascending).is_ok() && is_sorted(&qs_data) {
                let qs_ms = qs_start.elapsed().as_secs_f64() * 1000.0;
                let speedup = cpu_ms / qs_ms;
                (format!("{:.3}", qs_ms), format!("{:.2}x", speedup))
            } else {
                ("ERROR".to_string(), "N/A".to_string())
            };

        println!(
            "{:>12} | {:>12.3} | {:>14} | {:>10}",
            size, cpu_ms, qs_ms, speedup
        );
    }
}
