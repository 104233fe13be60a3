use exportbench::bench::{BenchConfig, Benchmark, MetricsProvider, Suite};
use exportbench::dataset::generate_applicants;
use exportbench::logging::init_logger;
use std::io::Write;

#[cfg(not(feature = "dhat-heap"))]
#[global_allocator]
static ALLOCATOR: exportbench::bench::TrackingAllocator =
    exportbench::bench::TrackingAllocator::system();

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    init_logger();

    let config = BenchConfig::default();

    #[cfg(not(feature = "dhat-heap"))]
    let metrics = exportbench::bench::TrackingMetrics::new(&ALLOCATOR);
    #[cfg(feature = "dhat-heap")]
    let metrics = exportbench::bench::DhatMetrics;

    run(&config, metrics)
}

fn run<M: MetricsProvider>(
    config: &BenchConfig,
    metrics: M,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = generate_applicants(config.record_count);

    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "Starting export benchmarks with {} records...",
        config.record_count
    )?;

    let mut bench = Benchmark::new(metrics).with_memory_figure(config.memory_figure);
    let outcomes = Suite::standard(config).run(&mut bench, &data, &mut out)?;

    writeln!(out, "\nProcess memory after all runs:")?;
    writeln!(out, "{}", bench.metrics_mut().snapshot())?;

    let failed = outcomes.iter().filter(|o| !o.is_completed()).count();
    tracing::info!(
        completed = outcomes.len() - failed,
        failed,
        "benchmarks finished"
    );
    Ok(())
}
