use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use clap::Parser;
use hdrhistogram::Histogram;
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tower::BoxError;
use tower::Layer;
use tower::Service;
use tower::ServiceExt;
use tower::service_fn;
use tower_window::AdmissionError;
use tower_window::AdmissionLayer;
use window_limit::LimiterConfig;
use window_limit::TimingPolicy;

/// Hammer an admission controlled service and report what got through.
#[derive(Debug, Parser)]
struct Args {
    /// Requests admitted per sliding second
    #[arg(long, default_value_t = 10_000)]
    max_rate: u64,

    /// Slices per second of the sliding window
    #[arg(long, default_value_t = 100)]
    frames_per_second: u32,

    /// Concurrent client tasks
    #[arg(long, default_value_t = 64)]
    clients: usize,

    /// How long to keep sending, e.g. "3s" or "500ms"
    #[arg(long, value_parser = humantime::parse_duration, default_value = "3s")]
    duration: Duration,

    /// Pause between two requests of one client
    #[arg(long, value_parser = humantime::parse_duration, default_value = "100us")]
    pause: Duration,

    /// Sleep between ticks instead of spinning
    #[arg(long)]
    sleepy: bool,
}

async fn mock_handler(_req: ()) -> Result<&'static str, BoxError> {
    Ok("success")
}

#[derive(Default)]
struct Outcome {
    admitted: u64,
    rejected: u64,
    failed: u64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter("info,window_limit=debug")
        .init();
    let args = Args::parse();

    let timing = if args.sleepy {
        TimingPolicy::Sleep {
            slack: Duration::from_micros(200),
        }
    } else {
        TimingPolicy::Spin
    };
    let mut controller = LimiterConfig::new(args.max_rate, args.frames_per_second)
        .with_timing(timing)
        .build()?;
    controller.start()?;
    let limiter = Arc::new(controller);

    let svc = AdmissionLayer::new(limiter.clone()).layer(service_fn(mock_handler));
    let barrier = Arc::new(Barrier::new(args.clients));
    let mut tasks = JoinSet::new();

    let start = Instant::now();
    for _ in 0..args.clients {
        let mut local_svc = svc.clone();
        let bar = barrier.clone();
        let (run_for, pause) = (args.duration, args.pause);
        tasks.spawn(async move {
            let mut outcome = Outcome::default();
            let mut hist = Histogram::<u64>::new_with_bounds(1, 60_000_000_000, 3)?;
            bar.wait().await;

            let began = Instant::now();
            while began.elapsed() < run_for {
                let req_start = Instant::now();
                let result = match local_svc.ready().await {
                    Ok(ready_svc) => ready_svc.call(()).await,
                    Err(e) => Err(e),
                };
                hist.record(req_start.elapsed().as_nanos() as u64)?;

                match result.map_err(AdmissionError::from_boxed) {
                    Ok(_) => outcome.admitted += 1,
                    Err(AdmissionError::Rejected { .. }) => outcome.rejected += 1,
                    Err(AdmissionError::Inner(_)) => outcome.failed += 1,
                }
                tokio::time::sleep(pause).await;
            }
            Ok::<_, BoxError>((outcome, hist))
        });
    }

    let mut total = Outcome::default();
    let mut hist = Histogram::<u64>::new_with_bounds(1, 60_000_000_000, 3)?;
    while let Some(task) = tasks.join_next().await {
        let (outcome, local) = task??;
        total.admitted += outcome.admitted;
        total.rejected += outcome.rejected;
        total.failed += outcome.failed;
        hist.add(local)?;
    }
    let elapsed = start.elapsed();

    println!("--- Sliding Window Admission ---");
    println!("Budget:          {} req/s in {} slices", args.max_rate, args.frames_per_second);
    println!("Total Duration:  {:.2?}", elapsed);
    println!(
        "Admitted:        {} ({:.2} req/sec)",
        total.admitted,
        total.admitted as f64 / elapsed.as_secs_f64()
    );
    println!("Rejected:        {}", total.rejected);
    if total.failed > 0 {
        println!("Failed:          {}", total.failed);
    }
    println!("Window ticks:    {}", limiter.tick_count());
    println!("P50 (Decision):  {}ns", hist.value_at_quantile(0.5));
    println!("P99 (Decision):  {}ns", hist.value_at_quantile(0.99));

    Ok(())
}
