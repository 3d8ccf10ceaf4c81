use std::path::PathBuf;
use std::process::exit;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{debug, error, info};

use pinpool::{PoolConfig, Priority, ResultHandle, Result, ThreadPool};

#[derive(Parser)]
#[command(
    name = "pinpool",
    version,
    about = "Runs a batch of demo tasks on a pinned, prioritized thread pool"
)]
struct Cli {
    /// Number of worker threads [default: number of CPUs]
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Comma-separated logical cores to pin workers to
    #[arg(long, value_delimiter = ',', value_name = "CORES")]
    cores: Option<Vec<usize>>,

    /// Worker priority: low, normal, high, realtime or a raw OS value
    #[arg(long, value_name = "PRIORITY", allow_hyphen_values = true)]
    priority: Option<Priority>,

    /// Number of tasks to submit
    #[arg(long, default_value_t = 8, value_name = "N")]
    tasks: u64,

    /// Time each task sleeps, in milliseconds
    #[arg(long, default_value_t = 0, value_name = "MS")]
    sleep_ms: u64,

    /// JSON pool configuration; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    info!("pinpool {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Workers: {}, cores: {:?}, priority: {}",
        config.threads, config.cores, config.priority
    );

    let pool = ThreadPool::with_config(config)?;
    let sleep = Duration::from_millis(cli.sleep_ms);

    let handles = (0..cli.tasks)
        .map(|i| {
            pool.submit(move || {
                debug!("hello {i}");
                thread::sleep(sleep);
                debug!("world {i}");
                i * i
            })
        })
        .collect::<Result<Vec<_>>>()?;

    pool.drain();
    info!("All {} tasks finished", cli.tasks);

    let results = handles
        .into_iter()
        .map(ResultHandle::join)
        .collect::<Result<Vec<_>>>()?;
    let line: Vec<String> = results.iter().map(u64::to_string).collect();
    println!("{}", line.join(" "));

    pool.shutdown();
    Ok(())
}

/// Starts from the config file (or defaults) and applies command-line overrides.
fn resolve_config(cli: &Cli) -> Result<PoolConfig> {
    let mut config = match &cli.config {
        Some(path) => PoolConfig::from_path(path)?,
        None => PoolConfig::default(),
    };

    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    if let Some(cores) = &cli.cores {
        config.cores = cores.clone();
    }
    if let Some(priority) = cli.priority {
        config.priority = priority;
    }

    Ok(config)
}
