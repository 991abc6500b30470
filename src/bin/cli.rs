//! SortKV CLI
//!
//! Command-line interface operating directly on a pool directory.

use std::process::ExitCode;

use clap::{Args as ClapArgs, Parser, Subcommand};
use sortkv::{Config, Engine, SortKvError, Status};
use tracing_subscriber::{fmt, EnvFilter};

/// SortKV CLI
#[derive(Parser, Debug)]
#[command(name = "sortkv-cli")]
#[command(about = "CLI for the SortKV embedded key-value store")]
#[command(version)]
struct Args {
    /// Pool directory
    #[arg(short, long, default_value = "./sortkv_data")]
    data_dir: String,

    /// Pool capacity in MB
    #[arg(long, default_value = "64")]
    capacity_mb: u64,

    /// Fail instead of creating a pool when none exists
    #[arg(long)]
    no_create: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Check whether a key exists
    Exists {
        /// The key to check
        key: String,
    },

    /// Print the number of entries
    Count,

    /// List entries in ascending order
    Scan(ScanArgs),

    /// Print pool usage
    Stats,
}

#[derive(ClapArgs, Debug)]
struct ScanArgs {
    #[command(flatten)]
    range: ScanRange,

    /// Stop after N entries
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(ClapArgs, Debug)]
#[group(multiple = false)]
struct ScanRange {
    /// Keys strictly greater than KEY
    #[arg(long, value_name = "KEY")]
    above: Option<String>,

    /// Keys greater than or equal to KEY
    #[arg(long, value_name = "KEY")]
    equal_above: Option<String>,

    /// Keys less than or equal to KEY
    #[arg(long, value_name = "KEY")]
    equal_below: Option<String>,

    /// Keys strictly less than KEY
    #[arg(long, value_name = "KEY")]
    below: Option<String>,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,sortkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut engine = match build_config(&args).and_then(Engine::open) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            return ExitCode::from(1);
        }
    };

    let code = match run(&mut engine, args.command) {
        Ok(status) if status.is_not_found() => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(1)
        }
    };

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        return ExitCode::from(1);
    }

    code
}

fn build_config(args: &Args) -> sortkv::Result<Config> {
    let capacity = args.capacity_mb.checked_mul(1024 * 1024).ok_or_else(|| {
        SortKvError::Config(format!("--capacity-mb {} is too large", args.capacity_mb))
    })?;

    Ok(Config::builder()
        .data_dir(&args.data_dir)
        .pool_capacity(capacity)
        .create_if_missing(!args.no_create)
        .build())
}

fn run(engine: &mut Engine, command: Commands) -> sortkv::Result<Status> {
    let status = match command {
        Commands::Get { key } => {
            engine.get(key.as_bytes(), |v| println!("{}", String::from_utf8_lossy(v)))
        }
        Commands::Put { key, value } => {
            engine.put(key.as_bytes(), value.as_bytes())?;
            Status::Ok
        }
        Commands::Del { key } => engine.remove(key.as_bytes())?,
        Commands::Exists { key } => {
            let status = engine.exists(key.as_bytes());
            println!("{}", status.is_ok());
            status
        }
        Commands::Count => {
            println!("{}", engine.count_all());
            Status::Ok
        }
        Commands::Scan(scan) => run_scan(engine, scan),
        Commands::Stats => {
            let stats = engine.pool_stats();
            println!("engine:     {}", engine.name());
            println!("entries:    {}", engine.count_all());
            println!("used bytes: {}", stats.used_bytes);
            println!("capacity:   {}", stats.capacity);
            println!("lsn:        {}", stats.lsn);
            println!("log bytes:  {}", stats.log_bytes);
            Status::Ok
        }
    };

    Ok(status)
}

fn run_scan(engine: &Engine, scan: ScanArgs) -> Status {
    let limit = scan.limit.unwrap_or(usize::MAX);
    let mut printed = 0usize;
    let print = |k: &[u8], v: &[u8]| -> i32 {
        if printed >= limit {
            return 1;
        }
        println!(
            "{}\t{}",
            String::from_utf8_lossy(k),
            String::from_utf8_lossy(v)
        );
        printed += 1;
        0
    };

    let range = scan.range;
    let status = if let Some(key) = range.above {
        engine.get_above(key.as_bytes(), print)
    } else if let Some(key) = range.equal_above {
        engine.get_equal_above(key.as_bytes(), print)
    } else if let Some(key) = range.equal_below {
        engine.get_equal_below(key.as_bytes(), print)
    } else if let Some(key) = range.below {
        engine.get_below(key.as_bytes(), print)
    } else {
        engine.get_all(print)
    };

    // Hitting --limit is a normal end of listing
    match status {
        Status::StoppedByCallback => Status::Ok,
        other => other,
    }
}
