use clap::{Parser, Subcommand};
use sentipool::config::{load_config, load_user_config};
use sentipool::{HealthProbe, LanguageCode, PoolConfig, PoolError, WorkerPool};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Score text sentiment through a pool of local engine processes
#[derive(Parser)]
#[command(name = "sentipool")]
#[command(version)]
#[command(about = "Score text sentiment through a pool of local engine processes")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: $XDG_CONFIG_HOME/sentipool/sentipool.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Two-letter language code of the engine data directory
    #[arg(long, short, default_value = "EN")]
    language: LanguageCode,

    /// Worker count; negative values are relative to the CPU count
    #[arg(long, allow_negative_numbers = true)]
    workers: Option<i32>,

    /// First port of the pool
    #[arg(long)]
    start_port: Option<u16>,

    /// Lines sent per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum concurrent requests per batch
    #[arg(long)]
    concurrency: Option<usize>,

    /// Directory holding the language data directories
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Input files, one text per line (default: stdin)
    files: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether an engine answers on a port
    Probe {
        #[arg(long)]
        port: u16,
    },
}

impl Cli {
    fn pool_config(&self) -> Result<PoolConfig, PoolError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => load_user_config()?,
        };
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(start_port) = self.start_port {
            config.start_port = start_port;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.concurrency.is_some() {
            config.concurrency = self.concurrency;
        }
        if let Some(dir) = &self.working_dir {
            config.engine.working_dir = Some(dir.clone());
        }
        Ok(config)
    }
}

type LineResults = Box<dyn Iterator<Item = io::Result<String>>>;

/// Lines of stdin, or of every file in turn, read on demand.
fn input_lines(files: &[PathBuf]) -> LineResults {
    if files.is_empty() {
        return Box::new(io::stdin().lock().lines());
    }
    let files = files.to_vec();
    Box::new(files.into_iter().flat_map(|path| -> LineResults {
        match File::open(&path) {
            Ok(file) => Box::new(BufReader::new(file).lines()),
            Err(e) => Box::new(std::iter::once(Err(io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            )))),
        }
    }))
}

/// Yield lines until the first read error, which is parked in `error`.
fn until_read_error<'a>(
    mut lines: impl Iterator<Item = io::Result<String>> + 'a,
    error: &'a mut Option<io::Error>,
) -> impl Iterator<Item = String> + 'a {
    std::iter::from_fn(move || match lines.next()? {
        Ok(line) => Some(line),
        Err(e) => {
            *error = Some(e);
            None
        }
    })
}

fn stdout_error(e: io::Error) -> PoolError {
    PoolError::internal(format!("stdout: {e}"))
}

fn score_lines(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.pool_config()?;
    let mut read_error = None;

    WorkerPool::scoped(cli.language, config, |pool| {
        let mut out = BufWriter::new(io::stdout().lock());
        let mut total = 0usize;
        let mut failed = 0usize;
        let lines = until_read_error(input_lines(&cli.files), &mut read_error);
        for result in pool.run_stream(lines) {
            total += 1;
            match result {
                Ok(score) => {
                    writeln!(out, "{} {} {}", score.positive, score.negative, score.neutral)
                        .map_err(stdout_error)?;
                }
                Err(e @ PoolError::Item { .. }) => {
                    failed += 1;
                    log::warn!(target: "sentipool::cli", "{}", e);
                    writeln!(out).map_err(stdout_error)?;
                }
                Err(e) => return Err(e),
            }
        }
        out.flush().map_err(stdout_error)?;
        if failed > 0 {
            eprintln!("{} of {} lines could not be scored", failed, total);
        }
        Ok(())
    })?;

    match read_error {
        Some(e) => Err(format!("reading input: {e}").into()),
        None => Ok(()),
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Probe { port }) => {
            let probe = match cli.pool_config() {
                Ok(config) => HealthProbe::new(&config.client),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            if probe.exists(*port) {
                println!("port {} WORKS", port);
                ExitCode::SUCCESS
            } else {
                println!("port {} FAILED", port);
                ExitCode::FAILURE
            }
        }
        None => match score_lines(&cli) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}
