use anyhow::bail;
use clap::{Parser, ValueEnum};
use lineworker::{
    DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY, DEFAULT_MAX_QUEUE_SIZE, DEFAULT_MIN_QUEUE_SIZE,
    LineWorkerConfig,
};
use std::path::PathBuf;

/// Output format of the log layer.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human readable.
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Runtime configuration for the `lineworker` binary.
///
/// Every option can also be set through its `LINEWORKER_*` environment
/// variable or a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "lineworker",
    version,
    about = "Run a command for every line of a file or stdin, with bounded concurrency",
    after_help = "Without a COMMAND, each line is echoed to stdout."
)]
pub struct CliArgs {
    /// File to read lines from. Reads stdin when absent or `-`.
    ///
    /// Environment variable: `LINEWORKER_INPUT`
    #[arg(short, long, env = "LINEWORKER_INPUT")]
    pub input: Option<PathBuf>,

    /// Maximum number of lines processed at the same time.
    ///
    /// Environment variable: `LINEWORKER_CONCURRENCY`
    #[arg(short = 'j', long, env = "LINEWORKER_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Number of lines allowed to wait for a free slot before reading pauses.
    ///
    /// Environment variable: `LINEWORKER_MAX_QUEUE_SIZE`
    #[arg(long, env = "LINEWORKER_MAX_QUEUE_SIZE", default_value_t = DEFAULT_MAX_QUEUE_SIZE)]
    pub max_queue_size: usize,

    /// Advisory low-water mark for the queue. Only reported in logs.
    ///
    /// Environment variable: `LINEWORKER_MIN_QUEUE_SIZE`
    #[arg(long, env = "LINEWORKER_MIN_QUEUE_SIZE", default_value_t = DEFAULT_MIN_QUEUE_SIZE)]
    pub min_queue_size: usize,

    /// Stop after this many lines, even if the input has more.
    ///
    /// Environment variable: `LINEWORKER_MAX_LINES`
    #[arg(short = 'n', long, env = "LINEWORKER_MAX_LINES")]
    pub max_lines: Option<u64>,

    /// Abort if a single refill pass iterates more than this many times.
    ///
    /// Environment variable: `LINEWORKER_SAFETY`
    #[arg(long, env = "LINEWORKER_SAFETY")]
    pub safety: Option<usize>,

    /// Drop empty lines instead of processing them.
    ///
    /// Environment variable: `LINEWORKER_SKIP_EMPTY_LINES`
    #[arg(long, env = "LINEWORKER_SKIP_EMPTY_LINES", default_value_t = false)]
    pub skip_empty_lines: bool,

    /// Keep going after a failed line instead of stopping the run.
    ///
    /// Environment variable: `LINEWORKER_KEEP_GOING`
    #[arg(short, long, env = "LINEWORKER_KEEP_GOING", default_value_t = false)]
    pub keep_going: bool,

    /// Number of bytes requested from the input per read.
    ///
    /// Environment variable: `LINEWORKER_CHUNK_SIZE`
    #[arg(long, env = "LINEWORKER_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Log output format. Logs are written to stderr; filter with `RUST_LOG`.
    ///
    /// Environment variable: `LINEWORKER_LOG_FORMAT`
    #[arg(long, env = "LINEWORKER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Command to run per line. The line is appended as its last argument.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Where lines are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

/// A program and its leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: Input,
    pub chunk_size: usize,
    pub log_format: LogFormat,
    pub command: Option<CommandSpec>,
    pub lines: LineWorkerConfig,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.chunk_size == 0 {
            bail!("LINEWORKER_CHUNK_SIZE must be greater than 0");
        }
        if args.safety == Some(0) {
            bail!("LINEWORKER_SAFETY must be greater than 0");
        }

        let lines = LineWorkerConfig::default()
            .with_concurrency(args.concurrency)
            .with_max_queue_size(args.max_queue_size)
            .with_min_queue_size(args.min_queue_size)
            .with_max_lines(args.max_lines)
            .with_safety(args.safety)
            .with_skip_empty_lines(args.skip_empty_lines)
            .with_halt_on_worker_error(!args.keep_going);
        lines.validate()?;

        let input = match args.input {
            Some(path) if path.as_os_str() != "-" => Input::File(path),
            _ => Input::Stdin,
        };

        let mut command = args.command.into_iter();
        let command = command.next().map(|program| CommandSpec {
            program,
            args: command.collect(),
        });

        Ok(Self {
            input,
            chunk_size: args.chunk_size,
            log_format: args.log_format,
            command,
            lines,
        })
    }
}
