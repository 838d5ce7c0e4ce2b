//! Trellis Command-Line Interface
//!
//! Boots an in-process cluster on the configured endpoints, loads a sample
//! music catalogue and walks through the four table views.
//!
//! # Usage
//!
//! ```bash
//! # Run the four-view tour
//! trellis
//!
//! # Execute a single query
//! trellis -c "SELECT * FROM Album WHERE artistId = 1"
//!
//! # Execute queries from a file, as JSON
//! trellis -o json -f queries.sql
//!
//! # Simulate a failed node
//! trellis --down localhost:10800 -v
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trellis_client::Client;
use trellis_store::MemoryCluster;

mod config;
mod formatter;
mod seed;
mod tour;

use config::CliConfig;
use formatter::{format_rows, OutputFormat, Rows};

/// Trellis command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "trellis",
    version,
    about = "Typed table views over an in-process Trellis cluster",
    long_about = "Starts an in-process cluster on the configured endpoints, loads a sample\n\
                  music catalogue and either runs the four-view tour or executes SQL."
)]
struct Args {
    /// Cluster endpoint (repeatable)
    #[arg(long = "endpoint", value_name = "HOST:PORT", env = "TRELLIS_ENDPOINTS", value_delimiter = ',')]
    endpoints: Vec<String>,

    /// Endpoint to mark unreachable before connecting (repeatable)
    #[arg(long = "down", value_name = "HOST:PORT")]
    down: Vec<String>,

    /// Execute a single SQL query and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Execute SQL queries from file and exit
    #[arg(short = 'f', long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum)]
    output: Option<OutputFormatArg>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Configuration file path
    #[arg(long, value_name = "FILE", env = "TRELLIS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    subcommand: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Walk through the four table views (default)
    Tour,
    /// Write the effective configuration to the default config file
    InitConfig,
}

/// Output format argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    /// Display results in a formatted table
    Table,
    /// Display results as JSON
    Json,
    /// Display results as CSV
    Csv,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Csv => OutputFormat::Csv,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    let format = match args.output {
        Some(arg) => arg.into(),
        None => config.output_format.parse()?,
    };

    if args.subcommand == Some(Command::InitConfig) {
        let path = CliConfig::default_config_path().context("no configuration directory")?;
        config.save(&path)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let cluster = MemoryCluster::new(config.client.endpoints.iter().cloned());
    for endpoint in &args.down {
        if !cluster.set_reachable(endpoint, false) {
            anyhow::bail!("--down {endpoint} is not a configured endpoint");
        }
    }

    let client = Client::connect(config.client.clone(), &cluster)
        .await
        .context("connecting to cluster")?;
    info!(endpoint = ?client.connections(), "connected");
    seed::seed(&client).await.context("loading sample catalogue")?;

    if let Some(sql) = &args.command {
        execute_and_print(&client, sql, format, config.timing).await?;
    } else if let Some(file) = &args.file {
        execute_file(&client, file, format, config.timing).await?;
    } else {
        run_tour(&client, format, config.timing).await?;
    }

    client.close().await;
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("trellis_cli=debug,trellis_client=debug,trellis_store=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trellis_cli=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<CliConfig> {
    let mut config = match &args.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::load_default()?,
    };

    if !args.endpoints.is_empty() {
        config.client.endpoints = args.endpoints.clone();
    }
    config.client.validate()?;
    Ok(config)
}

async fn execute_and_print(client: &Client, sql: &str, format: OutputFormat, timing: bool) -> Result<()> {
    info!(sql, "executing query");
    let start = Instant::now();
    let rows = client
        .sql()
        .execute(None, sql)
        .await
        .with_context(|| format!("executing `{sql}`"))?;
    print_rows(&Rows::from_result_set(rows), format);
    if timing {
        println!("Time: {:.3} ms", start.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(())
}

async fn execute_file(client: &Client, path: &Path, format: OutputFormat, timing: bool) -> Result<()> {
    info!(file = %path.display(), "executing file");
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    for statement in split_statements(&content) {
        execute_and_print(client, statement, format, timing).await?;
    }
    Ok(())
}

async fn run_tour(client: &Client, format: OutputFormat, timing: bool) -> Result<()> {
    let start = Instant::now();
    for step in tour::run(client).await.context("running the tour")? {
        println!("== {} ==", step.title);
        print_rows(&step.rows, format);
    }
    if timing {
        println!("Time: {:.3} ms", start.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(())
}

fn print_rows(rows: &Rows, format: OutputFormat) {
    let output = format_rows(rows, format);
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
}

/// Splits SQL text into statements on `;`, ignoring separators inside
/// quotes and `--` comments. Empty statements are dropped.
fn split_statements(content: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    let mut chars = content.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            _ if in_comment => in_comment = c != '\n',
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '-') if chars.peek().is_some_and(|&(_, n)| n == '-') => in_comment = true,
            (None, ';') => {
                statements.push(&content[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    statements.push(&content[start..]);

    statements
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.lines().all(|l| l.trim().is_empty() || l.trim_start().starts_with("--")))
        .collect()
}
