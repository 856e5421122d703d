use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process;

use botscript_core::normalizer::{fingerprint_command, render_pretty};
use botscript_core::parser::tokenizer::{Token, Tokenizer};
use botscript_core::verifier::{verify, VerificationResult};
use botscript_core::{parser, run_program, RunConfig};
use tracing_subscriber::EnvFilter;

/// BotScript — tick-driven agent programs
///
/// Check, format, fingerprint, and run BotScript programs.
#[derive(Parser)]
#[command(name = "botscript", version, about, long_about = None)]
struct Cli {
    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a program and run static checks
    Check {
        /// Path to .bot file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a program in canonical form
    Fmt {
        /// Path to .bot file
        file: PathBuf,
        /// Multi-line, indented output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the token stream with positions
    Tokens {
        /// Path to .bot file
        file: PathBuf,
    },

    /// Compute the fingerprint (SHA-256 of the canonical form)
    Hash {
        /// Path to .bot file
        file: PathBuf,
    },

    /// Run a program against a scripted agent
    Run {
        /// Path to .bot file
        file: PathBuf,
        /// JSON run configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the configured tick limit
        #[arg(long)]
        ticks: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Check { file, json } => cmd_check(&file, json, cli.quiet),
        Commands::Fmt { file, pretty } => cmd_fmt(&file, pretty),
        Commands::Tokens { file } => cmd_tokens(&file),
        Commands::Hash { file } => cmd_hash(&file),
        Commands::Run {
            file,
            config,
            ticks,
            json,
        } => cmd_run(&file, config.as_deref(), ticks, json, cli.quiet),
        Commands::Version => {
            println!(
                "botscript {} (botscript-core {})",
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_VERSION")
            );
            0
        }
    };

    process::exit(exit_code);
}

/// `RUST_LOG` wins over `-v` when set
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ── Helpers ───────────────────────────────────────────────

/// Exit code 2 when the file cannot be read
fn read_source(path: &Path) -> Result<String, i32> {
    std::fs::read_to_string(path).map_err(|e| {
        eprintln!("{} cannot read {}: {}", "error:".red().bold(), path.display(), e);
        2
    })
}

fn parse_file(path: &Path) -> Result<botscript_core::Command, i32> {
    let source = read_source(path)?;
    parser::parse(&source).map_err(|e| {
        eprintln!("{} {}: {}", "error:".red().bold(), path.display(), e);
        1
    })
}

// ── Commands ──────────────────────────────────────────────

fn cmd_check(path: &Path, json: bool, quiet: bool) -> i32 {
    let source = match read_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };
    let result = match parser::parse(&source) {
        Ok(root) => verify(&root),
        Err(e) => VerificationResult::from_error(&e),
    };
    let errors = result.diagnostics.len() - result.warnings().len();

    if json {
        let output = serde_json::json!({
            "file": path.display().to_string(),
            "valid": result.is_valid(),
            "errors": errors,
            "warnings": result.warnings().len(),
            "diagnostics": &result.diagnostics,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return 2;
            }
        }
    } else {
        for diagnostic in &result.diagnostics {
            if result.is_valid() {
                eprintln!("{}", diagnostic.to_string().yellow());
            } else {
                eprintln!("{}", diagnostic.to_string().red());
            }
        }
        if result.is_valid() && !quiet {
            println!("{} {} is valid", "✓".green(), path.display());
        }
    }

    if result.is_valid() {
        0
    } else {
        1
    }
}

fn cmd_fmt(path: &Path, pretty: bool) -> i32 {
    match parse_file(path) {
        Ok(root) if pretty => {
            println!("{}", render_pretty(&root));
            0
        }
        Ok(root) => {
            println!("{}", root);
            0
        }
        Err(code) => code,
    }
}

fn cmd_tokens(path: &Path) -> i32 {
    let source = match read_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };
    let mut tokenizer = Tokenizer::new(&source);
    loop {
        let Some(spanned) = tokenizer.next_token() else {
            eprintln!(
                "{} {}: {}",
                "error:".red().bold(),
                path.display(),
                tokenizer.unrecognized()
            );
            return 1;
        };
        println!("{}\t{}", spanned.span, spanned.token);
        if spanned.token == Token::Eof {
            return 0;
        }
    }
}

fn cmd_hash(path: &Path) -> i32 {
    match parse_file(path) {
        Ok(root) => {
            println!("{}", fingerprint_command(&root));
            0
        }
        Err(code) => code,
    }
}

fn cmd_run(path: &Path, config: Option<&Path>, ticks: Option<u64>, json: bool, quiet: bool) -> i32 {
    let mut run_config = match config {
        Some(config_path) => match RunConfig::from_file(config_path) {
            Ok(run_config) => run_config,
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return 2;
            }
        },
        None => RunConfig::default(),
    };
    if let Some(ticks) = ticks {
        run_config.max_ticks = ticks;
    }
    tracing::debug!(?run_config, "run configuration");

    let source = match read_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };
    let (report, agent) = match run_program(&source, &run_config) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} {}: {}", "error:".red().bold(), path.display(), e);
            return 1;
        }
    };

    if json {
        let output = serde_json::json!({
            "report": report,
            "agent": agent,
        });
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return 2;
            }
        }
        return 0;
    }

    if !quiet {
        for record in &report.trace.records {
            let action = match record.action {
                Some(action) => action.to_string(),
                None => "idle".dimmed().to_string(),
            };
            let resumed = if record.resumed { " (resumed)" } else { "" };
            println!("tick {:>4}: {}{}", record.tick, action, resumed);
        }
    }
    println!(
        "{} {} ticks, {} actions, stopped: {:?}, energy left: {}",
        "done:".green().bold(),
        report.ticks,
        report.actions,
        report.stop,
        agent.energy()
    );
    0
}
