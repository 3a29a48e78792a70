mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, guard::GuardSubcommand, whitelist::WhitelistSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "devloop",
    about = "DevLoop project tooling: pre-write guard for protected files, whitelist and config",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .devloop/ or .git/)
    #[arg(long, global = true, env = "DEVLOOP_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether a write or edit to a path is allowed
    Guard {
        #[command(subcommand)]
        subcommand: GuardSubcommand,
    },

    /// Manage the protected-file whitelist
    Whitelist {
        #[command(subcommand)]
        subcommand: WhitelistSubcommand,
    },

    /// Inspect and validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// True when argv names `guard hook` or `guard check`, whose callers read exit
/// status 2 as a block.
fn is_guard_decision(args: &[String]) -> bool {
    args.iter()
        .skip(1)
        .skip_while(|a| a.as_str() != "guard")
        .skip(1)
        .any(|a| a == "hook" || a == "check")
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap reports usage errors with status 2, the block status. A guard
            // invocation with bad arguments fails open instead.
            let args: Vec<String> = std::env::args().collect();
            if e.use_stderr() && is_guard_decision(&args) {
                eprint!("{e}");
                std::process::exit(0);
            }
            e.exit();
        }
    };

    // Diagnostics go to stderr; hook stdout is reserved for --json output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let explicit_root = cli.root.as_deref();

    let result = match cli.command {
        Commands::Guard { subcommand } => cmd::guard::run(explicit_root, subcommand, cli.json),
        Commands::Whitelist { subcommand } => {
            cmd::whitelist::run(&root::resolve_root(explicit_root), subcommand, cli.json)
        }
        Commands::Config { subcommand } => {
            cmd::config::run(&root::resolve_root(explicit_root), subcommand, cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
