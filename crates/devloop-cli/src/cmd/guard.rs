use crate::output::{print_json, print_table};
use crate::root;
use clap::Subcommand;
use devloop_core::config::Config;
use devloop_core::patterns::DEFAULT_PROTECTED;
use devloop_core::payload::{self, Action};
use devloop_core::{Decision, DevloopError, PathGuard};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Exit status that tells the host tool to refuse the operation.
pub const BLOCK_EXIT_CODE: i32 = 2;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum GuardSubcommand {
    /// Check a hook payload read from stdin (exit 2 blocks the tool call)
    Hook,

    /// Check a single path given on the command line
    Check {
        /// Target path, relative to the project root or absolute
        path: PathBuf,
        /// Tool action being attempted (write, edit, multiedit, notebookedit, read, ...)
        #[arg(long, default_value = "write")]
        action: String,
    },

    /// List the effective protected patterns
    Patterns,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(explicit_root: Option<&Path>, subcmd: GuardSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        GuardSubcommand::Hook => hook(explicit_root, json),
        GuardSubcommand::Check { path, action } => {
            let root = root::resolve_root(explicit_root);
            let decision =
                PathGuard::for_project(&root).check_path(&Action::from_tool_name(&action), &path);
            report(&decision, json)
        }
        GuardSubcommand::Patterns => patterns(&root::resolve_root(explicit_root), json),
    }
}

// ---------------------------------------------------------------------------
// hook
// ---------------------------------------------------------------------------

fn hook(explicit_root: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let decision = match std::io::read_to_string(std::io::stdin()) {
        Ok(input) => match payload::parse(&input) {
            Ok(req) => {
                let root = match &req.cwd {
                    Some(cwd) => root::resolve_root_from(explicit_root, cwd),
                    None => root::resolve_root(explicit_root),
                };
                PathGuard::for_project(&root).check(&req)
            }
            Err(e) => Decision::malformed(&e),
        },
        Err(e) => Decision::malformed(&DevloopError::from(e)),
    };
    report(&decision, json)
}

// ---------------------------------------------------------------------------
// Shared reporting
// ---------------------------------------------------------------------------

/// Print the decision and exit with [`BLOCK_EXIT_CODE`] when it blocks.
fn report(decision: &Decision, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(&decision.summary())?;
    }
    if let Decision::Block(blocked) = decision {
        eprintln!("{}", blocked.message);
        if let Some(err) = &blocked.whitelist_error {
            eprintln!("(whitelist ignored: {err})");
        }
        std::io::stdout().flush()?;
        std::process::exit(BLOCK_EXIT_CODE);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// patterns
// ---------------------------------------------------------------------------

fn patterns(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(root);
    let patterns = config.guard.protected_patterns();

    if json {
        return print_json(&serde_json::json!({
            "enabled": config.guard.enabled,
            "patterns": patterns,
        }));
    }

    let rows: Vec<Vec<String>> = patterns
        .fragments()
        .iter()
        .enumerate()
        .map(|(i, fragment)| {
            let source = if DEFAULT_PROTECTED.contains(&fragment.as_str()) {
                "built-in"
            } else {
                "config"
            };
            vec![(i + 1).to_string(), fragment.clone(), source.to_string()]
        })
        .collect();
    print_table(&["#", "PATTERN", "SOURCE"], &rows);

    if !config.guard.enabled {
        println!("\nguard is disabled in config; nothing is blocked");
    }
    Ok(())
}
