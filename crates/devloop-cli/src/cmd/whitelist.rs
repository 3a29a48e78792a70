use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use devloop_core::paths;
use devloop_core::whitelist::Whitelist;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum WhitelistSubcommand {
    /// Show whitelist entries
    List,

    /// Allow writes to protected paths containing FRAGMENT
    Add { fragment: String },

    /// Remove a whitelist entry
    Remove { fragment: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: WhitelistSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        WhitelistSubcommand::List => list(root, json),
        WhitelistSubcommand::Add { fragment } => add(root, &fragment, json),
        WhitelistSubcommand::Remove { fragment } => remove(root, &fragment, json),
    }
}

fn load(root: &Path) -> anyhow::Result<Whitelist> {
    Whitelist::load(root).with_context(|| {
        format!(
            "failed to read {}",
            paths::whitelist_path(root).display()
        )
    })
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let wl = load(root)?;

    if json {
        return print_json(&wl);
    }
    if wl.is_empty() {
        println!("No whitelist entries.");
        return Ok(());
    }
    for entry in wl.entries() {
        println!("{entry}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// add / remove
// ---------------------------------------------------------------------------

fn add(root: &Path, fragment: &str, json: bool) -> anyhow::Result<()> {
    let mut wl = load(root)?;
    let added = wl.add(fragment)?;
    if added {
        wl.save(root).context("failed to write whitelist")?;
    }

    if json {
        print_json(&serde_json::json!({
            "fragment": fragment.trim(),
            "changed": added,
        }))?;
    } else if added {
        println!("Whitelisted '{}'.", fragment.trim());
    } else {
        println!("'{}' is already whitelisted.", fragment.trim());
    }
    Ok(())
}

fn remove(root: &Path, fragment: &str, json: bool) -> anyhow::Result<()> {
    let mut wl = load(root)?;
    let removed = wl.remove(fragment)?;
    if removed {
        wl.save(root).context("failed to write whitelist")?;
    }

    if json {
        print_json(&serde_json::json!({
            "fragment": fragment.trim(),
            "changed": removed,
        }))?;
    } else if removed {
        println!("Removed '{}' from the whitelist.", fragment.trim());
    } else {
        println!("'{}' was not whitelisted; nothing changed.", fragment.trim());
    }
    Ok(())
}
