use std::path::{Path, PathBuf};

/// Resolve the project root directory from the current working directory.
///
/// Priority:
/// 1. `--root` flag / `DEVLOOP_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.devloop/`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_root_from(explicit, &cwd)
}

/// Same as [`resolve_root`], but discovery starts at `start` (for hooks, the
/// working directory reported in the payload).
pub fn resolve_root_from(explicit: Option<&Path>, start: &Path) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    if let Some(dir) = find_upward(start, ".devloop") {
        return dir;
    }
    if let Some(dir) = find_upward(start, ".git") {
        return dir;
    }

    start.to_path_buf()
}

fn find_upward(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}
