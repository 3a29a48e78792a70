//! Path normalization for guard checks.
//!
//! A requested path is joined onto the project root, then resolved through a
//! [`PathResolver`] so symlinks are followed to their final target. When the
//! path does not resolve, its components are walked from the leaf upward: a
//! dangling symlink is replaced by its target and resolution starts over,
//! otherwise the deepest existing ancestor is resolved and the remaining
//! segments are re-appended. If nothing resolves the lexical form is used.

use crate::paths::absolutize;
use std::path::{Path, PathBuf};

/// Upper bound on symlinks followed by hand, matching the usual `ELOOP` limit.
pub const MAX_LINK_HOPS: usize = 40;

/// Capability that turns an absolute path into its canonical, symlink-free form.
pub trait PathResolver {
    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf>;

    /// Target of `path` if it is itself a symlink, whether or not the target exists.
    fn read_link(&self, _path: &Path) -> std::io::Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Resolves against the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsResolver;

impl PathResolver for FsResolver {
    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }

    fn read_link(&self, path: &Path) -> std::io::Result<Option<PathBuf>> {
        if std::fs::symlink_metadata(path)?.file_type().is_symlink() {
            std::fs::read_link(path).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Never resolves anything; normalization stays lexical.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalResolver;

impl PathResolver for LexicalResolver {
    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("lexical resolver does not resolve {}", path.display()),
        ))
    }
}

impl<R: PathResolver + ?Sized> PathResolver for &R {
    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf> {
        (**self).canonicalize(path)
    }

    fn read_link(&self, path: &Path) -> std::io::Result<Option<PathBuf>> {
        (**self).read_link(path)
    }
}

/// Produce the absolute, symlink-resolved form of `requested` relative to `root`.
pub fn normalize<R: PathResolver + ?Sized>(resolver: &R, root: &Path, requested: &Path) -> PathBuf {
    let mut current = absolutize(root, requested);

    for _ in 0..=MAX_LINK_HOPS {
        match resolver.canonicalize(&current) {
            Ok(resolved) => return resolved,
            Err(e) => {
                tracing::debug!(path = %current.display(), error = %e, "path did not resolve, walking components");
            }
        }

        match walk_components(resolver, root, &current) {
            Walk::Resolved(resolved) => return resolved,
            Walk::Link { link, next } => {
                tracing::debug!(link = %link.display(), target = %next.display(), "following dangling symlink");
                current = next;
            }
            Walk::Unresolved => return current,
        }
    }

    tracing::warn!(path = %current.display(), "too many symlink hops, using lexical form");
    current
}

enum Walk {
    /// An existing ancestor resolved; the remaining segments were re-appended.
    Resolved(PathBuf),
    /// A component is a symlink whose target does not exist yet.
    Link { link: PathBuf, next: PathBuf },
    Unresolved,
}

/// Walk `current` from the leaf upward until a component resolves or turns out
/// to be a symlink.
fn walk_components<R: PathResolver + ?Sized>(resolver: &R, root: &Path, current: &Path) -> Walk {
    for ancestor in current.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        // ancestors() only yields prefixes of `current`
        let rest = current.strip_prefix(ancestor).unwrap_or(Path::new(""));

        if ancestor != current {
            if let Ok(resolved) = resolver.canonicalize(ancestor) {
                return Walk::Resolved(join_rest(resolved, rest));
            }
        }

        if let Ok(Some(target)) = resolver.read_link(ancestor) {
            let base = ancestor.parent().unwrap_or(root);
            return Walk::Link {
                link: ancestor.to_path_buf(),
                next: join_rest(absolutize(base, &target), rest),
            };
        }
    }
    Walk::Unresolved
}

fn join_rest(base: PathBuf, rest: &Path) -> PathBuf {
    if rest.as_os_str().is_empty() {
        base
    } else {
        base.join(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory filesystem: `resolved` lists paths that canonicalize, `links`
    /// lists symlinks whose targets may or may not exist.
    #[derive(Default)]
    struct MapResolver {
        resolved: HashMap<PathBuf, PathBuf>,
        links: HashMap<PathBuf, PathBuf>,
    }

    impl MapResolver {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                resolved: entries
                    .iter()
                    .map(|(k, v)| (PathBuf::from(k), PathBuf::from(v)))
                    .collect(),
                links: HashMap::new(),
            }
        }

        fn link(mut self, from: &str, to: &str) -> Self {
            self.links.insert(PathBuf::from(from), PathBuf::from(to));
            self
        }
    }

    impl PathResolver for MapResolver {
        fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf> {
            self.resolved
                .get(path)
                .cloned()
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }

        fn read_link(&self, path: &Path) -> std::io::Result<Option<PathBuf>> {
            Ok(self.links.get(path).cloned())
        }
    }

    #[test]
    fn lexical_resolver_falls_back_to_lexical_form() {
        let out = normalize(&LexicalResolver, Path::new("/proj"), Path::new("./src/../AGENTS.md"));
        assert_eq!(out, PathBuf::from("/proj/AGENTS.md"));
    }

    #[test]
    fn existing_symlink_resolves_to_target() {
        let resolver = MapResolver::new(&[("/proj/notes.md", "/proj/AGENTS.md")]);
        let out = normalize(&resolver, Path::new("/proj"), Path::new("notes.md"));
        assert_eq!(out, PathBuf::from("/proj/AGENTS.md"));
    }

    #[test]
    fn new_file_under_symlinked_dir_resolves_through_ancestor() {
        let resolver = MapResolver::new(&[("/proj/state", "/proj/.beads")]);
        let out = normalize(&resolver, Path::new("/proj"), Path::new("state/new.json"));
        assert_eq!(out, PathBuf::from("/proj/.beads/new.json"));
    }

    #[test]
    fn nothing_resolves_keeps_lexical() {
        let resolver = MapResolver::new(&[]);
        let out = normalize(&resolver, Path::new("/proj"), Path::new("a/b/c.txt"));
        assert_eq!(out, PathBuf::from("/proj/a/b/c.txt"));
    }

    #[test]
    fn dangling_leaf_link_follows_relative_target() {
        let resolver = MapResolver::new(&[("/proj", "/proj")]).link("/proj/notes.md", "AGENTS.md");
        let out = normalize(&resolver, Path::new("/proj"), Path::new("notes.md"));
        assert_eq!(out, PathBuf::from("/proj/AGENTS.md"));
    }

    #[test]
    fn dangling_dir_link_is_followed_for_new_files() {
        let resolver = MapResolver::new(&[("/proj", "/proj")]).link("/proj/state", "../proj/.beads");
        let out = normalize(&resolver, Path::new("/proj"), Path::new("state/new.json"));
        assert_eq!(out, PathBuf::from("/proj/.beads/new.json"));
    }

    #[test]
    fn chained_dangling_links_are_followed() {
        let resolver = MapResolver::new(&[("/proj", "/proj")])
            .link("/proj/a.md", "/proj/b.md")
            .link("/proj/b.md", "docs/../CLAUDE.md");
        let out = normalize(&resolver, Path::new("/proj"), Path::new("a.md"));
        assert_eq!(out, PathBuf::from("/proj/CLAUDE.md"));
    }

    #[test]
    fn link_cycle_terminates() {
        let resolver = MapResolver::new(&[])
            .link("/proj/a", "/proj/b")
            .link("/proj/b", "/proj/a");
        let out = normalize(&resolver, Path::new("/proj"), Path::new("a"));
        assert!(out == Path::new("/proj/a") || out == Path::new("/proj/b"));
    }

    #[test]
    fn fs_resolver_follows_real_symlink() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        std::fs::write(root.join("AGENTS.md"), "# agents").unwrap();
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(root.join("AGENTS.md"), root.join("link.md")).unwrap();
            let out = normalize(&FsResolver, &root, Path::new("link.md"));
            assert_eq!(out, root.join("AGENTS.md"));
        }
        let out = normalize(&FsResolver, &root, Path::new("not-yet/created.txt"));
        assert_eq!(out, root.join("not-yet/created.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn fs_resolver_follows_dangling_symlinks() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        std::os::unix::fs::symlink("AGENTS.md", root.join("notes.md")).unwrap();
        std::os::unix::fs::symlink(".beads/new.json", root.join("issue.json")).unwrap();

        assert_eq!(
            normalize(&FsResolver, &root, Path::new("notes.md")),
            root.join("AGENTS.md")
        );
        assert_eq!(
            normalize(&FsResolver, &root, Path::new("issue.json")),
            root.join(".beads/new.json")
        );
    }
}
