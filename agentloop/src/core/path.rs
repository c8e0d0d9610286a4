//! Lexical containment of untrusted paths inside a workspace root.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("path must be inside workspace: {0}")]
pub struct PathEscape(pub String);

/// Join `relative` onto `root` and normalize `.`/`..` without touching the
/// filesystem. Absolute inputs are accepted only if they already lie under `root`.
///
/// `root` must be absolute and normalized.
pub fn contain(root: &Path, relative: &str) -> Result<PathBuf, PathEscape> {
    let escape = || PathEscape(relative.to_string());
    let joined = root.join(relative);
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(escape());
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    if !normalized.starts_with(root) {
        return Err(escape());
    }
    Ok(normalized)
}

/// `/`-separated path of `path` relative to `root`, for display.
pub fn display_relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_relative_path_is_contained() {
        let root = Path::new("/ws");
        assert_eq!(
            contain(root, "src/./lib.rs").expect("inside"),
            PathBuf::from("/ws/src/lib.rs")
        );
        assert_eq!(contain(root, ".").expect("root"), PathBuf::from("/ws"));
    }

    #[test]
    fn parent_traversal_out_of_root_is_rejected() {
        let root = Path::new("/ws");
        assert!(contain(root, "../outside.txt").is_err());
        assert!(contain(root, "a/../../outside.txt").is_err());
        assert!(contain(root, "a/../b.txt").is_ok());
    }

    #[test]
    fn absolute_paths_must_stay_under_root() {
        let root = Path::new("/ws");
        assert!(contain(root, "/etc/passwd").is_err());
        assert!(contain(root, "/ws/notes.md").is_ok());
    }

    #[test]
    fn display_relative_uses_forward_slashes() {
        let root = Path::new("/ws");
        assert_eq!(display_relative(root, Path::new("/ws/a/b.py")), "a/b.py");
        assert_eq!(display_relative(root, Path::new("/ws")), ".");
    }
}
