use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `base` and fold `.` and `..` lexically.
///
/// The result is absolute whenever `base` is absolute. No filesystem access
/// happens, so symlinks are not resolved and missing files are fine. A `..`
/// that would climb above the root is dropped.
///
/// Two spellings of the same file (`./src/../package.json` and
/// `/project/package.json`) normalize to the same key.
pub fn normalize_path(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root.
                if out.file_name().is_some() {
                    out.pop();
                }
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_onto_base() {
        let base = Path::new("/project");
        assert_eq!(
            normalize_path(base, "src/main.ts"),
            PathBuf::from("/project/src/main.ts")
        );
    }

    #[test]
    fn dots_are_folded() {
        let base = Path::new("/project");
        assert_eq!(
            normalize_path(base, "./src/../package.json"),
            PathBuf::from("/project/package.json")
        );
    }

    #[test]
    fn absolute_paths_ignore_base() {
        let base = Path::new("/elsewhere");
        assert_eq!(
            normalize_path(base, "/project/./vite.config.ts"),
            PathBuf::from("/project/vite.config.ts")
        );
    }

    #[test]
    fn relative_and_absolute_spellings_collide() {
        let base = Path::new("/project");
        assert_eq!(
            normalize_path(base, "package.json"),
            normalize_path(base, "/project/src/../package.json")
        );
    }

    #[test]
    fn parent_dir_never_climbs_above_root() {
        assert_eq!(
            normalize_path(Path::new("/"), "../../etc/hosts"),
            PathBuf::from("/etc/hosts")
        );
    }
}
