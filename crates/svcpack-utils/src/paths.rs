use camino::{Utf8Path, Utf8PathBuf};
use std::path::Path;

/// Convert a filesystem path to UTF-8, or `None` if it is not valid UTF-8.
#[must_use]
pub fn to_utf8(path: &Path) -> Option<&Utf8Path> {
    Utf8Path::from_path(path)
}

/// Relative path of `path` under `root`, always `/`-separated.
///
/// Returns `None` when `path` is not under `root` or is not UTF-8. The root
/// itself yields an empty string.
#[must_use]
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        parts.push(component.as_os_str().to_str()?);
    }
    Some(parts.join("/"))
}

/// True when `name` is usable as a single file name in the output directory.
#[must_use]
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// True when any `/`-separated component of `rel` equals `name` exactly.
#[must_use]
pub fn has_component(rel: &str, name: &str) -> bool {
    rel.split('/').any(|component| component == name)
}

/// Directory part of a `/`-separated relative path; empty for top-level files.
#[must_use]
pub fn parent_dir(rel: &str) -> &str {
    rel.rfind('/').map_or("", |idx| &rel[..idx])
}

/// `root` joined with a `/`-separated relative path.
#[must_use]
pub fn join_slash(root: &Utf8Path, rel: &str) -> Utf8PathBuf {
    let mut joined = root.to_path_buf();
    for part in rel.split('/').filter(|p| !p.is_empty()) {
        joined.push(part);
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_relative_slash_path() {
        let root = PathBuf::from("/srv/app");
        let nested = root.join("b").join("c.txt");
        assert_eq!(relative_slash_path(&root, &nested).as_deref(), Some("b/c.txt"));
        assert_eq!(relative_slash_path(&root, &root).as_deref(), Some(""));
        assert_eq!(relative_slash_path(&root, Path::new("/elsewhere/x")), None);
    }

    #[test]
    fn test_is_plain_file_name() {
        assert!(is_plain_file_name("service.zip"));
        assert!(is_plain_file_name(".hidden.zip"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("out/service.zip"));
        assert!(!is_plain_file_name("..\\service.zip"));
    }

    #[test]
    fn test_has_component_is_exact() {
        assert!(has_component("a/node_modules/b/package.json", "node_modules"));
        assert!(!has_component("my_node_modules_tool/package.json", "node_modules"));
        assert!(!has_component("package.json", "node_modules"));
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("package.json"), "");
        assert_eq!(parent_dir("sub/deep/package.json"), "sub/deep");
    }

    #[test]
    fn test_join_slash() {
        let root = Utf8Path::new("/srv/app");
        assert_eq!(join_slash(root, "sub/deep/"), Utf8PathBuf::from("/srv/app/sub/deep"));
        assert_eq!(join_slash(root, ""), Utf8PathBuf::from("/srv/app"));
    }
}
