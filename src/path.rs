//! Path expansion for path-valued settings.
//!
//! A path goes through the same steps every time: environment variables are
//! expanded, the result is normalized lexically, a leading `~` is replaced by
//! the home directory, and a relative result is joined onto the base directory
//! (which has been through the same steps). Anything still relative is taken
//! from the current directory, so the output is always absolute.
//!
//! Normalization never touches the filesystem: symlinks are not resolved and
//! the path does not need to exist.

use std::path::{Component, Path, PathBuf};

/// Resolve `path` against an optional base directory using the process
/// environment, home directory and working directory.
pub fn resolve_path(path: &str, base_dir: Option<&str>) -> PathBuf {
    let home = directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_string_lossy().into_owned());
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    resolve_with(
        path,
        base_dir,
        |name| std::env::var(name).ok(),
        home.as_deref(),
        &cwd,
    )
}

/// [`resolve_path`] with every input supplied by the caller.
fn resolve_with<E>(
    path: &str,
    base_dir: Option<&str>,
    env: E,
    home: Option<&str>,
    cwd: &Path,
) -> PathBuf
where
    E: Fn(&str) -> Option<String>,
{
    let mut resolved = PathBuf::from(expand(path, &env, home));
    if !resolved.is_absolute()
        && let Some(base) = base_dir
    {
        resolved = PathBuf::from(expand(base, &env, home)).join(resolved);
    }
    if !resolved.is_absolute() {
        resolved = cwd.join(resolved);
    }
    normalize(&resolved)
}

fn expand<E>(raw: &str, env: &E, home: Option<&str>) -> String
where
    E: Fn(&str) -> Option<String>,
{
    let with_vars = shellexpand::env_with_context_no_errors(raw, |name| env(name));
    let normalized = normalize(Path::new(&*with_vars));
    let normalized = normalized.to_string_lossy();
    shellexpand::tilde_with_context(&normalized, || home).into_owned()
}

/// Collapse `.`, `..` and repeated separators without consulting the filesystem.
///
/// `..` at the root stays at the root; leading `..` of a relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(name: &str) -> Option<String> {
        match name {
            "XMG_HOME" => Some("/opt/xmg".into()),
            "DATA" => Some("data".into()),
            _ => None,
        }
    }

    fn resolve(path: &str, base: Option<&str>) -> PathBuf {
        resolve_with(path, base, vars, Some("/home/user"), Path::new("/work"))
    }

    #[test]
    fn relative_path_joins_base_dir() {
        assert_eq!(
            resolve("data.csv", Some("/home/user/out")),
            PathBuf::from("/home/user/out/data.csv")
        );
    }

    #[test]
    fn absolute_path_ignores_base_dir() {
        assert_eq!(
            resolve("/abs/data.csv", Some("/home/user/out")),
            PathBuf::from("/abs/data.csv")
        );
        assert_eq!(
            resolve("/abs/./x/../data.csv", None),
            PathBuf::from("/abs/data.csv")
        );
    }

    #[test]
    fn env_vars_expand_in_path_and_base() {
        assert_eq!(
            resolve("$DATA/x.csv", Some("${XMG_HOME}/run")),
            PathBuf::from("/opt/xmg/run/data/x.csv")
        );
    }

    #[test]
    fn unknown_vars_are_left_alone() {
        assert_eq!(resolve("/a/$NOPE/b", None), PathBuf::from("/a/$NOPE/b"));
    }

    #[test]
    fn tilde_expands_in_path_and_base() {
        assert_eq!(
            resolve("~/keys/k.pem", None),
            PathBuf::from("/home/user/keys/k.pem")
        );
        assert_eq!(
            resolve("k.pem", Some("~/keys")),
            PathBuf::from("/home/user/keys/k.pem")
        );
    }

    #[test]
    fn relative_without_base_uses_cwd() {
        assert_eq!(resolve("out/../x.csv", None), PathBuf::from("/work/x.csv"));
        assert_eq!(resolve("", None), PathBuf::from("/work"));
    }

    #[test]
    fn relative_base_is_taken_from_cwd() {
        assert_eq!(
            resolve("x.csv", Some("conf//sub/")),
            PathBuf::from("/work/conf/sub/x.csv")
        );
    }

    #[test]
    fn parent_dirs_collapse_across_base() {
        assert_eq!(
            resolve("../shared/x.json", Some("/etc/xmg/site")),
            PathBuf::from("/etc/xmg/shared/x.json")
        );
    }

    #[test]
    fn resolving_twice_changes_nothing() {
        let bases = [None, Some("/home/user/out"), Some("~/rel"), Some("$XMG_HOME")];
        let paths = [
            "data.csv",
            "/abs/data.csv",
            "~/x",
            "a/./b/../c",
            "$DATA/y",
            "../../up",
            "/a/$NOPE/b",
        ];
        for base in bases {
            for path in paths {
                let once = resolve(path, base);
                let twice = resolve(once.to_str().unwrap(), base);
                assert_eq!(once, twice, "path {path:?} base {base:?}");
                assert!(once.is_absolute());
            }
        }
    }

    #[test]
    fn normalize_keeps_leading_parent_of_relative_path() {
        assert_eq!(normalize(Path::new("../a/./b/..")), PathBuf::from("../a"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("a/..")), PathBuf::from("."));
    }
}
