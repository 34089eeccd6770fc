//! Required-tool checks.

use std::env;
use std::path::{Path, PathBuf};

/// Trait for tool lookup - allows mocking in tests
pub trait ToolLocator {
    fn locate(&self, tool: &str) -> Option<PathBuf>;
}

/// Searches the directories on `PATH`.
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        let tool_path = Path::new(tool);
        if tool_path.components().count() > 1 {
            return is_executable(tool_path).then(|| tool_path.to_path_buf());
        }
        let path = env::var_os("PATH")?;
        env::split_paths(&path)
            .map(|dir| dir.join(tool))
            .find(|candidate| is_executable(candidate))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locates_shell() {
        assert!(PathLocator.locate("sh").is_some());
    }

    #[test]
    fn test_missing_tool() {
        assert!(PathLocator
            .locate("hostprov-definitely-not-installed")
            .is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_explicit_path_must_be_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("tool");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(PathLocator.locate(script.to_str().unwrap()).is_none());

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(PathLocator.locate(script.to_str().unwrap()), Some(script));
    }
}
