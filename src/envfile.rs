//! # Env Files
//!
//! An ordered sequence of `KEY=VALUE` lines, edited in place. Lines that are
//! not assignments (comments, blanks) are carried through verbatim.
//!
//! [`EnvFile::set`] rewrites the first line whose key matches, or appends a
//! new line. Later lines with the same key are dropped so every key set
//! through this type is unique; all other lines keep their text and order.

use std::fs;
use std::path::Path;

use crate::error::Result;

/// A mutable env file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvFile {
    lines: Vec<String>,
}

/// The key of an assignment line, if it is one.
fn line_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return None;
    }
    let (key, _) = trimmed.split_once('=')?;
    let key = key.trim();
    let key = key.strip_prefix("export ").map(str::trim).unwrap_or(key);
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

impl EnvFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Set `key` to `value`, rewriting the first matching line or appending.
    pub fn set(&mut self, key: &str, value: &str) {
        let assignment = format!("{}={}", key, value);
        let mut seen = false;
        self.lines.retain_mut(|line| {
            if line_key(line) != Some(key) {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            *line = assignment.clone();
            true
        });
        if !seen {
            self.lines.push(assignment);
        }
    }

    /// Value of the first line with `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .find(|line| line_key(line) == Some(key))
            .and_then(|line| line.split_once('='))
            .map(|(_, value)| value)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.render())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TEMPLATE: &str = "# generated\nFOO=1\n\nBAR=two\nexport BAZ=3\n";

    #[test]
    fn test_set_rewrites_in_place() {
        let mut env = EnvFile::parse(TEMPLATE);
        env.set("BAR", "changed");
        assert_eq!(
            env.render(),
            "# generated\nFOO=1\n\nBAR=changed\nexport BAZ=3\n"
        );
    }

    #[test]
    fn test_set_appends_missing_key() {
        let mut env = EnvFile::parse(TEMPLATE);
        env.set("HOSTNAME", "node35.example.com");
        assert_eq!(env.lines().last().unwrap(), "HOSTNAME=node35.example.com");
        assert_eq!(env.lines().len(), 6);
    }

    #[test]
    fn test_set_matches_exported_keys() {
        let mut env = EnvFile::parse(TEMPLATE);
        env.set("BAZ", "4");
        assert_eq!(env.get("BAZ"), Some("4"));
        assert!(!env.render().contains("export BAZ"));
    }

    #[test]
    fn test_set_does_not_match_key_prefix() {
        let mut env = EnvFile::parse("FOOBAR=1\n");
        env.set("FOO", "2");
        assert_eq!(env.render(), "FOOBAR=1\nFOO=2\n");
    }

    #[test]
    fn test_set_ignores_commented_assignments() {
        let mut env = EnvFile::parse("# FOO=old\n");
        env.set("FOO", "new");
        assert_eq!(env.render(), "# FOO=old\nFOO=new\n");
    }

    #[test]
    fn test_set_collapses_duplicates() {
        let mut env = EnvFile::parse("A=1\nB=2\nA=3\n");
        env.set("A", "9");
        assert_eq!(env.render(), "A=9\nB=2\n");
    }

    #[test]
    fn test_value_may_contain_equals() {
        let mut env = EnvFile::new();
        env.set("DSN", "postgres://u@h/db?sslmode=require");
        assert_eq!(env.get("DSN"), Some("postgres://u@h/db?sslmode=require"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(EnvFile::new().render(), "");
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("deploy/.env");
        let mut env = EnvFile::parse(TEMPLATE);
        env.set("FOO", "x");
        env.save(&path).unwrap();
        assert_eq!(EnvFile::load(&path).unwrap(), env);
    }

    fn key() -> impl Strategy<Value = String> {
        "[A-Z][A-Z0-9_]{0,6}"
    }

    fn value() -> impl Strategy<Value = String> {
        "[a-z0-9.:/=-]{0,12}"
    }

    proptest! {
        #[test]
        fn prop_set_is_idempotent(
            lines in prop::collection::vec((key(), value()), 0..8),
            k in key(),
            v in value(),
        ) {
            let content: String = lines.iter().map(|(k, v)| format!("{}={}\n", k, v)).collect();
            let mut once = EnvFile::parse(&content);
            once.set(&k, &v);
            let mut twice = once.clone();
            twice.set(&k, &v);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_last_set_wins_and_others_untouched(
            lines in prop::collection::vec((key(), value()), 0..8),
            k in key(),
            v1 in value(),
            v2 in value(),
        ) {
            let content: String = lines.iter().map(|(k, v)| format!("{}={}\n", k, v)).collect();
            let original = EnvFile::parse(&content);
            let mut env = original.clone();
            env.set(&k, &v1);
            env.set(&k, &v2);

            let matching: Vec<&String> = env
                .lines()
                .iter()
                .filter(|line| line_key(line) == Some(k.as_str()))
                .collect();
            let expected = format!("{}={}", k, v2);
            prop_assert_eq!(matching, vec![&expected]);

            let others = |file: &EnvFile| -> Vec<String> {
                file.lines()
                    .iter()
                    .filter(|line| line_key(line) != Some(k.as_str()))
                    .cloned()
                    .collect()
            };
            prop_assert_eq!(others(&env), others(&original));
        }
    }
}
