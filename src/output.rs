//! # Operator Output
//!
//! Human-facing status lines printed by the commands (diagnostics go through
//! `log`). Colors and emoji follow the operator's terminal and preferences:
//!
//! - `--color=never|always|auto`
//! - `NO_COLOR` (any value) disables colors
//! - `CLICOLOR=0` disables, `CLICOLOR_FORCE=1` forces
//! - `TERM=dumb` disables
//!
//! ```rust,ignore
//! use hostprov::output::{OutputConfig, Status};
//!
//! let out = OutputConfig::from_env_and_flag("auto");
//! println!("{}", out.status(Status::Ok, "fetched app.yaml"));
//! ```

use std::env;

use console::style;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve `--color` against the environment. Unknown values mean `auto`.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    /// A status line such as `✅ deployed node35` or `[OK] deployed node35`.
    pub fn status(&self, status: Status, message: &str) -> String {
        let (icon, plain) = status.markers();
        let marker = emoji(self, icon, plain);
        if !self.use_color {
            return format!("{} {}", marker, message);
        }
        let message = match status {
            Status::Ok => style(message).green().to_string(),
            Status::Warn => style(message).yellow().to_string(),
            Status::Fail => style(message).red().bold().to_string(),
            Status::Info | Status::Watch => message.to_string(),
        };
        format!("{} {}", marker, message)
    }

    /// `key: value` detail line, indented under a status line.
    pub fn detail(&self, key: &str, value: &str) -> String {
        if self.use_color {
            format!("   {} {}", style(format!("{}:", key)).dim(), value)
        } else {
            format!("   {}: {}", key, value)
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Kinds of status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Info,
    Ok,
    Warn,
    Fail,
    Watch,
}

impl Status {
    fn markers(self) -> (&'static str, &'static str) {
        match self {
            Status::Info => ("🚀", "[..]"),
            Status::Ok => ("✅", "[OK]"),
            Status::Warn => ("⚠️ ", "[WARN]"),
            Status::Fail => ("❌", "[FAIL]"),
            Status::Watch => ("👀", "[WATCH]"),
        }
    }
}

/// The emoji when colors are enabled, otherwise the plain alternative.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_color_flags() {
        assert!(OutputConfig::from_env_and_flag("always").use_color);
        assert!(!OutputConfig::from_env_and_flag("NEVER").use_color);
    }

    #[test]
    #[serial]
    fn test_no_color_env_disables_auto_detection() {
        let previous = env::var_os("NO_COLOR");
        env::set_var("NO_COLOR", "1");
        assert!(!OutputConfig::from_env_and_flag("auto").use_color);
        match previous {
            Some(value) => env::set_var("NO_COLOR", value),
            None => env::remove_var("NO_COLOR"),
        }
    }

    #[test]
    #[serial]
    fn test_clicolor_force_enables_auto_detection() {
        let no_color = env::var_os("NO_COLOR");
        let forced = env::var_os("CLICOLOR_FORCE");
        env::remove_var("NO_COLOR");
        env::set_var("CLICOLOR_FORCE", "1");
        let out = OutputConfig::from_env_and_flag("auto");
        if let Some(value) = no_color {
            env::set_var("NO_COLOR", value);
        }
        match forced {
            Some(value) => env::set_var("CLICOLOR_FORCE", value),
            None => env::remove_var("CLICOLOR_FORCE"),
        }
        // CLICOLOR=0 in the ambient environment still wins.
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            assert!(!out.use_color);
        } else {
            assert!(out.use_color);
        }
    }

    #[test]
    fn test_plain_status_line() {
        let out = OutputConfig::without_color();
        assert_eq!(out.status(Status::Ok, "deployed node35"), "[OK] deployed node35");
        assert_eq!(out.status(Status::Fail, "boom"), "[FAIL] boom");
        assert_eq!(out.detail("project", "node35"), "   project: node35");
    }

    #[test]
    fn test_colored_status_uses_emoji() {
        let out = OutputConfig::with_color();
        assert!(out.status(Status::Watch, "watching").starts_with("👀"));
    }

    #[test]
    fn test_emoji_helper() {
        assert_eq!(emoji(&OutputConfig::with_color(), "✅", "[OK]"), "✅");
        assert_eq!(emoji(&OutputConfig::without_color(), "✅", "[OK]"), "[OK]");
    }
}
