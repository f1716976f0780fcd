use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::types::AppConfig;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV: &str = "DEVBOARD_CONFIG";

/// Written by `devboard init`.
pub const DEFAULT_CONFIG: &str = r#"# devboard configuration

# Directory containing your git projects (defaults to $DEVBOARD_PROJECTS, then ~/dev).
# projects_dir = "~/dev"

# Extra projects living elsewhere.
# projects = ["~/work/some-repo"]

[defaults]
# workers = 8
fetch_on_startup = true
notification_timeout_secs = 3
error_timeout_secs = 10

[[columns]]
kind = "to_commit"

[[columns]]
kind = "to_pull"

[[columns]]
kind = "to_push"

[[columns]]
kind = "to_release"
"#;

/// Discover and load the app config.
///
/// Priority:
/// 1. `--config` flag (explicit path)
/// 2. `$DEVBOARD_CONFIG` environment variable
/// 3. `$XDG_CONFIG_HOME/devboard/config.toml`
/// 4. `~/.config/devboard/config.toml`
///
/// Without any config file the default board is used.
pub fn load_config(explicit_path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit_path {
        return read_config(path);
    }
    match find_global_config() {
        Some(path) => read_config(&path),
        None => {
            tracing::debug!("config: no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML from {}", path.display()))?;
    tracing::debug!("config: loaded {}", path.display());
    Ok(config)
}

fn find_global_config() -> Option<PathBuf> {
    // $DEVBOARD_CONFIG
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let p = PathBuf::from(&path);
        if p.is_file() {
            return Some(p);
        }
    }

    // $XDG_CONFIG_HOME/devboard/config.toml
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let p = PathBuf::from(xdg).join("devboard/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // ~/.config/devboard/config.toml
    if let Some(home) = home_dir() {
        let p = home.join(".config/devboard/config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    None
}

/// Where `devboard init` writes the config.
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("devboard/config.toml"));
    }
    home_dir().map(|h| h.join(".config/devboard/config.toml"))
}

/// Write [`DEFAULT_CONFIG`] to `path` unless a file already exists there.
///
/// Returns `false` when the file was left untouched.
pub fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, DEFAULT_CONFIG).with_context(|| format!("writing {}", path.display()))?;
    Ok(true)
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

/// Expand a leading `~/`.
pub fn expand_tilde_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
