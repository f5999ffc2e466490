//! XDG Base Directory paths for devek.
//!
//! The CLI and the session core resolve their files through these helpers so
//! that config and persisted session state land in the same place on every
//! platform.

use std::path::PathBuf;

/// File holding persisted key/value session state (the auth token).
pub const STATE_FILE: &str = "state.json";

/// Get the devek config directory.
///
/// Returns `$XDG_CONFIG_HOME/devek` if set, otherwise `~/.config/devek`.
///
/// # Examples
///
/// ```
/// use devek_paths::config_dir;
///
/// let config = config_dir();
/// let file = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the devek data directory.
///
/// Returns `$XDG_DATA_HOME/devek` if set, otherwise `~/.local/share/devek`.
/// Persisted session state lives here.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Path of the persisted session state file inside [`data_dir`].
pub fn state_file() -> PathBuf {
    data_dir().join(STATE_FILE)
}

fn xdg_dir(env_var: &str, home_relative: &str) -> PathBuf {
    if let Ok(base) = std::env::var(env_var)
        && !base.is_empty()
    {
        PathBuf::from(base).join("devek")
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_relative).join("devek")
    } else {
        PathBuf::from(home_relative).join("devek")
    }
}
