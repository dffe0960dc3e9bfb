//! Platform config directory shared by the admin and sender binaries.
//!
//! - Windows:  `%APPDATA%\Screencast`
//! - Linux:    `$XDG_CONFIG_HOME/screencast` or `~/.config/screencast`
//! - macOS:    `~/Library/Application Support/Screencast`

use std::path::PathBuf;

/// Resolves the Screencast config directory, or `None` when the platform base
/// directory cannot be determined from the environment.
pub fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Screencast"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("screencast"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Screencast")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}
