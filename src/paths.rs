use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Where pitchmatch keeps its configuration.
///
/// On Linux this is $XDG_CONFIG_HOME/pitchmatch (~/.config/pitchmatch);
/// on macOS ~/Library/Application Support/pitchmatch. The `dirs` crate
/// handles platform detection and the result is cached after first use.
static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Root config directory: $XDG_CONFIG_HOME/pitchmatch
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pitchmatch")
    })
}

/// Config file path: <config_dir>/config.toml
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Chart path next to the input: `dir/song.wav` → `dir/song_<suffix>.png`.
pub fn chart_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    input.with_file_name(format!("{stem}_{suffix}.png"))
}

/// Display name for a file in reports: its file name, or the path as given.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
