use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn settings_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "exacto").map(|pd| pd.config_dir().join("settings.json"))
    }

    pub fn log_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join("exacto"))
        } else {
            ProjectDirs::from("", "", "exacto").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }
}
