use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ExplorerError;

use super::view::{ScopeConfig, SortKey, ViewState};
use super::window::{Window, WindowMode, WindowSettings};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub view: ViewConfig,
    pub window: WindowConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub vault_path: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub excluded_folders: Vec<String>,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub show_sub_folders: bool,
    #[serde(default)]
    pub show_empty_notes: bool,
    #[serde(default)]
    pub pinned_files: Vec<String>,
    #[serde(default)]
    pub default_sort: SortKey,
    #[serde(default)]
    pub pages_view: bool,
    pub cards_per_page: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub initial_count: i64,
    pub load_step: i64,
    pub cards_per_batch: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub min_score: i64,
    pub read_timeout_ms: u64,
    #[serde(default)]
    pub workers: usize,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let mut config = Self::defaults()?;

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "notes-explorer") {
            let config_path = proj_dirs.config_dir().join("config.toml");
            if config_path.exists() {
                let user_str = fs::read_to_string(&config_path)?;
                config = Self::from_toml_str(&user_str)?;
            }
        }

        // Expand ~ in vault_path
        if config.general.vault_path.starts_with('~') {
            let home = dirs_home().ok_or_else(|| anyhow!("cannot determine home directory"))?;
            config.general.vault_path =
                config
                    .general
                    .vault_path
                    .replacen('~', &home.to_string_lossy(), 1);
        }

        Ok(config)
    }

    pub fn defaults() -> Result<Self> {
        Self::from_toml_str(include_str!("../../config/default.toml"))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn vault_path(&self) -> PathBuf {
        PathBuf::from(&self.general.vault_path)
    }

    pub fn window_settings(&self) -> WindowSettings {
        WindowSettings {
            mode: if self.view.pages_view {
                WindowMode::Paged
            } else {
                WindowMode::Infinite
            },
            initial_count: clamp_positive("window.initial_count", self.window.initial_count),
            load_step: clamp_positive("window.load_step", self.window.load_step),
            page_size: clamp_positive("view.cards_per_page", self.view.cards_per_page),
            cards_per_batch: clamp_positive("window.cards_per_batch", self.window.cards_per_batch),
        }
    }

    /// The view state a freshly opened explorer starts from.
    pub fn view_state(&self) -> ViewState {
        ViewState {
            scope: ScopeConfig {
                container: self.view.folder.clone(),
                recursive: self.view.show_sub_folders,
                excluded: self.view.excluded_folders.clone(),
                tag: None,
            },
            sort: self.view.default_sort,
            query: String::new(),
            show_empty: self.view.show_empty_notes,
            window: Window::new(self.window_settings()),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.search.read_timeout_ms.max(1))
    }
}

fn clamp_positive(field: &str, value: i64) -> usize {
    if value < 1 {
        let err = ExplorerError::InvalidConfiguration(format!("{field} = {value} is not positive"));
        tracing::warn!("{err}, clamping to 1");
        return 1;
    }
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn default_log_filter() -> String {
    "notes_explorer=info".to_string()
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
