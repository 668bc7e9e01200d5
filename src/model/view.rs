use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::window::Window;

/// Card ordering. Unknown names deserialize to [`SortKey::Unsorted`], which keeps input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    NameAsc,
    NameDesc,
    EditedAsc,
    #[default]
    EditedDesc,
    CreatedAsc,
    CreatedDesc,
    #[serde(other)]
    Unsorted,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::NameAsc,
        SortKey::NameDesc,
        SortKey::EditedAsc,
        SortKey::EditedDesc,
        SortKey::CreatedAsc,
        SortKey::CreatedDesc,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::NameAsc => "name-asc",
            SortKey::NameDesc => "name-desc",
            SortKey::EditedAsc => "edited-asc",
            SortKey::EditedDesc => "edited-desc",
            SortKey::CreatedAsc => "created-asc",
            SortKey::CreatedDesc => "created-desc",
            SortKey::Unsorted => "unsorted",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SortKey::ALL
            .into_iter()
            .find(|key| key.label() == s.trim())
            .unwrap_or(SortKey::Unsorted))
    }
}

/// Which documents are eligible for the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeConfig {
    /// Container folder; empty means the whole vault.
    pub container: String,
    pub recursive: bool,
    /// Excluded folder prefixes, matched on path segment boundaries.
    pub excluded: Vec<String>,
    /// Only documents carrying this tag (set when a tag is opened in the view).
    pub tag: Option<String>,
}

impl ScopeConfig {
    pub fn folder(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            ..Self::default()
        }
    }
}

/// The complete view configuration, owned by the [`Explorer`](crate::Explorer).
#[derive(Debug, Clone)]
pub struct ViewState {
    pub scope: ScopeConfig,
    pub sort: SortKey,
    pub query: String,
    pub show_empty: bool,
    pub window: Window,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scope: ScopeConfig::default(),
            sort: SortKey::default(),
            query: String::new(),
            show_empty: false,
            window: Window::infinite(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_parses_labels_and_falls_back_to_unsorted() {
        for key in SortKey::ALL {
            assert_eq!(key.label().parse::<SortKey>().unwrap(), key);
        }
        assert_eq!("by-color".parse::<SortKey>().unwrap(), SortKey::Unsorted);
    }

    #[test]
    fn sort_key_deserializes_unknown_as_unsorted() {
        #[derive(Deserialize)]
        struct Holder {
            key: SortKey,
        }
        let known: Holder = toml::from_str("key = \"created-desc\"").unwrap();
        assert_eq!(known.key, SortKey::CreatedDesc);
        let unknown: Holder = toml::from_str("key = \"shuffle\"").unwrap();
        assert_eq!(unknown.key, SortKey::Unsorted);
    }
}
