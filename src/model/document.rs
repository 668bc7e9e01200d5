use std::time::SystemTime;

/// Suffix of drawing-annotation notes. They are never shown as cards.
pub const DRAWING_SUFFIX: &str = ".excalidraw.md";

/// A single note as seen by the view pipeline.
///
/// `path` is the only identity key. Content is not held here; it is read on demand
/// through a [`ContentProvider`](crate::source::ContentProvider).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Vault-relative path using `/` separators, e.g. `Notes/today.md`.
    pub path: String,
    /// Display name (file stem).
    pub name: String,
    pub has_frontmatter: bool,
    pub frontmatter: String,
    pub created: SystemTime,
    pub modified: SystemTime,
}

impl Document {
    pub fn new(path: impl Into<String>, created: SystemTime, modified: SystemTime) -> Self {
        let path = path.into();
        Self {
            name: display_name(&path),
            path,
            has_frontmatter: false,
            frontmatter: String::new(),
            created,
            modified,
        }
    }

    pub fn with_frontmatter(mut self, frontmatter: impl Into<String>) -> Self {
        self.has_frontmatter = true;
        self.frontmatter = frontmatter.into();
        self
    }

    /// Move the document to `to`, keeping every other attribute.
    pub fn renamed(&self, to: &str) -> Self {
        Self {
            path: to.to_string(),
            name: display_name(to),
            ..self.clone()
        }
    }

    /// Whether this document may appear as a card at all, regardless of settings.
    pub fn is_card_eligible(&self) -> bool {
        !self.path.ends_with(DRAWING_SUFFIX)
    }
}

/// File stem of a vault path: `Notes/today.md` → `today`.
pub fn display_name(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn display_name_strips_folder_and_extension() {
        assert_eq!(display_name("Notes/today.md"), "today");
        assert_eq!(display_name("plain"), "plain");
        assert_eq!(display_name("a/.hidden"), ".hidden");
        assert_eq!(display_name("a/b/c.tar.md"), "c.tar");
    }

    #[test]
    fn rename_keeps_timestamps_and_frontmatter() {
        let doc = Document::new("a/one.md", UNIX_EPOCH, UNIX_EPOCH).with_frontmatter("tags: x");
        let moved = doc.renamed("b/two.md");
        assert_eq!(moved.path, "b/two.md");
        assert_eq!(moved.name, "two");
        assert_eq!(moved.frontmatter, "tags: x");
        assert_eq!(moved.renamed("a/one.md"), doc);
    }

    #[test]
    fn drawings_are_not_cards() {
        let doc = Document::new("Sketch.excalidraw.md", UNIX_EPOCH, UNIX_EPOCH);
        assert!(!doc.is_card_eligible());
        assert!(Document::new("Sketch.md", UNIX_EPOCH, UNIX_EPOCH).is_card_eligible());
    }
}
