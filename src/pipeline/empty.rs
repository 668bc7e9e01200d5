//! Drop documents with no content beyond their frontmatter.

use std::sync::Arc;

use crate::model::document::Document;
use crate::source::{ContentProvider, FrontmatterParser};

use super::batch::{self, BatchOptions};

/// `true` when nothing but an optional leading frontmatter block and whitespace remains.
pub fn is_blank(text: &str, parser: &dyn FrontmatterParser) -> bool {
    let parsed = parser.parse(text);
    if !parsed.exists {
        return text.trim().is_empty();
    }

    let text = text.replace("\r\n", "\n");
    let block = if parsed.text.is_empty() {
        "---\n---".to_string()
    } else {
        format!("---\n{}\n---", parsed.text)
    };
    let body = match text.strip_prefix(block.as_str()) {
        Some(body) => body.to_string(),
        None => text.replacen(&block, "", 1),
    };
    body.trim().is_empty()
}

/// Keep the documents that have content, in input order.
///
/// Reads run concurrently and are joined before returning. A failed read counts as
/// empty; a read that never answers counts as not empty.
pub fn retain_non_empty(
    docs: Vec<Arc<Document>>,
    content: Arc<dyn ContentProvider>,
    frontmatter: Arc<dyn FrontmatterParser>,
    options: BatchOptions,
) -> Vec<Arc<Document>> {
    let keep = batch::join_all(docs.clone(), options, true, move |doc: &Arc<Document>| {
        match content.read(doc) {
            Ok(text) => !is_blank(&text, frontmatter.as_ref()),
            Err(err) => {
                tracing::warn!("treating {} as empty: {err}", doc.path);
                false
            }
        }
    });

    docs.into_iter()
        .zip(keep)
        .filter_map(|(doc, keep)| keep.then_some(doc))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MarkdownFrontmatter, MemoryVault};
    use std::time::{Duration, UNIX_EPOCH};

    fn blank(text: &str) -> bool {
        is_blank(text, &MarkdownFrontmatter)
    }

    #[test]
    fn whitespace_only_is_blank() {
        assert!(blank(""));
        assert!(blank("  \n\t\n"));
        assert!(!blank("x"));
    }

    #[test]
    fn frontmatter_only_is_blank() {
        assert!(blank("---\ntitle: a\ntags: [x]\n---\n\n   \n"));
        assert!(blank("---\r\ntitle: a\r\n---\r\n"));
        assert!(blank("---\n---\n"));
        assert!(!blank("---\ntitle: a\n---\nbody"));
    }

    #[test]
    fn horizontal_rule_is_content() {
        assert!(!blank("text\n---\n"));
    }

    fn seeded(entries: &[(&str, &str)]) -> (MemoryVault, Vec<Arc<Document>>) {
        let vault = MemoryVault::new();
        let docs = entries
            .iter()
            .map(|(path, content)| {
                let doc = Document::new(*path, UNIX_EPOCH, UNIX_EPOCH);
                vault.insert(doc.clone(), *content);
                Arc::new(doc)
            })
            .collect();
        (vault, docs)
    }

    #[test]
    fn keeps_order_and_drops_blank_and_unreadable() {
        let (vault, docs) = seeded(&[
            ("a.md", "alpha"),
            ("b.md", "---\nx: 1\n---\n"),
            ("c.md", "gamma"),
            ("d.md", "delta"),
        ]);
        vault.fail_reads("c.md");

        let kept = retain_non_empty(
            docs,
            Arc::new(vault),
            Arc::new(MarkdownFrontmatter),
            BatchOptions::new(4, Duration::from_secs(5)),
        );
        let paths: Vec<&str> = kept.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["a.md", "d.md"]);
    }

    #[test]
    fn stalled_read_counts_as_not_empty() {
        let (vault, docs) = seeded(&[("a.md", ""), ("slow.md", "")]);
        vault.stall_reads("slow.md", Duration::from_secs(10));

        let kept = retain_non_empty(
            docs,
            Arc::new(vault),
            Arc::new(MarkdownFrontmatter),
            BatchOptions::new(2, Duration::from_millis(200)),
        );
        let paths: Vec<&str> = kept.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["slow.md"]);
    }

    #[test]
    fn stalled_read_leaves_later_documents_checked() {
        let (vault, docs) = seeded(&[
            ("slow.md", ""),
            ("empty1.md", ""),
            ("empty2.md", "---\ntitle: x\n---\n"),
            ("real.md", "content"),
        ]);
        vault.stall_reads("slow.md", Duration::from_secs(10));

        let kept = retain_non_empty(
            docs,
            Arc::new(vault),
            Arc::new(MarkdownFrontmatter),
            BatchOptions::new(1, Duration::from_millis(200)),
        );
        let paths: Vec<&str> = kept.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["slow.md", "real.md"]);
    }
}
