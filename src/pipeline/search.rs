//! Fuzzy filter over content, display name and tags. Never reorders.

use std::sync::Arc;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::model::document::Document;
use crate::source::{ContentProvider, TagResolver};

use super::batch::{self, BatchOptions};

/// Default inclusion threshold: any positive score passes.
pub const DEFAULT_MIN_SCORE: i64 = 0;

/// Fuzzy scores of one document; `None` means no match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scores {
    pub content: Option<i64>,
    pub name: Option<i64>,
    pub tags: Option<i64>,
}

impl Scores {
    pub fn best(&self) -> Option<i64> {
        [self.content, self.name, self.tags].into_iter().flatten().max()
    }

    /// Retained iff at least one score is strictly above `min_score`.
    pub fn passes(&self, min_score: i64) -> bool {
        self.best().is_some_and(|score| score > min_score)
    }
}

/// Tags as one searchable line.
pub fn tag_line<S: AsRef<str>>(tags: &[S]) -> String {
    tags.iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn score(query: &str, content: Option<&str>, name: &str, tags: &[String]) -> Scores {
    let matcher = SkimMatcherV2::default();
    let tags = tag_line(tags);
    Scores {
        content: content.and_then(|text| matcher.fuzzy_match(text, query)),
        name: matcher.fuzzy_match(name, query),
        tags: if tags.is_empty() {
            None
        } else {
            matcher.fuzzy_match(&tags, query)
        },
    }
}

/// Documents matching `query`, in input order. An empty query passes everything through.
///
/// A failed content read only loses the content score; a document whose scoring never
/// finishes is treated as no match.
pub fn filter(
    docs: Vec<Arc<Document>>,
    query: &str,
    min_score: i64,
    content: Arc<dyn ContentProvider>,
    tags: Arc<dyn TagResolver>,
    options: BatchOptions,
) -> Vec<Arc<Document>> {
    let query = query.trim().to_string();
    if query.is_empty() {
        return docs;
    }

    let keep = batch::join_all(docs.clone(), options, false, move |doc: &Arc<Document>| {
        let text = match content.read(doc) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::warn!("searching {} without content: {err}", doc.path);
                None
            }
        };
        let doc_tags = tags.tags_of(doc);
        score(&query, text.as_deref(), &doc.name, &doc_tags).passes(min_score)
    });

    docs.into_iter()
        .zip(keep)
        .filter_map(|(doc, keep)| keep.then_some(doc))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryVault;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn exact_content_match_passes_threshold() {
        let query = "meeting notes";
        let scores = score(query, Some("meeting notes"), "zzz", &[]);
        assert!(scores.content.is_some_and(|s| s > DEFAULT_MIN_SCORE));
        assert!(scores.passes(DEFAULT_MIN_SCORE));
    }

    #[test]
    fn disjoint_characters_do_not_match() {
        let scores = score("xyz", Some("abc def"), "abc", &["#abc".to_string()]);
        assert_eq!(scores, Scores::default());
        assert!(!scores.passes(DEFAULT_MIN_SCORE));
    }

    #[test]
    fn name_and_tags_score_independently() {
        let scores = score("roadmap", None, "Roadmap 2025", &[]);
        assert!(scores.name.is_some());
        assert!(scores.content.is_none());

        let scores = score("#urgent", Some("nothing here"), "todo", &["#urgent".into()]);
        assert!(scores.tags.is_some());
    }

    #[test]
    fn tags_join_with_spaces() {
        assert_eq!(tag_line(&["#a", "#b"]), "#a #b");
        assert_eq!(tag_line::<&str>(&[]), "");
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
    fn filter_keeps_sorted_order() {
        let (vault, docs) = seeded(&[
            ("z-garden.md", "tomatoes and basil"),
            ("a.md", "unrelated"),
            ("m.md", "more about basil"),
        ]);
        let kept = filter(
            docs,
            "basil",
            DEFAULT_MIN_SCORE,
            Arc::new(vault.clone()),
            Arc::new(vault),
            BatchOptions::new(3, Duration::from_secs(5)),
        );
        let paths: Vec<&str> = kept.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["z-garden.md", "m.md"]);
    }

    #[test]
    fn unreadable_document_can_still_match_by_name() {
        let (vault, docs) = seeded(&[("basil.md", "x"), ("other.md", "basil")]);
        vault.fail_reads("basil.md");
        vault.fail_reads("other.md");
        let kept = filter(
            docs,
            "basil",
            DEFAULT_MIN_SCORE,
            Arc::new(vault.clone()),
            Arc::new(vault),
            BatchOptions::new(2, Duration::from_secs(5)),
        );
        let paths: Vec<&str> = kept.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["basil.md"]);
    }

    #[test]
    fn empty_query_passes_through() {
        let (vault, docs) = seeded(&[("b.md", ""), ("a.md", "")]);
        let kept = filter(
            docs.clone(),
            "   ",
            DEFAULT_MIN_SCORE,
            Arc::new(vault.clone()),
            Arc::new(vault),
            BatchOptions::default(),
        );
        assert_eq!(kept, docs);
    }

    #[test]
    fn stalled_read_only_loses_that_document() {
        let (vault, docs) = seeded(&[("slow2.md", "basil"), ("basil.md", "basil")]);
        vault.stall_reads("slow2.md", Duration::from_secs(10));
        let kept = filter(
            docs,
            "basil",
            DEFAULT_MIN_SCORE,
            Arc::new(vault.clone()),
            Arc::new(vault),
            BatchOptions::new(1, Duration::from_millis(200)),
        );
        let paths: Vec<&str> = kept.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["basil.md"]);
    }
}
