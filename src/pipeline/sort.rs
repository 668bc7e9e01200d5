//! Deterministic card ordering: pinned first, then the active sort key.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use icu_collator::{Collator, CollatorBorrowed};

use crate::model::document::Document;
use crate::model::view::SortKey;

/// Drop non-card documents and order the rest. The sort is stable, so equal keys keep
/// their prior relative order. [`SortKey::Unsorted`] leaves the input order untouched.
pub fn sort(
    docs: Vec<Arc<Document>>,
    pinned: &HashSet<String>,
    key: SortKey,
) -> Vec<Arc<Document>> {
    let mut docs: Vec<Arc<Document>> = docs
        .into_iter()
        .filter(|doc| doc.is_card_eligible())
        .collect();

    if key == SortKey::Unsorted {
        return docs;
    }

    let names = NameCollator::new();
    docs.sort_by(|a, b| compare(a, b, pinned, key, &names));
    docs
}

pub fn compare(
    a: &Document,
    b: &Document,
    pinned: &HashSet<String>,
    key: SortKey,
    names: &NameCollator,
) -> Ordering {
    let a_pinned = pinned.contains(&a.path);
    let b_pinned = pinned.contains(&b.path);
    b_pinned.cmp(&a_pinned).then_with(|| match key {
        SortKey::NameAsc => names.compare(&a.name, &b.name),
        SortKey::NameDesc => names.compare(&b.name, &a.name),
        SortKey::EditedAsc => a.modified.cmp(&b.modified),
        SortKey::EditedDesc => b.modified.cmp(&a.modified),
        SortKey::CreatedAsc => a.created.cmp(&b.created),
        SortKey::CreatedDesc => b.created.cmp(&a.created),
        SortKey::Unsorted => Ordering::Equal,
    })
}

/// Display-name order under the root locale. Distinct names never tie: equal collation
/// keys fall back to the raw text.
pub struct NameCollator {
    collator: Option<CollatorBorrowed<'static>>,
}

impl NameCollator {
    pub fn new() -> Self {
        match Collator::try_new(Default::default(), Default::default()) {
            Ok(collator) => Self {
                collator: Some(collator),
            },
            Err(err) => {
                tracing::warn!("locale collation unavailable, ordering names by case-folded text: {err}");
                Self { collator: None }
            }
        }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let primary = match &self.collator {
            Some(collator) => collator.compare(a, b),
            None => a.to_lowercase().cmp(&b.to_lowercase()),
        };
        primary.then_with(|| a.cmp(b))
    }
}

impl Default for NameCollator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn doc(path: &str, created: u64, modified: u64) -> Arc<Document> {
        Arc::new(Document::new(
            path,
            UNIX_EPOCH + Duration::from_secs(created),
            UNIX_EPOCH + Duration::from_secs(modified),
        ))
    }

    fn paths(docs: &[Arc<Document>]) -> Vec<&str> {
        docs.iter().map(|d| d.path.as_str()).collect()
    }

    #[test]
    fn created_desc_newest_first() {
        let docs = vec![doc("doc1.md", 1, 0), doc("doc2.md", 2, 0), doc("doc3.md", 3, 0)];
        let sorted = sort(docs, &HashSet::new(), SortKey::CreatedDesc);
        assert_eq!(paths(&sorted), ["doc3.md", "doc2.md", "doc1.md"]);
    }

    #[test]
    fn names_ignore_case_at_first_level() {
        let docs = vec![doc("b.md", 0, 0), doc("Cherry.md", 0, 0), doc("apple.md", 0, 0)];
        let sorted = sort(docs.clone(), &HashSet::new(), SortKey::NameAsc);
        assert_eq!(paths(&sorted), ["apple.md", "b.md", "Cherry.md"]);
        let sorted = sort(docs, &HashSet::new(), SortKey::NameDesc);
        assert_eq!(paths(&sorted), ["Cherry.md", "b.md", "apple.md"]);
    }

    #[test]
    fn accented_names_sort_with_their_base_letter() {
        let docs = vec![
            doc("zebra.md", 0, 0),
            doc("éclair.md", 0, 0),
            doc("fig.md", 0, 0),
            doc("eagle.md", 0, 0),
        ];
        let sorted = sort(docs, &HashSet::new(), SortKey::NameAsc);
        assert_eq!(paths(&sorted), ["eagle.md", "éclair.md", "fig.md", "zebra.md"]);
    }

    #[test]
    fn case_variants_never_tie() {
        let names = NameCollator::new();
        assert_ne!(names.compare("apple", "Apple"), Ordering::Equal);
        assert_eq!(names.compare("apple", "apple"), Ordering::Equal);
    }

    #[test]
    fn pinned_first_then_key() {
        let docs = vec![doc("a.md", 0, 1), doc("b.md", 0, 2), doc("c.md", 0, 3)];
        let pinned = HashSet::from(["a.md".to_string()]);
        let sorted = sort(docs, &pinned, SortKey::EditedDesc);
        assert_eq!(paths(&sorted), ["a.md", "c.md", "b.md"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let docs = vec![doc("x.md", 5, 5), doc("y.md", 5, 5), doc("w.md", 5, 5)];
        let sorted = sort(docs, &HashSet::new(), SortKey::EditedAsc);
        assert_eq!(paths(&sorted), ["x.md", "y.md", "w.md"]);
    }

    #[test]
    fn unsorted_keeps_input_order_and_ignores_pins() {
        let docs = vec![doc("b.md", 2, 0), doc("a.md", 1, 0)];
        let pinned = HashSet::from(["a.md".to_string()]);
        assert_eq!(paths(&sort(docs, &pinned, SortKey::Unsorted)), ["b.md", "a.md"]);
    }

    #[test]
    fn drawings_are_dropped() {
        let docs = vec![doc("plan.excalidraw.md", 0, 0), doc("plan.md", 0, 0)];
        assert_eq!(
            paths(&sort(docs, &HashSet::new(), SortKey::NameAsc)),
            ["plan.md"]
        );
    }

    fn arb_docs() -> impl Strategy<Value = (Vec<Arc<Document>>, HashSet<String>)> {
        prop::collection::vec(("[a-dA-D]{1,3}", 0u64..5, 0u64..5, any::<bool>()), 0..24).prop_map(
            |rows| {
                let mut pinned = HashSet::new();
                let docs = rows
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, created, modified, pin))| {
                        let path = format!("f{i}/{name}.md");
                        if pin {
                            pinned.insert(path.clone());
                        }
                        doc(&path, created, modified)
                    })
                    .collect();
                (docs, pinned)
            },
        )
    }

    proptest! {
        #[test]
        fn pinned_always_precede_unpinned((docs, pinned) in arb_docs(), key in 0usize..6) {
            let key = SortKey::ALL[key];
            let sorted = sort(docs, &pinned, key);
            let first_unpinned = sorted.iter().position(|d| !pinned.contains(&d.path));
            if let Some(first) = first_unpinned {
                prop_assert!(sorted[first..].iter().all(|d| !pinned.contains(&d.path)));
            }
        }

        #[test]
        fn sorting_is_idempotent((docs, pinned) in arb_docs(), key in 0usize..6) {
            let key = SortKey::ALL[key];
            let once = sort(docs, &pinned, key);
            let twice = sort(once.clone(), &pinned, key);
            prop_assert_eq!(paths(&once), paths(&twice));
        }
    }
}
