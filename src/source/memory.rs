use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{ExplorerError, Result};
use crate::model::document::Document;

use super::markdown::{MarkdownFrontmatter, extract_tags};
use super::{
    Collaborators, ContentProvider, DocumentSource, EventHandler, SourceEvent, TagResolver,
    TagSet,
};

/// An in-memory vault. Every mutation is reported to the subscribed handler,
/// the same way a filesystem watcher would.
#[derive(Clone, Default)]
pub struct MemoryVault {
    inner: Arc<Mutex<VaultInner>>,
}

#[derive(Default)]
struct VaultInner {
    documents: Vec<Document>,
    contents: HashMap<String, String>,
    tags: HashMap<String, TagSet>,
    failing: HashSet<String>,
    stalled: HashMap<String, Duration>,
    offline: bool,
    handler: Option<Arc<EventHandler>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            source: Box::new(self.clone()),
            content: Arc::new(self.clone()),
            frontmatter: Arc::new(MarkdownFrontmatter),
            tags: Arc::new(self.clone()),
        }
    }

    /// Seed a document without emitting an event.
    pub fn insert(&self, doc: Document, content: impl Into<String>) {
        let mut inner = self.lock();
        inner.contents.insert(doc.path.clone(), content.into());
        inner.documents.retain(|d| d.path != doc.path);
        inner.documents.push(doc);
    }

    pub fn add(&self, doc: Document, content: impl Into<String>) {
        self.insert(doc.clone(), content);
        self.emit(SourceEvent::Added(doc));
    }

    pub fn modify(&self, doc: Document, content: impl Into<String>) {
        {
            let mut inner = self.lock();
            inner.contents.insert(doc.path.clone(), content.into());
            if let Some(slot) = inner.documents.iter_mut().find(|d| d.path == doc.path) {
                *slot = doc.clone();
            } else {
                inner.documents.push(doc.clone());
            }
        }
        self.emit(SourceEvent::Modified(doc));
    }

    pub fn remove(&self, path: &str) {
        {
            let mut inner = self.lock();
            inner.documents.retain(|d| d.path != path);
            inner.contents.remove(path);
            inner.tags.remove(path);
        }
        self.emit(SourceEvent::Deleted(path.to_string()));
    }

    pub fn rename(&self, from: &str, to: &str) {
        {
            let mut inner = self.lock();
            if inner.documents.iter().any(|d| d.path == from) {
                inner.documents.retain(|d| d.path != to);
            }
            if let Some(slot) = inner.documents.iter_mut().find(|d| d.path == from) {
                *slot = slot.renamed(to);
            }
            if let Some(content) = inner.contents.remove(from) {
                inner.contents.insert(to.to_string(), content);
            }
            if let Some(tags) = inner.tags.remove(from) {
                inner.tags.insert(to.to_string(), tags);
            }
        }
        self.emit(SourceEvent::Renamed {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    /// Override the resolved tags of a document. Takes effect on the next lookup.
    pub fn set_tags<I, S>(&self, path: &str, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags = tags
            .into_iter()
            .map(|t| super::markdown::normalize_tag(t.as_ref()))
            .collect();
        self.lock().tags.insert(path.to_string(), tags);
    }

    pub fn resolve_metadata(&self) {
        self.emit(SourceEvent::MetadataResolved);
    }

    /// Make every read of `path` fail.
    pub fn fail_reads(&self, path: &str) {
        self.lock().failing.insert(path.to_string());
    }

    /// Make every read of `path` block for `delay` before answering.
    pub fn stall_reads(&self, path: &str, delay: Duration) {
        self.lock().stalled.insert(path.to_string(), delay);
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    fn emit(&self, event: SourceEvent) {
        let handler = self.lock().handler.clone();
        if let Some(handler) = handler {
            (*handler)(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, VaultInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentSource for MemoryVault {
    fn list_all(&self) -> Result<Vec<Document>> {
        let inner = self.lock();
        if inner.offline {
            return Err(ExplorerError::SourceUnavailable("memory vault offline".into()));
        }
        Ok(inner.documents.clone())
    }

    fn subscribe(&mut self, handler: EventHandler) -> Result<()> {
        self.lock().handler = Some(Arc::new(handler));
        Ok(())
    }

    fn has_folder(&self, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_matches('/'));
        self.lock()
            .documents
            .iter()
            .any(|d| d.path.starts_with(&prefix))
    }
}

impl ContentProvider for MemoryVault {
    fn read(&self, doc: &Document) -> Result<String> {
        let delay = self.lock().stalled.get(&doc.path).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let inner = self.lock();
        if inner.failing.contains(&doc.path) {
            return Err(ExplorerError::content_read(&doc.path, "read refused"));
        }
        inner
            .contents
            .get(&doc.path)
            .cloned()
            .ok_or_else(|| ExplorerError::content_read(&doc.path, "no such document"))
    }
}

impl TagResolver for MemoryVault {
    fn tags_of(&self, doc: &Document) -> TagSet {
        let inner = self.lock();
        if let Some(tags) = inner.tags.get(&doc.path) {
            return tags.clone();
        }
        inner
            .contents
            .get(&doc.path)
            .map(|content| extract_tags(content))
            .unwrap_or_default()
    }
}
