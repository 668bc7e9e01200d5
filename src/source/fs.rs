use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use ignore::WalkBuilder;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{ExplorerError, Result};
use crate::model::document::Document;

use super::markdown::{MarkdownFrontmatter, extract_tags, split_frontmatter};
use super::{
    Collaborators, ContentProvider, DocumentSource, EventHandler, SourceEvent, TagResolver,
    TagSet,
};

/// A vault of markdown files rooted at a directory on disk.
///
/// Tags are resolved while a file is read for its frontmatter (during the walk and on
/// watcher events) and served from a cache, so tag lookups never touch the disk.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    tags: Arc<Mutex<HashMap<String, TagSet>>>,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tags: Arc::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            source: Box::new(self.clone()),
            content: Arc::new(self.clone()),
            frontmatter: Arc::new(MarkdownFrontmatter),
            tags: Arc::new(self.clone()),
        }
    }

    /// Build the document for a file on disk, or `None` if it is not a readable markdown file.
    /// Refreshes the cached tags of the file.
    pub fn document_at(&self, abs: &Path) -> Option<Document> {
        if !is_markdown(abs) {
            return None;
        }
        let rel = relative_path(&self.root, abs)?;
        let metadata = fs::metadata(abs).ok()?;
        if !metadata.is_file() {
            return None;
        }

        let modified = metadata.modified().ok()?;
        let created = metadata.created().unwrap_or(modified);
        let text = fs::read_to_string(abs).ok();

        let tags = text.as_deref().map(extract_tags).unwrap_or_default();
        self.tag_cache().insert(rel.clone(), tags);

        let doc = Document::new(rel, created, modified);
        match text.as_deref().and_then(split_frontmatter) {
            Some((frontmatter, _)) => Some(doc.with_frontmatter(frontmatter)),
            None => Some(doc),
        }
    }

    /// Events for a change that needs no rename pairing.
    fn translate(&self, event: notify::Event) -> Vec<SourceEvent> {
        match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
                self.translate_rename(&event.paths[0], &event.paths[1])
            }
            EventKind::Create(_) => event
                .paths
                .iter()
                .filter_map(|path| self.document_at(path))
                .map(SourceEvent::Added)
                .collect(),
            EventKind::Modify(_) => event
                .paths
                .iter()
                .filter(|path| is_markdown(path))
                .filter_map(|path| match self.document_at(path) {
                    Some(doc) => Some(SourceEvent::Modified(doc)),
                    None => self.removed(path),
                })
                .collect(),
            EventKind::Remove(_) => event
                .paths
                .iter()
                .filter_map(|path| self.removed(path))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn translate_rename(&self, from_abs: &Path, to_abs: &Path) -> Vec<SourceEvent> {
        let from = relative_path(&self.root, from_abs).filter(|_| is_markdown(from_abs));
        let Some(from) = from else {
            return self
                .document_at(to_abs)
                .map(SourceEvent::Added)
                .into_iter()
                .collect();
        };

        match relative_path(&self.root, to_abs).filter(|_| is_markdown(to_abs)) {
            Some(to) => {
                let mut cache = self.tag_cache();
                if let Some(tags) = cache.remove(&from) {
                    cache.insert(to.clone(), tags);
                }
                vec![SourceEvent::Renamed { from, to }]
            }
            None => {
                self.tag_cache().remove(&from);
                vec![SourceEvent::Deleted(from)]
            }
        }
    }

    fn removed(&self, abs: &Path) -> Option<SourceEvent> {
        if !is_markdown(abs) {
            return None;
        }
        let rel = relative_path(&self.root, abs)?;
        self.tag_cache().remove(&rel);
        Some(SourceEvent::Deleted(rel))
    }

    fn tag_cache(&self) -> MutexGuard<'_, HashMap<String, TagSet>> {
        self.tags.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// First half of a rename, waiting for its counterpart.
#[derive(Debug)]
struct PendingRename {
    from: PathBuf,
    tracker: Option<usize>,
    to: Option<PathBuf>,
}

/// Turns raw watcher events into [`SourceEvent`]s.
///
/// Backends report one move as `From`, then `To`, then `Both`. The halves are held back
/// so the move surfaces as a single rename. A `From` that is never completed (the file
/// left the vault) is flushed as a delete by the next event.
#[derive(Debug)]
pub struct EventTranslator {
    vault: FsVault,
    pending: Option<PendingRename>,
}

impl EventTranslator {
    pub fn new(vault: FsVault) -> Self {
        Self {
            vault,
            pending: None,
        }
    }

    pub fn translate(&mut self, event: notify::Event) -> Vec<SourceEvent> {
        let mut out = Vec::new();
        match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                self.flush(&mut out);
                if let Some(from) = event.paths.into_iter().next() {
                    self.pending = Some(PendingRename {
                        from,
                        tracker: event.attrs.tracker(),
                        to: None,
                    });
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                let tracker = event.attrs.tracker();
                match &mut self.pending {
                    Some(pending)
                        if pending.to.is_none() && same_move(pending.tracker, tracker) =>
                    {
                        pending.to = event.paths.into_iter().next();
                    }
                    _ => {
                        self.flush(&mut out);
                        out.extend(
                            event
                                .paths
                                .iter()
                                .filter_map(|path| self.vault.document_at(path))
                                .map(SourceEvent::Added),
                        );
                    }
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
                if self
                    .pending
                    .as_ref()
                    .is_some_and(|pending| pending.from == event.paths[0])
                {
                    self.pending = None;
                } else {
                    self.flush(&mut out);
                }
                out.extend(self.vault.translate(event));
            }
            _ => {
                self.flush(&mut out);
                out.extend(self.vault.translate(event));
            }
        }
        out
    }

    fn flush(&mut self, out: &mut Vec<SourceEvent>) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        match pending.to {
            Some(to) => out.extend(self.vault.translate_rename(&pending.from, &to)),
            None => out.extend(self.vault.removed(&pending.from)),
        }
    }
}

fn same_move(a: Option<usize>, b: Option<usize>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

impl DocumentSource for FsVault {
    fn list_all(&self) -> Result<Vec<Document>> {
        if !self.root.is_dir() {
            return Err(ExplorerError::SourceUnavailable(format!(
                "vault root {} is not a directory",
                self.root.display()
            )));
        }

        self.tag_cache().clear();
        Ok(WalkBuilder::new(&self.root)
            .hidden(false)
            .build()
            .flatten()
            .filter_map(|entry| self.document_at(entry.path()))
            .collect())
    }

    fn subscribe(&mut self, handler: EventHandler) -> Result<()> {
        let vault = self.clone();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();

        thread::spawn(move || {
            let root = vault.root.clone();
            let mut translator = EventTranslator::new(vault);
            let mut watcher: RecommendedWatcher =
                match notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                    match res {
                        Ok(event) => {
                            for change in translator.translate(event) {
                                handler(change);
                            }
                        }
                        Err(err) => {
                            tracing::warn!("file watcher error: {err}");
                        }
                    }
                }) {
                    Ok(w) => w,
                    Err(err) => {
                        let _ = ready_tx.send(Err(ExplorerError::SourceUnavailable(format!(
                            "failed to initialize file watcher: {err}"
                        ))));
                        return;
                    }
                };

            if let Err(err) = watcher.watch(&root, RecursiveMode::Recursive) {
                let _ = ready_tx.send(Err(ExplorerError::SourceUnavailable(format!(
                    "failed to watch vault path {}: {err}",
                    root.display()
                ))));
                return;
            }

            let _ = ready_tx.send(Ok(()));
            loop {
                thread::park();
            }
        });

        ready_rx.recv().unwrap_or_else(|_| {
            Err(ExplorerError::SourceUnavailable(
                "file watcher thread exited".to_string(),
            ))
        })
    }

    fn has_folder(&self, path: &str) -> bool {
        self.root.join(path.trim_matches('/')).is_dir()
    }
}

impl ContentProvider for FsVault {
    fn read(&self, doc: &Document) -> Result<String> {
        fs::read_to_string(self.root.join(&doc.path))
            .map_err(|err| ExplorerError::content_read(&doc.path, err))
    }
}

impl TagResolver for FsVault {
    /// Cached tags only; a file the vault has not read yet has none.
    fn tags_of(&self, doc: &Document) -> TagSet {
        self.tag_cache().get(&doc.path).cloned().unwrap_or_default()
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}

/// Vault-relative path with `/` separators.
fn relative_path(root: &Path, abs: &Path) -> Option<String> {
    let rel = abs.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<_>>()?;
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
