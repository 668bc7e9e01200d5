use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use crate::error::ExplorerError;
use crate::model::config::AppConfig;
use crate::model::document::Document;
use crate::model::view::{ScopeConfig, SortKey, ViewState};
use crate::model::window::WindowStatus;
use crate::msg::Msg;
use crate::pipeline::batch::BatchOptions;
use crate::pipeline::search::DEFAULT_MIN_SCORE;
use crate::pipeline::{empty, scope, search, sort, tags};
use crate::source::{Collaborators, SourceEvent, TagSet};

/// Pipeline stages that can be restarted, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Scope,
    Sort,
    Empty,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerOptions {
    /// Search inclusion threshold; a score must be strictly greater.
    pub min_score: i64,
    pub batch: BatchOptions,
}

impl Default for ExplorerOptions {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            batch: BatchOptions::default(),
        }
    }
}

impl ExplorerOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_score: config.search.min_score,
            batch: BatchOptions::new(config.search.workers, config.read_timeout()),
        }
    }
}

/// Owns the view state and decides, per event, which stages must recompute.
///
/// Handlers run one at a time through [`Explorer::update`]. The empty filter and the
/// search run on background threads and report back through the message channel; each
/// result carries the generation it was started under and is dropped unless that is
/// still the current generation.
pub struct Explorer {
    state: ViewState,
    generation: u64,
    documents: Vec<Arc<Document>>,
    pinned: HashSet<String>,
    tag_cache: HashMap<String, TagSet>,
    scoped: Vec<Arc<Document>>,
    sorted: Vec<Arc<Document>>,
    /// Empty-filter output for the current generation; `None` while it is being computed.
    filtered: Option<Vec<Arc<Document>>>,
    /// Last published search output, the input of the window.
    results: Vec<Arc<Document>>,
    displayed: Vec<Arc<Document>>,
    tags: Vec<String>,
    pending: Option<Stage>,
    refresh_requested: bool,
    collaborators: Collaborators,
    options: ExplorerOptions,
    event_tx: mpsc::Sender<Msg>,
    pub should_quit: bool,
}

impl Explorer {
    pub fn new(
        state: ViewState,
        pinned: impl IntoIterator<Item = String>,
        options: ExplorerOptions,
        collaborators: Collaborators,
        event_tx: mpsc::Sender<Msg>,
    ) -> Self {
        Self {
            state,
            generation: 0,
            documents: Vec::new(),
            pinned: pinned.into_iter().collect(),
            tag_cache: HashMap::new(),
            scoped: Vec::new(),
            sorted: Vec::new(),
            filtered: None,
            results: Vec::new(),
            displayed: Vec::new(),
            tags: Vec::new(),
            pending: None,
            refresh_requested: false,
            collaborators,
            options,
            event_tx,
            should_quit: false,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        collaborators: Collaborators,
        event_tx: mpsc::Sender<Msg>,
    ) -> Self {
        Self::new(
            config.view_state(),
            config.view.pinned_files.iter().cloned(),
            ExplorerOptions::from_config(config),
            collaborators,
            event_tx,
        )
    }

    /// Subscribe to the document source and run the first full scan.
    pub fn start(&mut self) {
        let tx = self.event_tx.clone();
        let subscribed = self
            .collaborators
            .source
            .subscribe(Box::new(move |event| {
                let _ = tx.send(Msg::Source(event));
            }));
        if let Err(err) = subscribed {
            tracing::warn!("live updates disabled: {err}");
        }
        self.rescan();
    }

    // ── Outputs ──────────────────────────────────────────────────

    pub fn displayed(&self) -> &[Arc<Document>] {
        &self.displayed
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn status(&self) -> WindowStatus {
        self.state.window.status()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `true` while a batch for the current generation is still running.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pinned(&self) -> &HashSet<String> {
        &self.pinned
    }

    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    pub fn refresh_requested(&self) -> bool {
        self.refresh_requested
    }

    // ── Update ───────────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) {
        match msg {
            Msg::Source(event) => self.handle_source_event(event),
            Msg::Rescan => self.rescan(),
            Msg::SetScope(scope) => {
                self.state.scope = scope;
                self.rescan();
            }
            Msg::SetExcluded(excluded) => {
                self.state.scope.excluded = excluded;
                self.rescan();
            }
            Msg::SetSort(key) => {
                self.state.sort = key;
                self.rescan();
            }
            Msg::SetShowEmpty(show) => {
                self.state.show_empty = show;
                self.rescan();
            }
            Msg::TogglePin(path) => self.toggle_pin(path),
            Msg::OpenFolder(folder) => self.open_scope(ScopeConfig {
                container: folder,
                recursive: false,
                excluded: self.state.scope.excluded.clone(),
                tag: None,
            }),
            Msg::OpenTag(tag) => self.open_scope(ScopeConfig {
                container: String::new(),
                recursive: true,
                excluded: self.state.scope.excluded.clone(),
                tag: Some(tag),
            }),
            Msg::SetQuery(query) => self.set_query(query),
            Msg::RequestMore => {
                if self.state.window.request_more() {
                    self.publish_window();
                }
            }
            Msg::NextPage => {
                self.state.window.next_page();
                self.publish_window();
            }
            Msg::PrevPage => {
                self.state.window.prev_page();
                self.publish_window();
            }
            Msg::GoToPage(page) => {
                self.state.window.go_to_page(page);
                self.publish_window();
            }
            Msg::SetWindowMode(mode) => {
                self.state.window.set_mode(mode);
                self.publish_window();
            }
            Msg::SetPageSize(size) => {
                self.state.window.set_page_size(size);
                self.publish_window();
            }
            Msg::ResetView => self.reset_view(),
            Msg::Resize(_w, _h) => {
                self.refresh_requested = true;
                if self.pending.is_none() {
                    self.publish_window();
                }
            }
            Msg::EmptyFiltered {
                generation,
                documents,
            } => self.finish_empty_filter(generation, documents),
            Msg::SearchFinished {
                generation,
                documents,
            } => self.finish_search(generation, documents),
            Msg::Quit => self.should_quit = true,
        }
    }

    fn handle_source_event(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Added(doc) => self.on_added(doc),
            SourceEvent::Modified(doc) => self.on_modified(doc),
            SourceEvent::Deleted(path) => self.on_deleted(&path),
            SourceEvent::Renamed { from, to } => self.on_renamed(&from, &to),
            SourceEvent::MetadataResolved => self.on_metadata_resolved(),
        }
    }

    fn on_added(&mut self, doc: Document) {
        if self.position(&doc.path).is_some() {
            self.on_modified(doc);
            return;
        }

        self.tag_cache.remove(&doc.path);
        let doc = Arc::new(doc);
        let visible = self.in_scope(&doc);
        self.documents.push(Arc::clone(&doc));

        if visible {
            tracing::debug!("added {}", doc.path);
            self.invalidate(Stage::Scope);
        } else {
            tracing::trace!("added {} outside scope", doc.path);
        }
    }

    fn on_modified(&mut self, doc: Document) {
        let Some(idx) = self.position(&doc.path) else {
            self.on_added(doc);
            return;
        };

        self.tag_cache.remove(&doc.path);
        let previous = Arc::clone(&self.documents[idx]);
        let was_visible = self.in_scope(&previous);
        let doc = Arc::new(doc);
        let visible = self.in_scope(&doc);
        self.documents[idx] = doc;

        if was_visible || visible {
            tracing::debug!("modified {}", previous.path);
            self.invalidate(Stage::Scope);
        }
    }

    fn on_deleted(&mut self, path: &str) {
        let before = self.documents.len();
        self.documents.retain(|doc| doc.path != path);
        self.pinned.remove(path);
        self.tag_cache.remove(path);

        if self.documents.len() == before {
            tracing::trace!("delete of unknown document {path}");
            return;
        }

        tracing::debug!("deleted {path}");
        self.invalidate(Stage::Scope);
    }

    fn on_renamed(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }

        let Some(idx) = self.position(from) else {
            self.on_rename_already_applied(from, to);
            return;
        };

        // A document already at `to` is overwritten, along with its pin and tags.
        let overwritten = self.position(to).map(|i| Arc::clone(&self.documents[i]));
        let overwritten_visible = match overwritten {
            Some(doc) => self.in_scope(&doc),
            None => false,
        };
        self.pinned.remove(to);
        self.tag_cache.remove(to);

        let previous = Arc::clone(&self.documents[idx]);
        let was_visible = self.in_scope(&previous);

        if let Some(tags) = self.tag_cache.remove(from) {
            self.tag_cache.insert(to.to_string(), tags);
        }
        if self.pinned.remove(from) {
            self.pinned.insert(to.to_string());
        }

        let renamed = Arc::new(previous.renamed(to));
        let visible = self.in_scope(&renamed);
        self.documents[idx] = renamed;
        let mut position = 0;
        self.documents.retain(|doc| {
            let keep = position == idx || doc.path != to;
            position += 1;
            keep
        });

        match (was_visible, visible) {
            (false, false) if !overwritten_visible => {
                tracing::trace!("renamed {from} -> {to} outside scope");
                return;
            }
            (true, false) => tracing::debug!("{from} -> {to} left the scope"),
            (false, true) => tracing::debug!("{from} -> {to} entered the scope"),
            _ => tracing::debug!("renamed {from} -> {to}"),
        }
        self.invalidate(Stage::Scope);
    }

    /// `from` is gone and `to` is already known: the move arrived as separate
    /// delete/create events first. Treat it as a modify of `to`.
    fn on_rename_already_applied(&mut self, from: &str, to: &str) {
        let Some(idx) = self.position(to) else {
            tracing::warn!("rename of unknown document {from} -> {to}");
            return;
        };

        tracing::debug!("rename {from} -> {to} already applied");
        self.tag_cache.remove(to);
        let doc = Arc::clone(&self.documents[idx]);
        if self.in_scope(&doc) {
            self.invalidate(Stage::Scope);
        }
    }

    fn on_metadata_resolved(&mut self) {
        self.tag_cache.clear();
        if self.state.scope.tag.is_some() {
            self.invalidate(Stage::Scope);
        } else if !self.state.query.trim().is_empty() {
            self.invalidate(Stage::Search);
        } else {
            self.tags = self.aggregate_tags();
        }
    }

    fn rescan(&mut self) {
        self.documents = match self.collaborators.source.list_all() {
            Ok(docs) => docs.into_iter().map(Arc::new).collect(),
            Err(err) => {
                tracing::error!("rescan failed, showing an empty view: {err}");
                Vec::new()
            }
        };
        self.tag_cache.clear();
        tracing::info!("scanned {} documents", self.documents.len());
        self.invalidate(Stage::Scope);
    }

    fn toggle_pin(&mut self, path: String) {
        if !self.pinned.remove(&path) {
            self.pinned.insert(path);
        }
        self.invalidate(Stage::Sort);
    }

    fn open_scope(&mut self, scope: ScopeConfig) {
        self.state.scope = scope;
        self.state.sort = SortKey::CreatedDesc;
        self.state.query.clear();
        self.state.window.reset();
        self.rescan();
    }

    fn set_query(&mut self, query: String) {
        if query == self.state.query {
            return;
        }
        self.state.query = query;
        self.invalidate(Stage::Search);
    }

    fn reset_view(&mut self) {
        self.state.window.reset();
        if self.state.query.is_empty() {
            self.publish_window();
        } else {
            self.state.query.clear();
            self.invalidate(Stage::Search);
        }
    }

    // ── Pipeline ─────────────────────────────────────────────────

    fn invalidate(&mut self, from: Stage) {
        self.generation += 1;
        tracing::debug!(generation = self.generation, "recompute from {from:?}");
        self.run_from(from);
    }

    fn run_from(&mut self, mut from: Stage) {
        // A batch under an older generation will be discarded, so its stage must rerun.
        if from > Stage::Empty && self.filtered.is_none() {
            from = Stage::Empty;
        }

        if from <= Stage::Scope {
            self.scoped = self.resolve_scope();
        }

        if from <= Stage::Sort {
            self.sorted = sort::sort(self.scoped.clone(), &self.pinned, self.state.sort);
        }

        if from <= Stage::Empty {
            if self.state.show_empty {
                self.filtered = Some(self.sorted.clone());
            } else {
                self.filtered = None;
                self.spawn_empty_filter();
                return;
            }
        }

        let filtered = self.filtered.clone().unwrap_or_default();
        if self.state.query.trim().is_empty() {
            self.pending = None;
            self.results = filtered;
            self.publish_window();
        } else {
            self.spawn_search(filtered);
        }
    }

    fn resolve_scope(&mut self) -> Vec<Arc<Document>> {
        let container = self.state.scope.container.trim_matches('/');
        if !container.is_empty() && !self.collaborators.source.has_folder(container) {
            tracing::warn!("{}", ExplorerError::ScopeNotFound(container.to_string()));
            return Vec::new();
        }

        let mut scoped = scope::resolve(&self.documents, &self.state.scope);
        if let Some(tag) = self.state.scope.tag.clone() {
            scoped.retain(|doc| scope::has_tag(&self.tags_for(doc), &tag));
        }
        scoped
    }

    fn spawn_empty_filter(&mut self) {
        let generation = self.generation;
        let documents = self.sorted.clone();
        let content = Arc::clone(&self.collaborators.content);
        let frontmatter = Arc::clone(&self.collaborators.frontmatter);
        let options = self.options.batch;
        let tx = self.event_tx.clone();
        self.pending = Some(Stage::Empty);

        thread::spawn(move || {
            let documents = empty::retain_non_empty(documents, content, frontmatter, options);
            if tx
                .send(Msg::EmptyFiltered {
                    generation,
                    documents,
                })
                .is_err()
            {
                tracing::debug!("explorer closed before empty filter {generation} finished");
            }
        });
    }

    fn spawn_search(&mut self, documents: Vec<Arc<Document>>) {
        let generation = self.generation;
        let query = self.state.query.clone();
        let min_score = self.options.min_score;
        let content = Arc::clone(&self.collaborators.content);
        let tags = Arc::clone(&self.collaborators.tags);
        let options = self.options.batch;
        let tx = self.event_tx.clone();
        self.pending = Some(Stage::Search);

        thread::spawn(move || {
            let documents = search::filter(documents, &query, min_score, content, tags, options);
            if tx
                .send(Msg::SearchFinished {
                    generation,
                    documents,
                })
                .is_err()
            {
                tracing::debug!("explorer closed before search {generation} finished");
            }
        });
    }

    fn finish_empty_filter(&mut self, generation: u64, documents: Vec<Arc<Document>>) {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "stale empty filter dropped");
            return;
        }
        self.filtered = Some(documents);
        self.run_from(Stage::Search);
    }

    fn finish_search(&mut self, generation: u64, documents: Vec<Arc<Document>>) {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "stale search dropped");
            return;
        }
        self.pending = None;
        self.results = documents;
        self.publish_window();
    }

    fn publish_window(&mut self) {
        if self.refresh_requested {
            tracing::trace!("refresh requested, re-slicing window");
            self.refresh_requested = false;
        }
        self.state.window.rebound(self.results.len());
        self.displayed = self.state.window.slice(&self.results).to_vec();
        self.tags = self.aggregate_tags();
    }

    fn aggregate_tags(&mut self) -> Vec<String> {
        let displayed = self.displayed.clone();
        let tag_sets: Vec<TagSet> = displayed.iter().map(|doc| self.tags_for(doc)).collect();
        tags::aggregate(tag_sets)
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn position(&self, path: &str) -> Option<usize> {
        self.documents.iter().position(|doc| doc.path == path)
    }

    fn in_scope(&mut self, doc: &Document) -> bool {
        if !scope::contains(&doc.path, &self.state.scope) {
            return false;
        }
        match self.state.scope.tag.clone() {
            Some(tag) => scope::has_tag(&self.tags_for(doc), &tag),
            None => true,
        }
    }

    fn tags_for(&mut self, doc: &Document) -> TagSet {
        if let Some(tags) = self.tag_cache.get(&doc.path) {
            return tags.clone();
        }
        let tags = self.collaborators.tags.tags_of(doc);
        self.tag_cache.insert(doc.path.clone(), tags.clone());
        tags
    }
}
