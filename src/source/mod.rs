//! Collaborators the view pipeline consumes: the document source and its read accessors.

pub mod fs;
pub mod markdown;
pub mod memory;

use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::Result;
use crate::model::document::Document;

pub use fs::{EventTranslator, FsVault};
pub use markdown::MarkdownFrontmatter;
pub use memory::MemoryVault;

/// Resolved tags of one document, `#`-prefixed.
pub type TagSet = SmallVec<[String; 4]>;

/// Change notifications delivered by a [`DocumentSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Added(Document),
    Modified(Document),
    Deleted(String),
    Renamed { from: String, to: String },
    /// The tag resolver caught up with recent edits.
    MetadataResolved,
}

pub type EventHandler = Box<dyn Fn(SourceEvent) + Send + Sync + 'static>;

pub trait DocumentSource: Send {
    fn list_all(&self) -> Result<Vec<Document>>;

    /// Register the single handler that receives every subsequent change.
    fn subscribe(&mut self, handler: EventHandler) -> Result<()>;

    /// Whether a folder exists. Used to report a missing scope container.
    fn has_folder(&self, _path: &str) -> bool {
        true
    }
}

pub trait ContentProvider: Send + Sync {
    fn read(&self, doc: &Document) -> Result<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    pub exists: bool,
    pub text: String,
}

pub trait FrontmatterParser: Send + Sync {
    fn parse(&self, text: &str) -> Frontmatter;
}

/// Eventually consistent: may lag the latest edit.
///
/// Called on the controller thread, so answers come from memory; implementations that
/// need to read files do it ahead of time (see [`FsVault`]).
pub trait TagResolver: Send + Sync {
    fn tags_of(&self, doc: &Document) -> TagSet;
}

/// Everything the [`Explorer`](crate::Explorer) needs from the outside world.
pub struct Collaborators {
    pub source: Box<dyn DocumentSource>,
    pub content: Arc<dyn ContentProvider>,
    pub frontmatter: Arc<dyn FrontmatterParser>,
    pub tags: Arc<dyn TagResolver>,
}
