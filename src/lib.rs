//! Incremental document views over a notes vault.
//!
//! An [`Explorer`] owns a [`ViewState`](model::view::ViewState) and recomputes the
//! scope → sort → empty filter → search → window → tags pipeline from the earliest stage
//! each [`Msg`] invalidates. Documents, content and tags come from the collaborators in
//! [`source`].

pub mod app;
pub mod error;
pub mod model;
pub mod msg;
pub mod pipeline;
pub mod source;

pub use app::{Explorer, ExplorerOptions};
pub use error::{ExplorerError, Result};
pub use msg::Msg;
