//! The stages of the view pipeline, leaves first:
//! scope → sort → empty filter → search → window (in `model::window`) → tags.
//!
//! Every stage is a plain function over an immutable snapshot. The two stages that read
//! document content fan their work out through [`batch`] and join before returning.

pub mod batch;
pub mod empty;
pub mod scope;
pub mod search;
pub mod sort;
pub mod tags;
