//! Narrow the raw document set to the ones currently in view.

use std::sync::Arc;

use crate::model::document::Document;
use crate::model::view::ScopeConfig;

/// Container and exclusion test for one path. The tag filter is applied separately.
pub fn contains(path: &str, scope: &ScopeConfig) -> bool {
    in_container(path, &scope.container, scope.recursive)
        && !scope
            .excluded
            .iter()
            .any(|prefix| is_excluded(path, prefix))
}

pub fn resolve(docs: &[Arc<Document>], scope: &ScopeConfig) -> Vec<Arc<Document>> {
    docs.iter()
        .filter(|doc| contains(&doc.path, scope))
        .cloned()
        .collect()
}

/// `true` if `path` is `folder` itself or lies anywhere below it, comparing whole segments.
pub fn is_under(path: &str, folder: &str) -> bool {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        return true;
    }
    path == folder
        || path
            .strip_prefix(folder)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn parent_folder(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

/// Tag comparison ignores the leading `#` and case.
pub fn has_tag<S: AsRef<str>>(tags: &[S], wanted: &str) -> bool {
    let wanted = wanted.trim_start_matches('#');
    tags.iter()
        .any(|tag| tag.as_ref().trim_start_matches('#').eq_ignore_ascii_case(wanted))
}

fn in_container(path: &str, container: &str, recursive: bool) -> bool {
    let container = container.trim_matches('/');
    if container.is_empty() {
        return true;
    }
    if recursive {
        is_under(path, container)
    } else {
        parent_folder(path) == container
    }
}

fn is_excluded(path: &str, prefix: &str) -> bool {
    !prefix.trim_matches('/').is_empty() && is_under(path, prefix)
}
