use std::sync::Arc;

use crate::model::document::Document;
use crate::model::view::{ScopeConfig, SortKey};
use crate::model::window::WindowMode;
use crate::source::SourceEvent;

/// All possible messages that drive state transitions.
#[derive(Debug)]
pub enum Msg {
    // -- Document source
    Source(SourceEvent),
    Rescan,

    // -- Configuration
    SetScope(ScopeConfig),
    SetExcluded(Vec<String>),
    SetSort(SortKey),
    SetShowEmpty(bool),
    TogglePin(String),
    OpenFolder(String),
    OpenTag(String),
    SetQuery(String),

    // -- Window
    RequestMore,
    NextPage,
    PrevPage,
    GoToPage(usize),
    SetWindowMode(WindowMode),
    SetPageSize(usize),
    ResetView,

    // -- Presentation
    Resize(u16, u16),

    // -- Batch completions, stamped with the generation they were started under
    EmptyFiltered {
        generation: u64,
        documents: Vec<Arc<Document>>,
    },
    SearchFinished {
        generation: u64,
        documents: Vec<Arc<Document>>,
    },

    // -- System
    Quit,
}

impl Msg {
    /// Parse one line of the command protocol read from stdin.
    ///
    /// Returns `None` for blank lines and unknown commands.
    pub fn parse_command(line: &str) -> Option<Msg> {
        let line = line.trim();
        let (cmd, arg) = match line.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line, ""),
        };

        let msg = match cmd {
            "q" | "query" => Msg::SetQuery(arg.to_string()),
            "sort" => Msg::SetSort(arg.parse().unwrap_or_default()),
            "more" => Msg::RequestMore,
            "next" => Msg::NextPage,
            "prev" => Msg::PrevPage,
            "page" => Msg::GoToPage(arg.parse().ok()?),
            "pin" if !arg.is_empty() => Msg::TogglePin(arg.to_string()),
            "folder" => Msg::OpenFolder(arg.to_string()),
            "tag" if !arg.is_empty() => Msg::OpenTag(arg.to_string()),
            "empty" => match arg {
                "on" => Msg::SetShowEmpty(true),
                "off" => Msg::SetShowEmpty(false),
                _ => return None,
            },
            "mode" => match arg {
                "paged" => Msg::SetWindowMode(WindowMode::Paged),
                "infinite" => Msg::SetWindowMode(WindowMode::Infinite),
                _ => return None,
            },
            "size" => Msg::SetPageSize(arg.parse().ok()?),
            "rescan" => Msg::Rescan,
            "reset" => Msg::ResetView,
            "quit" | "exit" => Msg::Quit,
            _ => return None,
        };
        Some(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arguments() {
        assert!(matches!(
            Msg::parse_command("q  meeting notes "),
            Some(Msg::SetQuery(q)) if q == "meeting notes"
        ));
        assert!(matches!(Msg::parse_command("page 3"), Some(Msg::GoToPage(3))));
        assert!(matches!(
            Msg::parse_command("sort created-desc"),
            Some(Msg::SetSort(SortKey::CreatedDesc))
        ));
        assert!(matches!(
            Msg::parse_command("sort nonsense"),
            Some(Msg::SetSort(SortKey::Unsorted))
        ));
        assert!(matches!(
            Msg::parse_command("mode paged"),
            Some(Msg::SetWindowMode(WindowMode::Paged))
        ));
    }

    #[test]
    fn bare_query_clears_search() {
        assert!(matches!(Msg::parse_command("q"), Some(Msg::SetQuery(q)) if q.is_empty()));
        assert!(matches!(Msg::parse_command("folder"), Some(Msg::OpenFolder(f)) if f.is_empty()));
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        assert!(Msg::parse_command("").is_none());
        assert!(Msg::parse_command("page two").is_none());
        assert!(Msg::parse_command("empty maybe").is_none());
        assert!(Msg::parse_command("pin").is_none());
        assert!(Msg::parse_command("fly away").is_none());
    }
}
