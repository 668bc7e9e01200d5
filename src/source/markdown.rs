use std::sync::LazyLock;

use regex::Regex;

use super::{Frontmatter, FrontmatterParser, TagSet};

static INLINE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s(])#([\p{L}\p{N}_/-]*[\p{L}_/-][\p{L}\p{N}_/-]*)")
        .expect("valid inline tag regex")
});

/// `---` delimited YAML-style frontmatter at the very start of a note.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownFrontmatter;

impl FrontmatterParser for MarkdownFrontmatter {
    fn parse(&self, text: &str) -> Frontmatter {
        match split_frontmatter(text) {
            Some((frontmatter, _)) => Frontmatter {
                exists: true,
                text: frontmatter,
            },
            None => Frontmatter::default(),
        }
    }
}

/// Split content into (frontmatter, body). Line endings are normalized to `\n`.
pub fn split_frontmatter(content: &str) -> Option<(String, String)> {
    let content = content.replace("\r\n", "\n");
    let rest = content.strip_prefix("---\n")?;

    if let Some(body) = rest.strip_prefix("---")
        && (body.is_empty() || body.starts_with('\n'))
    {
        return Some((String::new(), body.trim_start_matches('\n').to_string()));
    }

    let (yaml_end, body_start) = rest
        .find("\n---\n")
        .map(|i| (i, i + 5))
        .or_else(|| rest.ends_with("\n---").then(|| (rest.len() - 4, rest.len())))?;

    Some((rest[..yaml_end].to_string(), rest[body_start..].to_string()))
}

/// Tags from the frontmatter `tags` key and inline `#tag` patterns, first-seen order.
pub fn extract_tags(content: &str) -> TagSet {
    let mut tags = TagSet::new();
    let mut push = |raw: &str| {
        let tag = normalize_tag(raw);
        if tag.len() > 1 && !tags.contains(&tag) {
            tags.push(tag);
        }
    };

    let body = match split_frontmatter(content) {
        Some((frontmatter, body)) => {
            for tag in frontmatter_tags(&frontmatter) {
                push(&tag);
            }
            body
        }
        None => content.to_string(),
    };

    let mut in_code_block = false;
    for line in body.lines() {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            continue;
        }
        for cap in INLINE_TAG_RE.captures_iter(line) {
            push(&cap[1]);
        }
    }

    tags
}

/// `#`-prefixed form of a tag.
pub fn normalize_tag(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|c: char| c == '"' || c == '\'');
    if trimmed.starts_with('#') {
        trimmed.to_string()
    } else {
        format!("#{trimmed}")
    }
}

fn frontmatter_tags(frontmatter: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut in_list = false;

    for line in frontmatter.lines() {
        if in_list {
            if let Some(item) = line.trim_start().strip_prefix("- ") {
                tags.push(item.trim().to_string());
                continue;
            }
            in_list = false;
        }

        let Some(value) = line
            .strip_prefix("tags:")
            .or_else(|| line.strip_prefix("tag:"))
        else {
            continue;
        };

        let value = value.trim();
        if value.is_empty() {
            in_list = true;
            continue;
        }

        let inner = value.trim_start_matches('[').trim_end_matches(']');
        tags.extend(
            inner
                .split([',', ' '])
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );
    }

    tags
}
