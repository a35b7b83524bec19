//! Section-level edits of hand-written YAML files.
//!
//! Compose files and `services.yaml` are edited line by line rather than
//! parsed and re-emitted, so everything outside a recipe's blocks keeps its
//! exact bytes. A top-level section starts at a column-0 `key:` line (a
//! trailing comment is allowed) and runs until the next column-0 line that
//! is not a comment. A recipe's lines for a section go in a
//! [`MarkerStyle::Yaml`] block at the end of the section, ahead of the blank
//! line that separates it from the next key:
//!
//! ```yaml
//! services:
//!   app:
//!     image: acme/app
//!
//! ###> acme/database ###
//!   db:
//!     image: postgres
//! ###< acme/database ###
//!
//! volumes: # added by recipe-kit
//! ###> acme/database ###
//!   db-data: {}
//! ###< acme/database ###
//! ```
//!
//! A section missing from the file is appended as `"\n<key>: "` plus
//! [`CREATED_KEY_COMMENT`], followed by the block. Removing the last block
//! under a key carrying that comment removes the key too; keys written by
//! the user always stay. A key holding an inline value (`volumes: {}`,
//! `parameters: ~`) cannot take nested lines and is reported as an
//! [`InlineValueKey`] error.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use super::markers::{self, MarkerStyle};

static TOP_LEVEL_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:"([^"]*)"|'([^']*)'|([A-Za-z0-9_.-]+))[ \t]*:(?:[ \t]+(.*))?$"#)
        .expect("top-level key pattern is valid")
});

/// Trailing comment of a key line written for a recipe.
pub const CREATED_KEY_COMMENT: &str = "# added by recipe-kit";

/// Indentation used when the file shows none.
const DEFAULT_INDENT: usize = 2;

/// A recipe needs a section under a key that holds an inline value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("top-level key \"{key}\" holds the inline value `{value}`, so no lines can be nested under it")]
pub struct InlineValueKey {
    /// The top-level key
    pub key: String,
    /// Its value, trailing comment excluded
    pub value: String,
}

/// A column-0 `key:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyLine<'a> {
    key: &'a str,
    /// Everything after the colon, trimmed
    rest: &'a str,
}

impl<'a> KeyLine<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let captures = TOP_LEVEL_KEY.captures(line.trim_end_matches(['\r', '\n']))?;
        let key = captures.get(1).or(captures.get(2)).or(captures.get(3))?.as_str();
        let rest = captures.get(4).map_or("", |rest| rest.as_str().trim());
        Some(Self { key, rest })
    }

    /// The inline value, if anything but a comment follows the colon.
    fn inline_value(&self) -> Option<&'a str> {
        if self.rest.is_empty() || self.rest.starts_with('#') {
            return None;
        }
        let value = match self.rest.find(" #") {
            Some(comment) => &self.rest[..comment],
            None => self.rest,
        };
        Some(value.trim_end())
    }
}

/// Where a section's recipe blocks go.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    key: String,
    /// Byte offset of the insertion point
    end: usize,
    inline_value: Option<String>,
}

/// Result of scanning a document.
#[derive(Debug, Default)]
struct Layout {
    sections: Vec<Section>,
    indent: Option<usize>,
}

fn scan(contents: &str) -> Layout {
    let mut layout = Layout::default();
    let mut line_starts = Vec::new();
    let mut offset = 0;
    let mut previous_blank = false;
    let mut open_section: Option<(String, Option<String>)> = None;

    for line in contents.split_inclusive('\n') {
        let index = line_starts.len();
        line_starts.push(offset);
        offset += line.len();

        if line.trim().is_empty() {
            previous_blank = true;
            continue;
        }
        let trimmed = line.trim_start_matches(' ');
        if trimmed.starts_with('#') {
            previous_blank = false;
            continue;
        }
        if line.starts_with([' ', '\t']) {
            let indent = line.len() - trimmed.len();
            if indent > 0 && layout.indent.is_none_or(|current| indent < current) {
                layout.indent = Some(indent);
            }
            previous_blank = false;
            continue;
        }

        // Any other column-0 line ends the open section.
        if let Some((key, inline_value)) = open_section.take() {
            let end_line = if previous_blank && index > 0 { index - 1 } else { index };
            layout.sections.push(Section {
                key,
                end: line_starts[end_line],
                inline_value,
            });
        }
        if let Some(key_line) = KeyLine::parse(line) {
            if !layout.sections.iter().any(|section| section.key == key_line.key) {
                open_section =
                    Some((key_line.key.to_string(), key_line.inline_value().map(str::to_string)));
            }
        }
        previous_blank = false;
    }

    if let Some((key, inline_value)) = open_section {
        layout.sections.push(Section {
            key,
            end: contents.len(),
            inline_value,
        });
    }
    layout
}

/// Name of the top-level key declared on `line`, if any.
#[must_use]
pub fn top_level_key(line: &str) -> Option<&str> {
    KeyLine::parse(line).map(|key_line| key_line.key)
}

/// Indentation the document uses for nested lines.
#[must_use]
pub fn detect_indent(contents: &str) -> usize {
    scan(contents).indent.unwrap_or(DEFAULT_INDENT)
}

/// Adds `name`'s lines under each top-level key of `sections`.
///
/// Lines are indented with the document's own indentation. Returns `contents`
/// unchanged when the document already holds a block for `name`.
///
/// # Errors
///
/// Returns [`InlineValueKey`] when one of the keys exists with an inline
/// value; nothing is added then.
pub fn add_sections(
    contents: &str,
    name: &str,
    sections: &[(String, Vec<String>)],
) -> Result<String, InlineValueKey> {
    if sections.is_empty() || markers::is_marked(contents, MarkerStyle::Yaml, name) {
        return Ok(contents.to_string());
    }

    let layout = scan(contents);
    let targets: Vec<Option<&Section>> = sections
        .iter()
        .map(|(key, _)| layout.sections.iter().find(|section| &section.key == key))
        .collect();
    if let Some(section) = targets.iter().flatten().find(|section| section.inline_value.is_some()) {
        return Err(InlineValueKey {
            key: section.key.clone(),
            value: section.inline_value.clone().unwrap_or_default(),
        });
    }

    let indent = " ".repeat(layout.indent.unwrap_or(DEFAULT_INDENT));
    let render = |lines: &[String]| -> String {
        lines
            .iter()
            .map(|line| format!("{indent}{line}\n"))
            .collect()
    };

    let mut insertions: Vec<(usize, usize, String)> = Vec::new();
    let mut appended = String::new();
    for (position, ((key, lines), target)) in sections.iter().zip(targets).enumerate() {
        let block = markers::render_block(MarkerStyle::Yaml, name, &render(lines));
        match target {
            Some(section) => insertions.push((section.end, position, block)),
            None => {
                appended.push('\n');
                appended.push_str(key);
                appended.push_str(": ");
                appended.push_str(CREATED_KEY_COMMENT);
                appended.push_str(&block);
            }
        }
    }

    // Splice from the back so earlier offsets stay valid.
    insertions.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    let mut patched = contents.to_string();
    for (at, _, block) in insertions {
        patched.insert_str(at, &block);
    }
    patched.push_str(&appended);
    Ok(patched)
}

/// Removes every block of `name`, and any key line that was only written to
/// hold recipe blocks once nothing is left under it.
#[must_use]
pub fn remove_sections(contents: &str, name: &str) -> String {
    let mut patched = contents.to_string();
    while let Some(range) = markers::find_block(&patched, MarkerStyle::Yaml, name) {
        let start = created_key_start(&patched, range.start, range.end).unwrap_or(range.start);
        patched.replace_range(start..range.end, "");
    }
    patched
}

/// Start of the `"\n<key>: # added by recipe-kit"` line owning the block at
/// `start..end`, when nothing else lives under that key.
fn created_key_start(contents: &str, start: usize, end: usize) -> Option<usize> {
    let before = &contents[..start];
    let line_start = before.rfind('\n').map_or(0, |pos| pos + 1);
    let key_line = KeyLine::parse(&before[line_start..])?;
    if key_line.rest != CREATED_KEY_COMMENT {
        return None;
    }

    for line in contents[end..].split_inclusive('\n') {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t', '#']) {
            return None;
        }
        break;
    }

    Some(line_start.saturating_sub(1))
}
