//! Marker-delimited blocks inside user-owned text files.
//!
//! Every configurator that edits a file the user also edits (`.env`,
//! `phpunit.xml.dist`, `docker-compose.yml`, `Makefile`, ...) wraps its lines
//! between an opening and a closing marker carrying the recipe name:
//!
//! ```text
//! APP_ENV=dev
//!
//! ###> acme/mailer ###
//! MAILER_DSN=smtp://localhost
//! ###< acme/mailer ###
//! ```
//!
//! A block is always written as `"\n" + open + "\n" + body + close + "\n"`.
//! The leading newline is the block's padding and belongs to the block, so
//! removing a block together with the newline right before its opening marker
//! restores the file byte for byte.

use std::ops::Range;

/// Marker syntax of a file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStyle {
    /// `###> name ###` / `###< name ###`
    Env,
    /// `<!-- ###+ name ### -->` / `<!-- ###- name ### -->`, indented 8 spaces
    Xml,
    /// Same comments as [`MarkerStyle::Env`], at column 0
    Yaml,
}

impl MarkerStyle {
    /// Opening marker line for `name`, without the line break.
    #[must_use]
    pub fn open(self, name: &str) -> String {
        match self {
            Self::Env | Self::Yaml => format!("###> {name} ###"),
            Self::Xml => format!("{}<!-- ###+ {name} ### -->", self.indent()),
        }
    }

    /// Closing marker line for `name`, without the line break.
    #[must_use]
    pub fn close(self, name: &str) -> String {
        match self {
            Self::Env | Self::Yaml => format!("###< {name} ###"),
            Self::Xml => format!("{}<!-- ###- {name} ### -->", self.indent()),
        }
    }

    /// Indentation used for marker and body lines.
    #[must_use]
    pub fn indent(self) -> &'static str {
        match self {
            Self::Env | Self::Yaml => "",
            Self::Xml => "        ",
        }
    }
}

/// Whether `contents` already holds a block for `name`.
///
/// Only an opening marker that starts its line counts.
#[must_use]
pub fn is_marked(contents: &str, style: MarkerStyle, name: &str) -> bool {
    marker_lines(contents, &style.open(name)).next().is_some()
}

/// `(line_start, marker_start)` of every occurrence of `marker` preceded only
/// by whitespace on its line.
fn marker_lines<'a>(contents: &'a str, marker: &'a str) -> impl Iterator<Item = (usize, usize)> + 'a {
    contents.match_indices(marker).filter_map(|(at, _)| {
        let line_start = contents[..at].rfind('\n').map_or(0, |pos| pos + 1);
        contents[line_start..at]
            .trim()
            .is_empty()
            .then_some((line_start, at))
    })
}

/// Renders a complete block, padding included.
///
/// `body` is used as is, with a line break appended when it lacks one.
#[must_use]
pub fn render_block(style: MarkerStyle, name: &str, body: &str) -> String {
    let mut block = String::with_capacity(body.len() + 2 * name.len() + 32);
    block.push('\n');
    block.push_str(&style.open(name));
    block.push('\n');
    block.push_str(body);
    if !body.is_empty() && !body.ends_with('\n') {
        block.push('\n');
    }
    block.push_str(&style.close(name));
    block.push('\n');
    block
}

/// Inserts a block for `name` at byte offset `at` (a line start or the end of
/// `contents`).
///
/// Returns `contents` unchanged when a block for `name` already exists.
#[must_use]
pub fn insert_block(
    contents: &str,
    at: usize,
    style: MarkerStyle,
    name: &str,
    body: &str,
) -> String {
    if is_marked(contents, style, name) {
        return contents.to_string();
    }

    let at = at.min(contents.len());
    let block = render_block(style, name, body);
    let mut patched = String::with_capacity(contents.len() + block.len());
    patched.push_str(&contents[..at]);
    patched.push_str(&block);
    patched.push_str(&contents[at..]);
    patched
}

/// Appends a block for `name` at the end of `contents`.
#[must_use]
pub fn append_block(contents: &str, style: MarkerStyle, name: &str, body: &str) -> String {
    insert_block(contents, contents.len(), style, name, body)
}

/// Byte range of the first block for `name`, padding included.
///
/// A block whose closing marker is missing is not reported, so a damaged
/// file is never truncated.
#[must_use]
pub fn find_block(contents: &str, style: MarkerStyle, name: &str) -> Option<Range<usize>> {
    let open = style.open(name);
    let close = style.close(name);

    let (line_start, open_at) = marker_lines(contents, &open).next()?;
    let after_open = open_at + open.len();

    let close_at = after_open + contents[after_open..].find(&close)?;
    let end = contents[close_at..]
        .find('\n')
        .map_or(contents.len(), |pos| close_at + pos + 1);

    let start = if line_start > 0 && contents.as_bytes()[line_start - 1] == b'\n' {
        line_start - 1
    } else {
        line_start
    };
    Some(start..end)
}

/// Removes every block for `name`, each with its padding.
///
/// Returns the new contents and the number of blocks removed.
#[must_use]
pub fn remove_blocks(contents: &str, style: MarkerStyle, name: &str) -> (String, usize) {
    let mut patched = contents.to_string();
    let mut removed = 0;
    while let Some(range) = find_block(&patched, style, name) {
        patched.replace_range(range, "");
        removed += 1;
    }
    (patched, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_env_block() {
        let block = render_block(MarkerStyle::Env, "acme/mailer", "MAILER_DSN=null://null\n");
        assert_eq!(
            block,
            "\n###> acme/mailer ###\nMAILER_DSN=null://null\n###< acme/mailer ###\n"
        );
    }

    #[test]
    fn test_render_xml_block_is_indented() {
        let block = render_block(
            MarkerStyle::Xml,
            "acme/mailer",
            "        <env name=\"MAILER_DSN\" value=\"null://null\" />",
        );
        assert_eq!(
            block,
            "\n        <!-- ###+ acme/mailer ### -->\n        <env name=\"MAILER_DSN\" value=\"null://null\" />\n        <!-- ###- acme/mailer ### -->\n"
        );
    }

    #[test]
    fn test_append_then_remove_round_trips() {
        for original in ["", "APP_ENV=dev\n", "APP_ENV=dev", "A=1\n\n\n"] {
            let patched = append_block(original, MarkerStyle::Env, "acme/mailer", "X=1\n");
            assert!(is_marked(&patched, MarkerStyle::Env, "acme/mailer"));

            let (restored, removed) = remove_blocks(&patched, MarkerStyle::Env, "acme/mailer");
            assert_eq!(removed, 1);
            assert_eq!(restored, original);
        }
    }

    #[test]
    fn test_insert_is_idempotent() {
        let once = append_block("A=1\n", MarkerStyle::Env, "acme/mailer", "X=1\n");
        let twice = append_block(&once, MarkerStyle::Env, "acme/mailer", "X=2\n");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_neighbouring_blocks_survive() {
        let original = "A=1\n";
        let with_log = append_block(original, MarkerStyle::Env, "acme/log", "LOG=1\n");
        let with_both = append_block(&with_log, MarkerStyle::Env, "acme/mailer", "MAIL=1\n");
        let with_three = append_block(&with_both, MarkerStyle::Env, "acme/queue", "QUEUE=1\n");

        let (without_mailer, _) = remove_blocks(&with_three, MarkerStyle::Env, "acme/mailer");
        let expected = append_block(&with_log, MarkerStyle::Env, "acme/queue", "QUEUE=1\n");
        assert_eq!(without_mailer, expected);

        let (only_queue_removed, _) = remove_blocks(&expected, MarkerStyle::Env, "acme/queue");
        assert_eq!(only_queue_removed, with_log);
    }

    #[test]
    fn test_prefix_names_do_not_collide() {
        let patched = append_block("", MarkerStyle::Env, "acme/mailer-bridge", "X=1\n");
        assert!(!is_marked(&patched, MarkerStyle::Env, "acme/mailer"));

        let (unchanged, removed) = remove_blocks(&patched, MarkerStyle::Env, "acme/mailer");
        assert_eq!(removed, 0);
        assert_eq!(unchanged, patched);
    }

    #[test]
    fn test_missing_close_marker_is_left_alone() {
        let damaged = "A=1\n\n###> acme/mailer ###\nX=1\n";
        assert_eq!(find_block(damaged, MarkerStyle::Env, "acme/mailer"), None);

        let (unchanged, removed) = remove_blocks(damaged, MarkerStyle::Env, "acme/mailer");
        assert_eq!(removed, 0);
        assert_eq!(unchanged, damaged);
    }

    #[test]
    fn test_marker_inside_a_value_is_not_a_block() {
        let contents = "NOTE=\"###> acme/mailer ###\"\n";
        assert_eq!(find_block(contents, MarkerStyle::Env, "acme/mailer"), None);
        assert!(!is_marked(contents, MarkerStyle::Env, "acme/mailer"));
    }
}
