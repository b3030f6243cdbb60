// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2016, 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2016, 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Comment styles
//!
//! Issues are embedded in block comments. Which comment syntax applies to a
//! file is determined via a lookup of the file's extension, with the MIME type
//! as a fallback.
//!

use regex::{Captures, Regex};
use std::ffi::OsStr;
use std::path::Path;


/// Block comment syntax
///
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum CommentStyle {
    /// `/* ... */`
    CStyle,
    /// `"""..."""` and `'''...'''`
    Python,
    /// `<!-- ... -->`
    Html,
    /// `%{ ... %}`
    Matlab,
    /// `{- ... -}`
    Haskell,
    /// Runs of lines starting with `#`
    Hash,
    /// `<!-- ... -->` and fenced ```` ```issue ```` blocks
    Markdown,
}

lazy_static! {
    static ref C_BLOCK: Regex = Regex::new(r"(?s)/\*(.*?)\*/").unwrap();
    static ref PYTHON_BLOCK: Regex = Regex::new(r#"(?s)"""(.*?)"""|'''(.*?)'''"#).unwrap();
    static ref HTML_BLOCK: Regex = Regex::new(r"(?s)<!--(.*?)-->").unwrap();
    static ref MATLAB_BLOCK: Regex = Regex::new(r"(?s)%\{(.*?)%\}").unwrap();
    static ref HASKELL_BLOCK: Regex = Regex::new(r"(?s)\{-(.*?)-\}").unwrap();
    static ref HASH_BLOCK: Regex = Regex::new(r"(?m)(?:^[ \t]*#[^\n]*(?:\n|\z))+").unwrap();
    static ref MARKDOWN_BLOCK: Regex = Regex::new(r"(?s)<!--(.*?)-->|```issue[^\n]*\n(.*?)```").unwrap();

    static ref C_DECORATION: Regex = Regex::new(r"^[ \t]*\* ?").unwrap();
    static ref HASH_DECORATION: Regex = Regex::new(r"^[ \t]*#+ ?").unwrap();
}

impl CommentStyle {
    /// Look up the comment style for a file extension
    ///
    /// The extension is expected without the leading dot and is compared
    /// case-insensitively.
    ///
    pub fn from_extension(extension: &str) -> Option<Self> {
        let style = match extension.to_lowercase().as_str() {
            "c" | "h" | "cc" | "cpp" | "cxx" | "hpp" | "hh" | "cs" | "java" |
            "js" | "jsx" | "mjs" | "ts" | "tsx" | "go" | "rs" | "swift" | "kt" |
            "kts" | "scala" | "css" | "scss" | "less" | "php" | "groovy" |
            "dart"                          => CommentStyle::CStyle,
            "py" | "pyw" | "pyi"            => CommentStyle::Python,
            "html" | "htm" | "xhtml" | "xml" |
            "vue" | "svg"                   => CommentStyle::Html,
            "m"                             => CommentStyle::Matlab,
            "hs" | "lhs"                    => CommentStyle::Haskell,
            "sh" | "bash" | "zsh" | "rb" | "pl" | "pm" | "r" | "yaml" | "yml" |
            "toml" | "cfg" | "conf" | "ini" | "cmake" | "mk" |
            "txt"                           => CommentStyle::Hash,
            "md" | "markdown"               => CommentStyle::Markdown,
            _ => return None,
        };
        Some(style)
    }

    /// Look up the comment style for a MIME type
    ///
    /// Textual MIME types not explicitly known default to the `Hash` style.
    ///
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim().to_lowercase();
        let style = match essence.as_str() {
            "text/x-c" | "text/x-c++" | "text/x-csrc" | "text/x-chdr" |
            "text/x-c++src" | "text/x-java" | "text/x-java-source" |
            "text/javascript" | "application/javascript" | "text/css" |
            "text/x-rust" | "text/x-go"     => CommentStyle::CStyle,
            "text/x-python" |
            "text/x-script.python"          => CommentStyle::Python,
            "text/html" | "application/xhtml+xml" | "text/xml" |
            "application/xml" | "image/svg+xml" => CommentStyle::Html,
            "text/x-matlab"                 => CommentStyle::Matlab,
            "text/x-haskell"                => CommentStyle::Haskell,
            "text/markdown" | "text/x-markdown" => CommentStyle::Markdown,
            "application/x-sh" | "application/x-shellscript" |
            "application/toml" | "application/x-yaml" |
            "application/yaml"              => CommentStyle::Hash,
            other if other.starts_with("text/") => CommentStyle::Hash,
            _ => return None,
        };
        Some(style)
    }

    /// Determine the comment style for a file
    ///
    /// The extension takes precedence. If the extension is not in the table,
    /// the MIME type decides. Files for which no MIME type is known (e.g.
    /// files without or with an unknown extension) are treated as plain text.
    ///
    pub fn for_path(path: &str, mime: Option<&str>) -> Option<Self> {
        let by_extension = Path::new(path)
            .extension()
            .and_then(OsStr::to_str)
            .and_then(Self::from_extension);

        by_extension.or_else(|| match mime {
            Some(mime) => Self::from_mime(mime),
            None => Some(CommentStyle::Hash),
        })
    }

    /// Get the regular expression matching a comment block
    ///
    pub fn block_regex(&self) -> &'static Regex {
        match *self {
            CommentStyle::CStyle    => &*C_BLOCK,
            CommentStyle::Python    => &*PYTHON_BLOCK,
            CommentStyle::Html      => &*HTML_BLOCK,
            CommentStyle::Matlab    => &*MATLAB_BLOCK,
            CommentStyle::Haskell   => &*HASKELL_BLOCK,
            CommentStyle::Hash      => &*HASH_BLOCK,
            CommentStyle::Markdown  => &*MARKDOWN_BLOCK,
        }
    }

    /// Extract the inner text of a block match
    ///
    /// Returns the first participating capture group or, for patterns without
    /// groups, the whole match.
    ///
    pub fn block_body<'t>(captures: &Captures<'t>) -> &'t str {
        captures
            .iter()
            .skip(1)
            .filter_map(|group| group)
            .next()
            .or_else(|| captures.get(0))
            .map(|m| m.as_str())
            .unwrap_or_default()
    }

    /// Strip per-line comment decoration
    ///
    /// Removes leading `*` in C-style blocks and leading `#` in hash-style
    /// blocks, including one following space. Lines without decoration are
    /// returned unchanged.
    ///
    pub fn strip_decoration<'l>(&self, line: &'l str) -> &'l str {
        let decoration = match *self {
            CommentStyle::CStyle    => &*C_DECORATION,
            CommentStyle::Hash      => &*HASH_DECORATION,
            _ => return line,
        };

        decoration
            .find(line)
            .map(|m| &line[m.end()..])
            .unwrap_or(line)
    }
}
