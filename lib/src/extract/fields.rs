// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2016, 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2016, 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Issue field grammar
//!
//! Within a comment block, issue metadata is given as field markers:
//!
//! ```ignore
//! @issue fix-parser
//! @title Fix the parser
//! @labels bug, parser
//! @description
//!     The parser chokes on empty input.
//!     Multiple lines are fine.
//! ```
//!
//! A marker is a line starting with `@key`, optionally followed by a colon,
//! and a value. All fields but the description are single-line. The
//! description extends up to the next marker or the end of the block.
//!

use regex::Regex;


lazy_static! {
    static ref MARKER: Regex = Regex::new(r"^\s*@([A-Za-z_]+)\b:?[ \t]*(.*?)\s*$").unwrap();
    static ref SLUG_STRIP: Regex = Regex::new(r"[^\w\s-]").unwrap();
    static ref SLUG_SPLIT: Regex = Regex::new(r"[\s_-]+").unwrap();
}


/// Keys recognized in field markers
///
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Key {
    Issue,
    Title,
    Description,
    Assignees,
    DueDate,
    Labels,
    Weight,
    Priority,
    Blockers,
    Other,
}

impl Key {
    pub fn from_marker(name: &str) -> Key {
        match name.to_lowercase().as_str() {
            "issue"                     => Key::Issue,
            "title"                     => Key::Title,
            "description"               => Key::Description,
            "assignees" | "assignee"    => Key::Assignees,
            "due_date" | "due"          => Key::DueDate,
            "labels" | "label"          => Key::Labels,
            "weight"                    => Key::Weight,
            "priority"                  => Key::Priority,
            "blockers" | "blocked_by"   => Key::Blockers,
            _                           => Key::Other,
        }
    }
}


/// Raw fields parsed from a single comment block
///
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RawFields {
    /// The value of the `@issue` marker, `None` if the marker is absent
    pub issue: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignees: Option<String>,
    pub due_date: Option<String>,
    pub labels: Option<String>,
    pub weight: Option<String>,
    pub priority: Option<String>,
    pub blockers: Option<String>,
}

impl RawFields {
    /// Parse fields from the lines of a comment block
    ///
    /// The lines are expected to be stripped of any comment decoration.
    ///
    pub fn parse<'a, I>(lines: I) -> Self
        where I: IntoIterator<Item = &'a str>
    {
        let mut retval = RawFields::default();
        let mut description: Option<Vec<&str>> = None;
        let mut in_description = false;

        for line in lines {
            if let Some(captures) = MARKER.captures(line) {
                let key = Key::from_marker(&captures[1]);
                let value = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
                in_description = key == Key::Description;

                match key {
                    Key::Issue          => retval.issue = Some(value.to_owned()),
                    Key::Title          => retval.title = non_empty(value),
                    Key::Description    => description = Some(vec![value]),
                    Key::Assignees      => retval.assignees = non_empty(value),
                    Key::DueDate        => retval.due_date = non_empty(value),
                    Key::Labels         => retval.labels = non_empty(value),
                    Key::Weight         => retval.weight = non_empty(value),
                    Key::Priority       => retval.priority = non_empty(value),
                    Key::Blockers       => retval.blockers = non_empty(value),
                    Key::Other          => {},
                }
            } else if in_description {
                if let Some(ref mut lines) = description {
                    lines.push(line);
                }
            }
        }

        retval.description = description.and_then(|lines| join_description(&lines));
        retval
    }

    /// Determine the issue id
    ///
    /// Returns the value of the `@issue` marker if it is not empty. An empty
    /// marker falls back to the slug of the title. Blocks without a marker or
    /// without both an explicit id and a title have no id.
    ///
    pub fn issue_id(&self) -> Option<String> {
        let explicit = self.issue.as_ref()?.trim();
        if !explicit.is_empty() {
            return Some(explicit.to_owned());
        }

        self.title
            .as_ref()
            .map(|title| slugify(title))
            .filter(|slug| !slug.is_empty())
    }
}


/// Derive an issue id from a title
///
/// The title is lowercased and every character which is neither alphanumeric,
/// whitespace, `-` nor `_` is removed. The remaining text is split at runs of
/// whitespace, `-` and `_`, and the non-empty words are joined with `-`.
///
/// Titles differing only in case or punctuation map to the same slug.
///
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    let stripped = SLUG_STRIP.replace_all(&lower, "");
    SLUG_SPLIT
        .split(&stripped)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}


fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}


/// Number of leading ASCII spaces and tabs of a line
///
fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(|c: char| c == ' ' || c == '\t').len()
}


/// Assemble a description from its lines
///
/// The first line is the text following the marker. The remaining lines are
/// dedented by their common indentation. Leading and trailing blank lines are
/// dropped.
///
fn join_description(lines: &[&str]) -> Option<String> {
    let (first, rest) = lines.split_first()?;

    let indent = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indentation(line))
        .min()
        .unwrap_or(0);

    let mut result: Vec<&str> = Vec::with_capacity(lines.len());
    result.push(first.trim_end());
    for line in rest {
        let line = line.trim_end();
        result.push(&line[indent.min(indentation(line))..]);
    }

    while result.first().map(|l| l.is_empty()).unwrap_or(false) {
        result.remove(0);
    }
    while result.last().map(|l| l.is_empty()).unwrap_or(false) {
        result.pop();
    }

    if result.is_empty() {
        None
    } else {
        Some(result.join("\n"))
    }
}
