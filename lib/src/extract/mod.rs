// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2016, 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2016, 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Comment extraction
//!
//! This module finds issues embedded in the comments of a file. Extraction is
//! a pure function of a file's path, MIME type and content: the comment style
//! is selected via the `style` module, each comment block is matched and
//! parsed according to the grammar in the `fields` module.
//!
//! Blocks without an `@issue` marker are not issues. Files whose content is not
//! valid UTF-8 or for which no comment style is known yield no issues.
//!

pub mod fields;
pub mod style;

use std::str;

use crate::snapshot::IssueFields;
use self::fields::RawFields;
use self::style::CommentStyle;


/// Extract issues from a file
///
pub fn extract(file_path: &str, mime_type: Option<&str>, content: &[u8]) -> Vec<IssueFields> {
    let style = match CommentStyle::for_path(file_path, mime_type) {
        Some(style) => style,
        None => {
            trace!("No comment style for {}, skipping", file_path);
            return Vec::new();
        },
    };

    match str::from_utf8(content) {
        Ok(text) => extract_str(file_path, style, text),
        Err(_) => {
            debug!("Content of {} is not valid UTF-8, skipping", file_path);
            Vec::new()
        },
    }
}


/// Extract issues from text with a known comment style
///
pub fn extract_str(file_path: &str, style: CommentStyle, text: &str) -> Vec<IssueFields> {
    let mut retval = Vec::new();

    for captures in style.block_regex().captures_iter(text) {
        let block = match captures.get(0) {
            Some(block) => block,
            None => continue,
        };
        let body = CommentStyle::block_body(&captures);

        let raw = RawFields::parse(body.lines().map(|line| style.strip_decoration(line)));
        let id = match raw.issue_id() {
            Some(id) => id,
            None => continue,
        };

        retval.push(IssueFields {
            id: id,
            title: raw.title,
            description: raw.description,
            assignees: raw.assignees,
            due_date: raw.due_date,
            labels: raw.labels,
            weight: raw.weight,
            priority: raw.priority,
            blockers: raw.blockers,
            file_path: file_path.to_owned(),
            start_position: block.start(),
            end_position: block.end(),
        });
    }

    retval
}




#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_style() {
        let text = "int main() {}\n\
                    /**\n \
                     * @issue fix-main\n \
                     * @title Fix main\n \
                     * @description\n \
                     *   main does nothing.\n \
                     *     Really nothing.\n \
                     */\n\
                    /* a regular comment */\n";
        let issues = extract("src/main.c", None, text.as_bytes());
        assert_eq!(issues.len(), 1);

        let issue = &issues[0];
        assert_eq!(issue.id, "fix-main");
        assert_eq!(issue.title.as_deref(), Some("Fix main"));
        assert_eq!(issue.description.as_deref(), Some("main does nothing.\n  Really nothing."));
        assert_eq!(issue.file_path, "src/main.c");
        assert_eq!(&text[issue.start_position..issue.start_position + 3], "/**");
        assert_eq!(&text[issue.end_position - 2..issue.end_position], "*/");
    }

    #[test]
    fn python_style() {
        let text = "def foo():\n    \"\"\"\n    @issue\n    @title Make foo useful\n    @weight 2\n    \"\"\"\n";
        let issues = extract("foo.py", None, text.as_bytes());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "make-foo-useful");
        assert_eq!(issues[0].weight.as_deref(), Some("2"));
    }

    #[test]
    fn hash_style() {
        let text = "#!/bin/sh\n\n###\n# @issue shell-issue\n# @labels sh, scripts\n###\necho foo\n";
        let issues = extract("run.sh", None, text.as_bytes());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "shell-issue");
        assert_eq!(issues[0].labels.as_deref(), Some("sh, scripts"));
    }

    #[test]
    fn other_styles() {
        let html = "<p>x</p><!-- @issue html-issue -->";
        assert_eq!(extract("a.html", None, html.as_bytes())[0].id, "html-issue");

        let matlab = "%{\n@issue matlab-issue\n%}\nx = 1;";
        assert_eq!(extract("a.m", None, matlab.as_bytes())[0].id, "matlab-issue");

        let haskell = "{- @issue haskell-issue -}\nmain = pure ()";
        assert_eq!(extract("Main.hs", None, haskell.as_bytes())[0].id, "haskell-issue");

        let markdown = "# Title\n\n```issue\n@issue md-issue\n@title In markdown\n```\n<!-- @issue md-comment -->";
        let ids: Vec<String> = extract("README.md", None, markdown.as_bytes())
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["md-issue", "md-comment"]);
    }

    #[test]
    fn blocks_without_marker() {
        let text = "/* @title Not an issue */ /* @issue real */";
        let issues = extract("a.rs", None, text.as_bytes());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "real");
    }

    #[test]
    fn undecodable_and_unsupported() {
        assert!(extract("a.rs", None, &[0x2f, 0x2a, 0xff, 0xfe, 0x2a, 0x2f]).is_empty());
        assert!(extract("logo.png", Some("image/png"), b"/* @issue foo */").is_empty());
    }
}
