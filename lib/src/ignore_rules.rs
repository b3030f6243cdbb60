// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Ignore rules
//!
//! Paths may be excluded from scanning via an ignore file using gitignore
//! syntax.
//!

use git2::Repository;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fs;
use std::path::Path;
use std::str;

use crate::error::*;
use crate::error::ErrorKind as EK;


/// Set of path patterns excluded from scanning
///
#[derive(Clone, Debug)]
pub struct IgnoreRules {
    matcher: Gitignore,
}

impl IgnoreRules {
    /// Create a rule set which does not ignore anything
    ///
    pub fn empty() -> Self {
        IgnoreRules { matcher: Gitignore::empty() }
    }

    /// Parse rules from the contents of an ignore file
    ///
    /// The `origin` is used for error reporting only.
    ///
    pub fn parse(origin: &str, text: &str) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(".");
        for line in text.lines() {
            builder
                .add_line(None, line)
                .chain_err(|| EK::MalformedIgnoreFile(origin.to_owned()))?;
        }

        builder
            .build()
            .map(|matcher| IgnoreRules { matcher: matcher })
            .chain_err(|| EK::MalformedIgnoreFile(origin.to_owned()))
    }

    /// Load the rules of a repository
    ///
    /// The ignore file is looked up in the work tree first and in the tree of
    /// `HEAD` second. If neither exists, the empty rule set is returned.
    ///
    pub fn load(repo: &Repository, path: &str) -> Result<Self> {
        if let Some(workdir) = repo.workdir() {
            let file = workdir.join(path);
            if file.is_file() {
                let text = fs::read_to_string(&file)
                    .chain_err(|| EK::MalformedIgnoreFile(path.to_owned()))?;
                return Self::parse(path, &text);
            }
        }

        let entry = match repo
            .head()
            .and_then(|head| head.peel_to_tree())
            .and_then(|tree| tree.get_path(Path::new(path)))
        {
            Ok(entry) => entry,
            Err(_) => return Ok(Self::empty()),
        };

        let blob = repo
            .find_blob(entry.id())
            .chain_err(|| EK::MalformedIgnoreFile(path.to_owned()))?;
        let text = str::from_utf8(blob.content())
            .chain_err(|| EK::MalformedIgnoreFile(path.to_owned()))?;
        Self::parse(path, text)
    }

    /// Check whether a path is excluded
    ///
    /// A path is excluded if it or any of its parent directories match.
    ///
    pub fn is_ignored(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        self.matcher
            .matched_path_or_any_parents(Path::new(path), false)
            .is_ignore()
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::empty()
    }
}




#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestingRepo;

    #[test]
    fn matching() {
        let rules = IgnoreRules::parse("test", "vendor/\n*.min.js\n!keep.min.js\n# comment\n")
            .expect("Could not parse rules");
        assert!(rules.is_ignored("vendor/lib.c"));
        assert!(rules.is_ignored("vendor/deep/lib.c"));
        assert!(rules.is_ignored("static/app.min.js"));
        assert!(!rules.is_ignored("static/keep.min.js"));
        assert!(!rules.is_ignored("src/main.rs"));
        assert!(!IgnoreRules::empty().is_ignored("vendor/lib.c"));
    }

    #[test]
    fn malformed() {
        let err = IgnoreRules::parse(".issueignore", "*.rs\na{b\n").unwrap_err();
        match *err.kind() {
            EK::MalformedIgnoreFile(ref origin) => assert_eq!(origin, ".issueignore"),
            ref kind => panic!("Unexpected error: {}", kind),
        }
        assert!(IgnoreRules::parse(".issueignore", "[z-a]\n").is_err());
    }

    #[test]
    fn load_from_head() {
        let testing_repo = TestingRepo::new();
        testing_repo.commit("master", &[(".issueignore", "generated/\n"), ("a.rs", "")], 1);
        testing_repo
            .repo()
            .set_head("refs/heads/master")
            .expect("Could not set HEAD");

        let rules = IgnoreRules::load(testing_repo.repo(), ".issueignore")
            .expect("Could not load rules");
        assert!(rules.is_ignored("generated/foo.rs"));

        let rules = IgnoreRules::load(testing_repo.repo(), "does-not-exist")
            .expect("Could not load rules");
        assert!(!rules.is_ignored("generated/foo.rs"));
    }
}
