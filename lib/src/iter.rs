// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2016, 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2016, 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Utility iterators
//!
//! This module provides various iterators.
//!

use chrono::{FixedOffset, Offset, TimeZone, Utc};
use git2::{Commit, Oid, Repository, Revwalk};

use crate::snapshot::CommitInfo;

use crate::error::*;
use crate::error::ErrorKind as EK;


/// Convert a git commit into its value representation
///
pub fn commit_info(commit: &Commit) -> Result<CommitInfo> {
    let author = commit.author();
    let when = author.when();

    let offset = FixedOffset::east_opt(when.offset_minutes() * 60)
        .unwrap_or_else(|| Utc.fix());
    let authored_time = offset
        .timestamp_opt(when.seconds(), 0)
        .single()
        .ok_or_else(|| Error::from_kind(EK::CannotGetCommit))?;

    Ok(CommitInfo {
        id: commit.id(),
        author: author.name().unwrap_or_default().to_owned(),
        authored_time: authored_time,
        parents: commit.parent_ids().collect(),
        tree: commit.tree_id(),
        message: commit.message().unwrap_or_default().to_owned(),
    })
}

/// Iterator over the commits of a revwalk
///
/// This iterator wraps a `Revwalk` and returns the value representation of
/// each commit walked.
///
pub struct Commits<'r> {
    repo: &'r Repository,
    revwalk: Revwalk<'r>,
}

impl<'r> Commits<'r> {
    pub fn new(repo: &'r Repository, revwalk: Revwalk<'r>) -> Self {
        Commits { repo: repo, revwalk: revwalk }
    }
}

impl<'r> Iterator for Commits<'r> {
    type Item = Result<CommitInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        let repo = self.repo;
        self.revwalk
            .next()
            .map(|item| item
                .and_then(|id| repo.find_commit(id))
                .chain_err(|| EK::CannotGetCommit)
                .and_then(|commit| commit_info(&commit))
            )
    }
}


/// Iterator over the ids of a revwalk
///
pub struct CommitIds<'r>(Revwalk<'r>);

impl<'r> From<Revwalk<'r>> for CommitIds<'r> {
    fn from(revwalk: Revwalk<'r>) -> Self {
        CommitIds(revwalk)
    }
}

impl<'r> Iterator for CommitIds<'r> {
    type Item = Result<Oid>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0
            .next()
            .map(|item| item.chain_err(|| EK::CannotGetCommit))
    }
}
