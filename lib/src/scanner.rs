// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Commit scanner
//!
//! The scanner extracts the issue snapshots introduced by a single commit.
//! Only the files changed by the commit are considered, with both paths of a
//! rename counting as changed.
//!

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::extract;
use crate::ignore_rules::IgnoreRules;
use crate::index::BranchIndex;
use crate::repository::{Blob, History};
use crate::snapshot::{CommitInfo, IssueFields};

use crate::error::*;


/// Result of scanning a single commit
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitScan {
    pub commit: Rc<CommitInfo>,
    /// Snapshots found, sorted by `IssueFields::sort_key()`
    pub snapshots: Vec<IssueFields>,
    pub files_changed: Vec<String>,
    pub branches: BTreeSet<String>,
}


/// Scanner for commits of one history
///
pub struct Scanner<'a, H>
    where H: History + ?Sized + 'a
{
    history: &'a H,
    ignore: &'a IgnoreRules,
    branches: &'a BranchIndex,
}

impl<'a, H> Scanner<'a, H>
    where H: History + ?Sized + 'a
{
    pub fn new(history: &'a H, ignore: &'a IgnoreRules, branches: &'a BranchIndex) -> Self {
        Scanner { history: history, ignore: ignore, branches: branches }
    }

    /// Scan the files changed by a commit
    ///
    /// Files which are ignored, absent from the commit's tree or unreadable
    /// are skipped.
    ///
    pub fn scan(&self, commit: Rc<CommitInfo>) -> Result<CommitScan> {
        let files_changed: Vec<String> = self
            .history
            .changed_files(&commit)?
            .iter()
            .flat_map(|change| change.paths())
            .map(String::from)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut snapshots = Vec::new();
        for path in files_changed.iter() {
            if self.ignore.is_ignored(path) {
                trace!("Ignoring {} in {}", path, commit.id);
                continue;
            }

            match self.history.blob_at(&commit, path) {
                Ok(Some(blob)) => snapshots.append(&mut extract_blob(&blob)),
                Ok(None) => trace!("{} is not present in {}", path, commit.id),
                Err(err) => warn!("Skipping {} in {}: {}", path, commit.id, err),
            }
        }
        snapshots.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        debug!("Found {} snapshots in {} changed files of {}",
               snapshots.len(),
               files_changed.len(),
               commit.id);

        Ok(CommitScan {
            branches: self.branches.branches_containing(commit.id),
            commit: commit,
            snapshots: snapshots,
            files_changed: files_changed,
        })
    }

    /// Scan the full tree of a commit
    ///
    /// This yields all the issues present at that commit, sorted by
    /// `IssueFields::sort_key()`.
    ///
    pub fn scan_tree(&self, commit: &CommitInfo) -> Result<Vec<IssueFields>> {
        let mut snapshots: Vec<IssueFields> = self
            .history
            .tree_blobs(commit)?
            .iter()
            .filter(|blob| !self.ignore.is_ignored(&blob.path))
            .flat_map(extract_blob)
            .collect();
        snapshots.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(snapshots)
    }
}


fn extract_blob(blob: &Blob) -> Vec<IssueFields> {
    extract::extract(&blob.path, blob.mime_type.as_deref(), &blob.content)
}
