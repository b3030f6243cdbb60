// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Issue aggregation
//!
//! The aggregator folds the snapshots found in a stream of commits into
//! issues. Commits are expected oldest first. Once all commits are processed,
//! the status of every issue is inferred from the state of the branch heads.
//!

use git2::Oid;
use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::index::{CommitGraph, HeadStates};
use crate::issue::Issue;
use crate::scanner::CommitScan;
use crate::snapshot::{CommitInfo, IssueFields, IssueSnapshot};
use crate::status;


/// Occurrence of one issue id in multiple files of a commit
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub commit: Oid,
    pub issue_id: String,
    pub file_paths: BTreeSet<String>,
}


/// Issue aggregator
///
#[derive(Default)]
pub struct Aggregator {
    issues: BTreeMap<String, Issue>,
    duplicates: Vec<Duplicate>,
}

impl Aggregator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Process the snapshots found in one commit
    ///
    pub fn process(&mut self,
                   commit: &Rc<CommitInfo>,
                   snapshots: Vec<IssueFields>,
                   branches: &BTreeSet<String>
    ) {
        let mut files: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for item in snapshots.iter() {
            files.entry(&item.id).or_insert_with(BTreeSet::new).insert(item.file_path.clone());
        }
        for (id, paths) in files.into_iter().filter(|&(_, ref paths)| paths.len() > 1) {
            warn!("Issue {} found in {} files in {}", id, paths.len(), commit.id);
            self.duplicates.push(Duplicate {
                commit: commit.id,
                issue_id: id.to_owned(),
                file_paths: paths,
            });
        }

        for fields in snapshots {
            let snapshot = IssueSnapshot::new(commit.clone(), fields, branches.clone());
            if let Some(issue) = self.issues.get_mut(snapshot.issue_id()) {
                issue.update(snapshot);
                continue;
            }
            self.issues.insert(snapshot.issue_id().to_owned(), Issue::new(snapshot));
        }
    }

    /// Process the result of a commit scan
    ///
    pub fn process_scan(&mut self, scan: CommitScan) {
        self.process(&scan.commit, scan.snapshots, &scan.branches)
    }

    /// Finish aggregation
    ///
    /// This infers the branch partition, status and closing commit of every
    /// issue.
    ///
    pub fn finish(self, heads: &HeadStates, graph: &CommitGraph, main_branch: &str) -> IssueMap {
        let mut issues = self.issues;
        for issue in issues.values_mut() {
            issue.set_open_in(heads.open_branches(issue.id()), heads.file_paths(issue.id()));

            let status = status::compute_status(issue, main_branch);
            let closing_commit = status::closing_commit(issue, status, main_branch, graph);
            issue.set_status(status, closing_commit);
        }

        debug!("Aggregated {} issues", issues.len());
        IssueMap { issues: issues, duplicates: self.duplicates }
    }
}


/// Aggregated issues, by id
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueMap {
    issues: BTreeMap<String, Issue>,
    duplicates: Vec<Duplicate>,
}

impl IssueMap {
    pub fn get(&self, id: &str) -> Option<&Issue> {
        self.issues.get(id)
    }

    pub fn iter(&self) -> btree_map::Values<String, Issue> {
        self.issues.values()
    }

    pub fn ids(&self) -> btree_map::Keys<String, Issue> {
        self.issues.keys()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Retain only the issues matching a predicate
    ///
    pub fn filter<F>(mut self, predicate: F) -> Self
        where F: Fn(&Issue) -> bool
    {
        self.issues.retain(|_, issue| predicate(issue));
        self
    }

    /// Get the open issues
    ///
    pub fn open(self) -> Self {
        self.filter(Issue::is_open)
    }

    /// Get the closed issues
    ///
    pub fn closed(self) -> Self {
        self.filter(|issue| !issue.is_open())
    }

    /// Resolve the blockers of an issue
    ///
    /// Blockers which do not refer to a known issue resolve to `None`.
    ///
    pub fn blockers(&self, issue: &Issue) -> Vec<(String, Option<&Issue>)> {
        issue
            .blocker_ids()
            .into_iter()
            .map(|id| {
                let blocker = self.issues.get(&id);
                (id, blocker)
            })
            .collect()
    }

    /// Get all occurrences of issues in multiple files of the same commit
    ///
    /// Those usually result from copying a comment without changing its id.
    /// No attempt is made to resolve them.
    ///
    pub fn duplicates(&self) -> &[Duplicate] {
        &self.duplicates
    }
}

impl IntoIterator for IssueMap {
    type Item = (String, Issue);
    type IntoIter = btree_map::IntoIter<String, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

impl<'a> IntoIterator for &'a IssueMap {
    type Item = &'a Issue;
    type IntoIter = btree_map::Values<'a, String, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
