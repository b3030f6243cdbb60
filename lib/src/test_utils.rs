// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Testing utils
//!
//! This module provides some utility functionality exclusively for testing
//! purposes.
//!

use git2::{self, Oid, Repository, Signature, Time};
use std::cell::Cell;
use std::collections::BTreeMap;
use tempfile::TempDir;


/// Testing repository
///
/// This type provides a temporary bare testing repository along with helpers
/// for creating commits with explicit contents and author times.
///
pub struct TestingRepo {
    repo: Repository,
    last_commit: Cell<Option<Oid>>,
    _dir: TempDir,
}

impl TestingRepo {
    /// Create a testing repository
    ///
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Could not create temporary directory");
        let repo = Repository::init_opts(
            dir.path(),
            git2::RepositoryInitOptions::new().bare(true).mkdir(true)
        ).expect("Could not open/init repository");
        TestingRepo { repo: repo, last_commit: Cell::new(None), _dir: dir }
    }

    /// Get a reference of the repo
    ///
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Commit a file set on a branch
    ///
    /// The files given make up the complete tree of the new commit. The commit
    /// will have the branch's head as parent. If the branch does not exist yet,
    /// it is forked off the commit created last. The branch is moved to the new
    /// commit.
    ///
    pub fn commit(&self, branch: &str, files: &[(&str, &str)], time: i64) -> Oid {
        let parent = self
            .repo
            .find_branch(branch, git2::BranchType::Local)
            .ok()
            .and_then(|b| b.get().target())
            .or(self.last_commit.get());
        let parents: Vec<Oid> = parent.into_iter().collect();
        self.commit_with_parents(branch, &parents, files, time)
    }

    /// Commit a file set with explicit parents
    ///
    /// The branch is moved to the new commit.
    ///
    pub fn commit_with_parents(&self,
                               branch: &str,
                               parents: &[Oid],
                               files: &[(&str, &str)],
                               time: i64
    ) -> Oid {
        let tree_id = self.write_tree(files);
        let tree = self.repo.find_tree(tree_id).expect("Could not find tree");
        let sig = Signature::new("Foo Bar", "foo.bar@example.com", &Time::new(time, 0))
            .expect("Could not create signature");
        let parent_commits: Vec<git2::Commit> = parents
            .iter()
            .map(|id| self.repo.find_commit(*id).expect("Could not find parent"))
            .collect();
        let parent_refs: Vec<&git2::Commit> = parent_commits.iter().collect();

        let id = self
            .repo
            .commit(None, &sig, &sig, &format!("Commit at {}", time), &tree, &parent_refs)
            .expect("Could not create commit");
        self.set_branch(branch, id);
        self.last_commit.set(Some(id));
        id
    }

    /// Point a branch at a commit
    ///
    pub fn set_branch(&self, branch: &str, id: Oid) {
        self.repo
            .reference(&format!("refs/heads/{}", branch), id, true, "test: set branch")
            .expect("Could not set branch");
    }

    /// Write a tree from a list of paths and contents
    ///
    fn write_tree(&self, files: &[(&str, &str)]) -> Oid {
        let mut nested: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        let mut builder = self.repo.treebuilder(None).expect("Could not create treebuilder");

        for &(path, content) in files {
            match path.split_once('/') {
                Some((dir, rest)) => nested
                    .entry(dir.to_owned())
                    .or_insert_with(Vec::new)
                    .push((rest.to_owned(), content.to_owned())),
                None => {
                    let blob = self.repo.blob(content.as_bytes()).expect("Could not write blob");
                    builder.insert(path, blob, 0o100644).expect("Could not insert blob");
                },
            }
        }

        for (dir, entries) in nested {
            let entries: Vec<(&str, &str)> = entries
                .iter()
                .map(|&(ref p, ref c)| (p.as_str(), c.as_str()))
                .collect();
            let subtree = self.write_tree(&entries);
            builder.insert(&dir, subtree, 0o040000).expect("Could not insert tree");
        }

        builder.write().expect("Could not write tree")
    }
}
