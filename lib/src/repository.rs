// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2016, 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2016, 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Repository related utilities
//!
//! This module provides the `History` trait, the interface through which all
//! access to the version control system happens, and its implementation for
//! `git2::Repository`.
//!

use git2::{self, BranchType, Delta, DiffFindOptions, ErrorCode, ObjectType, Oid};
use git2::{TreeWalkMode, TreeWalkResult};
use std::path::Path;

use crate::iter;
use crate::snapshot::CommitInfo;
use crate::utils::ResultIterExt;

use crate::error::*;
use crate::error::ErrorKind as EK;


/// File content at some commit
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub path: String,
    pub content: Vec<u8>,
    pub mime_type: Option<String>,
}

impl Blob {
    /// Create a blob, guessing the MIME type from its path
    ///
    pub fn new<P: Into<String>>(path: P, content: Vec<u8>) -> Self {
        let path = path.into();
        let mime_type = mime_guess::from_path(&path).first_raw().map(String::from);
        Blob { path: path, content: content, mime_type: mime_type }
    }
}


/// Local branch
///
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Branch {
    pub name: String,
    pub head: Oid,
}


/// A change record of a commit
///
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum FileChange {
    /// A file which was added, modified or deleted
    Changed(String),
    /// A file which was moved
    Renamed { from: String, to: String },
}

impl FileChange {
    /// Get all the paths affected by the change
    ///
    /// For renames, both the old and the new path are returned.
    ///
    pub fn paths(&self) -> Vec<&str> {
        match *self {
            FileChange::Changed(ref path) => vec![path.as_str()],
            FileChange::Renamed { ref from, ref to } => vec![from.as_str(), to.as_str()],
        }
    }
}


/// Access to the history of a repository
///
/// All version control access of this library goes through this interface.
///
pub trait History {
    /// List commits, parents before children
    ///
    /// If no revision is given, the commits of all local branches are
    /// returned. Otherwise, the commits reachable from the revision are
    /// returned. Ranges of the form `a..b` are supported.
    ///
    fn list_commits(&self, revision: Option<&str>) -> Result<Vec<CommitInfo>>;

    /// Determine the files changed in a commit
    ///
    /// Commits are compared to their first parent. Root commits are compared
    /// to an empty tree.
    ///
    fn changed_files(&self, commit: &CommitInfo) -> Result<Vec<FileChange>>;

    /// Get the blob at a path in the commit's tree
    ///
    /// Returns `None` if the path does not exist or does not refer to a blob.
    ///
    fn blob_at(&self, commit: &CommitInfo, path: &str) -> Result<Option<Blob>>;

    /// Get all blobs in the commit's tree, recursively
    ///
    fn tree_blobs(&self, commit: &CommitInfo) -> Result<Vec<Blob>>;

    /// List local branches, sorted by name
    ///
    fn list_branches(&self) -> Result<Vec<Branch>>;

    /// Get the ids of all commits reachable from a commit
    ///
    fn reachable_from(&self, head: Oid) -> Result<Vec<Oid>>;
}

impl History for git2::Repository {
    fn list_commits(&self, revision: Option<&str>) -> Result<Vec<CommitInfo>> {
        let mut revwalk = self.revwalk().chain_err(|| EK::CannotConstructRevwalk)?;
        revwalk
            .set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)
            .chain_err(|| EK::CannotConstructRevwalk)?;

        match revision {
            None => {
                let glob = "refs/heads/*";
                revwalk
                    .push_glob(glob)
                    .chain_err(|| EK::CannotGetReferences(glob.to_owned()))?;
            },
            Some(rev) if rev.contains("..") => {
                revwalk
                    .push_range(rev)
                    .chain_err(|| EK::CannotGetCommitForRev(rev.to_owned()))?;
            },
            Some(rev) => {
                let id = self
                    .revparse_single(rev)
                    .and_then(|object| object.peel_to_commit())
                    .chain_err(|| EK::CannotGetCommitForRev(rev.to_owned()))?
                    .id();
                revwalk.push(id).chain_err(|| EK::CannotConstructRevwalk)?;
            },
        }

        iter::Commits::new(self, revwalk).collect_result()
    }

    fn changed_files(&self, commit: &CommitInfo) -> Result<Vec<FileChange>> {
        let tree = self
            .find_tree(commit.tree)
            .chain_err(|| EK::CannotReadTree(commit.id))?;
        let parent_tree = match commit.parents.first() {
            Some(parent) => Some(self
                .find_commit(*parent)
                .and_then(|parent| parent.tree())
                .chain_err(|| EK::CannotReadTree(*parent))?
            ),
            None => None,
        };

        let mut diff = self.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;
        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let path_string = |path: Option<&Path>| path.map(|p| p.to_string_lossy().into_owned());
        let changes = diff
            .deltas()
            .filter_map(|delta| {
                let old = path_string(delta.old_file().path());
                let new = path_string(delta.new_file().path());
                match (delta.status(), old, new) {
                    (Delta::Renamed, Some(from), Some(to)) => Some(FileChange::Renamed { from: from, to: to }),
                    (_, old, new) => new.or(old).map(FileChange::Changed),
                }
            })
            .collect();
        Ok(changes)
    }

    fn blob_at(&self, commit: &CommitInfo, path: &str) -> Result<Option<Blob>> {
        let tree = self
            .find_tree(commit.tree)
            .chain_err(|| EK::CannotReadTree(commit.id))?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(ref err) if err.code() == ErrorCode::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if entry.kind() != Some(ObjectType::Blob) {
            return Ok(None);
        }

        let blob = self.find_blob(entry.id())?;
        Ok(Some(Blob::new(path, blob.content().to_vec())))
    }

    fn tree_blobs(&self, commit: &CommitInfo) -> Result<Vec<Blob>> {
        let tree = self
            .find_tree(commit.tree)
            .chain_err(|| EK::CannotReadTree(commit.id))?;

        let mut entries = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    entries.push((format!("{}{}", root, name), entry.id()));
                }
            }
            TreeWalkResult::Ok
        }).chain_err(|| EK::CannotReadTree(commit.id))?;

        entries
            .into_iter()
            .map(|(path, id)| {
                self.find_blob(id)
                    .map(|blob| Blob::new(path, blob.content().to_vec()))
                    .map_err(Error::from)
            })
            .collect_result()
    }

    fn list_branches(&self) -> Result<Vec<Branch>> {
        let glob = "refs/heads/*";
        let mut retval = Vec::new();

        let branches = self
            .branches(Some(BranchType::Local))
            .chain_err(|| EK::CannotGetReferences(glob.to_owned()))?;
        for item in branches {
            let (branch, _) = item.chain_err(|| EK::CannotGetReferences(glob.to_owned()))?;
            let name = match branch.name()? {
                Some(name) => name.to_owned(),
                None => continue,
            };
            let head = branch
                .get()
                .peel_to_commit()
                .chain_err(|| EK::CannotGetCommitForRev(name.clone()))?
                .id();
            retval.push(Branch { name: name, head: head });
        }

        retval.sort();
        Ok(retval)
    }

    fn reachable_from(&self, head: Oid) -> Result<Vec<Oid>> {
        let mut revwalk = self.revwalk().chain_err(|| EK::CannotConstructRevwalk)?;
        revwalk.push(head).chain_err(|| EK::CannotGetCommitForRev(head.to_string()))?;
        iter::CommitIds::from(revwalk).collect_result()
    }
}




#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestingRepo;

    #[test]
    fn list_commits_oldest_first() {
        let testing_repo = TestingRepo::new();
        let c1 = testing_repo.commit("master", &[("a.txt", "1")], 1);
        let c2 = testing_repo.commit("master", &[("a.txt", "2")], 2);
        let c3 = testing_repo.commit_with_parents("topic", &[c1], &[("b.txt", "3")], 3);

        let repo = testing_repo.repo();
        let all: Vec<Oid> = repo
            .list_commits(None)
            .expect("Could not list commits")
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], c1);
        assert!(all.contains(&c2));
        assert!(all.contains(&c3));

        let master: Vec<Oid> = repo
            .list_commits(Some("master"))
            .expect("Could not list commits")
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(master, vec![c1, c2]);

        let range: Vec<Oid> = repo
            .list_commits(Some("master..topic"))
            .expect("Could not list commits")
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(range, vec![c3]);

        assert!(repo.list_commits(Some("does-not-exist")).is_err());
    }

    #[test]
    fn commit_metadata() {
        let testing_repo = TestingRepo::new();
        let c1 = testing_repo.commit("master", &[("a.txt", "1")], 1000);
        let repo = testing_repo.repo();

        let commits = repo.list_commits(None).expect("Could not list commits");
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].id, c1);
        assert_eq!(commits[0].author, "Foo Bar");
        assert_eq!(commits[0].authored_time.timestamp(), 1000);
        assert!(commits[0].parents.is_empty());
    }

    #[test]
    fn changed_files_and_blobs() {
        let testing_repo = TestingRepo::new();
        testing_repo.commit("master", &[("a.txt", "a"), ("dir/b.rs", "b"), ("gone.txt", "x")], 1);
        let c2 = testing_repo.commit("master", &[("a.txt", "a2"), ("dir/b.rs", "b")], 2);
        let repo = testing_repo.repo();

        let commit = repo
            .list_commits(None)
            .expect("Could not list commits")
            .into_iter()
            .find(|c| c.id == c2)
            .expect("Could not find commit");

        let mut changed: Vec<String> = repo
            .changed_files(&commit)
            .expect("Could not compute changes")
            .iter()
            .flat_map(|c| c.paths().into_iter().map(String::from).collect::<Vec<_>>())
            .collect();
        changed.sort();
        assert_eq!(changed, vec!["a.txt", "gone.txt"]);

        let blob = repo
            .blob_at(&commit, "dir/b.rs")
            .expect("Could not read blob")
            .expect("Blob does not exist");
        assert_eq!(blob.content, b"b".to_vec());
        assert!(repo.blob_at(&commit, "gone.txt").expect("Could not read blob").is_none());
        assert!(repo.blob_at(&commit, "dir").expect("Could not read blob").is_none());

        let mut paths: Vec<String> = repo
            .tree_blobs(&commit)
            .expect("Could not read tree")
            .into_iter()
            .map(|b| b.path)
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["a.txt", "dir/b.rs"]);
    }

    #[test]
    fn renames_report_both_paths() {
        let content = "a file with enough content to be detected as a rename\n".repeat(8);
        let testing_repo = TestingRepo::new();
        testing_repo.commit("master", &[("old/name.txt", &content)], 1);
        let c2 = testing_repo.commit("master", &[("new/name.txt", &content)], 2);
        let repo = testing_repo.repo();

        let commit = repo
            .list_commits(None)
            .expect("Could not list commits")
            .into_iter()
            .find(|c| c.id == c2)
            .expect("Could not find commit");
        let changes = repo.changed_files(&commit).expect("Could not compute changes");
        assert_eq!(changes, vec![FileChange::Renamed {
            from: "old/name.txt".to_owned(),
            to: "new/name.txt".to_owned(),
        }]);
    }

    #[test]
    fn branches_and_reachability() {
        let testing_repo = TestingRepo::new();
        let c1 = testing_repo.commit("master", &[("a.txt", "1")], 1);
        let c2 = testing_repo.commit("topic", &[("a.txt", "2")], 2);
        let repo = testing_repo.repo();

        let branches = repo.list_branches().expect("Could not list branches");
        assert_eq!(branches, vec![
            Branch { name: "master".to_owned(), head: c1 },
            Branch { name: "topic".to_owned(), head: c2 },
        ]);

        let mut reachable = repo.reachable_from(c2).expect("Could not walk");
        reachable.sort();
        let mut expected = vec![c1, c2];
        expected.sort();
        assert_eq!(reachable, expected);
    }
}
