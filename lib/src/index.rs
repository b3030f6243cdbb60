// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Session indices
//!
//! Branch containment and commit children are not available from the history
//! directly, or only at a cost linear in the size of the history. This module
//! provides indices which are built once per session and queried many times.
//!
//! All of these are plain values, passed explicitly to whoever needs them.
//!

use git2::Oid;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use crate::repository::{Branch, History};
use crate::snapshot::{CommitInfo, IssueFields};

use crate::error::*;


/// Index of the branches containing a commit
///
pub struct BranchIndex {
    branches: Vec<Branch>,
    containing: HashMap<Oid, BTreeSet<String>>,
}

impl BranchIndex {
    /// Build the index for all local branches
    ///
    pub fn build<H>(history: &H) -> Result<Self>
        where H: History + ?Sized
    {
        let branches = history.list_branches()?;
        let mut containing: HashMap<Oid, BTreeSet<String>> = HashMap::new();

        for branch in branches.iter() {
            for id in history.reachable_from(branch.head)? {
                containing
                    .entry(id)
                    .or_insert_with(BTreeSet::new)
                    .insert(branch.name.clone());
            }
        }

        debug!("Indexed {} commits on {} branches", containing.len(), branches.len());
        Ok(BranchIndex { branches: branches, containing: containing })
    }

    /// Get the branches the index was built for
    ///
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Get the names of all branches containing a commit
    ///
    pub fn branches_containing(&self, commit: Oid) -> BTreeSet<String> {
        self.containing.get(&commit).cloned().unwrap_or_default()
    }

    /// Get the head of a branch
    ///
    pub fn head_of(&self, branch: &str) -> Option<Oid> {
        self.branches
            .iter()
            .find(|b| b.name == branch)
            .map(|b| b.head)
    }

    /// Check whether the index still reflects the branches of a history
    ///
    /// If any branch was created, removed or moved, the index is outdated and
    /// needs to be rebuilt.
    ///
    pub fn is_current<H>(&self, history: &H) -> Result<bool>
        where H: History + ?Sized
    {
        history.list_branches().map(|branches| branches == self.branches)
    }
}


/// Commit graph with children
///
/// Holds commits in the order they were listed, parents before children,
/// along with the inverse of the parent relation.
///
pub struct CommitGraph {
    commits: Vec<Rc<CommitInfo>>,
    positions: HashMap<Oid, usize>,
    children: HashMap<Oid, Vec<Oid>>,
}

impl CommitGraph {
    /// Build the graph for a revision, or for all branches
    ///
    pub fn build<H>(history: &H, revision: Option<&str>) -> Result<Self>
        where H: History + ?Sized
    {
        history
            .list_commits(revision)
            .map(Self::from_commits)
    }

    /// Build the graph from a list of commits ordered parents first
    ///
    pub fn from_commits(commits: Vec<CommitInfo>) -> Self {
        let mut positions = HashMap::with_capacity(commits.len());
        let mut children: HashMap<Oid, Vec<Oid>> = HashMap::new();

        let commits: Vec<Rc<CommitInfo>> = commits.into_iter().map(Rc::new).collect();
        for (position, commit) in commits.iter().enumerate() {
            positions.insert(commit.id, position);
            for parent in commit.parents.iter() {
                children.entry(*parent).or_insert_with(Vec::new).push(commit.id);
            }
        }

        CommitGraph { commits: commits, positions: positions, children: children }
    }

    /// Get all commits, parents before children
    ///
    pub fn commits(&self) -> &[Rc<CommitInfo>] {
        &self.commits
    }

    pub fn get(&self, id: Oid) -> Option<&Rc<CommitInfo>> {
        self.positions.get(&id).map(|position| &self.commits[*position])
    }

    pub fn contains(&self, id: Oid) -> bool {
        self.positions.contains_key(&id)
    }

    /// Get the ids of the children of a commit
    ///
    /// Children are ordered like the commits of the graph.
    ///
    pub fn children(&self, id: Oid) -> &[Oid] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Get the first child of a commit
    ///
    pub fn first_child(&self, id: Oid) -> Option<&Rc<CommitInfo>> {
        self.children(id).first().and_then(|child| self.get(*child))
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}


/// Issues present at the heads of branches
///
/// For each branch, this holds the issues found in the full tree of the
/// branch's head commit along with the files they were found in. An issue is
/// open in a branch if and only if the branch's head state contains it.
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadStates {
    states: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl HeadStates {
    pub fn new() -> Self {
        Default::default()
    }

    /// Record the issues found in the head tree of a branch
    ///
    /// Any state previously recorded for the branch is replaced.
    ///
    pub fn insert<'a, I>(&mut self, branch: &str, fields: I)
        where I: IntoIterator<Item = &'a IssueFields>
    {
        let mut state: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for item in fields {
            state
                .entry(item.id.clone())
                .or_insert_with(BTreeSet::new)
                .insert(item.file_path.clone());
        }
        self.states.insert(branch.to_owned(), state);
    }

    /// Get the names of all branches with a recorded state
    ///
    pub fn branches(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Check whether an issue is present at the head of a branch
    ///
    pub fn contains(&self, branch: &str, id: &str) -> bool {
        self.states
            .get(branch)
            .map(|state| state.contains_key(id))
            .unwrap_or(false)
    }

    /// Get the names of all branches in which an issue is open
    ///
    pub fn open_branches(&self, id: &str) -> BTreeSet<String> {
        self.states
            .iter()
            .filter(|&(_, state)| state.contains_key(id))
            .map(|(branch, _)| branch.clone())
            .collect()
    }

    /// Get the files containing an issue, per branch
    ///
    pub fn file_paths(&self, id: &str) -> BTreeMap<String, BTreeSet<String>> {
        self.states
            .iter()
            .filter_map(|(branch, state)| state.get(id).map(|paths| (branch.clone(), paths.clone())))
            .collect()
    }
}




#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestingRepo;

    #[test]
    fn branch_containment() {
        let testing_repo = TestingRepo::new();
        let c1 = testing_repo.commit("master", &[("a.txt", "1")], 1);
        let c2 = testing_repo.commit("topic", &[("a.txt", "2")], 2);
        let c3 = testing_repo.commit("master", &[("a.txt", "3")], 3);

        let index = BranchIndex::build(testing_repo.repo()).expect("Could not build index");
        let both: BTreeSet<String> = vec!["master".to_owned(), "topic".to_owned()]
            .into_iter()
            .collect();
        assert_eq!(index.branches_containing(c1), both);
        assert_eq!(index.branches_containing(c2).into_iter().collect::<Vec<_>>(), vec!["topic"]);
        assert_eq!(index.branches_containing(c3).into_iter().collect::<Vec<_>>(), vec!["master"]);
        assert_eq!(index.head_of("topic"), Some(c2));
        assert_eq!(index.head_of("nope"), None);
        assert!(index.is_current(testing_repo.repo()).expect("Could not list branches"));

        testing_repo.commit("topic", &[("a.txt", "4")], 4);
        assert!(!index.is_current(testing_repo.repo()).expect("Could not list branches"));
    }

    #[test]
    fn children() {
        let testing_repo = TestingRepo::new();
        let c1 = testing_repo.commit("master", &[("a.txt", "1")], 1);
        let c2 = testing_repo.commit("master", &[("a.txt", "2")], 2);
        let c3 = testing_repo.commit_with_parents("topic", &[c1], &[("b.txt", "3")], 3);
        let c4 = testing_repo.commit_with_parents("master", &[c2, c3], &[("c.txt", "4")], 4);

        let graph = CommitGraph::build(testing_repo.repo(), None).expect("Could not build graph");
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.commits()[0].id, c1);

        let mut children = graph.children(c1).to_vec();
        children.sort();
        let mut expected = vec![c2, c3];
        expected.sort();
        assert_eq!(children, expected);

        assert_eq!(graph.first_child(c3).map(|c| c.id), Some(c4));
        assert_eq!(graph.first_child(c4), None);
        assert!(graph.contains(c4));
    }

    #[test]
    fn head_states() {
        let mut states = HeadStates::new();
        let a = IssueFields::new("a", "src/a.rs");
        let a2 = IssueFields::new("a", "src/b.rs");
        let b = IssueFields::new("b", "src/b.rs");
        states.insert("master", vec![&a, &b]);
        states.insert("a", vec![&a2]);

        assert!(states.contains("master", "b"));
        assert!(!states.contains("a", "b"));
        assert!(!states.contains("nope", "a"));
        assert_eq!(states.open_branches("a").len(), 2);
        assert_eq!(states.open_branches("b").into_iter().collect::<Vec<_>>(), vec!["master"]);

        let paths = states.file_paths("a");
        assert_eq!(paths["master"].iter().collect::<Vec<_>>(), vec!["src/a.rs"]);
        assert_eq!(paths["a"].iter().collect::<Vec<_>>(), vec!["src/b.rs"]);
    }
}
