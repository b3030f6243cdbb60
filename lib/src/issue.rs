// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2016, 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2016, 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Issues
//!
//! This module provides the `Issue` type, the merged view of all snapshots of
//! one issue id found in the history.
//!
//! Metadata accessors follow a "newest non-null wins" rule: the value of a
//! field is taken from the newest snapshot defining it.
//!

use chrono::{DateTime, FixedOffset, NaiveDate};
use git2::Oid;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::rc::Rc;

use crate::snapshot::{CommitInfo, Field, IssueSnapshot};
use crate::status::Status;
use crate::utils::split_list;


/// Revision of an issue
///
/// A revision is a state of an issue's metadata, introduced by a commit. Once
/// a later commit changes the metadata, the revision records the values which
/// were superseded along with the superseding commit.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub commit: Rc<CommitInfo>,
    pub superseded: BTreeMap<Field, Option<String>>,
    pub superseded_by: Option<Oid>,
}

impl Revision {
    fn new(commit: Rc<CommitInfo>) -> Self {
        Revision { commit: commit, superseded: BTreeMap::new(), superseded_by: None }
    }
}


/// Issue
///
/// An issue always holds at least one snapshot. Snapshots are kept ordered by
/// the authored time of their commits, snapshots with equal times in the order
/// they were added.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    id: String,
    snapshots: Vec<IssueSnapshot>,

    participants: BTreeSet<String>,
    in_branches: BTreeSet<String>,
    activity: Vec<Rc<CommitInfo>>,
    activity_ids: HashSet<Oid>,
    revisions: Vec<Revision>,

    open_in_branches: BTreeSet<String>,
    closed_in_branches: BTreeSet<String>,
    file_paths: BTreeMap<String, BTreeSet<String>>,
    status: Status,
    closing_commit: Option<Rc<CommitInfo>>,
}

impl Issue {
    /// Create an issue from its first snapshot
    ///
    pub fn new(snapshot: IssueSnapshot) -> Self {
        let mut retval = Issue {
            id: snapshot.issue_id().to_owned(),
            snapshots: Vec::new(),
            participants: BTreeSet::new(),
            in_branches: BTreeSet::new(),
            activity: Vec::new(),
            activity_ids: HashSet::new(),
            revisions: Vec::new(),
            open_in_branches: BTreeSet::new(),
            closed_in_branches: BTreeSet::new(),
            file_paths: BTreeMap::new(),
            status: Status::default(),
            closing_commit: None,
        };
        retval.update(snapshot);
        retval
    }

    /// Add a snapshot
    ///
    /// Snapshots are expected to arrive roughly in order of their authored
    /// time, in which case adding one is cheap.
    ///
    pub fn update(&mut self, snapshot: IssueSnapshot) {
        self.participants.insert(snapshot.commit.author.clone());
        self.in_branches.extend(snapshot.branches.iter().cloned());

        let time = snapshot.authored_time();
        if self.activity_ids.insert(snapshot.commit_ref()) {
            let position = self.activity.partition_point(|c| c.authored_time <= time);
            self.activity.insert(position, snapshot.commit.clone());
        }

        let position = self.snapshots.partition_point(|s| s.authored_time() <= time);
        if position == self.snapshots.len() {
            record_revision(&mut self.revisions, self.snapshots.last(), &snapshot);
            self.snapshots.push(snapshot);
        } else {
            // Late arrival, the chain of revisions needs to be redone.
            self.snapshots.insert(position, snapshot);
            let mut revisions = Vec::new();
            let mut previous = None;
            for snapshot in self.snapshots.iter() {
                record_revision(&mut revisions, previous, snapshot);
                previous = Some(snapshot);
            }
            self.revisions = revisions;
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get all snapshots, oldest first
    ///
    pub fn snapshots(&self) -> &[IssueSnapshot] {
        &self.snapshots
    }

    fn first_snapshot(&self) -> &IssueSnapshot {
        &self.snapshots[0]
    }

    fn last_snapshot(&self) -> &IssueSnapshot {
        &self.snapshots[self.snapshots.len() - 1]
    }

    /// Get the newest value of a field
    ///
    pub fn latest(&self, field: Field) -> Option<&str> {
        self.snapshots
            .iter()
            .rev()
            .find_map(|snapshot| snapshot.fields.get(field))
    }

    pub fn title(&self) -> Option<&str> {
        self.latest(Field::Title)
    }

    pub fn description(&self) -> Option<&str> {
        self.latest(Field::Description)
    }

    pub fn priority(&self) -> Option<&str> {
        self.latest(Field::Priority)
    }

    /// Get the path of the file the issue was last seen in
    ///
    pub fn file_path(&self) -> &str {
        &self.last_snapshot().fields.file_path
    }

    pub fn assignees(&self) -> Vec<String> {
        self.latest(Field::Assignees).map(split_list).unwrap_or_default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.latest(Field::Labels).map(split_list).unwrap_or_default()
    }

    /// Get the ids of the issues blocking this one
    ///
    pub fn blocker_ids(&self) -> Vec<String> {
        self.latest(Field::Blockers).map(split_list).unwrap_or_default()
    }

    /// Get the due date
    ///
    /// Dates are expected in the format `YYYY-MM-DD`. `None` is returned if the
    /// date is not set or does not parse.
    ///
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.latest(Field::DueDate)
            .and_then(|date| NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok())
    }

    pub fn weight(&self) -> Option<u32> {
        self.latest(Field::Weight).and_then(|weight| weight.trim().parse().ok())
    }

    /// Get the author of the oldest snapshot
    ///
    pub fn creator(&self) -> &str {
        &self.first_snapshot().commit.author
    }

    pub fn created_date(&self) -> DateTime<FixedOffset> {
        self.first_snapshot().authored_time()
    }

    /// Get the author of the newest snapshot
    ///
    pub fn last_author(&self) -> &str {
        &self.last_snapshot().commit.author
    }

    pub fn last_authored_date(&self) -> DateTime<FixedOffset> {
        self.last_snapshot().authored_time()
    }

    /// Get the authors of all snapshots
    ///
    pub fn participants(&self) -> &BTreeSet<String> {
        &self.participants
    }

    /// Get all branches containing any of the issue's snapshots
    ///
    pub fn in_branches(&self) -> &BTreeSet<String> {
        &self.in_branches
    }

    /// Get the commits contributing to the issue, oldest first
    ///
    /// This includes the closing commit, if the issue was closed.
    ///
    pub fn activity(&self) -> Vec<&CommitInfo> {
        self.activity
            .iter()
            .chain(self.closing_commit.iter())
            .map(|commit| &**commit)
            .collect()
    }

    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }

    /// Get the authored time of the first snapshot in a given branch
    ///
    /// For the main branch, this is the date the issue was accepted.
    ///
    pub fn accepted_date(&self, main_branch: &str) -> Option<DateTime<FixedOffset>> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.in_branch(main_branch))
            .map(IssueSnapshot::authored_time)
    }

    /// Get the authored time of the last snapshot in a given branch
    ///
    pub fn latest_in_branch(&self, branch: &str) -> Option<DateTime<FixedOffset>> {
        self.last_snapshot_in(branch).map(IssueSnapshot::authored_time)
    }

    pub fn last_snapshot_in(&self, branch: &str) -> Option<&IssueSnapshot> {
        self.snapshots
            .iter()
            .rev()
            .find(|snapshot| snapshot.in_branch(branch))
    }

    /// Get the branches at the head of which the issue is present
    ///
    pub fn open_in_branches(&self) -> &BTreeSet<String> {
        &self.open_in_branches
    }

    pub fn closed_in_branches(&self) -> &BTreeSet<String> {
        &self.closed_in_branches
    }

    /// Get the files the issue is found in, per branch
    ///
    pub fn file_paths(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.file_paths
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn closing_commit(&self) -> Option<&CommitInfo> {
        self.closing_commit.as_deref()
    }

    /// Set the branches the issue is open in
    ///
    /// All other branches containing a snapshot are considered branches the
    /// issue was closed in.
    ///
    pub(crate) fn set_open_in(&mut self,
                              open_in: BTreeSet<String>,
                              file_paths: BTreeMap<String, BTreeSet<String>>
    ) {
        self.closed_in_branches = self.in_branches.difference(&open_in).cloned().collect();
        self.open_in_branches = open_in;
        self.file_paths = file_paths;
    }

    pub(crate) fn set_status(&mut self, status: Status, closing_commit: Option<Rc<CommitInfo>>) {
        self.status = status;
        self.closing_commit = closing_commit;
    }
}


/// Record the revision introduced by a snapshot
///
/// If the snapshot does not differ from the previous one, no revision is
/// recorded.
///
fn record_revision(revisions: &mut Vec<Revision>,
                   previous: Option<&IssueSnapshot>,
                   snapshot: &IssueSnapshot
) {
    if let Some(previous) = previous {
        let superseded: BTreeMap<Field, Option<String>> = Field::ALL
            .iter()
            .filter(|field| previous.fields.get(**field) != snapshot.fields.get(**field))
            .map(|field| (*field, previous.fields.get(*field).map(String::from)))
            .collect();
        if superseded.is_empty() {
            return;
        }

        if let Some(last) = revisions.last_mut() {
            last.superseded = superseded;
            last.superseded_by = Some(snapshot.commit_ref());
        }
    }

    revisions.push(Revision::new(snapshot.commit.clone()));
}




#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::IssueFields;
    use chrono::TimeZone;

    fn commit(n: u64, author: &str, time: i64) -> Rc<CommitInfo> {
        let id = Oid::from_str(&format!("{:040x}", n)).expect("Could not create id");
        Rc::new(CommitInfo {
            id: id,
            author: author.to_owned(),
            authored_time: FixedOffset::east_opt(3600)
                .expect("Could not create offset")
                .timestamp_opt(time, 0)
                .unwrap(),
            parents: Vec::new(),
            tree: id,
            message: format!("Commit {}", n),
        })
    }

    fn snapshot(commit: Rc<CommitInfo>, title: &str, branches: &[&str]) -> IssueSnapshot {
        let mut fields = IssueFields::new("a", "src/a.rs");
        fields.title = Some(title.to_owned());
        IssueSnapshot::new(commit, fields, branches.iter().map(|b| b.to_string()).collect())
    }

    #[test]
    fn single_snapshot() {
        let issue = Issue::new(snapshot(commit(1, "Foo", 10), "X", &["master"]));
        assert_eq!(issue.id(), "a");
        assert_eq!(issue.revisions().len(), 1);
        assert!(issue.revisions()[0].superseded.is_empty());
        assert_eq!(issue.revisions()[0].superseded_by, None);
        assert_eq!(issue.creator(), "Foo");
        assert_eq!(issue.last_author(), "Foo");
        assert_eq!(issue.activity().len(), 1);
    }

    #[test]
    fn revision_diffs() {
        let c1 = commit(1, "Foo", 10);
        let c2 = commit(2, "Bar", 20);
        let c3 = commit(3, "Baz", 30);

        let mut issue = Issue::new(snapshot(c1.clone(), "X", &["master"]));
        issue.update(snapshot(c2.clone(), "Y", &["master"]));
        issue.update(snapshot(c3.clone(), "Y", &["topic"]));

        let revisions = issue.revisions();
        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions[0].commit.id, c1.id);
        assert_eq!(revisions[0].superseded.len(), 1);
        assert_eq!(revisions[0].superseded[&Field::Title], Some("X".to_owned()));
        assert_eq!(revisions[0].superseded_by, Some(c2.id));
        assert!(revisions[1].superseded.is_empty());
        assert_eq!(revisions[1].commit.id, c2.id);

        assert_eq!(issue.title(), Some("Y"));
        assert_eq!(issue.creator(), "Foo");
        assert_eq!(issue.last_author(), "Baz");
        assert_eq!(issue.participants().len(), 3);
        assert_eq!(issue.in_branches().iter().collect::<Vec<_>>(), vec!["master", "topic"]);
        assert_eq!(issue.accepted_date("master"), Some(c1.authored_time));
        assert_eq!(issue.latest_in_branch("master"), Some(c2.authored_time));
        assert_eq!(issue.latest_in_branch("nope"), None);
    }

    #[test]
    fn late_arrival() {
        let c1 = commit(1, "Foo", 10);
        let c2 = commit(2, "Bar", 20);
        let c3 = commit(3, "Baz", 30);

        let mut issue = Issue::new(snapshot(c1.clone(), "X", &["master"]));
        issue.update(snapshot(c3.clone(), "Z", &["master"]));
        issue.update(snapshot(c2.clone(), "Y", &["master"]));

        let ids: Vec<Oid> = issue.snapshots().iter().map(|s| s.commit_ref()).collect();
        assert_eq!(ids, vec![c1.id, c2.id, c3.id]);
        let activity: Vec<Oid> = issue.activity().iter().map(|c| c.id).collect();
        assert_eq!(activity, vec![c1.id, c2.id, c3.id]);

        let revisions = issue.revisions();
        assert_eq!(revisions.len(), 3);
        assert_eq!(revisions[0].superseded[&Field::Title], Some("X".to_owned()));
        assert_eq!(revisions[1].superseded[&Field::Title], Some("Y".to_owned()));
        assert_eq!(revisions[1].superseded_by, Some(c3.id));
        assert_eq!(issue.title(), Some("Z"));
    }

    #[test]
    fn newest_non_null_wins() {
        let mut first = IssueFields::new("a", "src/a.rs");
        first.title = Some("Title".to_owned());
        first.labels = Some("bug, ui".to_owned());
        first.due_date = Some("2017-03-01".to_owned());
        first.weight = Some("3".to_owned());
        first.blockers = Some("b,c".to_owned());
        let mut second = IssueFields::new("a", "src/b.rs");
        second.description = Some("Now with text".to_owned());
        second.weight = Some("heavy".to_owned());

        let mut issue = Issue::new(IssueSnapshot::new(commit(1, "Foo", 10), first, BTreeSet::new()));
        issue.update(IssueSnapshot::new(commit(2, "Foo", 20), second, BTreeSet::new()));

        assert_eq!(issue.title(), Some("Title"));
        assert_eq!(issue.description(), Some("Now with text"));
        assert_eq!(issue.labels(), vec!["bug", "ui"]);
        assert_eq!(issue.blocker_ids(), vec!["b", "c"]);
        assert_eq!(issue.assignees(), Vec::<String>::new());
        assert_eq!(issue.due_date(), NaiveDate::from_ymd_opt(2017, 3, 1));
        assert_eq!(issue.weight(), None);
        assert_eq!(issue.file_path(), "src/b.rs");
        assert_eq!(issue.participants().len(), 1);

        let revisions = issue.revisions();
        assert_eq!(revisions.len(), 2);
        let changed: Vec<Field> = revisions[0].superseded.keys().cloned().collect();
        assert_eq!(changed, vec![
            Field::Title,
            Field::Description,
            Field::DueDate,
            Field::Labels,
            Field::Weight,
            Field::Blockers,
            Field::FilePath,
        ]);
        assert_eq!(revisions[0].superseded[&Field::Description], None);
        assert_eq!(revisions[0].superseded[&Field::Weight], Some("3".to_owned()));
    }

    #[test]
    fn branch_partition() {
        let mut issue = Issue::new(snapshot(commit(1, "Foo", 10), "X", &["master", "a"]));
        let open: BTreeSet<String> = vec!["a".to_owned()].into_iter().collect();
        issue.set_open_in(open, BTreeMap::new());
        assert_eq!(issue.open_in_branches().iter().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(issue.closed_in_branches().iter().collect::<Vec<_>>(), vec!["master"]);

        let closing = commit(2, "Bar", 20);
        issue.set_status(Status::default(), Some(closing.clone()));
        assert_eq!(issue.closing_commit().map(|c| c.id), Some(closing.id));
        assert_eq!(issue.activity().len(), 2);
    }
}
