// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2016, 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2016, 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Issue snapshots
//!
//! A snapshot is a single occurrence of an issue's metadata, as found in the
//! files touched by one commit. This module provides the value types making up
//! a snapshot as well as the content-addressed list of snapshots found in a
//! commit.
//!

use chrono::{DateTime, FixedOffset};
use git2::{ObjectType, Oid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::result::Result as RResult;

use crate::error::*;


/// Commit metadata
///
/// Independent value representation of a commit, referring to other objects
/// only by id.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: Oid,
    pub author: String,
    pub authored_time: DateTime<FixedOffset>,
    pub parents: Vec<Oid>,
    pub tree: Oid,
    pub message: String,
}

impl CommitInfo {
    /// Get the first line of the commit message
    ///
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}


/// Metadata fields of an issue which are subject to revisions
///
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Field {
    Title,
    Description,
    Assignees,
    DueDate,
    Labels,
    Weight,
    Priority,
    Blockers,
    FilePath,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Title,
        Field::Description,
        Field::Assignees,
        Field::DueDate,
        Field::Labels,
        Field::Weight,
        Field::Priority,
        Field::Blockers,
        Field::FilePath,
    ];

    /// Get the key used for the field in comments
    ///
    pub fn key(&self) -> &'static str {
        match *self {
            Field::Title        => "title",
            Field::Description  => "description",
            Field::Assignees    => "assignees",
            Field::DueDate      => "due_date",
            Field::Labels       => "labels",
            Field::Weight       => "weight",
            Field::Priority     => "priority",
            Field::Blockers     => "blockers",
            Field::FilePath     => "file_path",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> RResult<(), fmt::Error> {
        f.write_str(self.key())
    }
}


/// Commit independent content of an issue snapshot
///
/// Two occurrences of the same issue text in different commits have equal
/// `IssueFields`, which is what makes them cacheable by content.
///
#[derive(Debug, Clone, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct IssueFields {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignees: Option<String>,
    pub due_date: Option<String>,
    pub labels: Option<String>,
    pub weight: Option<String>,
    pub priority: Option<String>,
    pub blockers: Option<String>,
    pub file_path: String,
    pub start_position: usize,
    pub end_position: usize,
}

impl IssueFields {
    /// Create an empty field set for a given issue in a given file
    ///
    pub fn new<I, P>(id: I, file_path: P) -> Self
        where I: Into<String>,
              P: Into<String>
    {
        IssueFields {
            id: id.into(),
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    /// Get the value of a field
    ///
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Title        => self.title.as_deref(),
            Field::Description  => self.description.as_deref(),
            Field::Assignees    => self.assignees.as_deref(),
            Field::DueDate      => self.due_date.as_deref(),
            Field::Labels       => self.labels.as_deref(),
            Field::Weight       => self.weight.as_deref(),
            Field::Priority     => self.priority.as_deref(),
            Field::Blockers     => self.blockers.as_deref(),
            Field::FilePath     => Some(self.file_path.as_str()),
        }
    }

    /// Get a mutable reference to an optional field
    ///
    /// Returns `None` for fields which are not optional.
    ///
    pub fn slot_mut(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::Title        => Some(&mut self.title),
            Field::Description  => Some(&mut self.description),
            Field::Assignees    => Some(&mut self.assignees),
            Field::DueDate      => Some(&mut self.due_date),
            Field::Labels       => Some(&mut self.labels),
            Field::Weight       => Some(&mut self.weight),
            Field::Priority     => Some(&mut self.priority),
            Field::Blockers     => Some(&mut self.blockers),
            Field::FilePath     => None,
        }
    }

    /// Sorting key used wherever the order of snapshots within one commit
    /// matters
    ///
    pub fn sort_key(&self) -> (&str, &str, usize) {
        (self.id.as_str(), self.file_path.as_str(), self.start_position)
    }

    /// Serialize the fields for storage
    ///
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(From::from)
    }

    /// Deserialize fields previously serialized via `to_bytes()`
    ///
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(From::from)
    }
}


/// One occurrence of an issue in one commit
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSnapshot {
    pub commit: Rc<CommitInfo>,
    pub fields: IssueFields,
    /// Branches containing the commit at the time of the scan
    pub branches: BTreeSet<String>,
}

impl IssueSnapshot {
    pub fn new(commit: Rc<CommitInfo>, fields: IssueFields, branches: BTreeSet<String>) -> Self {
        IssueSnapshot { commit: commit, fields: fields, branches: branches }
    }

    /// Get the id of the commit which introduced this snapshot
    ///
    pub fn commit_ref(&self) -> Oid {
        self.commit.id
    }

    pub fn issue_id(&self) -> &str {
        &self.fields.id
    }

    pub fn authored_time(&self) -> DateTime<FixedOffset> {
        self.commit.authored_time
    }

    /// Check whether the owning commit was found on a given branch
    ///
    pub fn in_branch(&self, branch: &str) -> bool {
        self.branches.contains(branch)
    }
}


/// Hash identifying a stored record by its content
///
/// The hash is the id git would assign to a blob with the record's bytes.
///
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Compute the content hash of some bytes
    ///
    pub fn of(bytes: &[u8]) -> Result<Self> {
        Oid::hash_object(ObjectType::Blob, bytes)
            .map(ContentHash::from)
            .map_err(From::from)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the git object id corresponding to the hash
    ///
    pub fn to_oid(&self) -> Result<Oid> {
        Oid::from_str(&self.0)
            .chain_err(|| ErrorKind::MalformedCacheRecord(self.0.clone()))
    }
}

impl From<Oid> for ContentHash {
    fn from(id: Oid) -> Self {
        ContentHash(id.to_string())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> RResult<(), fmt::Error> {
        f.write_str(&self.0)
    }
}


/// Entry of an `IssueListInCommit`
///
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ListEntry {
    pub id: String,
    pub snapshot: ContentHash,
}


/// Ordered list of issue snapshots found in a commit
///
/// The list refers to the snapshots by content hash. Entries are kept in the
/// order of the snapshots they were created from, which is the canonical
/// `IssueFields::sort_key()` order. Hence the list's own content hash only
/// depends on the set of snapshots.
///
#[derive(Debug, Clone, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct IssueListInCommit {
    pub entries: Vec<ListEntry>,
}

impl IssueListInCommit {
    /// Create a list from snapshot fields
    ///
    /// Returns the list along with the serialized snapshots and their hashes,
    /// in list order.
    ///
    pub fn from_fields<'a, I>(fields: I) -> Result<(Self, Vec<(ContentHash, Vec<u8>)>)>
        where I: IntoIterator<Item = &'a IssueFields>
    {
        let mut sorted: Vec<&IssueFields> = fields.into_iter().collect();
        sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut records = Vec::with_capacity(sorted.len());
        let mut entries = Vec::with_capacity(sorted.len());
        for item in sorted {
            let bytes = item.to_bytes()?;
            let hash = ContentHash::of(&bytes)?;
            entries.push(ListEntry { id: item.id.clone(), snapshot: hash.clone() });
            records.push((hash, bytes));
        }

        Ok((IssueListInCommit { entries: entries }, records))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(From::from)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(From::from)
    }

    /// Compute the content hash of the list
    ///
    pub fn content_hash(&self) -> Result<ContentHash> {
        self.to_bytes().and_then(|bytes| ContentHash::of(&bytes))
    }
}




#[cfg(test)]
mod tests {
    use super::*;

    fn fields(id: &str, path: &str, title: &str) -> IssueFields {
        let mut retval = IssueFields::new(id, path);
        retval.title = Some(title.to_owned());
        retval
    }

    #[test]
    fn field_access() {
        let mut item = fields("foo", "src/main.rs", "Foo");
        assert_eq!(item.get(Field::Title), Some("Foo"));
        assert_eq!(item.get(Field::Description), None);
        assert_eq!(item.get(Field::FilePath), Some("src/main.rs"));

        *item.slot_mut(Field::Weight).expect("weight is optional") = Some("3".to_owned());
        assert_eq!(item.weight.as_deref(), Some("3"));
        assert!(item.slot_mut(Field::FilePath).is_none());
    }

    #[test]
    fn content_hash_matches_git() {
        // `git hash-object` of an empty blob
        let hash = ContentHash::of(b"").expect("Could not hash");
        assert_eq!(hash.as_str(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn list_order_independent_hash() {
        let a = fields("a", "a.rs", "A");
        let b = fields("b", "b.rs", "B");

        let (list1, _) = IssueListInCommit::from_fields(vec![&a, &b])
            .expect("Could not create list");
        let (list2, records) = IssueListInCommit::from_fields(vec![&b, &a])
            .expect("Could not create list");
        assert_eq!(list1, list2);
        assert_eq!(list1.content_hash().unwrap(), list2.content_hash().unwrap());
        assert_eq!(list1.entries[0].id, "a");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn list_serialization() {
        let a = fields("a", "a.rs", "A");
        let (list, records) = IssueListInCommit::from_fields(vec![&a])
            .expect("Could not create list");

        let restored = IssueListInCommit::from_bytes(&list.to_bytes().unwrap())
            .expect("Could not deserialize list");
        assert_eq!(restored, list);

        let restored_fields = IssueFields::from_bytes(&records[0].1)
            .expect("Could not deserialize fields");
        assert_eq!(restored_fields, a);
    }
}
