// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! History cache
//!
//! Scan results are cached in a content-addressed store. Each record is
//! identified by the hash git would assign to a blob holding its bytes, so
//! equal issue states found at different commits share one record.
//!
//! The store holds the following records:
//!
//! * serialized `IssueFields`,
//! * `IssueListInCommit` lists referring to the former,
//! * a `ScanIndex` mapping commits to lists.
//!
//! A single `CachePointer` names the current scan index along with the last
//! commit processed. Records only become part of the cache once the pointer
//! is advanced.
//!

use git2::{self, ErrorCode, Oid, Repository, Signature};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::snapshot::{ContentHash, IssueFields, IssueListInCommit};

use crate::error::*;
use crate::error::ErrorKind as EK;


/// Index of scanned commits
///
/// Maps the hex ids of scanned commits to the list of issues found in the
/// files they changed. Head commits of branches are additionally mapped to
/// the list of all the issues present in their tree.
///
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanIndex {
    pub commits: BTreeMap<String, ContentHash>,
    pub trees: BTreeMap<String, ContentHash>,
}

impl ScanIndex {
    pub fn commit(&self, id: Oid) -> Option<&ContentHash> {
        self.commits.get(&id.to_string())
    }

    pub fn tree(&self, id: Oid) -> Option<&ContentHash> {
        self.trees.get(&id.to_string())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(From::from)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(From::from)
    }
}


/// Cache pointer
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePointer {
    /// The commit processed last
    pub last_commit: Oid,
    /// Hash of the current `ScanIndex`
    pub index: ContentHash,
}

#[derive(Serialize, Deserialize)]
struct PointerRecord {
    last_commit: String,
    index: ContentHash,
}

impl CachePointer {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let record = PointerRecord {
            last_commit: self.last_commit.to_string(),
            index: self.index.clone(),
        };
        serde_json::to_vec(&record).map_err(From::from)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let record: PointerRecord = serde_json::from_slice(bytes)?;
        let last_commit = Oid::from_str(&record.last_commit)
            .chain_err(|| EK::MalformedCacheRecord(record.last_commit.clone()))?;
        Ok(CachePointer { last_commit: last_commit, index: record.index })
    }
}


/// Content-addressed store for cache records
///
pub trait CacheStore {
    /// Store a record
    ///
    /// Storing the same bytes twice yields the same hash.
    ///
    fn put(&mut self, bytes: &[u8]) -> Result<ContentHash>;

    /// Retrieve a record
    ///
    fn get(&self, hash: &ContentHash) -> Result<Option<Vec<u8>>>;

    /// Get the current pointer, if any
    ///
    fn pointer(&self) -> Result<Option<CachePointer>>;

    /// Advance the pointer
    ///
    /// All records stored so far become part of the cache in one atomic
    /// step, along with the new pointer.
    ///
    fn advance(&mut self, pointer: &CachePointer) -> Result<()>;

    /// Replace the cache
    ///
    /// Like `advance()`, but only the records stored since the last update
    /// become part of the new cache. Records of the current cache are dropped
    /// in the same step.
    ///
    fn replace(&mut self, pointer: &CachePointer) -> Result<()>;

    /// Discard the cache
    ///
    fn clear(&mut self) -> Result<()>;

    /// Retrieve a record which is expected to exist
    ///
    fn require(&self, hash: &ContentHash) -> Result<Vec<u8>> {
        self.get(hash)?
            .ok_or_else(|| Error::from_kind(EK::MissingCacheRecord(hash.to_string())))
    }

    /// Store the snapshots found in a commit
    ///
    /// Returns the hash of the `IssueListInCommit`.
    ///
    fn put_list(&mut self, snapshots: &[IssueFields]) -> Result<ContentHash> {
        let (list, records) = IssueListInCommit::from_fields(snapshots.iter())?;
        for (hash, bytes) in records {
            let stored = self.put(&bytes)?;
            debug_assert_eq!(stored, hash);
        }
        self.put(&list.to_bytes()?)
    }

    /// Retrieve the snapshots stored via `put_list()`
    ///
    fn get_list(&self, hash: &ContentHash) -> Result<Vec<IssueFields>> {
        let list = IssueListInCommit::from_bytes(&self.require(hash)?)
            .chain_err(|| EK::MalformedCacheRecord(hash.to_string()))?;

        let mut retval = Vec::with_capacity(list.len());
        for entry in list.entries.iter() {
            let fields = IssueFields::from_bytes(&self.require(&entry.snapshot)?)
                .chain_err(|| EK::MalformedCacheRecord(entry.snapshot.to_string()))?;
            retval.push(fields);
        }
        Ok(retval)
    }

    fn put_index(&mut self, index: &ScanIndex) -> Result<ContentHash> {
        self.put(&index.to_bytes()?)
    }

    fn get_index(&self, hash: &ContentHash) -> Result<ScanIndex> {
        ScanIndex::from_bytes(&self.require(hash)?)
            .chain_err(|| EK::MalformedCacheRecord(hash.to_string()))
    }
}


/// In-memory cache store
///
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    records: HashMap<ContentHash, Vec<u8>>,
    pending: HashSet<ContentHash>,
    pointer: Option<CachePointer>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Default::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn put(&mut self, bytes: &[u8]) -> Result<ContentHash> {
        let hash = ContentHash::of(bytes)?;
        self.records.entry(hash.clone()).or_insert_with(|| bytes.to_vec());
        self.pending.insert(hash.clone());
        Ok(hash)
    }

    fn get(&self, hash: &ContentHash) -> Result<Option<Vec<u8>>> {
        Ok(self.records.get(hash).cloned())
    }

    fn pointer(&self) -> Result<Option<CachePointer>> {
        Ok(self.pointer.clone())
    }

    fn advance(&mut self, pointer: &CachePointer) -> Result<()> {
        self.pending.clear();
        self.pointer = Some(pointer.clone());
        Ok(())
    }

    fn replace(&mut self, pointer: &CachePointer) -> Result<()> {
        let pending = ::std::mem::replace(&mut self.pending, HashSet::new());
        self.records.retain(|hash, _| pending.contains(hash));
        self.pointer = Some(pointer.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.pending.clear();
        self.pointer = None;
        Ok(())
    }
}


/// Cache store backed by a git repository
///
/// Records are stored as blobs in the repository's object database. Advancing
/// or replacing the pointer creates a commit holding all records under
/// `records/` along with the pointer itself and moves the cache reference to
/// that commit.
///
pub struct GitCacheStore<'r> {
    repo: &'r Repository,
    refname: String,
    pending: BTreeSet<Oid>,
}

impl<'r> GitCacheStore<'r> {
    pub fn new<R: Into<String>>(repo: &'r Repository, refname: R) -> Self {
        GitCacheStore { repo: repo, refname: refname.into(), pending: BTreeSet::new() }
    }

    pub fn refname(&self) -> &str {
        &self.refname
    }

    /// Get the commit the cache reference points to
    ///
    fn head(&self) -> Result<Option<git2::Commit<'r>>> {
        match self.repo.find_reference(&self.refname) {
            Ok(reference) => reference
                .peel_to_commit()
                .map(Some)
                .chain_err(|| EK::CannotGetCommitForRev(self.refname.clone())),
            Err(ref err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err).chain_err(|| EK::CannotGetReferences(self.refname.clone())),
        }
    }

    /// Commit the pending records along with a pointer
    ///
    /// If `carry` is set, the records of the current cache are kept.
    ///
    fn update(&mut self, pointer: &CachePointer, carry: bool) -> Result<()> {
        let refname = self.refname.clone();

        let previous = match self.head()? {
            Some(ref commit) if carry => match commit.tree()?.get_name("records") {
                Some(entry) => Some(self.repo.find_tree(entry.id())?),
                None => None,
            },
            _ => None,
        };

        let mut records = self.repo.treebuilder(previous.as_ref())?;
        for id in self.pending.iter() {
            records.insert(id.to_string(), *id, 0o100644)?;
        }
        let records = records.write()?;

        let mut root = self.repo.treebuilder(None)?;
        root.insert("records", records, 0o040000)?;
        root.insert("pointer", self.repo.blob(&pointer.to_bytes()?)?, 0o100644)?;
        let tree = self.repo.find_tree(root.write()?)?;

        let sig = self
            .repo
            .signature()
            .or_else(|_| Signature::now("git-issue", "git-issue@localhost"))?;
        let message = format!("Update issue cache to {}", pointer.last_commit);
        let commit = self.repo.commit(None, &sig, &sig, &message, &tree, &[])?;

        self.repo
            .reference(&refname, commit, true, "issue cache: advance")
            .chain_err(|| EK::CannotUpdateCache(refname.clone()))?;
        self.pending.clear();

        debug!("Updated {} to {}", refname, pointer.last_commit);
        Ok(())
    }
}

impl<'r> CacheStore for GitCacheStore<'r> {
    fn put(&mut self, bytes: &[u8]) -> Result<ContentHash> {
        let id = self.repo.blob(bytes)?;
        self.pending.insert(id);
        Ok(ContentHash::from(id))
    }

    fn get(&self, hash: &ContentHash) -> Result<Option<Vec<u8>>> {
        match self.repo.find_blob(hash.to_oid()?) {
            Ok(blob) => Ok(Some(blob.content().to_vec())),
            Err(ref err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn pointer(&self) -> Result<Option<CachePointer>> {
        let commit = match self.head()? {
            Some(commit) => commit,
            None => return Ok(None),
        };
        let entry = match commit.tree()?.get_name("pointer") {
            Some(entry) => entry.id(),
            None => return Err(Error::from_kind(EK::MalformedCacheRecord(commit.id().to_string()))),
        };

        let blob = self.repo.find_blob(entry)?;
        CachePointer::from_bytes(blob.content())
            .chain_err(|| EK::MalformedCacheRecord(entry.to_string()))
            .map(Some)
    }

    fn advance(&mut self, pointer: &CachePointer) -> Result<()> {
        self.update(pointer, true)
    }

    fn replace(&mut self, pointer: &CachePointer) -> Result<()> {
        self.update(pointer, false)
    }

    fn clear(&mut self) -> Result<()> {
        self.pending.clear();
        match self.repo.find_reference(&self.refname) {
            Ok(mut reference) => reference
                .delete()
                .chain_err(|| EK::CannotUpdateCache(self.refname.clone())),
            Err(ref err) if err.code() == ErrorCode::NotFound => Ok(()),
            Err(err) => Err(err).chain_err(|| EK::CannotUpdateCache(self.refname.clone())),
        }
    }
}
