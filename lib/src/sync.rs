// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Issue history
//!
//! This module ties scanning, caching and aggregation together. An
//! `IssueHistory` keeps the cache of a repository up to date and derives the
//! issues from it.
//!
//! Keeping the cache up to date is done either by a full rebuild or by a
//! sync, which only scans commits not scanned before. Both may be
//! interrupted. The cache pointer is only advanced once the results for all
//! commits processed have been stored.
//!

use git2::{Oid, Repository};
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::aggregate::{Aggregator, IssueMap};
use crate::cache::{CachePointer, CacheStore, GitCacheStore, ScanIndex};
use crate::config::Config;
use crate::ignore_rules::IgnoreRules;
use crate::index::{BranchIndex, CommitGraph, HeadStates};
use crate::repository::History;
use crate::scanner::Scanner;
use crate::snapshot::CommitInfo;

use crate::error::*;
use crate::error::ErrorKind as EK;


/// Progress information
///
/// Reported before each commit is scanned.
///
#[derive(Debug, Clone, Copy)]
pub struct Progress<'c> {
    pub done: usize,
    pub total: usize,
    pub commit: &'c CommitInfo,
}


/// Summary of a rebuild or sync
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of commits scanned
    pub scanned: usize,
    /// Number of branch heads whose trees were scanned
    pub heads_scanned: usize,
    /// Whether the cache was rebuilt from scratch
    pub rebuilt: bool,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}


/// Indices valid for one state of the branches
///
struct Session {
    branches: BranchIndex,
    graph: CommitGraph,
}


/// Issue history of a repository
///
pub struct IssueHistory<'a, H, S>
    where H: History + ?Sized + 'a,
          S: CacheStore
{
    history: &'a H,
    store: S,
    ignore: IgnoreRules,
    main_branch: String,
    session: Option<Rc<Session>>,
}

impl<'r> IssueHistory<'r, Repository, GitCacheStore<'r>> {
    /// Open the issue history of a repository
    ///
    /// Configuration and ignore rules are read from the repository, the cache
    /// is kept in the repository itself.
    ///
    pub fn open(repo: &'r Repository) -> Result<Self> {
        let config = Config::from_repo(repo)?;
        let ignore = IgnoreRules::load(repo, &config.ignore_file)?;
        let store = GitCacheStore::new(repo, config.cache_ref.clone());
        Ok(Self::new(repo, store, &config, ignore))
    }
}

impl<'a, H, S> IssueHistory<'a, H, S>
    where H: History + ?Sized + 'a,
          S: CacheStore
{
    pub fn new(history: &'a H, store: S, config: &Config, ignore: IgnoreRules) -> Self {
        IssueHistory {
            history: history,
            store: store,
            ignore: ignore,
            main_branch: config.main_branch.clone(),
            session: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn main_branch(&self) -> &str {
        &self.main_branch
    }

    /// Get the indices for the current state of the branches
    ///
    /// The indices are rebuilt if the branches changed since they were built.
    ///
    fn session(&mut self) -> Result<Rc<Session>> {
        if let Some(ref session) = self.session {
            if session.branches.is_current(self.history)? {
                return Ok(session.clone());
            }
            debug!("Branches changed, rebuilding indices");
        }

        let session = Rc::new(Session {
            branches: BranchIndex::build(self.history)?,
            graph: CommitGraph::build(self.history, None)?,
        });
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Rebuild the cache from scratch
    ///
    /// All commits of all branches are scanned, oldest first. The results
    /// replace any existing cache once scanning stops. If nothing was scanned
    /// or scanning fails, the existing cache is left untouched.
    ///
    pub fn build_all(&mut self,
                     progress: &mut dyn FnMut(Progress),
                     interrupt: &AtomicBool
    ) -> Result<SyncReport> {
        let session = self.session()?;
        if session.graph.is_empty() {
            return Err(Error::from_kind(EK::NoCommits));
        }

        info!("Rebuilding issue cache from {} commits", session.graph.len());

        let pending: Vec<Rc<CommitInfo>> = session.graph.commits().to_vec();
        self.update(&session, ScanIndex::default(), None, pending, progress, interrupt)
    }

    /// Bring the cache up to date
    ///
    /// Only commits not scanned yet are scanned. If there is no cache or if
    /// the history the cache was built from was rewritten, the cache is
    /// rebuilt.
    ///
    pub fn sync(&mut self,
                progress: &mut dyn FnMut(Progress),
                interrupt: &AtomicBool
    ) -> Result<SyncReport> {
        let pointer = match self.store.pointer()? {
            Some(pointer) => pointer,
            None => {
                info!("No issue cache present");
                return self.build_all(progress, interrupt);
            },
        };

        let session = self.session()?;
        if session.graph.is_empty() {
            return Err(Error::from_kind(EK::NoCommits));
        }
        if !session.graph.contains(pointer.last_commit) {
            warn!("Cached commit {} is not part of the history any more, rebuilding",
                  pointer.last_commit);
            return self.build_all(progress, interrupt);
        }

        let index = self.store.get_index(&pointer.index)?;
        let pending: Vec<Rc<CommitInfo>> = session
            .graph
            .commits()
            .iter()
            .filter(|commit| index.commit(commit.id).is_none())
            .cloned()
            .collect();

        info!("Syncing issue cache, {} new commits", pending.len());
        self.update(&session, index, Some(pointer.last_commit), pending, progress, interrupt)
    }

    /// Scan commits and branch heads, then advance the pointer
    ///
    /// Without a `last_commit` to start from, the cache is replaced rather
    /// than advanced.
    ///
    fn update(&mut self,
              session: &Session,
              mut index: ScanIndex,
              mut last_commit: Option<Oid>,
              pending: Vec<Rc<CommitInfo>>,
              progress: &mut dyn FnMut(Progress),
              interrupt: &AtomicBool
    ) -> Result<SyncReport> {
        let rebuild = last_commit.is_none();
        let mut report = SyncReport { rebuilt: rebuild, ..Default::default() };
        let mut pruned = false;
        let scanner = Scanner::new(self.history, &self.ignore, &session.branches);

        let total = pending.len();
        for (done, commit) in pending.into_iter().enumerate() {
            if interrupt.load(Ordering::SeqCst) {
                info!("Interrupted after {} of {} commits", done, total);
                report.interrupted = true;
                break;
            }
            progress(Progress { done: done, total: total, commit: &commit });

            match scanner.scan(commit.clone()) {
                Ok(scan) => {
                    let list = self.store.put_list(&scan.snapshots)?;
                    index.commits.insert(commit.id.to_string(), list);
                },
                Err(err) => warn!("Could not scan {}: {}", commit.id, err),
            }
            last_commit = Some(commit.id);
            report.scanned += 1;
        }

        if !report.interrupted {
            let heads: BTreeSet<String> = session
                .branches
                .branches()
                .iter()
                .map(|branch| branch.head.to_string())
                .collect();
            let known = index.trees.len();
            index.trees.retain(|head, _| heads.contains(head));
            pruned = index.trees.len() != known;

            for branch in session.branches.branches() {
                if index.tree(branch.head).is_some() {
                    continue;
                }
                let commit = match session.graph.get(branch.head) {
                    Some(commit) => commit,
                    None => continue,
                };

                let snapshots = scanner.scan_tree(commit)?;
                let list = self.store.put_list(&snapshots)?;
                index.trees.insert(branch.head.to_string(), list);
                report.heads_scanned += 1;
            }
        }

        if report.scanned == 0 && report.heads_scanned == 0 && !pruned {
            return Ok(report);
        }
        let last_commit = match last_commit {
            Some(commit) => commit,
            None => return Ok(report),
        };
        let pointer = CachePointer {
            last_commit: last_commit,
            index: self.store.put_index(&index)?,
        };
        if rebuild {
            self.store.replace(&pointer)?;
        } else {
            self.store.advance(&pointer)?;
        }

        debug!("Cache updated to {}", last_commit);
        Ok(report)
    }

    /// Get all issues
    ///
    /// The issues are derived from the commits reachable from the revision
    /// given, or from all branches if no revision is given. Results cached are
    /// used where available. Commits missing from the cache are scanned, but
    /// the results are not stored.
    ///
    pub fn get_all_issues(&mut self, revision: Option<&str>) -> Result<IssueMap> {
        let session = self.session()?;

        let limited;
        let graph = match revision {
            Some(revision) => {
                limited = CommitGraph::build(self.history, Some(revision))?;
                &limited
            },
            None => &session.graph,
        };
        if graph.is_empty() {
            return Err(Error::from_kind(EK::NoCommits));
        }

        let index = match self.store.pointer()? {
            Some(pointer) => self.store.get_index(&pointer.index)?,
            None => ScanIndex::default(),
        };
        let scanner = Scanner::new(self.history, &self.ignore, &session.branches);

        let mut aggregator = Aggregator::new();
        for commit in graph.commits() {
            let snapshots = match index.commit(commit.id) {
                Some(list) => self.store.get_list(list)?,
                None => match scanner.scan(commit.clone()) {
                    Ok(scan) => scan.snapshots,
                    Err(err) => {
                        warn!("Could not scan {}: {}", commit.id, err);
                        continue;
                    },
                },
            };
            aggregator.process(commit, snapshots, &session.branches.branches_containing(commit.id));
        }

        let mut heads = HeadStates::new();
        for branch in session.branches.branches() {
            let snapshots = match (index.tree(branch.head), session.graph.get(branch.head)) {
                (Some(list), _) => self.store.get_list(list)?,
                (None, Some(commit)) => scanner.scan_tree(commit)?,
                (None, None) => continue,
            };
            heads.insert(&branch.name, snapshots.iter());
        }

        Ok(aggregator.finish(&heads, graph, &self.main_branch))
    }

    /// Get the issues which are open
    ///
    pub fn get_open_issues(&mut self, revision: Option<&str>) -> Result<IssueMap> {
        self.get_all_issues(revision).map(IssueMap::open)
    }

    /// Get the issues which are closed
    ///
    pub fn get_closed_issues(&mut self, revision: Option<&str>) -> Result<IssueMap> {
        self.get_all_issues(revision).map(IssueMap::closed)
    }
}
