// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Issue status
//!
//! The status of an issue is inferred from the branches it is present in.
//! Two branches are of special interest: the main integration branch and the
//! issue's feature branch, which is the branch named like the issue.
//!
//! The rules, evaluated in order:
//!
//!  1. open only in the feature branch: `(Open, Proposed)`
//!  2. open in the main branch: `(Open, InProgress)` if the feature branch
//!     holds a snapshot authored after the issue was accepted into the main
//!     branch, `(Open, InReview)` if it is closed in the feature branch and
//!     `(Open, Accepted)` otherwise
//!  3. closed in the feature branch and never present in the main branch:
//!     `(Closed, Rejected)`
//!  4. closed in the main branch: `(Closed, Resolved)`
//!  5. not open in any branch: `(Closed, Unknown)`
//!  6. `(Open, Unknown)`
//!
//! All comparisons of dates use the authored time of the commits involved.
//!

use std::fmt;
use std::rc::Rc;
use std::result::Result as RResult;

use crate::index::CommitGraph;
use crate::issue::Issue;
use crate::snapshot::CommitInfo;


#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Major {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Minor {
    Proposed,
    Accepted,
    InProgress,
    InReview,
    Rejected,
    Resolved,
    /// Branch topology the rules can not classify
    Unknown,
}


/// Status of an issue
///
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Status {
    pub major: Major,
    pub minor: Minor,
}

impl Status {
    pub fn new(major: Major, minor: Minor) -> Self {
        Status { major: major, minor: minor }
    }

    pub fn is_open(&self) -> bool {
        self.major == Major::Open
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::new(Major::Open, Minor::Unknown)
    }
}

impl fmt::Display for Major {
    fn fmt(&self, f: &mut fmt::Formatter) -> RResult<(), fmt::Error> {
        f.write_str(match *self {
            Major::Open   => "open",
            Major::Closed => "closed",
        })
    }
}

impl fmt::Display for Minor {
    fn fmt(&self, f: &mut fmt::Formatter) -> RResult<(), fmt::Error> {
        f.write_str(match *self {
            Minor::Proposed     => "proposed",
            Minor::Accepted     => "accepted",
            Minor::InProgress   => "in progress",
            Minor::InReview     => "in review",
            Minor::Rejected     => "rejected",
            Minor::Resolved     => "resolved",
            Minor::Unknown      => "unknown",
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> RResult<(), fmt::Error> {
        write!(f, "{} ({})", self.major, self.minor)
    }
}


/// Compute the status of an issue
///
/// The issue's branch partition has to be populated.
///
pub fn compute_status(issue: &Issue, main_branch: &str) -> Status {
    let feature = issue.id();
    let open_in = issue.open_in_branches();
    let closed_in = issue.closed_in_branches();

    if open_in.len() == 1 && open_in.contains(feature) {
        return Status::new(Major::Open, Minor::Proposed);
    }

    if open_in.contains(main_branch) {
        let in_progress = match (issue.latest_in_branch(feature), issue.accepted_date(main_branch)) {
            (Some(latest), Some(accepted)) => latest > accepted,
            _ => false,
        };

        let minor = if in_progress {
            Minor::InProgress
        } else if closed_in.contains(feature) {
            Minor::InReview
        } else {
            Minor::Accepted
        };
        return Status::new(Major::Open, minor);
    }

    if closed_in.contains(feature) && !issue.in_branches().contains(main_branch) {
        return Status::new(Major::Closed, Minor::Rejected);
    }

    if closed_in.contains(main_branch) {
        return Status::new(Major::Closed, Minor::Resolved);
    }

    if open_in.is_empty() {
        return Status::new(Major::Closed, Minor::Unknown);
    }

    Status::new(Major::Open, Minor::Unknown)
}


/// Determine the commit which closed an issue
///
/// For resolved issues, this is the first child of the last commit in the
/// main branch featuring the issue. For rejected issues, it is the first child
/// of the last such commit in the feature branch. Other issues have no closing
/// commit.
///
pub fn closing_commit(issue: &Issue,
                      status: Status,
                      main_branch: &str,
                      graph: &CommitGraph
) -> Option<Rc<CommitInfo>> {
    let branch = match status.minor {
        Minor::Resolved => main_branch,
        Minor::Rejected => issue.id(),
        _ => return None,
    };

    issue
        .last_snapshot_in(branch)
        .and_then(|snapshot| graph.first_child(snapshot.commit_ref()))
        .cloned()
}
