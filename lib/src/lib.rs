#![recursion_limit = "1024"]
// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2016, 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2016, 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! The git-issue library
//!
//! This library derives an issue tracker from specially formatted comments in
//! source files, using the history of a git repository as the only source of
//! truth. It is implemented on top of the `git2` crate.
//!
//!
//! # Issues in comments
//!
//! An issue is a comment block carrying an `@issue` marker, optionally
//! followed by further fields:
//!
//! ```text
//! /*
//!  * @issue parser-recovery
//!  * @title Recover from unbalanced braces
//!  * @labels parser, bug
//!  * @description
//!  *   The parser currently gives up on the first unbalanced brace.
//!  */
//! ```
//!
//! The comment syntax is selected by the file's extension, or by its MIME type
//! as a fallback. See the `extract` module for details.
//!
//! # History
//!
//! Each commit is scanned for the issues in the files it changed. The
//! snapshots found are folded, oldest first, into `Issue`s tracking the
//! lifecycle of each issue id: its revisions, participants and the branches
//! it appears in. The status of an issue is inferred from the branches at the
//! heads of which it is present.
//!
//! Scan results are cached in the repository. The `IssueHistory` type keeps
//! that cache up to date and provides the issues.
//!

#[macro_use] extern crate error_chain;
#[macro_use] extern crate lazy_static;
#[macro_use] extern crate log;
extern crate chrono;
extern crate git2;
extern crate ignore;
extern crate mime_guess;
extern crate regex;
extern crate serde;
extern crate serde_json;

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod ignore_rules;
pub mod index;
pub mod issue;
pub mod iter;
pub mod repository;
pub mod scanner;
pub mod snapshot;
pub mod status;
pub mod sync;

mod utils;

#[cfg(test)]
mod test_utils;

pub use crate::aggregate::IssueMap;
pub use crate::issue::Issue;
pub use crate::repository::History;
pub use crate::status::Status;
pub use crate::sync::IssueHistory;
