// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Configuration
//!
//! Settings are read from the git configuration of the repository:
//!
//! * `issues.mainBranch`: the main integration branch. Defaults to `main` if
//!   a local branch of that name exists and to `master` otherwise.
//! * `issues.ignoreFile`: path of the file listing paths not to scan for
//!   issues, in gitignore syntax. Defaults to `.issueignore`.
//! * `issues.cacheRef`: reference under which the history cache is kept.
//!   Defaults to `refs/issues/cache`.
//!

use git2::{self, BranchType, ErrorCode, Repository};

use crate::error::*;
use crate::error::ErrorKind as EK;


pub const MAIN_BRANCH_KEY: &str = "issues.mainBranch";
pub const IGNORE_FILE_KEY: &str = "issues.ignoreFile";
pub const CACHE_REF_KEY: &str = "issues.cacheRef";

pub const DEFAULT_IGNORE_FILE: &str = ".issueignore";
pub const DEFAULT_CACHE_REF: &str = "refs/issues/cache";


/// Library configuration
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub main_branch: String,
    pub ignore_file: String,
    pub cache_ref: String,
}

impl Config {
    /// Read the configuration for a repository
    ///
    pub fn from_repo(repo: &Repository) -> Result<Self> {
        let config = repo
            .config()
            .chain_err(|| EK::CannotReadConfig("*".to_owned()))?;

        let main_branch = match get_string(&config, MAIN_BRANCH_KEY)? {
            Some(branch) => branch,
            None => default_main_branch(repo).to_owned(),
        };

        Ok(Config {
            main_branch: main_branch,
            ignore_file: get_string(&config, IGNORE_FILE_KEY)?
                .unwrap_or_else(|| DEFAULT_IGNORE_FILE.to_owned()),
            cache_ref: get_string(&config, CACHE_REF_KEY)?
                .unwrap_or_else(|| DEFAULT_CACHE_REF.to_owned()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            main_branch: "master".to_owned(),
            ignore_file: DEFAULT_IGNORE_FILE.to_owned(),
            cache_ref: DEFAULT_CACHE_REF.to_owned(),
        }
    }
}


/// Get a string value from the configuration, if present
///
fn get_string(config: &git2::Config, key: &str) -> Result<Option<String>> {
    match config.get_string(key) {
        Ok(value) => Ok(Some(value)),
        Err(ref err) if err.code() == ErrorCode::NotFound => Ok(None),
        Err(err) => Err(err).chain_err(|| EK::CannotReadConfig(key.to_owned())),
    }
}

fn default_main_branch(repo: &Repository) -> &'static str {
    if repo.find_branch("main", BranchType::Local).is_ok() {
        "main"
    } else {
        "master"
    }
}
