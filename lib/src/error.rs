// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2016, 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2016, 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

use git2::Oid;

error_chain! {
    foreign_links {
        GitError(::git2::Error);
        JsonError(::serde_json::Error);
        IoError(::std::io::Error);
    }

    errors {
        NoCommits {
            description("The repository has no commits")
            display("The repository does not contain any commits")
        }

        CannotConstructRevwalk {
            description("Cannot construct revwalk")
            display("Cannot construct a revwalk for iterating over commits")
        }

        CannotGetCommit {
            description("Cannot get a commit from the repository")
            display("Cannot get a specific commit from repository")
        }

        CannotGetCommitForRev(rev: String) {
            description("Cannot get commit from rev")
            display("Cannot get commit from rev '{}'", rev)
        }

        CannotGetReferences(glob: String) {
            description("Cannot get references from repository")
            display("Cannot get references '{}' from repository", glob)
        }

        CannotReadTree(id: Oid) {
            description("Cannot read a tree")
            display("Cannot read the tree of commit {}", id)
        }

        CannotReadConfig(key: String) {
            description("Cannot read configuration")
            display("Cannot read configuration value '{}'", key)
        }

        MalformedIgnoreFile(path: String) {
            description("Found malformed ignore file")
            display("Malformed ignore file: {}", path)
        }

        MissingCacheRecord(hash: String) {
            description("A cache record is missing")
            display("Cache record {} is missing", hash)
        }

        MalformedCacheRecord(hash: String) {
            description("Found malformed cache record")
            display("Malformed cache record: {}", hash)
        }

        CannotUpdateCache(refname: String) {
            description("Cannot update the cache")
            display("Cannot update the cache reference '{}'", refname)
        }
    }
}
