// git-issue - issue tracking derived from comments in git history
// Copyright (C) 2016, 2017 Matthias Beyer <mail@beyermatthias.de>
// Copyright (C) 2016, 2017 Julian Ganz <neither@nut.email>
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//

//! Private utilities
//!
//! This module provides utilities private to this library.
//!

use std::result::Result as RResult;


/// Trait for pre-accumulating results
///
/// Collects the values of an iterator over results, stopping at the first
/// error.
///
pub trait ResultIterExt<I, E> : Sized {
    fn collect_result(self) -> RResult<Vec<I>, E>;
}

impl<I, E, J> ResultIterExt<I, E> for J
    where J: Iterator<Item = RResult<I, E>>
{
    fn collect_result(self) -> RResult<Vec<I>, E> {
        let mut res = Vec::new();
        for item in self {
            res.push(item?);
        }
        Ok(res)
    }
}


/// Split a comma separated list
///
/// Items are trimmed, empty items are dropped.
///
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
