// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeSet;

use crate::names::StatisticsId;

/// The statistics objects already handled by one multi-object statement.
///
/// A statement may name the same object more than once, directly or through
/// different paths. Each object is processed only on its first visit.
#[derive(Debug, Default)]
pub struct ProcessedSet {
    seen: BTreeSet<StatisticsId>,
}

impl ProcessedSet {
    /// Records a visit of `id`, reporting whether it is the first one.
    pub fn first_visit(&mut self, id: StatisticsId) -> bool {
        self.seen.insert(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
