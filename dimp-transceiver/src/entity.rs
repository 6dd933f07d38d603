// SPDX-License-Identifier: MIT OR Apache-2.0

use dimp_core::{Id, Meta};

/// User known to the directory.
///
/// Everything beyond the identifier and its meta is looked up through the [`Barrack`], which
/// applies the key selection policy on top of the data source.
///
/// [`Barrack`]: crate::Barrack
#[derive(Clone, Debug)]
pub struct User {
    id: Id,
    meta: Option<Meta>,
}

impl User {
    /// Creates a user, the meta is only absent for broadcast identifiers.
    pub fn new(id: Id, meta: Option<Meta>) -> Self {
        Self { id, meta }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    pub fn is_broadcast(&self) -> bool {
        self.id.is_broadcast()
    }
}

/// Group known to the directory.
#[derive(Clone, Debug)]
pub struct Group {
    id: Id,
    meta: Option<Meta>,
}

impl Group {
    pub fn new(id: Id, meta: Option<Meta>) -> Self {
        Self { id, meta }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    pub fn is_broadcast(&self) -> bool {
        self.id.is_broadcast()
    }
}
