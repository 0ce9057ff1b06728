// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;
use uuid::Uuid;

/// Custom error type for MessageLane operations.
///
/// Lookups that find nothing are not errors: they return `Ok(None)`.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred (e.g., file system issues).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// LMDB storage error (via `heed`).
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    /// A stored record could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A stored key or row does not have the expected shape.
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stream not found.
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    /// A stream with this name already exists.
    #[error("Stream already exists: {0}")]
    StreamAlreadyExists(String),

    /// Stream names must be non-empty and fit in an LMDB key.
    #[error("Invalid stream name: {0:?}")]
    InvalidStreamName(String),

    /// A message with this uuid is already stored.
    #[error("Duplicate message uuid: {0}")]
    DuplicateUuid(Uuid),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<rkyv::rancor::Error> for Error {
    fn from(e: rkyv::rancor::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl Error {
    /// Returns `true` when the failure came from the backing store rather than
    /// from application-level validation.
    pub fn is_backing_store_failure(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Heed(_) | Self::Serialization(_) | Self::Corrupted(_)
        )
    }
}
