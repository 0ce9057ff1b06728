// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;
use std::sync::Arc;

use heed::{RoTxn, WithoutTls};

use crate::error::{Error, Result};
use crate::model::{decode, Message, MessageHeader};
use crate::storage::{LaneConfig, Storage};
use crate::types::MessageKey;

/// Handle to a MessageLane store.
///
/// Cloning is cheap and every clone shares the same LMDB environment, so a
/// handle can be moved to as many threads as needed. Each public operation
/// runs in its own transaction: it either fully applies or has no effect.
///
/// # Example
///
/// ```rust
/// use messagelane::MessageLane;
/// use tempfile::tempdir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempdir()?;
/// let lane = MessageLane::open(dir.path())?;
///
/// lane.create_stream("obs")?;
/// let uuid = lane.append("obs", "A")?;
///
/// let message = lane.get_by_uuid(uuid)?.expect("message was just appended");
/// assert_eq!(message.position, 1);
/// # Ok(())
/// # }
/// ```
///
/// A stream's `marker` only moves through the append engine. The LMDB
/// environment behind a handle is not reachable from outside the crate:
///
/// ```compile_fail
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let lane = messagelane::MessageLane::open(dir.path())?;
/// let _env = &lane.storage().env;
/// # Ok(())
/// # }
/// ```
///
/// ```compile_fail
/// use messagelane::storage::Storage;
/// ```
#[derive(Clone)]
pub struct MessageLane {
    core: Arc<Storage>,
}

impl MessageLane {
    /// Opens (or creates) a store at `path` with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(LaneConfig::new(path.as_ref()))
    }

    pub fn with_config(config: LaneConfig) -> Result<Self> {
        Ok(Self {
            core: Arc::new(Storage::open(config)?),
        })
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.core
    }

    pub fn config(&self) -> &LaneConfig {
        &self.core.config
    }

    /// Loads the message stored under `key`, if any.
    pub(crate) fn read_message(
        &self,
        txn: &RoTxn<'_, WithoutTls>,
        key: MessageKey,
    ) -> Result<Option<Message>> {
        let storage = self.storage();
        let raw = key.to_u128();

        let Some(bytes) = storage.messages.get(txn, &raw)? else {
            return Ok(None);
        };
        let header: MessageHeader = decode(bytes)?;

        let payload = storage.payloads.get(txn, &raw)?.ok_or_else(|| {
            Error::Corrupted(format!(
                "missing payload for stream {} position {}",
                key.stream_id, key.position
            ))
        })?;

        header
            .into_message(key.stream_id, key.position, payload.to_vec())
            .map(Some)
    }
}
