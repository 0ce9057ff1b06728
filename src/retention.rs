// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

//! Message deletion: single positions, position ranges and age-based sweeps.
//!
//! Deletion never touches a stream's `marker`, so freed positions are never
//! handed out again.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use heed::RwTxn;
use uuid::Uuid;

use crate::error::Result;
use crate::lane::MessageLane;
use crate::log::{debug, info};
use crate::model::{decode, MessageHeader, PayloadHash, StreamRecord};
use crate::pattern::LikePattern;
use crate::types::{HashKey, MessageKey};

impl MessageLane {
    /// Removes the message at `position`. Returns `false` if there was none.
    pub fn delete_at(&self, stream: &str, position: u64) -> Result<bool> {
        Ok(self.delete_range(stream, position, position)? > 0)
    }

    /// Removes every message with `first <= position <= last` in one transaction.
    ///
    /// Returns the number of messages removed. An empty range (`first > last`)
    /// removes nothing.
    pub fn delete_range(&self, stream: &str, first: u64, last: u64) -> Result<u64> {
        let mut txn = self.storage().env.write_txn()?;
        let record = self.require_stream(&txn, stream)?;

        if first > last {
            return Ok(0);
        }

        let removed =
            self.remove_messages(&mut txn, MessageKey::range(record.id, first, last), |_| true)?;
        txn.commit()?;

        debug!("deleted {} messages from {} in [{}, {}]", removed, stream, first, last);
        Ok(removed)
    }

    /// Retention sweep: in every stream whose name matches the `LIKE` pattern
    /// (`%` any sequence, `_` any single character), removes every message with
    /// `ts <= before`. Stream rows are left alone.
    ///
    /// Returns the total number of messages removed.
    pub fn delete_before(&self, pattern: &str, before: DateTime<Utc>) -> Result<u64> {
        let storage = self.storage();
        let pattern = LikePattern::new(pattern);
        let threshold = before.timestamp_micros();

        let mut txn = storage.env.write_txn()?;

        let mut stream_ids = Vec::new();
        for entry in storage.streams.iter(&txn)? {
            let (name, bytes) = entry?;
            if pattern.matches(name) {
                let record: StreamRecord = decode(bytes)?;
                stream_ids.push(record.id);
            }
        }

        let mut removed = 0;
        for stream_id in stream_ids {
            removed += self.remove_messages(
                &mut txn,
                MessageKey::stream_range(stream_id),
                |header| header.ts_micros <= threshold,
            )?;
        }
        txn.commit()?;

        info!("retention sweep removed {} messages up to {}", removed, before);
        Ok(removed)
    }

    /// Deletes the messages in `range` accepted by `filter`, along with their
    /// payloads and index entries. Returns how many were removed.
    pub(crate) fn remove_messages<F>(
        &self,
        txn: &mut RwTxn<'_>,
        range: RangeInclusive<u128>,
        filter: F,
    ) -> Result<u64>
    where
        F: Fn(&MessageHeader) -> bool,
    {
        let storage = self.storage();

        let mut doomed = Vec::new();
        for entry in storage.messages.range(&*txn, &range)? {
            let (raw, bytes) = entry?;
            let header: MessageHeader = decode(bytes)?;
            if filter(&header) {
                doomed.push((raw, header));
            }
        }

        for (raw, header) in &doomed {
            let key = MessageKey::from_u128(*raw);
            let hash = PayloadHash(header.hash);

            storage.messages.delete(txn, raw)?;
            storage.payloads.delete(txn, raw)?;
            storage
                .uuid_index
                .delete(txn, &Uuid::from_bytes(header.uuid).as_u128())?;
            storage
                .hash_index
                .delete(txn, &HashKey::encode(header.ts_micros, &hash, key))?;
        }

        Ok(doomed.len() as u64)
    }
}
