// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

//! Point lookups and ordered traversal.
//!
//! Reads run in LMDB read transactions: they see a consistent committed
//! snapshot and never block appenders.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use heed::{RoTxn, WithoutTls};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::lane::MessageLane;
use crate::model::{decode, Message, MessageHeader, PayloadHash};
use crate::types::{HashKey, MessageKey};

impl MessageLane {
    /// The message at `position` in `stream`.
    pub fn get_at(&self, stream: &str, position: u64) -> Result<Option<Message>> {
        let txn = self.storage().env.read_txn()?;
        let record = self.require_stream(&txn, stream)?;
        self.read_message(&txn, MessageKey::new(record.id, position))
    }

    /// Global lookup by uuid, independent of the stream.
    pub fn get_by_uuid(&self, uuid: Uuid) -> Result<Option<Message>> {
        let storage = self.storage();
        let txn = storage.env.read_txn()?;
        match storage.uuid_index.get(&txn, &uuid.as_u128())? {
            Some(raw) => self.read_message(&txn, MessageKey::from_u128(raw)),
            None => Ok(None),
        }
    }

    /// A message whose timestamp and payload hash both match, if any.
    ///
    /// `ts` is compared at the stored microsecond precision; sub-microsecond
    /// digits are ignored, as they are by [`Append::at`](crate::Append::at).
    pub fn get_by_hash(&self, ts: DateTime<Utc>, hash: &PayloadHash) -> Result<Option<Message>> {
        let txn = self.storage().env.read_txn()?;
        match self.find_by_hash(&txn, ts, hash)? {
            Some(key) => self.read_message(&txn, key),
            None => Ok(None),
        }
    }

    pub fn has_uuid(&self, uuid: Uuid) -> Result<bool> {
        let storage = self.storage();
        let txn = storage.env.read_txn()?;
        Ok(storage.uuid_index.get(&txn, &uuid.as_u128())?.is_some())
    }

    /// Dedup check: `true` iff a message with exactly this `(ts, hash)` exists.
    ///
    /// Like [`get_by_hash`](Self::get_by_hash), `ts` is truncated to microseconds.
    pub fn has_hash(&self, ts: DateTime<Utc>, hash: &PayloadHash) -> Result<bool> {
        let txn = self.storage().env.read_txn()?;
        Ok(self.find_by_hash(&txn, ts, hash)?.is_some())
    }

    /// The message with the smallest position in `stream`.
    pub fn first(&self, stream: &str) -> Result<Option<Message>> {
        self.first_after(stream, 0)
    }

    /// The message with the smallest position strictly greater than `position`.
    ///
    /// This is the cursor to prefer for exactly-once consumption: unlike
    /// [`list_since`](Self::list_since), it is unaffected by backdated timestamps.
    pub fn next(&self, stream: &str, position: u64) -> Result<Option<Message>> {
        match position.checked_add(1) {
            Some(from) => self.first_after(stream, from),
            None => Ok(None),
        }
    }

    /// Every message of `stream` in ascending position order.
    pub fn list(&self, stream: &str) -> Result<MessageIter> {
        self.iter_stream(stream, None)
    }

    /// Messages of `stream` with `ts >= since`, still in ascending position order.
    ///
    /// Timestamps can be supplied by callers, so they are not monotonic with
    /// positions. A consumer resuming from a timestamp can miss or re-read
    /// backdated messages appended concurrently; use [`next`](Self::next) for
    /// position-based resumption instead.
    pub fn list_since(&self, stream: &str, since: DateTime<Utc>) -> Result<MessageIter> {
        self.iter_stream(stream, Some(since.timestamp_micros()))
    }

    fn first_after(&self, stream: &str, from: u64) -> Result<Option<Message>> {
        let storage = self.storage();
        let txn = storage.env.read_txn()?;
        let record = self.require_stream(&txn, stream)?;

        let range = MessageKey::range(record.id, from, u64::MAX);
        let first = storage.messages.range(&txn, &range)?.next().transpose()?;
        match first {
            Some((raw, _)) => self.read_message(&txn, MessageKey::from_u128(raw)),
            None => Ok(None),
        }
    }

    fn find_by_hash(
        &self,
        txn: &RoTxn<'_, WithoutTls>,
        ts: DateTime<Utc>,
        hash: &PayloadHash,
    ) -> Result<Option<MessageKey>> {
        let prefix = HashKey::prefix(ts.timestamp_micros(), hash);
        let found = self
            .storage()
            .hash_index
            .prefix_iter(txn, &prefix)?
            .next()
            .transpose()?;
        found.map(|(raw, ())| HashKey::message_key(raw)).transpose()
    }

    fn iter_stream(&self, stream: &str, since: Option<i64>) -> Result<MessageIter> {
        let txn = self.storage().env.read_txn()?;
        let record = self.require_stream(&txn, stream)?;
        Ok(MessageIter {
            lane: self.clone(),
            stream_id: record.id,
            since,
            cursor: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        })
    }
}

/// Lazy iterator over a stream's messages in ascending position order.
///
/// Messages are fetched in pages of [`LaneConfig::page_size`](crate::LaneConfig)
/// entries, each page from its own short read transaction, so a long traversal
/// never pins an old snapshot. The iterator keeps a position cursor, which makes
/// it immune to concurrent deletes and appends shifting anything under it.
#[derive(Clone)]
pub struct MessageIter {
    lane: MessageLane,
    stream_id: u64,
    since: Option<i64>,
    /// Last position scanned.
    cursor: u64,
    buffer: VecDeque<Message>,
    exhausted: bool,
}

impl MessageIter {
    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    /// Starts over from the beginning of the stream.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.buffer.clear();
        self.exhausted = false;
    }

    fn fill(&mut self) -> Result<()> {
        let Some(from) = self.cursor.checked_add(1) else {
            self.exhausted = true;
            return Ok(());
        };

        let storage = self.lane.storage();
        let page_size = self.lane.config().page_size;
        let txn = storage.env.read_txn()?;

        let range = MessageKey::range(self.stream_id, from, u64::MAX);
        let mut scanned = 0;
        for entry in storage.messages.range(&txn, &range)?.take(page_size) {
            let (raw, bytes) = entry?;
            let key = MessageKey::from_u128(raw);
            scanned += 1;
            self.cursor = key.position;

            let header: MessageHeader = decode(bytes)?;
            if self.since.is_some_and(|since| header.ts_micros < since) {
                continue;
            }

            let payload = storage.payloads.get(&txn, &raw)?.ok_or_else(|| {
                Error::Corrupted(format!(
                    "missing payload for stream {} position {}",
                    key.stream_id, key.position
                ))
            })?;
            self.buffer
                .push_back(header.into_message(key.stream_id, key.position, payload.to_vec())?);
        }

        if scanned < page_size {
            self.exhausted = true;
        }
        Ok(())
    }
}

impl Iterator for MessageIter {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(message) = self.buffer.pop_front() {
                return Some(Ok(message));
            }
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
    }
}
