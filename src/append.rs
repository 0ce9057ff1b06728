// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

//! The append engine.
//!
//! Appending bumps the stream's `marker` and writes the message under the new
//! value inside one LMDB write transaction. LMDB admits a single writer at a
//! time, so two appenders can never observe the same marker, and a failure at
//! any step drops the transaction, leaving neither the bumped marker nor a
//! partial message behind.

use std::path::Path;

use chrono::{DateTime, SubsecRound, Utc};
use heed::{MdbError, PutFlags, RwTxn};
use uuid::Uuid;

use crate::constants;
use crate::error::{Error, Result};
use crate::lane::MessageLane;
use crate::log::trace;
use crate::model::{encode, now, payload_hash, MessageHeader};
use crate::types::{HashKey, MessageKey};
use crate::utils::timed_trace;

/// Optional overrides for a single append.
///
/// Both fields are meant for replaying messages captured elsewhere: the
/// timestamp defaults to the append time and the uuid to a fresh v4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Append {
    pub ts: Option<DateTime<Utc>>,
    pub uuid: Option<Uuid>,
}

impl Append {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `ts` instead of the append time.
    ///
    /// Timestamps are stored with microsecond precision, so `ts` is truncated
    /// here and the stored message reports exactly the value kept in `self.ts`.
    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = Some(ts.trunc_subsecs(6));
        self
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }
}

impl MessageLane {
    /// Appends `payload` to `stream` and returns the new message's uuid.
    pub fn append(&self, stream: &str, payload: impl AsRef<[u8]>) -> Result<Uuid> {
        self.append_with(stream, payload, Append::default())
    }

    /// Appends `payload` with explicit timestamp and/or uuid.
    ///
    /// Fails with [`Error::StreamNotFound`] for an unknown stream and with
    /// [`Error::DuplicateUuid`] if `options.uuid` is already stored.
    pub fn append_with(
        &self,
        stream: &str,
        payload: impl AsRef<[u8]>,
        options: Append,
    ) -> Result<Uuid> {
        let mut txn = self.storage().env.write_txn()?;
        let uuid = timed_trace!(
            "append",
            self.append_in(&mut txn, stream, payload.as_ref(), options)
        )?;
        timed_trace!("append_commit", txn.commit())?;
        Ok(uuid)
    }

    /// Appends the contents of the file at `path`.
    pub fn append_file(
        &self,
        stream: &str,
        path: impl AsRef<Path>,
        options: Append,
    ) -> Result<Uuid> {
        let payload = std::fs::read(path)?;
        self.append_with(stream, payload, options)
    }

    /// Appends several payloads in a single transaction.
    ///
    /// The payloads receive consecutive positions in iteration order. Either all
    /// of them are stored or none is.
    pub fn append_batch<I>(&self, stream: &str, payloads: I) -> Result<Vec<Uuid>>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let payloads: Vec<I::Item> = payloads.into_iter().collect();
        if payloads.is_empty() {
            return Ok(Vec::new());
        }

        let count = payloads.len();
        let mut txn = self.storage().env.write_txn()?;
        let uuids = timed_trace!(format!("append_batch({count})"), {
            let mut uuids = Vec::with_capacity(count);
            for payload in &payloads {
                uuids.push(self.append_in(&mut txn, stream, payload.as_ref(), Append::default())?);
            }
            Ok::<_, Error>(uuids)
        })?;
        txn.commit()?;
        Ok(uuids)
    }

    /// Increment-then-insert inside an open write transaction.
    fn append_in(
        &self,
        txn: &mut RwTxn<'_>,
        stream: &str,
        payload: &[u8],
        options: Append,
    ) -> Result<Uuid> {
        let storage = self.storage();

        let mut record = self.require_stream(txn, stream)?;
        record.marker += 1;
        let position = record.marker;
        storage.streams.put(txn, stream, encode(&record)?.as_slice())?;

        let id = storage.next_id(txn, constants::MESSAGE_ID_SEQUENCE)?;
        let uuid = options.uuid.unwrap_or_else(Uuid::new_v4);
        let ts_micros = options.ts.unwrap_or_else(now).timestamp_micros();
        let hash = payload_hash(payload);
        let key = MessageKey::new(record.id, position);

        match storage.uuid_index.put_with_flags(
            txn,
            PutFlags::NO_OVERWRITE,
            &uuid.as_u128(),
            &key.to_u128(),
        ) {
            Ok(()) => {}
            Err(heed::Error::Mdb(MdbError::KeyExist)) => return Err(Error::DuplicateUuid(uuid)),
            Err(e) => return Err(e.into()),
        }

        let header = MessageHeader {
            id,
            uuid: *uuid.as_bytes(),
            ts_micros,
            hash: hash.0,
            size: payload.len() as u64,
        };

        // Positions are never reused, so an existing row here means the stream
        // record and the message table disagree.
        match storage.messages.put_with_flags(
            txn,
            PutFlags::NO_OVERWRITE,
            &key.to_u128(),
            encode(&header)?.as_slice(),
        ) {
            Ok(()) => {}
            Err(heed::Error::Mdb(MdbError::KeyExist)) => {
                return Err(Error::Corrupted(format!(
                    "stream {stream} already holds position {position}"
                )));
            }
            Err(e) => return Err(e.into()),
        }
        storage.payloads.put(txn, &key.to_u128(), payload)?;
        storage
            .hash_index
            .put(txn, &HashKey::encode(ts_micros, &hash, key), &())?;

        trace!("appended {} to {} at position {}", uuid, stream, position);

        Ok(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LaneConfig;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn open_lane(dir: &tempfile::TempDir) -> MessageLane {
        MessageLane::with_config(LaneConfig {
            map_size: 10 * 1024 * 1024,
            ..LaneConfig::new(dir.path())
        })
        .expect("Failed to open MessageLane")
    }

    #[test]
    fn test_append_assigns_consecutive_positions() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);
        lane.create_stream("obs").unwrap();

        for (i, payload) in ["A", "B", "C"].iter().enumerate() {
            let uuid = lane.append("obs", payload).expect("append failed");
            let message = lane.get_by_uuid(uuid).unwrap().expect("missing message");
            assert_eq!(message.position, i as u64 + 1);
            assert_eq!(message.payload, payload.as_bytes());
            assert_eq!(message.payload_size, 1);
            assert_eq!(message.payload_hash, payload_hash(payload.as_bytes()));
        }

        assert_eq!(lane.get_stream("obs").unwrap().unwrap().marker, 3);
    }

    #[test]
    fn test_append_to_missing_stream_fails() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);

        let err = lane.append("ghost", "A").unwrap_err();
        assert!(matches!(err, Error::StreamNotFound(name) if name == "ghost"));
    }

    #[test]
    fn test_append_with_explicit_ts_and_uuid() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);
        lane.create_stream("obs").unwrap();

        let ts = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let uuid = Uuid::new_v4();
        let returned = lane
            .append_with("obs", "replayed", Append::new().at(ts).with_uuid(uuid))
            .unwrap();
        assert_eq!(returned, uuid);

        let message = lane.get_at("obs", 1).unwrap().unwrap();
        assert_eq!(message.uuid, uuid);
        assert_eq!(message.ts, ts);
    }

    #[test]
    fn test_duplicate_uuid_is_rejected_without_side_effects() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);
        lane.create_stream("a").unwrap();
        lane.create_stream("b").unwrap();

        let uuid = lane.append("a", "first").unwrap();
        let err = lane
            .append_with("b", "second", Append::new().with_uuid(uuid))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateUuid(u) if u == uuid));

        // The failed append must not have bumped the marker.
        assert_eq!(lane.get_stream("b").unwrap().unwrap().marker, 0);
        assert_eq!(lane.append("b", "third").unwrap(), lane.get_at("b", 1).unwrap().unwrap().uuid);
    }

    #[test]
    fn test_append_batch_is_consecutive() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);
        lane.create_stream("obs").unwrap();
        lane.append("obs", "single").unwrap();

        let uuids = lane.append_batch("obs", ["x", "y", "z"]).unwrap();
        assert_eq!(uuids.len(), 3);
        for (i, uuid) in uuids.iter().enumerate() {
            assert_eq!(lane.get_by_uuid(*uuid).unwrap().unwrap().position, i as u64 + 2);
        }

        assert!(lane.append_batch("obs", Vec::<Vec<u8>>::new()).unwrap().is_empty());
    }

    #[test]
    fn test_append_batch_to_missing_stream_stores_nothing() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);

        assert!(lane.append_batch("ghost", ["x"]).is_err());
        assert!(lane.overview().unwrap().is_empty());
    }

    #[test]
    fn test_append_file_reads_payload() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);
        lane.create_stream("files").unwrap();

        let file = dir.path().join("payload.txt");
        std::fs::write(&file, "from a file").unwrap();

        let uuid = lane.append_file("files", &file, Append::new()).unwrap();
        let message = lane.get_by_uuid(uuid).unwrap().unwrap();
        assert_eq!(message.payload_str(), Some("from a file"));

        let missing = lane.append_file("files", dir.path().join("nope"), Append::new());
        assert!(matches!(missing, Err(Error::Io(_))));
    }

    #[test]
    fn test_explicit_ts_is_truncated_to_micros() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);
        lane.create_stream("obs").unwrap();

        let precise = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let stored = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
            + chrono::Duration::microseconds(123_456);

        let options = Append::new().at(precise);
        assert_eq!(options.ts, Some(stored));

        let uuid = lane.append_with("obs", "A", options).unwrap();
        let message = lane.get_by_uuid(uuid).unwrap().expect("missing message");
        assert_eq!(Some(message.ts), options.ts);

        // Lookups compare at the same precision.
        let hash = payload_hash(b"A");
        assert!(lane.has_hash(precise, &hash).unwrap());
        assert_eq!(lane.get_by_hash(stored, &hash).unwrap().map(|m| m.uuid), Some(uuid));
    }

    #[cfg(feature = "log")]
    #[rstest::rstest]
    fn test_append_with_tracing_enabled(#[from(crate::log::test::log_init)] _log: ()) {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);
        lane.create_stream("traced").unwrap();

        let uuids = lane.append_batch("traced", ["A", "B"]).unwrap();
        assert_eq!(uuids.len(), 2);
        assert!(lane.append("untraced", "C").is_err());
    }
}
