// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

//! Stream registry: creation, deletion and lookup of named streams.

use heed::{MdbError, PutFlags, RoTxn, WithoutTls};

use crate::constants;
use crate::error::{Error, Result};
use crate::lane::MessageLane;
use crate::log::{debug, info};
use crate::model::{decode, encode, Stream, StreamRecord};
use crate::types::MessageKey;

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > constants::MAX_STREAM_NAME_LEN {
        return Err(Error::InvalidStreamName(name.to_string()));
    }
    Ok(())
}

impl MessageLane {
    /// Creates a stream with `marker = 0`.
    ///
    /// Uniqueness is enforced by the insert itself (`NO_OVERWRITE`), not by a
    /// separate existence check.
    pub fn create_stream(&self, name: &str) -> Result<Stream> {
        validate_name(name)?;

        let storage = self.storage();
        let mut txn = storage.env.write_txn()?;

        let id = storage.next_id(&mut txn, constants::STREAM_ID_SEQUENCE)?;
        let record = StreamRecord { id, marker: 0 };
        let bytes = encode(&record)?;

        match storage
            .streams
            .put_with_flags(&mut txn, PutFlags::NO_OVERWRITE, name, bytes.as_slice())
        {
            Ok(()) => {}
            Err(heed::Error::Mdb(MdbError::KeyExist)) => {
                return Err(Error::StreamAlreadyExists(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        storage.stream_names.put(&mut txn, &id, name)?;
        txn.commit()?;

        info!("created stream {} (id {})", name, id);

        Ok(Stream {
            id,
            name: name.to_string(),
            marker: 0,
        })
    }

    /// Deletes a stream together with every message it owns, in one transaction.
    ///
    /// Returns the stream as it was just before deletion.
    pub fn delete_stream(&self, name: &str) -> Result<Stream> {
        let storage = self.storage();
        let mut txn = storage.env.write_txn()?;

        let record = self.require_stream(&txn, name)?;
        let removed =
            self.remove_messages(&mut txn, MessageKey::stream_range(record.id), |_| true)?;

        storage.streams.delete(&mut txn, name)?;
        storage.stream_names.delete(&mut txn, &record.id)?;
        txn.commit()?;

        info!("deleted stream {} and {} messages", name, removed);

        Ok(Stream {
            id: record.id,
            name: name.to_string(),
            marker: record.marker,
        })
    }

    pub fn has_stream(&self, name: &str) -> Result<bool> {
        Ok(self.get_stream(name)?.is_some())
    }

    pub fn get_stream(&self, name: &str) -> Result<Option<Stream>> {
        let txn = self.storage().env.read_txn()?;
        Ok(self.load_stream(&txn, name)?.map(|record| Stream {
            id: record.id,
            name: name.to_string(),
            marker: record.marker,
        }))
    }

    /// All streams, ordered by name, read from a single snapshot.
    pub fn list_streams(&self) -> Result<Vec<Stream>> {
        let storage = self.storage();
        let txn = storage.env.read_txn()?;

        let mut streams = Vec::new();
        for entry in storage.streams.iter(&txn)? {
            let (name, bytes) = entry?;
            let record: StreamRecord = decode(bytes)?;
            streams.push(Stream {
                id: record.id,
                name: name.to_string(),
                marker: record.marker,
            });
        }
        Ok(streams)
    }

    /// Resolves a stream id (as carried by [`Message::stream_id`](crate::Message)) to its name.
    pub fn stream_name(&self, stream_id: u64) -> Result<Option<String>> {
        let storage = self.storage();
        let txn = storage.env.read_txn()?;
        Ok(storage
            .stream_names
            .get(&txn, &stream_id)?
            .map(str::to_string))
    }

    pub(crate) fn load_stream(
        &self,
        txn: &RoTxn<'_, WithoutTls>,
        name: &str,
    ) -> Result<Option<StreamRecord>> {
        match self.storage().streams.get(txn, name)? {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn require_stream(
        &self,
        txn: &RoTxn<'_, WithoutTls>,
        name: &str,
    ) -> Result<StreamRecord> {
        let record = self.load_stream(txn, name)?;
        record.ok_or_else(|| {
            debug!("stream {} not found", name);
            Error::StreamNotFound(name.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LaneConfig;
    use tempfile::tempdir;

    fn open_lane(dir: &tempfile::TempDir) -> MessageLane {
        MessageLane::with_config(LaneConfig {
            map_size: 10 * 1024 * 1024,
            ..LaneConfig::new(dir.path())
        })
        .expect("Failed to open MessageLane")
    }

    #[test]
    fn test_create_stream_starts_at_marker_zero() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);

        let stream = lane.create_stream("obs").expect("create failed");
        assert_eq!(stream.marker, 0);
        assert_eq!(lane.get_stream("obs").unwrap(), Some(stream));
        assert!(lane.has_stream("obs").unwrap());
        assert!(!lane.has_stream("other").unwrap());
    }

    #[test]
    fn test_create_stream_twice_fails() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);

        lane.create_stream("obs").unwrap();
        let err = lane.create_stream("obs").unwrap_err();
        assert!(matches!(err, Error::StreamAlreadyExists(name) if name == "obs"));
        assert_eq!(lane.list_streams().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_stream_names_are_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);

        assert!(matches!(
            lane.create_stream(""),
            Err(Error::InvalidStreamName(_))
        ));
        let long = "x".repeat(constants::MAX_STREAM_NAME_LEN + 1);
        assert!(matches!(
            lane.create_stream(&long),
            Err(Error::InvalidStreamName(_))
        ));
    }

    #[test]
    fn test_delete_missing_stream_fails() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);

        assert!(matches!(
            lane.delete_stream("ghost"),
            Err(Error::StreamNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_list_streams_is_sorted_by_name() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);

        for name in ["zulu", "alpha", "mike"] {
            lane.create_stream(name).unwrap();
        }

        let names: Vec<_> = lane
            .list_streams()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mike", "zulu"]);
    }

    #[test]
    fn test_recreated_stream_gets_fresh_identity() {
        let dir = tempdir().expect("Failed to create temp dir");
        let lane = open_lane(&dir);

        let first = lane.create_stream("obs").unwrap();
        lane.delete_stream("obs").unwrap();
        let second = lane.create_stream("obs").unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(lane.stream_name(first.id).unwrap(), None);
        assert_eq!(lane.stream_name(second.id).unwrap().as_deref(), Some("obs"));
    }
}
