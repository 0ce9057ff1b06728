// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;

use chrono::{DateTime, Utc};
use rkyv::{Archive, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Content hash of a payload, used to detect accidental duplicate appends.
///
/// Not a security primitive: only `(ts, hash)` equality is ever checked.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PayloadHash(pub [u8; 32]);

impl PayloadHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PayloadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PayloadHash({self})")
    }
}

impl fmt::Display for PayloadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Computes the dedup hash of `payload`.
pub fn payload_hash(payload: &[u8]) -> PayloadHash {
    PayloadHash(Sha256::digest(payload).into())
}

/// A named, independently ordered log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub id: u64,
    pub name: String,
    /// Number of appends ever committed to this stream. Never decremented.
    pub marker: u64,
}

/// One immutable message within a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub uuid: Uuid,
    pub stream_id: u64,
    pub position: u64,
    pub ts: DateTime<Utc>,
    pub payload: Vec<u8>,
    pub payload_hash: PayloadHash,
    pub payload_size: u64,
}

impl Message {
    /// Payload as UTF-8 text, if it is valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Per-stream aggregate returned by [`MessageLane::overview`](crate::MessageLane::overview).
///
/// A stream without messages reports `min_position == max_position == 0`,
/// `count == 0`, no timestamps and `total_size == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStats {
    pub name: String,
    pub min_position: u64,
    pub max_position: u64,
    pub count: u64,
    pub min_ts: Option<DateTime<Utc>>,
    pub max_ts: Option<DateTime<Utc>>,
    pub total_size: u64,
}

/// Row count of one backing database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    pub name: &'static str,
    pub rows: u64,
}

/// Backing-store introspection returned by [`MessageLane::status`](crate::MessageLane::status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    pub path: std::path::PathBuf,
    pub map_size: usize,
    pub disk_size: u64,
    pub tables: Vec<TableStatus>,
}

// =========================================================================
// Stored records
// =========================================================================

/// Value of the `streams` database, keyed by stream name.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[rkyv(derive(Debug))]
pub(crate) struct StreamRecord {
    pub id: u64,
    pub marker: u64,
}

/// Value of the `messages` database. The payload lives in `payloads` under the
/// same key so that statistics never have to read it.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[rkyv(derive(Debug))]
pub(crate) struct MessageHeader {
    pub id: u64,
    pub uuid: [u8; 16],
    pub ts_micros: i64,
    pub hash: [u8; 32],
    pub size: u64,
}

impl MessageHeader {
    pub fn into_message(self, stream_id: u64, position: u64, payload: Vec<u8>) -> Result<Message> {
        Ok(Message {
            id: self.id,
            uuid: Uuid::from_bytes(self.uuid),
            stream_id,
            position,
            ts: from_micros(self.ts_micros)?,
            payload,
            payload_hash: PayloadHash(self.hash),
            payload_size: self.size,
        })
    }
}

/// Encodes a record with rkyv.
pub(crate) fn encode<T>(value: &T) -> Result<rkyv::util::AlignedVec>
where
    T: for<'a> rkyv::Serialize<
        rkyv::api::high::HighSerializer<
            rkyv::util::AlignedVec,
            rkyv::ser::allocator::ArenaHandle<'a>,
            rkyv::rancor::Error,
        >,
    >,
{
    Ok(rkyv::to_bytes::<rkyv::rancor::Error>(value)?)
}

/// Decodes a record with validation.
///
/// LMDB gives no alignment guarantee for values, so the bytes are copied into an
/// aligned buffer first.
pub(crate) fn decode<T>(bytes: &[u8]) -> Result<T>
where
    T: Archive,
    T::Archived: for<'a> rkyv::bytecheck::CheckBytes<
            rkyv::api::high::HighValidator<'a, rkyv::rancor::Error>,
        > + rkyv::Deserialize<T, rkyv::rancor::Strategy<rkyv::de::Pool, rkyv::rancor::Error>>,
{
    let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);
    Ok(rkyv::from_bytes::<T, rkyv::rancor::Error>(&aligned)?)
}

// =========================================================================
// Timestamps
// =========================================================================

/// Current time truncated to the stored (microsecond) precision.
pub(crate) fn now() -> DateTime<Utc> {
    let now = Utc::now();
    // Round-trip through micros so callers see exactly what was stored.
    from_micros(now.timestamp_micros()).unwrap_or(now)
}

pub(crate) fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| Error::Corrupted(format!("timestamp out of range: {micros}")))
}
