// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

use std::ops::RangeInclusive;

use heed::byteorder::BigEndian;
use heed::types::{Bytes, Str, Unit, U128, U64};
use heed::Database;

use crate::error::{Error, Result};
use crate::model::PayloadHash;

pub(crate) type MessageKeyCodec = U128<BigEndian>;

/// Stream name -> rkyv `StreamRecord`.
pub(crate) type StreamsDb = Database<Str, Bytes>;
/// Stream id -> stream name.
pub(crate) type StreamNamesDb = Database<U64<BigEndian>, Str>;
/// `MessageKey` -> rkyv `MessageHeader`.
pub(crate) type MessagesDb = Database<MessageKeyCodec, Bytes>;
/// `MessageKey` -> raw payload.
pub(crate) type PayloadsDb = Database<MessageKeyCodec, Bytes>;
/// Message uuid -> `MessageKey`.
pub(crate) type UuidIndexDb = Database<U128<BigEndian>, MessageKeyCodec>;
/// `HashKey` -> ().
pub(crate) type HashIndexDb = Database<Bytes, Unit>;
/// Sequence name -> last value handed out.
pub(crate) type SequencesDb = Database<Str, U64<BigEndian>>;

/// `(stream_id, position)` packed into one big-endian integer so that a
/// stream's messages are contiguous and sorted by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct MessageKey {
    pub(crate) stream_id: u64,
    pub(crate) position: u64,
}

impl MessageKey {
    pub(crate) fn new(stream_id: u64, position: u64) -> Self {
        Self {
            stream_id,
            position,
        }
    }

    pub(crate) fn to_u128(self) -> u128 {
        (u128::from(self.stream_id) << 64) | u128::from(self.position)
    }

    pub(crate) fn from_u128(raw: u128) -> Self {
        Self {
            stream_id: (raw >> 64) as u64,
            position: raw as u64,
        }
    }

    /// Keys of `stream_id` with `first <= position <= last`.
    pub(crate) fn range(stream_id: u64, first: u64, last: u64) -> RangeInclusive<u128> {
        Self::new(stream_id, first).to_u128()..=Self::new(stream_id, last).to_u128()
    }

    /// Every key of `stream_id`.
    pub(crate) fn stream_range(stream_id: u64) -> RangeInclusive<u128> {
        Self::range(stream_id, 0, u64::MAX)
    }
}

/// Key of the dedup index: `ts || hash || message key`.
///
/// The timestamp is stored with its sign bit flipped so that the big-endian
/// encoding sorts like the signed value.
pub(crate) struct HashKey;

impl HashKey {
    pub(crate) const PREFIX_LEN: usize = 8 + 32;
    pub(crate) const LEN: usize = Self::PREFIX_LEN + 16;

    pub(crate) fn prefix(ts_micros: i64, hash: &PayloadHash) -> [u8; Self::PREFIX_LEN] {
        let mut buf = [0u8; Self::PREFIX_LEN];
        buf[0..8].copy_from_slice(&((ts_micros as u64) ^ (1 << 63)).to_be_bytes());
        buf[8..40].copy_from_slice(hash.as_bytes());
        buf
    }

    pub(crate) fn encode(ts_micros: i64, hash: &PayloadHash, key: MessageKey) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[..Self::PREFIX_LEN].copy_from_slice(&Self::prefix(ts_micros, hash));
        buf[Self::PREFIX_LEN..].copy_from_slice(&key.to_u128().to_be_bytes());
        buf
    }

    /// Extracts the message key from a full index key.
    pub(crate) fn message_key(raw: &[u8]) -> Result<MessageKey> {
        let tail: [u8; 16] = raw
            .get(Self::PREFIX_LEN..Self::LEN)
            .and_then(|tail| tail.try_into().ok())
            .ok_or_else(|| Error::Corrupted(format!("hash index key of length {}", raw.len())))?;
        Ok(MessageKey::from_u128(u128::from_be_bytes(tail)))
    }
}
