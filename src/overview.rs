// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

//! Aggregate views over the whole store.

use crate::constants;
use crate::error::Result;
use crate::lane::MessageLane;
use crate::model::{
    decode, from_micros, MessageHeader, StoreStatus, StreamRecord, StreamStats, TableStatus,
};
use crate::types::MessageKey;

impl MessageLane {
    /// Per-stream statistics, ordered by stream name, from one read snapshot.
    ///
    /// Only message headers are scanned; payloads are never read.
    pub fn overview(&self) -> Result<Vec<StreamStats>> {
        let storage = self.storage();
        let txn = storage.env.read_txn()?;

        let mut overview = Vec::new();
        for entry in storage.streams.iter(&txn)? {
            let (name, bytes) = entry?;
            let record: StreamRecord = decode(bytes)?;

            let mut stats = StreamStats {
                name: name.to_string(),
                min_position: 0,
                max_position: 0,
                count: 0,
                min_ts: None,
                max_ts: None,
                total_size: 0,
            };
            let mut ts_bounds: Option<(i64, i64)> = None;

            for message in storage
                .messages
                .range(&txn, &MessageKey::stream_range(record.id))?
            {
                let (raw, bytes) = message?;
                let position = MessageKey::from_u128(raw).position;
                let header: MessageHeader = decode(bytes)?;

                // Keys are sorted, so the first one seen is the minimum.
                if stats.count == 0 {
                    stats.min_position = position;
                }
                stats.max_position = position;
                stats.count += 1;
                stats.total_size += header.size;
                ts_bounds = Some(match ts_bounds {
                    Some((lo, hi)) => (lo.min(header.ts_micros), hi.max(header.ts_micros)),
                    None => (header.ts_micros, header.ts_micros),
                });
            }

            if let Some((lo, hi)) = ts_bounds {
                stats.min_ts = Some(from_micros(lo)?);
                stats.max_ts = Some(from_micros(hi)?);
            }
            overview.push(stats);
        }
        Ok(overview)
    }

    /// Size and row counts of the backing LMDB environment.
    pub fn status(&self) -> Result<StoreStatus> {
        let storage = self.storage();
        let txn = storage.env.read_txn()?;

        let tables = vec![
            TableStatus {
                name: constants::STREAMS_DB_NAME,
                rows: storage.streams.len(&txn)?,
            },
            TableStatus {
                name: constants::STREAM_NAMES_DB_NAME,
                rows: storage.stream_names.len(&txn)?,
            },
            TableStatus {
                name: constants::MESSAGES_DB_NAME,
                rows: storage.messages.len(&txn)?,
            },
            TableStatus {
                name: constants::PAYLOADS_DB_NAME,
                rows: storage.payloads.len(&txn)?,
            },
            TableStatus {
                name: constants::UUID_INDEX_DB_NAME,
                rows: storage.uuid_index.len(&txn)?,
            },
            TableStatus {
                name: constants::HASH_INDEX_DB_NAME,
                rows: storage.hash_index.len(&txn)?,
            },
        ];

        Ok(StoreStatus {
            path: storage.env.path().to_path_buf(),
            map_size: storage.config.map_size,
            disk_size: storage.env.real_disk_size()?,
            tables,
        })
    }
}
