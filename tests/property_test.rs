// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

use chrono::{Duration, TimeZone, Utc};
use messagelane::{Append, LaneConfig, MessageLane};
use proptest::prelude::*;
use tempfile::tempdir;

fn open_lane(dir: &tempfile::TempDir, page_size: usize) -> MessageLane {
    MessageLane::with_config(LaneConfig {
        map_size: 10 * 1024 * 1024,
        page_size,
        ..LaneConfig::new(dir.path())
    })
    .unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Append(Vec<u8>),
    Delete(u64),
    DeleteRange(u64, u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec(any::<u8>(), 0..32).prop_map(Op::Append),
        1 => (1..40u64).prop_map(Op::Delete),
        1 => (1..40u64, 0..8u64).prop_map(|(first, len)| Op::DeleteRange(first, first + len)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Replays random appends and deletes against a simple model of the stream.
    #[test]
    fn test_stream_matches_model(
        ops in prop::collection::vec(op_strategy(), 1..60),
        page_size in 1..8usize,
    ) {
        let dir = tempdir().unwrap();
        let lane = open_lane(&dir, page_size);
        lane.create_stream("obs").unwrap();

        let mut marker = 0u64;
        let mut model: Vec<(u64, Vec<u8>)> = Vec::new();
        for op in ops {
            match op {
                Op::Append(payload) => {
                    lane.append("obs", &payload).unwrap();
                    marker += 1;
                    model.push((marker, payload));
                }
                Op::Delete(position) => {
                    let existed = model.iter().any(|(p, _)| *p == position);
                    prop_assert_eq!(lane.delete_at("obs", position).unwrap(), existed);
                    model.retain(|(p, _)| *p != position);
                }
                Op::DeleteRange(first, last) => {
                    let before = model.len();
                    model.retain(|(p, _)| *p < first || *p > last);
                    let removed = lane.delete_range("obs", first, last).unwrap();
                    prop_assert_eq!(removed, (before - model.len()) as u64);
                }
            }
        }

        let stored: Vec<(u64, Vec<u8>)> = lane
            .list("obs")
            .unwrap()
            .map(|m| m.map(|m| (m.position, m.payload)))
            .collect::<messagelane::Result<_>>()
            .unwrap();
        prop_assert_eq!(&stored, &model);
        prop_assert_eq!(lane.get_stream("obs").unwrap().unwrap().marker, marker);

        let stats = &lane.overview().unwrap()[0];
        prop_assert_eq!(stats.count, model.len() as u64);
        prop_assert_eq!(stats.min_position, model.first().map_or(0, |(p, _)| *p));
        prop_assert_eq!(stats.max_position, model.last().map_or(0, |(p, _)| *p));
        prop_assert_eq!(
            stats.total_size,
            model.iter().map(|(_, payload)| payload.len() as u64).sum::<u64>()
        );

        // Walking with `next` visits the same positions as `list`.
        let mut walked = Vec::new();
        let mut cursor = lane.first("obs").unwrap();
        while let Some(message) = cursor {
            walked.push(message.position);
            cursor = lane.next("obs", message.position).unwrap();
        }
        prop_assert_eq!(walked, model.iter().map(|(p, _)| *p).collect::<Vec<_>>());
    }

    /// `list_since` is exactly `list` filtered by timestamp, whatever the order
    /// the timestamps were supplied in.
    #[test]
    fn test_list_since_is_filtered_list(
        offsets in prop::collection::vec(0..100i64, 1..40),
        since in 0..100i64,
        page_size in 1..8usize,
    ) {
        let dir = tempdir().unwrap();
        let lane = open_lane(&dir, page_size);
        lane.create_stream("obs").unwrap();

        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for (i, offset) in offsets.iter().enumerate() {
            lane.append_with(
                "obs",
                i.to_string(),
                Append::new().at(base + Duration::seconds(*offset)),
            )
            .unwrap();
        }

        let threshold = base + Duration::seconds(since);
        let expected: Vec<u64> = lane
            .list("obs")
            .unwrap()
            .map(|m| m.unwrap())
            .filter(|m| m.ts >= threshold)
            .map(|m| m.position)
            .collect();
        let actual: Vec<u64> = lane
            .list_since("obs", threshold)
            .unwrap()
            .map(|m| m.unwrap().position)
            .collect();
        prop_assert_eq!(actual, expected);
    }
}
