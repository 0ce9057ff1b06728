#![no_main]

// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use messagelane::{LaneConfig, MessageLane};
use tempfile::tempdir;

#[derive(Arbitrary, Debug)]
enum LaneOp {
    Create(String),
    Append { stream: String, payload: Vec<u8> },
    Delete { stream: String, position: u64 },
    DeleteRange { stream: String, first: u64, last: u64 },
    DeleteStream(String),
    Next { stream: String, position: u64 },
}

fuzz_target!(|ops: Vec<LaneOp>| {
    let dir = match tempdir() {
        Ok(d) => d,
        Err(_) => return,
    };
    let config = LaneConfig {
        map_size: 10 * 1024 * 1024, // 10MB
        ..LaneConfig::new(dir.path())
    };
    let lane = match MessageLane::with_config(config) {
        Ok(l) => l,
        Err(_) => return,
    };

    // None of these may panic, whatever the input.
    for op in ops {
        let _ = match op {
            LaneOp::Create(name) => lane.create_stream(&name).map(|_| ()),
            LaneOp::Append { stream, payload } => lane.append(&stream, payload).map(|_| ()),
            LaneOp::Delete { stream, position } => lane.delete_at(&stream, position).map(|_| ()),
            LaneOp::DeleteRange {
                stream,
                first,
                last,
            } => lane.delete_range(&stream, first, last).map(|_| ()),
            LaneOp::DeleteStream(name) => lane.delete_stream(&name).map(|_| ()),
            LaneOp::Next { stream, position } => lane.next(&stream, position).map(|_| ()),
        };
    }

    // Whatever survived must still list in strictly increasing position order.
    if let Ok(streams) = lane.list_streams() {
        for stream in streams {
            let Ok(messages) = lane.list(&stream.name) else {
                continue;
            };
            let mut last = 0;
            for message in messages.flatten() {
                assert!(message.position > last);
                assert!(message.position <= stream.marker);
                last = message.position;
            }
        }
    }
});
