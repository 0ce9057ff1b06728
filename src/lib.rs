// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

//! Named append-only message lanes backed by LMDB.
//!
//! Every stream hands out gapless, strictly increasing positions under any
//! number of concurrent writers. Messages are addressable by position, by uuid
//! and by `(timestamp, payload hash)`, and can be deleted one at a time, by
//! position range or by age.

pub mod append;
pub mod constants;
pub mod error;
mod lane;
pub mod log;
pub mod model;
mod overview;
pub mod pattern;
pub mod reader;
mod registry;
mod retention;
mod storage;
mod types;
mod utils;

pub use append::Append;
pub use error::{Error, Result};
pub use lane::MessageLane;
pub use model::{payload_hash, Message, PayloadHash, StoreStatus, Stream, StreamStats, TableStatus};
pub use reader::MessageIter;
pub use storage::LaneConfig;
