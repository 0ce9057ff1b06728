// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

pub const STREAMS_DB_NAME: &str = "streams";
pub const STREAM_NAMES_DB_NAME: &str = "stream_names";
pub const MESSAGES_DB_NAME: &str = "messages";
pub const PAYLOADS_DB_NAME: &str = "payloads";
pub const UUID_INDEX_DB_NAME: &str = "uuid_index";
pub const HASH_INDEX_DB_NAME: &str = "hash_index";
pub const SEQUENCES_DB_NAME: &str = "sequences";

/// Keys of the `sequences` database.
pub const STREAM_ID_SEQUENCE: &str = "stream_id";
pub const MESSAGE_ID_SEQUENCE: &str = "message_id";

pub const DEFAULT_PATH: &str = "messagelane.mdb";
pub const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024; // 1 GiB
pub const DEFAULT_MAX_DBS: u32 = 7;
pub const DEFAULT_MAX_READERS: u32 = 126;
pub const DEFAULT_PAGE_SIZE: usize = 256;

/// LMDB's default maximum key size.
pub const MAX_STREAM_NAME_LEN: usize = 511;
