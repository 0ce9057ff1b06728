// This file is part of MessageLane.
//
// Copyright (C) 2025 Matheus Cardoso <varvedb@matheus.sbs>
//
// This Source Code Form is subject to the terms of the Mozilla Public License
// v. 2.0. If a copy of the MPL was not distributed with this file, You can
// obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use heed::{Env, EnvOpenOptions, RwTxn, WithoutTls};

use crate::constants;
use crate::error::{Error, Result};
use crate::log::debug;
use crate::types::{
    HashIndexDb, MessagesDb, PayloadsDb, SequencesDb, StreamNamesDb, StreamsDb, UuidIndexDb,
};

/// Configuration for opening a MessageLane storage environment.
#[derive(Debug, Clone)]
pub struct LaneConfig {
    pub path: PathBuf,
    pub map_size: usize,
    pub max_readers: u32,
    /// Number of messages fetched per read transaction by lazy iterators.
    pub page_size: usize,
    pub create_dir: bool,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::DEFAULT_PATH),
            map_size: constants::DEFAULT_MAP_SIZE,
            max_readers: constants::DEFAULT_MAX_READERS,
            page_size: constants::DEFAULT_PAGE_SIZE,
            create_dir: true,
        }
    }
}

impl LaneConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.map_size == 0 {
            return Err(Error::InvalidConfig("map_size must be non-zero".to_string()));
        }
        if self.max_readers == 0 {
            return Err(Error::InvalidConfig(
                "max_readers must be non-zero".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(Error::InvalidConfig("page_size must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// The LMDB environment and every database MessageLane keeps in it.
#[derive(Clone)]
pub(crate) struct Storage {
    pub(crate) env: Env<WithoutTls>,
    pub(crate) config: LaneConfig,
    // Buckets
    pub(crate) streams: StreamsDb,
    pub(crate) stream_names: StreamNamesDb,
    pub(crate) messages: MessagesDb,
    pub(crate) payloads: PayloadsDb,
    pub(crate) uuid_index: UuidIndexDb,
    pub(crate) hash_index: HashIndexDb,
    pub(crate) sequences: SequencesDb,
}

impl Storage {
    pub(crate) fn open(config: LaneConfig) -> Result<Self> {
        config.validate()?;

        if config.create_dir {
            std::fs::create_dir_all(&config.path)?;
        }

        // SAFETY: the environment is opened once per handle and LMDB's own
        // lock file arbitrates between processes.
        let env = unsafe {
            EnvOpenOptions::new()
                .read_txn_without_tls()
                .map_size(config.map_size)
                .max_dbs(constants::DEFAULT_MAX_DBS)
                .max_readers(config.max_readers)
                .open(&config.path)?
        };

        let mut txn = env.write_txn()?;
        let streams = env.create_database(&mut txn, Some(constants::STREAMS_DB_NAME))?;
        let stream_names = env.create_database(&mut txn, Some(constants::STREAM_NAMES_DB_NAME))?;
        let messages = env.create_database(&mut txn, Some(constants::MESSAGES_DB_NAME))?;
        let payloads = env.create_database(&mut txn, Some(constants::PAYLOADS_DB_NAME))?;
        let uuid_index = env.create_database(&mut txn, Some(constants::UUID_INDEX_DB_NAME))?;
        let hash_index = env.create_database(&mut txn, Some(constants::HASH_INDEX_DB_NAME))?;
        let sequences = env.create_database(&mut txn, Some(constants::SEQUENCES_DB_NAME))?;
        txn.commit()?;

        debug!("opened messagelane storage at {}", config.path.display());

        Ok(Self {
            env,
            config,
            streams,
            stream_names,
            messages,
            payloads,
            uuid_index,
            hash_index,
            sequences,
        })
    }

    /// Hands out the next value of a persistent sequence inside `txn`.
    ///
    /// Values start at 1 and are never reused, even if the rows they were
    /// assigned to are deleted later.
    pub(crate) fn next_id(&self, txn: &mut RwTxn<'_>, sequence: &str) -> Result<u64> {
        let next = self.sequences.get(&*txn, sequence)?.unwrap_or(0) + 1;
        self.sequences.put(txn, sequence, &next)?;
        Ok(next)
    }
}
