//! Persistent client-local storage using RocksDB.
//!
//! Plays the part of the browser's local storage: string keys, string
//! values, last write wins. Two processes sharing one data dir are not
//! coordinated beyond what RocksDB's own lock gives.

use crate::error::{Error, Result};
use rocksdb::{Options, DB};
use std::path::Path;

/// Key of the persisted client token.
pub const CLIENT_ID_KEY: &str = "client_id";

/// Key of the like counter for one school on one date.
pub fn like_counter_key(date: &str, school_code: &str) -> String {
    format!("{date}-{school_code}-schoolLikes")
}

/// Storage backend for client-local state.
pub struct LocalStore {
    db: DB,
}

impl LocalStore {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    /// Get a string value.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(data) => String::from_utf8(data)
                .map(Some)
                .map_err(|e| Error::Storage(format!("value of {key} is not UTF-8: {e}"))),
            None => Ok(None),
        }
    }

    /// Store a string value.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.db.put(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    /// Delete a value.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.db.delete(key.as_bytes())?;
        Ok(())
    }

    /// Read a counter; missing or unparsable values count as zero.
    pub fn get_counter(&self, key: &str) -> Result<u32> {
        Ok(self
            .get(key)?
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0))
    }

    /// Store a counter.
    pub fn put_counter(&self, key: &str, value: u32) -> Result<()> {
        self.put(key, &value.to_string())
    }
}
