//! Persisted record stored by the key/value service.

use serde::{Deserialize, Serialize};

use crate::cache::Tagged;

/// One record per key. Re-registering a key overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: String,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Tagged for Record {
    const TYPE_TAG: &'static str = "Record";
}
