//! Partitioner with pinned tokens.

use std::collections::HashMap;
use std::sync::Arc;

use crate::partitioner::sha256::Sha256Partitioner;
use crate::partitioner::traits::Partitioner;
use crate::token::HashToken;

/// Returns a fixed token for each listed key and hashes anything else with
/// SHA-256. Lets tests place nodes and keys at chosen ring positions.
#[derive(Debug, Default)]
pub struct TablePartitioner {
    table: HashMap<String, u64>,
}

impl TablePartitioner {
    pub fn new(entries: &[(&str, u64)]) -> Arc<Self> {
        Arc::new(Self {
            table: entries
                .iter()
                .map(|(key, token)| (key.to_string(), *token))
                .collect(),
        })
    }
}

impl Partitioner for TablePartitioner {
    fn partition(&self, key: &[u8]) -> HashToken {
        let pinned = std::str::from_utf8(key)
            .ok()
            .and_then(|key| self.table.get(key));
        match pinned {
            Some(token) => HashToken(*token),
            None => Sha256Partitioner.partition(key),
        }
    }

    fn name(&self) -> &'static str {
        "TablePartitioner"
    }
}
