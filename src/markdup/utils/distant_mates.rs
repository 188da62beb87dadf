use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use anyhow::{anyhow, Error};

use crate::utils::errors::Error as CoreError;

use super::read_pair::ReadPair;

/**
 * Templates whose two reads were read by different shards.
 *
 * Each shard hands over its unpaired mates once its local pass is over, with file indices
 * already shifted to global ones. The first read of a template waits in the table; the second
 * completes it and removes the entry, so every template is resolved at most once. A template
 * that is already complete, here or inside a shard, cannot take another read.
 */
pub(crate) struct DistantMateTable {
    state: Mutex<TableState>,
}

struct TableState {
    pending: HashMap<Vec<u8>, ReadPair>,
    completed: HashSet<Vec<u8>>,
}

impl DistantMateTable {
    /// `completed` holds the names of the templates the shards already paired locally.
    pub(crate) fn new(completed: HashSet<Vec<u8>>) -> Self {
        Self {
            state: Mutex::new(TableState {
                pending: HashMap::new(),
                completed,
            }),
        }
    }

    /// Offers one half of a template. Returns the completed pair when its mate was already waiting.
    pub(crate) fn resolve(&self, half: ReadPair) -> Result<Option<ReadPair>, Error> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("Distant mate table lock is poisoned."))?;

        let name = half.left.qname().to_vec();
        if state.completed.contains(&name) {
            return Err(CoreError::template_collision(&name, half.left.flags()).into());
        }

        match state.pending.remove(&name) {
            Some(mut waiting) => {
                let ReadPair {
                    left, left_file_idx, ..
                } = half;
                waiting.add_read(left, left_file_idx)?;
                state.completed.insert(name);

                Ok(Some(waiting))
            }
            None => {
                state.pending.insert(name, half);
                Ok(None)
            }
        }
    }

    /// Templates whose mate never showed up.
    pub(crate) fn into_unresolved(self) -> Result<Vec<ReadPair>, Error> {
        let state = self
            .state
            .into_inner()
            .map_err(|_| anyhow!("Distant mate table lock is poisoned."))?;

        let mut unresolved: Vec<ReadPair> = state.pending.into_values().collect();
        unresolved.sort_by_key(|p| p.left_file_idx);

        Ok(unresolved)
    }
}
