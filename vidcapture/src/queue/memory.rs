use std::collections::HashMap;
use std::sync::Mutex;

use super::BlobQueue;
use crate::error::QueueError;

/**
    In-process queue store.
*/
#[derive(Debug, Default)]
pub struct MemoryQueue {
    lists: Mutex<HashMap<String, Vec<Vec<u8>>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, key: &str) -> usize {
        self.lists
            .lock()
            .map(|lists| lists.get(key).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl BlobQueue for MemoryQueue {
    fn push(&self, key: &str, bytes: &[u8]) -> Result<(), QueueError> {
        let mut lists = self.lists.lock().map_err(|_| QueueError::Poisoned)?;
        lists.entry(key.to_string()).or_default().push(bytes.to_vec());
        Ok(())
    }

    fn get_all(&self, key: &str) -> Result<Vec<Vec<u8>>, QueueError> {
        let lists = self.lists.lock().map_err(|_| QueueError::Poisoned)?;
        Ok(lists.get(key).cloned().unwrap_or_default())
    }
}
