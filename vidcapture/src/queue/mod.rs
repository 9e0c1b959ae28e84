/*!
    Blob queue store: byte blobs appended to named lists.

    Capture sessions push their artifacts here; concatenation and export
    read them back in insertion order.
*/

mod memory;
mod redis;

pub use self::memory::MemoryQueue;
pub use self::redis::RedisQueue;

use crate::error::QueueError;

pub trait BlobQueue {
    /// Append `bytes` to the list under `key`.
    fn push(&self, key: &str, bytes: &[u8]) -> Result<(), QueueError>;

    /// Every blob under `key`, oldest first. A missing key is an empty list.
    fn get_all(&self, key: &str) -> Result<Vec<Vec<u8>>, QueueError>;
}
