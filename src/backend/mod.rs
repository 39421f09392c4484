//! Per-entity message storage behind topics and channels.

pub mod disk;
pub mod dummy;
mod logger;

use std::path::PathBuf;

use bytes::Bytes;
pub use disk::DiskQueue;
pub use dummy::DummyQueue;
use ferrumq_error::FerrumResult;
pub use logger::QueueLogger;

use crate::config::Options;

/// Smallest payload accepted by a durable queue.
pub const MIN_MSG_SIZE: u64 = 1;

/// Append/read/delete byte queue owned by a single topic or channel.
///
/// Implementations use interior mutability; every method takes `&self` so
/// the owning entity can share the queue across threads.
pub trait BackendQueue: Send + Sync {
    /// Appends one payload.
    fn put(
        &self,
        data: &[u8],
    ) -> FerrumResult<()>;

    /// Takes the oldest payload, `None` when the queue is empty.
    fn read_next(&self) -> FerrumResult<Option<Bytes>>;

    /// Number of payloads written and not yet read.
    fn depth(&self) -> u64;

    /// Flushes pending state and stops accepting operations.
    fn close(&self) -> FerrumResult<()>;

    /// Stops accepting operations without flushing pending state.
    fn delete(&self) -> FerrumResult<()>;

    /// Drops every stored payload.
    fn empty(&self) -> FerrumResult<()>;
}

/// Chooses the queue implementation for an entity once, at construction:
/// ephemeral entities get a [`DummyQueue`], everything else a
/// [`DiskQueue`] sized and synced from `opts`.
pub fn new_queue(
    name: &str,
    ephemeral: bool,
    opts: &Options,
) -> Box<dyn BackendQueue> {
    if ephemeral {
        return Box::new(DummyQueue::new());
    }

    let data_path = opts
        .data_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    Box::new(DiskQueue::new(
        name,
        data_path,
        opts.max_bytes_per_file,
        MIN_MSG_SIZE,
        opts.max_msg_size,
        opts.sync_every,
        opts.sync_timeout(),
        QueueLogger::new(name, opts.level()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_gets_dummy_queue() {
        let dir = tempfile::tempdir().unwrap();
        let opts = Options {
            data_path: Some(dir.path().to_path_buf()),
            ..Options::default()
        };

        let queue = new_queue("reports#ephemeral", true, &opts);
        queue.put(b"hello").unwrap();
        assert_eq!(queue.depth(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_durable_queue_stores_under_data_path() {
        let dir = tempfile::tempdir().unwrap();
        let opts = Options {
            data_path: Some(dir.path().to_path_buf()),
            ..Options::default()
        };

        let queue = new_queue("orders", false, &opts);
        queue.put(b"hello").unwrap();
        assert_eq!(queue.depth(), 1);
        assert!(dir.path().join("orders.diskqueue.000000.dat").exists());
    }
}
