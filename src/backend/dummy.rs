use bytes::Bytes;
use ferrumq_error::FerrumResult;

use super::BackendQueue;

/// Queue of ephemeral entities: accepts and forgets everything.
#[derive(Debug, Default)]
pub struct DummyQueue;

impl DummyQueue {
    pub fn new() -> Self {
        Self
    }
}

impl BackendQueue for DummyQueue {
    fn put(
        &self,
        _data: &[u8],
    ) -> FerrumResult<()> {
        Ok(())
    }

    fn read_next(&self) -> FerrumResult<Option<Bytes>> {
        Ok(None)
    }

    fn depth(&self) -> u64 {
        0
    }

    fn close(&self) -> FerrumResult<()> {
        Ok(())
    }

    fn delete(&self) -> FerrumResult<()> {
        Ok(())
    }

    fn empty(&self) -> FerrumResult<()> {
        Ok(())
    }
}
