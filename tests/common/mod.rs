#![allow(dead_code)]

use std::{path::Path, sync::Arc, time::Duration};

use ferrumq::{broker::Metadata, Broker, Options};

/// Options rooted at `dir`, listening on an ephemeral local port.
pub fn options(dir: &Path) -> Options {
    let mut opts = Options::default();
    opts.data_path = Some(dir.to_path_buf());
    opts.http_address = "127.0.0.1:0".to_string();
    opts
}

pub fn create_broker(dir: &Path) -> Arc<Broker> {
    Broker::create(options(dir)).expect("broker should start")
}

pub fn read_metadata(dir: &Path) -> Metadata {
    Metadata::read(&dir.join("ferrumqd.dat")).expect("metadata should parse")
}

/// Polls `check` until it holds or two seconds elapsed.
pub async fn eventually<F: FnMut() -> bool>(mut check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
