mod common;

use std::{
    sync::Arc,
    thread,
};

use anyhow::Result;
use common::{create_broker, options, read_metadata};
use ferrumq::Broker;
use ferrumq_error::StatusCode;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// Concurrent lookups of one name always yield the same topic.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_get_topic_returns_one_instance() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broker = create_broker(dir.path());

    let topics: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| broker.get_topic("orders")))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(broker.topic_count(), 1);
    assert!(topics.iter().all(|t| Arc::ptr_eq(t, &topics[0])));

    broker.exit().await;
    Ok(())
}

/// Concurrent channel creation on one topic yields one channel per name.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_get_channel_returns_one_instance() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broker = create_broker(dir.path());
    let topic = broker.get_topic("orders");

    thread::scope(|scope| {
        for i in 0..8 {
            let topic = &topic;
            scope.spawn(move || {
                topic.get_channel("shared").unwrap();
                topic.get_channel(&format!("own-{i}")).unwrap();
            });
        }
    });

    assert_eq!(topic.channel_count(), 9);
    broker.exit().await;
    Ok(())
}

/// A second broker on a locked directory fails fast.
#[tokio::test]
async fn second_broker_on_same_directory_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let first = create_broker(dir.path());

    let err = Broker::create(options(dir.path())).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::DirectoryInUse);
    assert!(err.to_string().contains("in use"));

    first.exit().await;

    // Released at exit.
    let again = Broker::create(options(dir.path()))?;
    again.exit().await;
    Ok(())
}

#[tokio::test]
async fn missing_data_directory_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let err = Broker::create(options(&dir.path().join("absent"))).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::StorageUnavailable);
    Ok(())
}

/// Exit closes topics, persists and refuses further work.
#[tokio::test]
async fn exit_closes_everything() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broker = create_broker(dir.path());
    let topic = broker.get_topic("orders");
    let channel = topic.get_channel("billing")?;
    topic.put_message(b"kept on disk")?;

    broker.exit().await;

    assert!(topic.is_exiting());
    assert!(channel.is_exiting());
    assert_eq!(
        topic.put_message(b"late").unwrap_err().status_code(),
        StatusCode::Exiting
    );
    assert!(dir.path().join("ferrumqd.dat").exists());
    assert!(dir.path().join("orders.diskqueue.meta.dat").exists());

    // Idempotent.
    broker.exit().await;
    Ok(())
}

/// Messages stored before exit are readable by the next broker.
#[tokio::test]
async fn queued_messages_survive_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    {
        let broker = create_broker(dir.path());
        let channel = broker.get_topic("orders").get_channel("billing")?;
        channel.put_message(b"first")?;
        channel.put_message(b"second")?;
        broker.exit().await;
    }

    let broker = create_broker(dir.path());
    broker.load_metadata()?;
    let channel = broker
        .get_existing_topic("orders")?
        .get_existing_channel("billing")?;
    assert_eq!(channel.depth(), 2);
    assert_eq!(channel.read_message()?.as_deref(), Some(&b"first"[..]));

    broker.exit().await;
    Ok(())
}

/// The admin surface serves until exit, then stops accepting connections.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_surface_serves_until_exit() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broker = create_broker(dir.path());
    let addr = broker.start().await?;
    assert_eq!(broker.http_address(), Some(addr));

    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(b"GET /ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    assert!(response.starts_with("HTTP/1.1 200"), "got: {response:?}");
    assert!(response.ends_with("OK"));

    broker.exit().await;
    assert!(TcpStream::connect(addr).await.is_err());
    Ok(())
}

/// Exit drains the admin server before returning: an idle keep-alive
/// connection is closed by the server, and the last change made over HTTP
/// is in the metadata file.
#[tokio::test]
async fn exit_waits_for_http_surface() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broker = create_broker(dir.path());
    broker.get_topic("orders");
    let addr = broker.start().await?;

    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(b"POST /topic/pause?topic=orders HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n")
        .await?;
    let mut buf = [0u8; 512];
    let n = stream.read(&mut buf).await?;
    assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200"));

    broker.exit().await;

    let mut rest = Vec::new();
    let closed = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        stream.read_to_end(&mut rest),
    )
    .await;
    assert!(matches!(closed, Ok(Ok(0)) | Ok(Err(_))), "connection still open: {closed:?}");

    let meta = read_metadata(dir.path());
    assert_eq!(meta.topics.len(), 1);
    assert!(meta.topics[0].paused);
    Ok(())
}

#[tokio::test]
async fn start_on_busy_address_fails() -> Result<()> {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0")?;
    let dir = tempfile::tempdir()?;

    let mut opts = options(dir.path());
    opts.http_address = occupied.local_addr()?.to_string();
    let broker = Broker::create(opts)?;

    let err = broker.start().await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BindFailed);
    assert!(err.to_string().contains("listen http"));

    broker.exit().await;
    Ok(())
}
