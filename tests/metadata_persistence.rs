mod common;

use std::fs;

use anyhow::Result;
use common::{create_broker, eventually, read_metadata};
use ferrumq::broker::{ChannelMetadata, Metadata, TopicMetadata};

fn write_metadata(
    dir: &std::path::Path,
    json: &str,
) {
    fs::write(dir.join("ferrumqd.dat"), json).unwrap();
}

/// An empty directory restores to an empty broker and persists an empty
/// topic list.
#[tokio::test]
async fn empty_directory_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broker = create_broker(dir.path());

    broker.load_metadata()?;
    assert_eq!(broker.topic_count(), 0);
    assert!(!dir.path().join("ferrumqd.dat").exists());

    broker.persist_metadata()?;
    let meta = read_metadata(dir.path());
    assert!(meta.topics.is_empty());
    assert_eq!(meta.version, ferrumq::version::BINARY);

    broker.exit().await;
    Ok(())
}

/// Pause flags of topics and channels survive a restart.
#[tokio::test]
async fn restore_topics_channels_and_pause_flags() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_metadata(
        dir.path(),
        r#"{"version":"1.1.0","topics":[
            {"name":"orders","paused":true,"channels":[
                {"name":"billing","paused":true},
                {"name":"shipping","paused":false}]}]}"#,
    );

    let broker = create_broker(dir.path());
    broker.load_metadata()?;

    let orders = broker.get_existing_topic("orders")?;
    assert!(orders.is_paused());
    assert!(orders.is_started());
    assert!(orders.get_existing_channel("billing")?.is_paused());
    assert!(!orders.get_existing_channel("shipping")?.is_paused());
    assert!(!broker.is_loading());

    broker.exit().await;
    Ok(())
}

/// Records with invalid names are skipped, the rest is restored.
#[tokio::test]
async fn invalid_names_are_skipped() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_metadata(
        dir.path(),
        r#"{"version":"1.1.0","topics":[
            {"name":"bad name!","paused":false,"channels":[]},
            {"name":"orders","paused":false,"channels":[
                {"name":"no/slashes","paused":false},
                {"name":"billing","paused":false}]}]}"#,
    );

    let broker = create_broker(dir.path());
    broker.load_metadata()?;

    assert_eq!(broker.topic_count(), 1);
    let orders = broker.get_existing_topic("orders")?;
    assert_eq!(orders.channel_count(), 1);
    assert!(orders.get_existing_channel("billing").is_ok());

    broker.exit().await;
    Ok(())
}

/// A `null` channel list restores the topic with no channels.
#[tokio::test]
async fn null_channel_list_restores_topic() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_metadata(
        dir.path(),
        r#"{"topics":[{"name":"orders","paused":false,"channels":null}]}"#,
    );

    let broker = create_broker(dir.path());
    broker.load_metadata()?;

    let orders = broker.get_existing_topic("orders")?;
    assert_eq!(orders.channel_count(), 0);
    assert!(orders.is_started());

    broker.exit().await;
    Ok(())
}

/// Ephemeral topics and channels never reach the metadata file.
#[tokio::test]
async fn ephemeral_entities_are_not_persisted() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broker = create_broker(dir.path());

    let reports = broker.get_topic("reports#ephemeral");
    assert!(reports.is_ephemeral());
    reports.get_channel("tail")?;
    let orders = broker.get_topic("orders");
    assert!(!orders.is_ephemeral());
    orders.get_channel("billing")?;
    assert!(orders.get_channel("live#ephemeral")?.is_ephemeral());
    broker.persist_metadata()?;

    let meta = read_metadata(dir.path());
    assert_eq!(
        meta.topics,
        vec![TopicMetadata {
            name: "orders".into(),
            paused: false,
            channels: vec![ChannelMetadata {
                name: "billing".into(),
                paused: false,
            }],
        }]
    );

    broker.exit().await;
    Ok(())
}

/// Persisting an unchanged registry writes the same bytes.
#[tokio::test]
async fn persist_is_idempotent() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broker = create_broker(dir.path());
    for name in ["b-topic", "a-topic"] {
        broker.get_topic(name).get_channel("c")?;
    }

    broker.persist_metadata()?;
    let first = fs::read(dir.path().join("ferrumqd.dat"))?;
    broker.persist_metadata()?;
    let second = fs::read(dir.path().join("ferrumqd.dat"))?;
    assert_eq!(first, second);

    // Sorted by name regardless of creation order.
    let names: Vec<_> = read_metadata(dir.path())
        .topics
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["a-topic", "b-topic"]);

    broker.exit().await;
    Ok(())
}

/// A corrupt file fails the restore and leaves the broker out of the
/// loading state.
#[tokio::test]
async fn corrupt_file_fails_load() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_metadata(dir.path(), "{\"topics\": [");

    let broker = create_broker(dir.path());
    let err = broker.load_metadata().unwrap_err();
    assert_eq!(
        err.status_code(),
        ferrumq_error::StatusCode::DeserializationFailed
    );
    assert!(err.to_string().starts_with("loading metadata: "));
    assert!(!broker.is_loading());

    // Topics created afterwards start normally.
    assert!(broker.get_topic("orders").is_started());

    broker.exit().await;
    Ok(())
}

/// Restoring does not rewrite the file it reads.
#[tokio::test]
async fn load_does_not_trigger_persist() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let original = r#"{ "version": "0.9.0", "topics": [ { "name": "orders", "paused": true } ] }"#;
    write_metadata(dir.path(), original);

    let broker = create_broker(dir.path());
    broker.load_metadata()?;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    assert_eq!(fs::read_to_string(dir.path().join("ferrumqd.dat"))?, original);

    broker.exit().await;
    Ok(())
}

/// A change made after startup reaches the file without an explicit
/// persist call.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn changes_are_persisted_in_background() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broker = create_broker(dir.path());
    broker.load_metadata()?;

    broker.get_topic("orders").get_channel("billing")?.pause();

    let path = dir.path().join("ferrumqd.dat");
    let persisted = eventually(|| {
        Metadata::read(&path)
            .map(|meta| {
                meta.topics.len() == 1
                    && meta.topics[0].channels.len() == 1
                    && meta.topics[0].channels[0].paused
            })
            .unwrap_or(false)
    })
    .await;
    assert!(persisted, "background persist did not happen");

    broker.exit().await;
    Ok(())
}

/// State written at exit is what the next broker restores.
#[tokio::test]
async fn exit_persists_final_state() -> Result<()> {
    let dir = tempfile::tempdir()?;
    {
        let broker = create_broker(dir.path());
        broker.load_metadata()?;
        let topic = broker.get_topic("orders");
        topic.get_channel("billing")?;
        topic.pause();
        broker.exit().await;
    }

    let broker = create_broker(dir.path());
    broker.load_metadata()?;
    let orders = broker.get_existing_topic("orders")?;
    assert!(orders.is_paused());
    assert!(orders.get_existing_channel("billing").is_ok());

    broker.exit().await;
    Ok(())
}

/// A failing background persist marks the broker unhealthy, a later
/// successful one clears it.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn persist_failure_updates_health() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broker = create_broker(dir.path());

    // Renaming over a non-empty directory fails.
    let blocker = dir.path().join("ferrumqd.dat");
    fs::create_dir(&blocker)?;
    fs::write(blocker.join("keep"), b"x")?;

    broker.get_topic("orders");
    assert!(eventually(|| !broker.is_healthy()).await);
    assert_ne!(broker.health(), "OK");

    fs::remove_dir_all(&blocker)?;
    broker.get_topic("orders").pause();
    assert!(eventually(|| broker.is_healthy()).await);

    broker.exit().await;
    Ok(())
}
