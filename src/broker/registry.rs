use std::{
    collections::HashMap,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use chrono::{DateTime, Utc};
use ferrumq_error::{bail, BrokerError, FerrumResult, ResultExt, StatusCode};
use parking_lot::{Mutex, RwLock};
use tokio::{
    net::TcpListener,
    runtime::Handle,
    sync::{mpsc, oneshot, watch, Notify},
};
use tracing::{debug, error, info, warn};

use super::{
    metadata::{self, ChannelMetadata, Metadata, TopicMetadata},
    owner::{MetadataEntity, TopicOwner},
    tasks::TaskGroup,
    topic::Topic,
};
use crate::{
    config::{Options, OptionsSnapshot},
    dirlock::DirLock,
    http,
    logging::{self, LoggingConfig, LoggingHandle},
    protocol, version,
};

/// Registry of topics and owner of everything a running daemon holds:
/// the configuration snapshot, the data-directory lock, the metadata
/// file and the background tasks.
///
/// Lifecycle: [`Broker::create`] → [`Broker::load_metadata`] →
/// [`Broker::start`] → [`Broker::exit`].
pub struct Broker {
    self_ref: Weak<Broker>,
    options: OptionsSnapshot,
    data_path: PathBuf,
    topics: RwLock<HashMap<String, Arc<Topic>>>,
    dir_lock: Mutex<DirLock>,
    /// Serialises snapshot-and-write of the metadata file.
    persist_lock: Mutex<()>,
    is_loading: AtomicBool,
    is_exiting: AtomicBool,
    health: RwLock<Option<String>>,
    start_time: DateTime<Utc>,
    tasks: TaskGroup,
    persist_tx: mpsc::UnboundedSender<MetadataEntity>,
    exit_tx: watch::Sender<bool>,
    http_close: Arc<Notify>,
    /// Resolves once the admin server drained its connections.
    http_stopped: Mutex<Option<oneshot::Receiver<()>>>,
    http_addr: Mutex<Option<SocketAddr>>,
    _logging: Mutex<Option<LoggingHandle>>,
}

/// Holds the loading flag up for the lifetime of the guard.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl Broker {
    /// Builds the broker and locks its data directory.
    ///
    /// Must be called from within a Tokio runtime: the metadata
    /// persistence worker is spawned on the current runtime.
    pub fn create(opts: Options) -> FerrumResult<Arc<Self>> {
        let runtime = Handle::try_current().map_err(|e| BrokerError::NoRuntime {
            reason: e.to_string(),
        })?;

        let data_path = opts.data_dir()?;
        let mut dir_lock = DirLock::new(&data_path);

        let opts = Options {
            data_path: Some(data_path.clone()),
            ..opts
        }
        .resolve()
        .context("resolving broker options")?;

        // Keeps whatever subscriber the embedding application installed.
        let logging = logging::init_logging(&LoggingConfig::from_options(&opts))?;

        if let Err(e) = dir_lock.lock() {
            error!(error = %e, "FATAL: failed to lock data directory");
            return Err(e.into());
        }

        info!(version = %version::string("ferrumqd"), id = opts.id, "starting");
        info!(data_path = %data_path.display(), "using data directory");

        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = watch::channel(false);

        let broker = Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            options: OptionsSnapshot::new(opts),
            data_path,
            topics: RwLock::new(HashMap::new()),
            dir_lock: Mutex::new(dir_lock),
            persist_lock: Mutex::new(()),
            is_loading: AtomicBool::new(false),
            is_exiting: AtomicBool::new(false),
            health: RwLock::new(None),
            start_time: Utc::now(),
            tasks: TaskGroup::new(runtime),
            persist_tx,
            exit_tx,
            http_close: Arc::new(Notify::new()),
            http_stopped: Mutex::new(None),
            http_addr: Mutex::new(None),
            _logging: Mutex::new(Some(logging)),
        });

        broker.tasks.spawn(run_persist_worker(
            Arc::downgrade(&broker),
            persist_rx,
            exit_rx,
        ));

        Ok(broker)
    }

    /// Current configuration snapshot.
    pub fn options(&self) -> Arc<Options> {
        self.options.load()
    }

    /// Publishes new options. The data directory cannot change at runtime.
    pub fn swap_options(
        &self,
        opts: Options,
    ) -> FerrumResult<()> {
        let opts = Options {
            data_path: Some(self.data_path.clone()),
            ..opts
        }
        .resolve()
        .context("resolving broker options")?;
        self.options.store(opts);
        Ok(())
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn metadata_file(&self) -> PathBuf {
        metadata::metadata_file(&self.data_path)
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub fn is_exiting(&self) -> bool {
        self.is_exiting.load(Ordering::SeqCst)
    }

    /// `"OK"` or the text of the last background persist failure.
    pub fn health(&self) -> String {
        self.health
            .read()
            .clone()
            .unwrap_or_else(|| "OK".to_string())
    }

    pub fn is_healthy(&self) -> bool {
        self.health.read().is_none()
    }

    pub fn set_health(
        &self,
        err: Option<String>,
    ) {
        *self.health.write() = err;
    }

    /// Address of the admin listener once [`Broker::start`] succeeded.
    pub fn http_address(&self) -> Option<SocketAddr> {
        *self.http_addr.lock()
    }

    /// Registered topics sorted by name.
    pub fn topics(&self) -> Vec<Arc<Topic>> {
        let mut topics: Vec<_> = self.topics.read().values().cloned().collect();
        topics.sort_by(|a, b| a.name().cmp(b.name()));
        topics
    }

    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }

    /// Returns the topic `name`, creating it on first use.
    ///
    /// Concurrent callers always get the same instance. A topic created
    /// while metadata is loading is not started here.
    pub fn get_topic(
        &self,
        name: &str,
    ) -> Arc<Topic> {
        if let Some(topic) = self.topics.read().get(name).cloned() {
            return topic;
        }

        let topic = {
            let mut topics = self.topics.write();
            if let Some(topic) = topics.get(name) {
                return topic.clone();
            }
            let owner: Weak<dyn TopicOwner> = self.self_ref.clone();
            let topic = Topic::new(name, owner, self.options());
            topics.insert(name.to_string(), topic.clone());
            info!(topic = name, "TOPIC created");
            topic
        };

        if !self.is_loading() {
            topic.start();
        }
        topic
    }

    pub fn get_existing_topic(
        &self,
        name: &str,
    ) -> FerrumResult<Arc<Topic>> {
        self.topics.read().get(name).cloned().ok_or_else(|| {
            BrokerError::TopicNotFound {
                topic: name.to_string(),
            }
            .into()
        })
    }

    /// Deletes the topic with its channels, then unregisters it.
    ///
    /// While the delete runs, lookups still return the exiting topic, so no
    /// fresh queue is created over files being removed. The topic is
    /// unregistered even when deleting its files fails.
    pub fn delete_existing_topic(
        &self,
        name: &str,
    ) -> FerrumResult<()> {
        let topic = self.get_existing_topic(name)?;

        let deleted = topic.delete();
        match &deleted {
            // Another caller is tearing it down and will unregister it.
            Err(e) if e.status_code() == StatusCode::Exiting => return deleted,
            Err(e) => error!(topic = name, error = %e, "failed to delete topic data"),
            Ok(()) => {}
        }

        {
            let mut topics = self.topics.write();
            if topics
                .get(name)
                .is_some_and(|current| Arc::ptr_eq(current, &topic))
            {
                topics.remove(name);
            }
        }

        self.notify_metadata_change(topic.entity());
        deleted
    }

    /// Requests a background persist.
    ///
    /// Dropped once the broker is exiting; suppressed while loading, since
    /// the restore itself must not rewrite the file it reads.
    pub fn notify_metadata_change(
        &self,
        entity: MetadataEntity,
    ) {
        if self.is_exiting() {
            return;
        }
        if self.is_loading() {
            debug!(%entity, "metadata change during load, not persisting");
            return;
        }
        if self.persist_tx.send(entity).is_err() {
            debug!("metadata persistence worker gone");
        }
    }

    /// Writes the metadata file from the current registry state.
    ///
    /// Ephemeral topics and channels are omitted. Concurrent calls are
    /// serialised and each one snapshots the registry after taking the
    /// lock, so the last write always reflects the latest state.
    pub fn persist_metadata(&self) -> FerrumResult<()> {
        let _guard = self.persist_lock.lock();

        let topics: Vec<TopicMetadata> = self
            .topics()
            .iter()
            .filter(|topic| !topic.is_ephemeral())
            .map(|topic| TopicMetadata {
                name: topic.name().to_string(),
                paused: topic.is_paused(),
                channels: topic
                    .channels()
                    .iter()
                    .filter(|channel| !channel.is_ephemeral())
                    .map(|channel| ChannelMetadata {
                        name: channel.name().to_string(),
                        paused: channel.is_paused(),
                    })
                    .collect(),
            })
            .collect();

        let path = self.metadata_file();
        info!(path = %path.display(), topics = topics.len(), "persisting topic/channel metadata");
        Metadata::new(topics).write(&path)
    }

    /// Recreates topics and channels recorded in the metadata file.
    ///
    /// Invalid names are skipped with a warning. Topics are started as they
    /// are restored; topics created concurrently during the restore are
    /// started once it ends.
    pub fn load_metadata(&self) -> FerrumResult<()> {
        let restored = {
            let _loading = LoadingGuard::enter(&self.is_loading);
            self.restore_metadata()
        };

        // Topics created by other callers while loading wait for this,
        // whether or not the restore succeeded.
        for topic in self.topics() {
            topic.start();
        }
        restored
    }

    fn restore_metadata(&self) -> FerrumResult<()> {
        let path = self.metadata_file();
        let meta = Metadata::read(&path).context("loading metadata")?;
        debug!(path = %path.display(), version = %meta.version, topics = meta.topics.len(), "restoring metadata");

        for record in meta.topics {
            if !protocol::is_valid_topic_name(&record.name) {
                warn!(topic = %record.name, "skipping creation of invalid topic");
                continue;
            }
            let topic = self.get_topic(&record.name);
            if record.paused {
                topic.pause();
            }

            for channel_record in record.channels {
                if !protocol::is_valid_channel_name(&channel_record.name) {
                    warn!(
                        topic = %record.name,
                        channel = %channel_record.name,
                        "skipping creation of invalid channel"
                    );
                    continue;
                }
                let channel = match topic.get_channel(&channel_record.name) {
                    Ok(channel) => channel,
                    Err(e) => {
                        warn!(topic = %record.name, channel = %channel_record.name, error = %e, "skipping channel restore");
                        continue;
                    }
                };
                if channel_record.paused {
                    channel.pause();
                }
            }

            topic.start();
        }
        Ok(())
    }

    /// Binds the admin listener and serves it in the background.
    ///
    /// # Returns
    ///
    /// The bound address, useful when listening on port 0.
    pub async fn start(&self) -> FerrumResult<SocketAddr> {
        let broker = self.self_ref.upgrade().filter(|_| !self.is_exiting());
        let Some(broker) = broker else {
            bail!(BrokerError::Exiting {
                entity: "broker".to_string(),
            });
        };

        let address = self.options().http_address.clone();
        let listen_failed = |e: std::io::Error| BrokerError::ListenFailed {
            address: address.clone(),
            reason: e.to_string(),
        };
        let listener = TcpListener::bind(&address).await.map_err(listen_failed)?;
        let local = listener.local_addr().map_err(listen_failed)?;

        info!(address = %local, "HTTP: listening");
        *self.http_addr.lock() = Some(local);

        let app = http::router(broker);
        let close = self.http_close.clone();
        let (stopped_tx, stopped_rx) = oneshot::channel();
        *self.http_stopped.lock() = Some(stopped_rx);
        self.tasks.spawn(async move {
            let shutdown = async move { close.notified().await };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "HTTP: server failed");
            }
            info!(address = %local, "HTTP: closing");
            let _ = stopped_tx.send(());
        });

        Ok(local)
    }

    /// Shuts the broker down: closes the listener, persists metadata,
    /// closes every topic, stops background tasks and waits for them, then
    /// releases the data directory. Later calls return immediately.
    pub async fn exit(&self) {
        if self.is_exiting.swap(true, Ordering::SeqCst) {
            return;
        }

        self.http_close.notify_one();
        // In-flight admin requests finish before the final snapshot.
        let http_stopped = self.http_stopped.lock().take();
        if let Some(stopped) = http_stopped {
            let _ = stopped.await;
        }

        if let Some(broker) = self.self_ref.upgrade() {
            let closing = tokio::task::spawn_blocking(move || broker.persist_and_close());
            if let Err(e) = closing.await {
                error!(error = %e, "shutdown persist task failed");
            }
        } else {
            self.persist_and_close();
        }

        self.exit_tx.send_replace(true);
        self.tasks.wait().await;

        if let Err(e) = self.dir_lock.lock().unlock() {
            error!(error = %e, "failed to release data directory");
        }
        info!("bye");
    }

    fn persist_and_close(&self) {
        if let Err(e) = self.persist_metadata() {
            error!(error = %e, "failed to persist metadata");
        }

        info!("closing topics");
        for topic in self.topics() {
            if let Err(e) = topic.close() {
                warn!(topic = topic.name(), error = %e, "failed to close topic");
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Background persistence
////////////////////////////////////////////////////////////////////////////////

/// Coalesces persist requests and writes the metadata file off the async
/// threads until the exit signal is raised.
async fn run_persist_worker(
    broker: Weak<Broker>,
    mut requests: mpsc::UnboundedReceiver<MetadataEntity>,
    mut exit: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = exit_signalled(&mut exit) => break,
            request = requests.recv() => {
                let Some(entity) = request else { break };
                let mut coalesced = 1usize;
                while requests.try_recv().is_ok() {
                    coalesced += 1;
                }
                let Some(broker) = broker.upgrade() else { break };
                debug!(%entity, coalesced, "persisting after metadata change");

                let persisting = broker.clone();
                match tokio::task::spawn_blocking(move || persisting.persist_metadata()).await {
                    Ok(Ok(())) => broker.set_health(None),
                    Ok(Err(e)) => {
                        error!(error = %e, "failed to persist metadata");
                        broker.set_health(Some(e.to_string()));
                    }
                    Err(e) => error!(error = %e, "metadata persist task failed"),
                }
            }
        }
    }
    debug!("metadata persistence worker exiting");
}

async fn exit_signalled(exit: &mut watch::Receiver<bool>) {
    let _ = exit.wait_for(|exiting| *exiting).await;
}

////////////////////////////////////////////////////////////////////////////////
// Trait implementations for Broker
////////////////////////////////////////////////////////////////////////////////

impl TopicOwner for Broker {
    fn options(&self) -> Arc<Options> {
        Broker::options(self)
    }

    fn notify_metadata_change(
        &self,
        entity: MetadataEntity,
    ) {
        Broker::notify_metadata_change(self, entity);
    }

    fn remove_topic(
        &self,
        name: &str,
    ) -> FerrumResult<()> {
        self.delete_existing_topic(name)
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("data_path", &self.data_path)
            .field("topics", &self.topic_count())
            .field("loading", &self.is_loading())
            .field("exiting", &self.is_exiting())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
