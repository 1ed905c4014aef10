use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use tribunal_core::CallbackDispatcher;
use tribunal_hearings::{
    HearingPublishers, PartitionedChannel, PendingHearingRequests, SessionAwarePublisher,
    SessionMessage,
};
use tribunal_notifications::{
    DisabledNotifications, NotificationsMessageProcessor, WebhookConfig, WebhookForwarder,
};

use crate::config::AppConfig;
use crate::handlers;
use crate::hearing_updates::{HearingUpdateListener, InMemoryCaseStore};
use crate::messaging::{ChannelMessageSource, QueueListener, QueueMessage, TopicConsumer};
use crate::routes::{AppState, build_app};

pub struct TribunalServer {
    addr: SocketAddr,
    app: Router,
    case_events: mpsc::Sender<QueueMessage>,
    hearing_updates: mpsc::Sender<QueueMessage>,
    case_store: Arc<InMemoryCaseStore>,
    shutdown: watch::Sender<bool>,
    listeners: Vec<JoinHandle<()>>,
    sinks: Vec<JoinHandle<()>>,
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Wire handlers, publishers and listeners. Must run inside a Tokio
    /// runtime: the queue listeners are spawned here.
    pub fn build(self) -> anyhow::Result<TribunalServer> {
        let cfg = self.config;

        let mut sinks = Vec::new();
        let publishers = if cfg.publisher.enabled {
            let (channel, receivers) =
                PartitionedChannel::new(cfg.publisher.partitions, cfg.publisher.partition_capacity);
            sinks = spawn_partition_sinks(receivers);
            let publisher = SessionAwarePublisher::with_timeout(
                channel,
                Duration::from_millis(cfg.publisher.send_timeout_ms),
            );
            HearingPublishers::new(Arc::new(publisher))
        } else {
            HearingPublishers::disabled()
        };

        let pending = Arc::new(PendingHearingRequests::new());
        let registry = handlers::registry(publishers, pending.clone())?;
        info!(handlers = ?registry.handler_names(), "Callback handlers registered");
        let dispatcher =
            CallbackDispatcher::with_options(Arc::new(registry), cfg.dispatch_options());

        let notifications = notifications_processor(&cfg)?;
        let consumer = Arc::new(TopicConsumer::new(
            dispatcher.clone(),
            notifications,
            cfg.retry_policy(),
        ));

        let (shutdown, shutdown_rx) = watch::channel(false);
        let mut listeners = Vec::new();

        let (case_events, source) = ChannelMessageSource::channel(cfg.listener.queue_capacity);
        let listener =
            QueueListener::new("case-events", source, consumer, cfg.listener.concurrency);
        listeners.push(tokio::spawn(listener.run(shutdown_rx.clone())));

        let case_store = Arc::new(InMemoryCaseStore::new());
        let hearing_listener = Arc::new(
            HearingUpdateListener::new(case_store.clone()).with_pending_requests(pending),
        );
        let (hearing_updates, source) =
            ChannelMessageSource::channel(cfg.listener.queue_capacity);
        let listener = QueueListener::new(
            "hearing-updates",
            source,
            hearing_listener,
            cfg.listener.concurrency,
        );
        listeners.push(tokio::spawn(listener.run(shutdown_rx)));

        let app = build_app(&cfg, AppState { dispatcher });

        Ok(TribunalServer {
            addr: cfg.addr(),
            app,
            case_events,
            hearing_updates,
            case_store,
            shutdown,
            listeners,
            sinks,
        })
    }
}

fn notifications_processor(
    cfg: &AppConfig,
) -> anyhow::Result<Arc<dyn NotificationsMessageProcessor>> {
    let settings = &cfg.notifications;
    let Some(url) = settings.url.as_deref().filter(|_| settings.enabled) else {
        return Ok(Arc::new(DisabledNotifications));
    };

    let mut webhook =
        WebhookConfig::new(url).with_timeout(Duration::from_millis(settings.timeout_ms));
    if let Some(secret) = &settings.secret {
        webhook = webhook.with_secret(secret);
    }
    for (name, value) in &settings.headers {
        webhook = webhook.with_header(name, value);
    }
    Ok(Arc::new(WebhookForwarder::new(webhook)?))
}

// Local end of the hearing request partitions; logs each delivery in order.
fn spawn_partition_sinks(receivers: Vec<mpsc::Receiver<SessionMessage>>) -> Vec<JoinHandle<()>> {
    receivers
        .into_iter()
        .enumerate()
        .map(|(partition, mut rx)| {
            tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    info!(partition, session_id = %message.session_id, "Hearing request delivered");
                }
            })
        })
        .collect()
}

impl TribunalServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Inbound case-event queue.
    pub fn case_events(&self) -> mpsc::Sender<QueueMessage> {
        self.case_events.clone()
    }

    /// Inbound scheduling-system update queue.
    pub fn hearing_updates(&self) -> mpsc::Sender<QueueMessage> {
        self.hearing_updates.clone()
    }

    pub fn case_store(&self) -> Arc<InMemoryCaseStore> {
        self.case_store.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        let _ = self.shutdown.send(true);
        for handle in self.listeners {
            let _ = handle.await;
        }
        for handle in self.sinks {
            handle.abort();
        }
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
