//! The supervisor loop. Blocks on the transport with a short timeout so
//! timer work (poll tick, keepalive) and reload requests interleave
//! cooperatively with message dispatch.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use quip_config::QuipConfig;
use quip_core::text::sanitize_outbound;
use quip_core::{Reply, Result};
use quip_scripts::ScriptRegistry;
use quip_transport::{Transport, TransportEvent};

/// How long one wait on the transport may block before timers get a turn.
const EVENT_TIMEOUT: Duration = Duration::from_millis(200);
/// Period of the script poll tick.
const POLL_PERIOD: Duration = Duration::from_secs(1);

/// Schedules a config reload on the supervisor loop. SIGHUP goes through
/// one of these; callers embedding the supervisor can hold their own.
#[derive(Clone)]
pub struct ReloadHandle(Arc<AtomicBool>);

impl ReloadHandle {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Drives one chat session end to end: connect, join, dispatch, keepalive,
/// and reconnect. `run` returns once the session is over for good — either
/// reconnecting is disabled or the attempt budget ran out.
pub struct ConnectionSupervisor<T> {
    transport: T,
    registry: ScriptRegistry,
    config: QuipConfig,
    config_path: Option<PathBuf>,
    reload_requested: Arc<AtomicBool>,
    connected: bool,
    unanswered_pings: u32,
    attempts_left: u32,
}

impl<T: Transport> ConnectionSupervisor<T> {
    pub fn new(
        transport: T,
        registry: ScriptRegistry,
        config: QuipConfig,
        config_path: Option<PathBuf>,
    ) -> Self {
        let attempts_left = config.connect.reconnect_attempts;
        Self {
            transport,
            registry,
            config,
            config_path,
            reload_requested: Arc::new(AtomicBool::new(false)),
            connected: false,
            unanswered_pings: 0,
            attempts_left,
        }
    }

    /// A handle that requests a reload, valid before and after `run` starts.
    pub fn reload_handle(&self) -> ReloadHandle {
        ReloadHandle(Arc::clone(&self.reload_requested))
    }

    /// Run the session to completion. The initial connect failing is fatal;
    /// disconnects after that go through the reconnect policy.
    pub async fn run(mut self) -> Result<()> {
        self.install_reload_handler();
        self.transport.connect().await?;

        let mut next_poll = Instant::now() + POLL_PERIOD;
        let mut next_ping = Instant::now() + self.ping_period();

        loop {
            match timeout(EVENT_TIMEOUT, self.transport.next_event()).await {
                Ok(event) => {
                    if !self.handle_event(event).await {
                        info!("session over, supervisor stopping");
                        return Ok(());
                    }
                    if !self.connected {
                        // Fresh link: hold the timers until the next welcome.
                        next_poll = Instant::now() + POLL_PERIOD;
                        next_ping = Instant::now() + self.ping_period();
                    }
                }
                Err(_elapsed) => {}
            }

            if self.reload_requested.swap(false, Ordering::SeqCst) {
                self.reload();
            }

            let now = Instant::now();
            if self.connected && now >= next_poll {
                next_poll = now + POLL_PERIOD;
                self.poll_channels().await;
            }
            if self.connected && now >= next_ping {
                next_ping = now + self.ping_period();
                if !self.keepalive().await {
                    // Link declared dead; route through the reconnect policy.
                    let _ = self.transport.disconnect().await;
                    if !self.handle_disconnect().await {
                        info!("session over, supervisor stopping");
                        return Ok(());
                    }
                    next_poll = Instant::now() + POLL_PERIOD;
                    next_ping = Instant::now() + self.ping_period();
                }
            }
        }
    }

    fn ping_period(&self) -> Duration {
        Duration::from_secs(self.config.connect.ping_interval.max(1))
    }

    /// React to one transport event. Returns `false` when the supervisor
    /// should stop.
    async fn handle_event(&mut self, event: Option<TransportEvent>) -> bool {
        match event {
            Some(TransportEvent::Welcome) => {
                info!("session established");
                self.connected = true;
                self.unanswered_pings = 0;
                self.attempts_left = self.config.connect.reconnect_attempts;
                for channel in self.config.connect.channels.clone() {
                    if let Err(e) = self.transport.join(&channel).await {
                        warn!(channel = %channel, error = %e, "join failed");
                    }
                }
                true
            }
            Some(TransportEvent::Message {
                sender,
                channel,
                text,
            }) => {
                let replies = self
                    .registry
                    .dispatch_message(&sender, &channel, &text)
                    .await;
                for reply in replies {
                    self.send(&channel, reply).await;
                }
                true
            }
            Some(TransportEvent::Pong) => {
                debug!("keepalive answered");
                self.unanswered_pings = 0;
                true
            }
            Some(TransportEvent::Disconnected(reason)) => {
                warn!(reason = ?reason, "link dropped");
                self.handle_disconnect().await
            }
            None => {
                warn!("transport closed");
                self.handle_disconnect().await
            }
        }
    }

    /// Reconnect policy: a fixed delay between attempts and a bounded attempt
    /// count, replenished only by a successful welcome. Returns `false` when
    /// the session is over for good.
    async fn handle_disconnect(&mut self) -> bool {
        self.connected = false;
        self.unanswered_pings = 0;
        if !self.config.connect.reconnect {
            return false;
        }
        while self.attempts_left > 0 {
            self.attempts_left -= 1;
            let delay = Duration::from_secs(self.config.connect.reconnect_interval);
            info!(delay_secs = delay.as_secs(), "reconnecting");
            sleep(delay).await;
            match self.transport.connect().await {
                Ok(()) => return true,
                Err(e) => warn!(error = %e, "reconnect attempt failed"),
            }
        }
        error!("reconnect attempts exhausted");
        false
    }

    /// One keepalive tick: count the probe, send it, and report whether the
    /// link is still considered alive.
    async fn keepalive(&mut self) -> bool {
        self.unanswered_pings += 1;
        if self.unanswered_pings > self.config.connect.ping_limit {
            warn!(
                unanswered = self.unanswered_pings,
                "keepalive limit exceeded"
            );
            return false;
        }
        if let Err(e) = self.transport.ping().await {
            warn!(error = %e, "keepalive send failed");
        }
        true
    }

    /// Give every script its periodic turn on every configured channel.
    async fn poll_channels(&mut self) {
        for channel in self.config.connect.channels.clone() {
            let replies = self.registry.dispatch_poll(&channel).await;
            for reply in replies {
                self.send(&channel, reply).await;
            }
        }
    }

    /// Deliver a reply, one sanitized line at a time.
    async fn send(&mut self, channel: &str, reply: Reply) {
        for line in reply.into_lines() {
            let line = sanitize_outbound(&line);
            if let Err(e) = self.transport.send_message(channel, &line).await {
                warn!(channel, error = %e, "send failed");
            }
        }
    }

    /// Re-read the config and rebuild the registry wholesale. On any failure
    /// the running config and scripts stay as they are.
    fn reload(&mut self) {
        let Some(path) = self.config_path.clone() else {
            info!("reload requested but no config path is set, rebuilding scripts");
            self.registry = ScriptRegistry::load(&self.config.scripts);
            return;
        };
        match quip_config::reload(&path).and_then(|c| c.validate().map(|_| c)) {
            Ok(fresh) => {
                info!(config_path = %path.display(), "configuration reloaded");
                self.config = fresh;
                self.registry = ScriptRegistry::load(&self.config.scripts);
            }
            Err(e) => {
                warn!(error = %e, "reload failed, keeping the running configuration");
            }
        }
    }

    #[cfg(unix)]
    fn install_reload_handler(&self) {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::hangup()) {
            Ok(mut stream) => {
                let handle = self.reload_handle();
                tokio::spawn(async move {
                    while stream.recv().await.is_some() {
                        info!("SIGHUP received, scheduling a reload");
                        handle.request();
                    }
                });
            }
            Err(e) => warn!(error = %e, "SIGHUP handler unavailable"),
        }
    }

    #[cfg(not(unix))]
    fn install_reload_handler(&self) {}
}
