//! `RacetrackServer` builder and accept loop.
//!
//! Ties the layers together: WebSocket transport → JSON events → race
//! control.

use std::future::{Future, pending};
use std::net::SocketAddr;
use std::pin::pin;

use racetrack_auth::RoleKeys;
use racetrack_protocol::JsonCodec;
use racetrack_race::{Clock, RaceConfig, RaceControlHandle, SystemClock, spawn_race_control};
use racetrack_transport::{Transport, WebSocketTransport};

use crate::config::{OBSERVER_KEY, RECEPTIONIST_KEY, SAFETY_KEY};
use crate::handler::handle_connection;
use crate::{ConfigError, RacetrackError};

/// Builder for configuring and starting a racetrack server.
///
/// # Example
///
/// ```rust,no_run
/// use racetrack::prelude::*;
///
/// # async fn run() -> Result<(), RacetrackError> {
/// let server = RacetrackServer::builder()
///     .bind("0.0.0.0:3000")
///     .race_config(RaceConfig::dev())
///     .keys(RoleKeys::new("desk", "safety", "observer"))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RacetrackServerBuilder {
    bind_addr: String,
    race_config: RaceConfig,
    keys: Option<RoleKeys>,
    clock: Box<dyn Clock>,
}

impl RacetrackServerBuilder {
    /// Creates a builder with production race settings and no keys.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            race_config: RaceConfig::default(),
            keys: None,
            clock: Box::new(SystemClock),
        }
    }

    /// Sets the address to listen on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the race length and tick interval.
    pub fn race_config(mut self, config: RaceConfig) -> Self {
        self.race_config = config;
        self
    }

    /// Sets the three role secrets. Required.
    pub fn keys(mut self, keys: RoleKeys) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Replaces the wall clock used for start and crossing timestamps.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Binds the listener and starts race control.
    ///
    /// Fails with [`ConfigError::MissingKeys`] if no keys were given.
    pub async fn build(self) -> Result<RacetrackServer, RacetrackError> {
        let keys = self.keys.ok_or_else(|| {
            ConfigError::MissingKeys(vec![RECEPTIONIST_KEY, SAFETY_KEY, OBSERVER_KEY])
        })?;

        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let race = spawn_race_control(self.race_config, keys, self.clock);

        Ok(RacetrackServer {
            transport,
            race,
            codec: JsonCodec,
        })
    }
}

impl Default for RacetrackServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound racetrack server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct RacetrackServer {
    transport: WebSocketTransport,
    race: RaceControlHandle,
    codec: JsonCodec,
}

impl RacetrackServer {
    /// Creates a new builder.
    pub fn builder() -> RacetrackServerBuilder {
        RacetrackServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to race control, e.g. for inspecting state.
    pub fn race_control(&self) -> RaceControlHandle {
        self.race.clone()
    }

    /// Accepts connections until the process is terminated.
    pub async fn run(self) -> Result<(), RacetrackError> {
        self.run_until(pending()).await
    }

    /// Accepts connections until `signal` completes, then stops race
    /// control and any running countdown.
    ///
    /// Connections already open are not closed right away; once race
    /// control has stopped, each handler closes its socket on the next
    /// frame it submits.
    pub async fn run_until(
        mut self,
        signal: impl Future<Output = ()>,
    ) -> Result<(), RacetrackError> {
        tracing::info!(addr = ?self.local_addr().ok(), "racetrack server running");
        let mut signal = pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let race = self.race.clone();
                        let codec = self.codec;
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, race, codec).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        let _ = self.race.shutdown().await;
        Ok(())
    }
}
