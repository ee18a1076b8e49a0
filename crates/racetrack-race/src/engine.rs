//! Race control: the single task that owns all race state.
//!
//! Every command from every station, and every countdown tick, is applied
//! here one at a time. Nothing else holds the registry, so there is no
//! locking; stations talk to the actor through a [`RaceControlHandle`].
//!
//! After each accepted mutation the actor pushes exactly one `state-update`
//! to every connected client. Ticks in between push `timer-tick` only.

use std::collections::BTreeMap;

use racetrack_auth::{AuthGate, Authenticator};
use racetrack_protocol::{
    Authenticate, ClientEvent, RaceMode, ServerEvent, StateSnapshot,
};
use racetrack_tick::{Countdown, Tick};
use racetrack_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{Clock, RaceConfig, RaceError, RaceRegistry};

/// Capacity of the command channel.
const CHANNEL_SIZE: usize = 256;

/// Channel for delivering outbound events to one client.
///
/// Unbounded so the actor never waits on a slow socket; each client's queue
/// preserves the order in which the actor produced events.
pub type ClientSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to the actor through its channel.
enum Command {
    /// Register a client; it receives the current snapshot straight away.
    Connect {
        conn: ConnectionId,
        sender: ClientSender,
        reply: oneshot::Sender<()>,
    },

    /// Forget a client and revoke its role.
    Disconnect { conn: ConnectionId },

    /// An event from a client.
    Submit {
        conn: ConnectionId,
        event: ClientEvent,
    },

    /// Request the snapshot clients would currently see.
    Snapshot {
        reply: oneshot::Sender<StateSnapshot>,
    },

    /// Stop the actor and any running countdown.
    Shutdown,
}

/// Handle to the running race control actor.
///
/// Cheap to clone; every connection handler holds one.
#[derive(Clone)]
pub struct RaceControlHandle {
    sender: mpsc::Sender<Command>,
}

impl RaceControlHandle {
    /// Registers a client.
    ///
    /// Returns once the client is registered and its initial `state-update`
    /// is queued on `sender`.
    pub async fn connect(&self, conn: ConnectionId, sender: ClientSender) -> Result<(), RaceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Connect {
            conn,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RaceError::Unavailable)
    }

    /// Unregisters a client and drops any role it held.
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), RaceError> {
        self.send(Command::Disconnect { conn }).await
    }

    /// Hands a client event to race control (fire-and-forget).
    ///
    /// Whether it is accepted shows up only as a broadcast, or not at all.
    pub async fn submit(&self, conn: ConnectionId, event: ClientEvent) -> Result<(), RaceError> {
        self.send(Command::Submit { conn, event }).await
    }

    /// The snapshot a newly connecting client would receive.
    pub async fn snapshot(&self) -> Result<StateSnapshot, RaceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RaceError::Unavailable)
    }

    /// Tells the actor to stop.
    pub async fn shutdown(&self) -> Result<(), RaceError> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, cmd: Command) -> Result<(), RaceError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RaceError::Unavailable)
    }
}

/// The actor state. Runs inside a Tokio task.
struct RaceControl {
    registry: RaceRegistry,
    gate: AuthGate,
    countdown: Countdown,
    config: RaceConfig,
    clients: BTreeMap<ConnectionId, ClientSender>,
    clock: Box<dyn Clock>,
    receiver: mpsc::Receiver<Command>,
}

impl RaceControl {
    /// Processes commands and ticks until shutdown or until every handle
    /// is dropped.
    async fn run(mut self) {
        tracing::info!(race_ms = as_millis(self.config), "race control started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                tick = self.countdown.wait_for_tick() => self.handle_tick(tick),
            }
        }

        self.countdown.cancel();
        tracing::info!(clients = self.clients.len(), "race control stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect {
                conn,
                sender,
                reply,
            } => {
                let _ = sender.send(ServerEvent::StateUpdate(self.snapshot()));
                self.clients.insert(conn, sender);
                tracing::debug!(%conn, clients = self.clients.len(), "client connected");
                let _ = reply.send(());
            }
            Command::Disconnect { conn } => {
                self.clients.remove(&conn);
                self.gate.revoke(conn);
                tracing::debug!(%conn, clients = self.clients.len(), "client disconnected");
            }
            Command::Submit { conn, event } => self.handle_event(conn, event),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    fn handle_event(&mut self, conn: ConnectionId, event: ClientEvent) {
        let name = event.name();
        let result = match event {
            ClientEvent::Authenticate(auth) => {
                self.authenticate(conn, auth);
                return;
            }
            command => self
                .authorize(conn, &command)
                .and_then(|()| self.apply(command)),
        };

        match result {
            Ok(()) => self.broadcast_state(),
            Err(err) => tracing::debug!(%conn, event = name, %err, "command dropped"),
        }
    }

    /// Answers `authenticate`. Success is immediate; failure may be held
    /// back without stalling the actor.
    fn authenticate(&mut self, conn: ConnectionId, auth: Authenticate) {
        let err = match self.gate.authenticate(conn, &auth.interface, &auth.key) {
            Ok(role) => {
                self.send_to(conn, ServerEvent::AuthSuccess { interface: role });
                return;
            }
            Err(err) => err,
        };

        tracing::debug!(%conn, %err, "authentication refused");
        let Some(sender) = self.clients.get(&conn).cloned() else {
            return;
        };
        let event = ServerEvent::AuthFailure {
            message: err.client_message().to_owned(),
        };
        let delay = err.response_delay();
        if delay.is_zero() {
            let _ = sender.send(event);
        } else {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = sender.send(event);
            });
        }
    }

    fn authorize(&self, conn: ConnectionId, event: &ClientEvent) -> Result<(), RaceError> {
        match event.required_role() {
            Some(required) if !self.gate.is_authorized(conn, required) => {
                Err(RaceError::Forbidden {
                    event: event.name(),
                    required,
                })
            }
            _ => Ok(()),
        }
    }

    /// Applies an authorized command to the registry and the countdown.
    fn apply(&mut self, event: ClientEvent) -> Result<(), RaceError> {
        match event {
            ClientEvent::CreateSession => {
                self.registry.create_session();
            }
            ClientEvent::DeleteSession(p) => self.registry.delete_session(p.session_id)?,
            ClientEvent::AddDriver(p) => {
                self.registry.add_driver(p.session_id, &p.name)?;
            }
            ClientEvent::RemoveDriver(p) => {
                self.registry.remove_driver(p.session_id, p.car_number)?
            }
            ClientEvent::EditDriver(p) => {
                self.registry
                    .edit_driver(p.session_id, p.car_number, &p.name)?
            }
            ClientEvent::StartRace => {
                self.registry.start_race(self.clock.now_ms())?;
                self.countdown.arm(self.config.race_duration);
            }
            ClientEvent::SetMode(p) => {
                let mode: RaceMode = p
                    .mode
                    .parse()
                    .map_err(|_| RaceError::InvalidMode(p.mode))?;
                self.change_mode(mode)?;
            }
            ClientEvent::EndSession => {
                self.registry.end_session()?;
                self.countdown.cancel();
            }
            ClientEvent::RecordLap(p) => {
                self.registry
                    .record_crossing(p.car_number, self.clock.now_ms())?;
            }
            // Answered by `authenticate` before dispatch.
            ClientEvent::Authenticate(_) => {}
        }
        Ok(())
    }

    /// The one path for flag changes, manual or on countdown expiry.
    fn change_mode(&mut self, mode: RaceMode) -> Result<(), RaceError> {
        self.registry.set_mode(mode)?;
        if mode == RaceMode::Finish {
            self.countdown.cancel();
        }
        Ok(())
    }

    fn handle_tick(&mut self, tick: Tick) {
        if !tick.expired {
            self.broadcast(ServerEvent::TimerTick {
                remaining: tick.remaining_ms(),
            });
            return;
        }

        tracing::info!("race time expired");
        match self.change_mode(RaceMode::Finish) {
            Ok(()) => self.broadcast_state(),
            Err(err) => tracing::debug!(%err, "automatic finish skipped"),
        }
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            sessions: self.registry.sessions().to_vec(),
            last_finished_session: self.registry.last_finished().cloned(),
            race_time_remaining: self
                .registry
                .active()
                .map(|_| self.countdown.remaining_ms()),
        }
    }

    fn broadcast_state(&self) {
        self.broadcast(ServerEvent::StateUpdate(self.snapshot()));
    }

    /// Sends `event` to every connected client, authenticated or not.
    fn broadcast(&self, event: ServerEvent) {
        for sender in self.clients.values() {
            let _ = sender.send(event.clone());
        }
    }

    /// Sends to one client. Silently drops if it has gone away.
    fn send_to(&self, conn: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.clients.get(&conn) {
            let _ = sender.send(event);
        }
    }
}

fn as_millis(config: RaceConfig) -> u64 {
    u64::try_from(config.race_duration.as_millis()).unwrap_or(u64::MAX)
}

/// Spawns race control and returns a handle to it.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_race_control(
    config: RaceConfig,
    authenticator: impl Authenticator,
    clock: impl Clock,
) -> RaceControlHandle {
    let (tx, rx) = mpsc::channel(CHANNEL_SIZE);

    let actor = RaceControl {
        registry: RaceRegistry::new(),
        gate: AuthGate::new(authenticator),
        countdown: Countdown::new(config.tick_interval),
        config,
        clients: BTreeMap::new(),
        clock: Box::new(clock),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RaceControlHandle { sender: tx }
}
