//! Wire protocol for the racetrack server.
//!
//! - **Model** ([`RaceSession`], [`Driver`], [`LapRecord`], [`StateSnapshot`], …):
//!   the race data every station renders, exactly as it is serialized.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): named events with a
//!   structured payload, framed as `{"event": "<name>", "data": {...}}`.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): events to bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Race control (state)
//! ```

mod codec;
mod error;
mod events;
mod model;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use events::{
    AddDriver, Authenticate, ClientEvent, DeleteSession, EditDriver, RecordLap, RemoveDriver,
    ServerEvent, SetMode,
};
pub use model::{
    CarNumber, Driver, LapRecord, RaceMode, RaceSession, Role, SessionId, SessionStatus,
    StateSnapshot, Timestamp,
};
