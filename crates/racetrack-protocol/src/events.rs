//! Named events exchanged between stations and race control.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": <payload>}`.
//! Events without a payload may omit `data` or send `{}` / `null`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{CarNumber, ProtocolError, Role, SessionId, StateSnapshot};

// ---------------------------------------------------------------------------
// Client → server payloads
// ---------------------------------------------------------------------------

/// `authenticate{interface, key}`.
///
/// `interface` stays a string so an unknown name can be answered with
/// "unknown interface" instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authenticate {
    pub interface: String,
    pub key: String,
}

/// `delete-session{sessionId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSession {
    pub session_id: SessionId,
}

/// `add-driver{sessionId, name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDriver {
    pub session_id: SessionId,
    #[serde(default)]
    pub name: String,
}

/// `remove-driver{sessionId, carNumber}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveDriver {
    pub session_id: SessionId,
    pub car_number: CarNumber,
}

/// `edit-driver{sessionId, carNumber, name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditDriver {
    pub session_id: SessionId,
    pub car_number: CarNumber,
    #[serde(default)]
    pub name: String,
}

/// `set-mode{mode}`. The mode is validated by race control, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetMode {
    pub mode: String,
}

/// `record-lap{carNumber}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordLap {
    pub car_number: CarNumber,
}

// ---------------------------------------------------------------------------
// ClientEvent
// ---------------------------------------------------------------------------

/// Commands a station can send.
///
/// Serialization uses the regular adjacently tagged form; decoding goes
/// through [`RawEvent`] so payload-less events tolerate any `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    Authenticate(Authenticate),
    CreateSession,
    DeleteSession(DeleteSession),
    AddDriver(AddDriver),
    RemoveDriver(RemoveDriver),
    EditDriver(EditDriver),
    StartRace,
    SetMode(SetMode),
    EndSession,
    RecordLap(RecordLap),
}

impl ClientEvent {
    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Authenticate(_) => "authenticate",
            ClientEvent::CreateSession => "create-session",
            ClientEvent::DeleteSession(_) => "delete-session",
            ClientEvent::AddDriver(_) => "add-driver",
            ClientEvent::RemoveDriver(_) => "remove-driver",
            ClientEvent::EditDriver(_) => "edit-driver",
            ClientEvent::StartRace => "start-race",
            ClientEvent::SetMode(_) => "set-mode",
            ClientEvent::EndSession => "end-session",
            ClientEvent::RecordLap(_) => "record-lap",
        }
    }

    /// The role a connection must hold to issue this event.
    ///
    /// `None` for `authenticate`, which anyone may send.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            ClientEvent::Authenticate(_) => None,
            ClientEvent::CreateSession
            | ClientEvent::DeleteSession(_)
            | ClientEvent::AddDriver(_)
            | ClientEvent::RemoveDriver(_)
            | ClientEvent::EditDriver(_) => Some(Role::FrontDesk),
            ClientEvent::StartRace | ClientEvent::SetMode(_) | ClientEvent::EndSession => {
                Some(Role::RaceControl)
            }
            ClientEvent::RecordLap(_) => Some(Role::LapLineTracker),
        }
    }
}

/// Loosely typed frame used to decode [`ClientEvent`].
#[derive(Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl TryFrom<RawEvent> for ClientEvent {
    type Error = ProtocolError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        fn payload<T: DeserializeOwned>(
            event: &str,
            data: serde_json::Value,
        ) -> Result<T, ProtocolError> {
            serde_json::from_value(data).map_err(|source| ProtocolError::InvalidPayload {
                event: event.to_owned(),
                source,
            })
        }

        let RawEvent { event, data } = raw;
        Ok(match event.as_str() {
            "authenticate" => ClientEvent::Authenticate(payload(&event, data)?),
            "create-session" => ClientEvent::CreateSession,
            "delete-session" => ClientEvent::DeleteSession(payload(&event, data)?),
            "add-driver" => ClientEvent::AddDriver(payload(&event, data)?),
            "remove-driver" => ClientEvent::RemoveDriver(payload(&event, data)?),
            "edit-driver" => ClientEvent::EditDriver(payload(&event, data)?),
            "start-race" => ClientEvent::StartRace,
            "set-mode" => ClientEvent::SetMode(payload(&event, data)?),
            "end-session" => ClientEvent::EndSession,
            "record-lap" => ClientEvent::RecordLap(payload(&event, data)?),
            _ => return Err(ProtocolError::UnknownEvent(event.clone())),
        })
    }
}

impl<'de> Deserialize<'de> for ClientEvent {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEvent::deserialize(deserializer)?;
        ClientEvent::try_from(raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Events pushed from race control to stations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// The connection now holds `interface`.
    AuthSuccess { interface: Role },
    /// Authentication was refused.
    AuthFailure { message: String },
    /// Full snapshot; sent on connect and after every mutation.
    StateUpdate(StateSnapshot),
    /// Countdown progress, once per tick while a race is running.
    TimerTick { remaining: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RaceSession;

    fn decode(json: &str) -> Result<ClientEvent, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_decode_authenticate() {
        let event =
            decode(r#"{"event":"authenticate","data":{"interface":"front-desk","key":"k"}}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::Authenticate(Authenticate {
                interface: "front-desk".into(),
                key: "k".into(),
            })
        );
    }

    #[test]
    fn test_decode_payloadless_events_accept_any_data_shape() {
        // socket.io clients emit these with no payload; others send {}.
        assert_eq!(decode(r#"{"event":"create-session"}"#).unwrap(), ClientEvent::CreateSession);
        assert_eq!(decode(r#"{"event":"start-race","data":{}}"#).unwrap(), ClientEvent::StartRace);
        assert_eq!(decode(r#"{"event":"end-session","data":null}"#).unwrap(), ClientEvent::EndSession);
    }

    #[test]
    fn test_decode_camel_case_fields() {
        let event =
            decode(r#"{"event":"edit-driver","data":{"sessionId":4,"carNumber":2,"name":"Bea"}}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::EditDriver(EditDriver {
                session_id: SessionId(4),
                car_number: CarNumber(2),
                name: "Bea".into(),
            })
        );
    }

    #[test]
    fn test_decode_add_driver_without_name_defaults_to_empty() {
        let event = decode(r#"{"event":"add-driver","data":{"sessionId":1}}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::AddDriver(AddDriver {
                session_id: SessionId(1),
                name: String::new(),
            })
        );
    }

    #[test]
    fn test_decode_unknown_event_fails() {
        let err = decode(r#"{"event":"launch-fireworks","data":{}}"#).unwrap_err();
        assert!(err.to_string().contains("launch-fireworks"));
    }

    #[test]
    fn test_decode_missing_payload_fails() {
        assert!(decode(r#"{"event":"record-lap"}"#).is_err());
        assert!(decode(r#"{"event":"record-lap","data":{"carNumber":"one"}}"#).is_err());
        assert!(decode(r#"{"event":"record-lap","data":{"carNumber":-1}}"#).is_err());
    }

    #[test]
    fn test_encoded_client_event_decodes_again() {
        let events = [
            ClientEvent::CreateSession,
            ClientEvent::SetMode(SetMode {
                mode: "hazard".into(),
            }),
            ClientEvent::RecordLap(RecordLap {
                car_number: CarNumber(5),
            }),
        ];
        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(decode(&json).unwrap(), event, "frame: {json}");
        }
    }

    #[test]
    fn test_required_roles() {
        assert_eq!(
            ClientEvent::Authenticate(Authenticate {
                interface: "race-control".into(),
                key: String::new(),
            })
            .required_role(),
            None
        );
        assert_eq!(ClientEvent::CreateSession.required_role(), Some(Role::FrontDesk));
        assert_eq!(ClientEvent::StartRace.required_role(), Some(Role::RaceControl));
        assert_eq!(
            ClientEvent::RecordLap(RecordLap {
                car_number: CarNumber(1),
            })
            .required_role(),
            Some(Role::LapLineTracker)
        );
    }

    #[test]
    fn test_server_event_json_shapes() {
        let json = serde_json::to_value(ServerEvent::AuthSuccess {
            interface: Role::RaceControl,
        })
        .unwrap();
        assert_eq!(json["event"], "auth-success");
        assert_eq!(json["data"]["interface"], "race-control");

        let json = serde_json::to_value(ServerEvent::TimerTick { remaining: 59_000 }).unwrap();
        assert_eq!(json["event"], "timer-tick");
        assert_eq!(json["data"]["remaining"], 59_000);

        let json = serde_json::to_value(ServerEvent::StateUpdate(StateSnapshot {
            sessions: vec![RaceSession::upcoming(SessionId(1))],
            last_finished_session: None,
            race_time_remaining: None,
        }))
        .unwrap();
        assert_eq!(json["event"], "state-update");
        assert_eq!(json["data"]["sessions"][0]["id"], 1);
        assert!(json["data"]["raceTimeRemaining"].is_null());
    }
}
