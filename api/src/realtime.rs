//! Message protocol of the tournament push channel.
//!
//! Inbound frames are JSON objects tagged by `type`. The only outbound frame is
//! the literal heartbeat text [`HEARTBEAT_FRAME`].

use crate::{MatchId, MatchStatus};
use serde::{Deserialize, Serialize};

pub const HEARTBEAT_FRAME: &str = "ping";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMessage {
    ConnectionInfo {
        #[serde(default)]
        message: String,
        #[serde(default, alias = "clients")]
        connected_clients: u32,
    },
    GameUpdate {
        data: GameUpdate,
    },
    StandingsUpdate,
    Pong,
    #[serde(other)]
    Unknown,
}

/// Partial match payload pushed when another client changes a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameUpdate {
    pub id: MatchId,
    pub points_local: u32,
    pub points_visitor: u32,
    #[serde(with = "status_str")]
    pub status: MatchStatus,
}

/// Backend statuses arrive as strings; anything unrecognised reads as scheduled.
mod status_str {
    use crate::MatchStatus;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(status: &MatchStatus, s: S) -> Result<S::Ok, S::Error> {
        status.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<MatchStatus, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(crate::client::parse_status(&raw))
    }
}

impl SyncMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connection_info() {
        let msg = SyncMessage::parse(
            r#"{"type":"connection_info","message":"Connected to tournament 3","connected_clients":4}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            SyncMessage::ConnectionInfo {
                message: "Connected to tournament 3".into(),
                connected_clients: 4,
            }
        );
    }

    #[test]
    fn parses_game_update_with_lowercase_status() {
        let msg = SyncMessage::parse(
            r#"{"type":"game_update","data":{"id":12,"points_local":55,"points_visitor":49,"status":"in_progress"}}"#,
        )
        .unwrap();
        let SyncMessage::GameUpdate { data } = msg else {
            panic!("expected game_update, got {msg:?}");
        };
        assert_eq!(data.id, 12);
        assert_eq!(data.points_local, 55);
        assert_eq!(data.status, MatchStatus::InProgress);
    }

    #[test]
    fn standings_update_ignores_payload() {
        let msg = SyncMessage::parse(r#"{"type":"standings_update","data":{"anything":true}}"#).unwrap();
        assert_eq!(msg, SyncMessage::StandingsUpdate);
    }

    #[test]
    fn unknown_types_do_not_fail() {
        assert_eq!(SyncMessage::parse(r#"{"type":"chat"}"#).unwrap(), SyncMessage::Unknown);
        assert_eq!(SyncMessage::parse(r#"{"type":"pong"}"#).unwrap(), SyncMessage::Pong);
    }

    #[test]
    fn missing_type_is_an_error() {
        assert!(SyncMessage::parse(r#"{"data":{}}"#).is_err());
    }
}
