//! Wire messages exchanged over the bus.

use std::time::Duration;

use brain_defense_core::{MatchSnapshot, Role, TowerId, TowerKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every message the game publishes, tagged by its `type` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Message {
    /// Presence beacon of a player searching for a match.
    Lfg {
        /// Searching player.
        sender: String,
        /// Level the player wants to play.
        level: u32,
    },
    /// Match proposal addressed to one discovered player.
    MatchOffer {
        /// Player the offer is addressed to.
        target: String,
        /// Offering player, who becomes host.
        sender: String,
        /// Topic of the proposed match.
        match_id: String,
        /// Level to play.
        level: u32,
        /// Shared seed.
        seed: u64,
    },
    /// Invited friend agrees to play.
    MatchAccept {
        /// Accepting player.
        sender: String,
        /// Level named in the invitation.
        level: u32,
        /// Levels the accepting player has completed.
        #[serde(default)]
        completed_levels: Vec<u32>,
    },
    /// Invited friend declines.
    MatchReject {
        /// Declining player.
        sender: String,
    },
    /// Host commits to a level and publishes the shared seed.
    HostStartConfirm {
        /// Shared seed.
        seed: u64,
        /// Level to play.
        level: u32,
    },
    /// Invitation delivered to a friend's mailbox.
    GameInvite {
        /// Inviting player.
        sender: String,
        /// Topic of the proposed match.
        match_id: String,
        /// Suggested level.
        #[serde(default = "first_level")]
        level: u32,
    },
    /// Friend request delivered to the target's mailbox.
    FriendRequest {
        /// Requesting player.
        sender: String,
    },
    /// Notice that a friend request was accepted.
    FriendAccepted {
        /// Accepting player.
        sender: String,
    },
    /// Notice that a friend request was declined.
    FriendRejected {
        /// Declining player.
        sender: String,
    },
    /// Replicated tower placement in normalized coordinates.
    TowerPlaced {
        /// Role of the placing participant.
        role: Role,
        /// Horizontal position as a fraction of the viewport width.
        nx: f32,
        /// Vertical position as a fraction of the viewport height.
        ny: f32,
        /// Instance identifier assigned by the placing participant.
        id: TowerId,
        /// Kind of tower placed.
        config_id: TowerKind,
    },
    /// Host announces that a wave started.
    StartWave {
        /// Role of the announcing participant.
        role: Role,
        /// Index of the started wave.
        wave_index: u32,
    },
    /// Request for a full state catch-up.
    SyncRequest {
        /// Role of the requesting participant.
        role: Role,
    },
    /// Full match state sent in response to a catch-up request.
    SyncData {
        /// Role of the responding participant.
        role: Role,
        /// Complete match state.
        state: Box<MatchSnapshot>,
    },
    /// Proposal to abandon the match.
    VoteSurrenderRequest {
        /// Role of the proposing participant.
        role: Role,
    },
    /// Agreement to abandon the match.
    VoteSurrenderAccept {
        /// Role of the agreeing participant.
        role: Role,
    },
    /// Refusal to abandon the match.
    VoteSurrenderDeny {
        /// Role of the refusing participant.
        role: Role,
    },
}

const fn first_level() -> u32 {
    1
}

/// Origin tag used to suppress a participant's own messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin<'a> {
    /// In-match message tagged with the sender's role.
    Role(Role),
    /// Lobby or mailbox message tagged with the sender's player id.
    Player(&'a str),
    /// Message carrying no origin tag.
    Anonymous,
}

impl Message {
    /// Decodes a bus payload.
    ///
    /// Payloads that were JSON-encoded twice (a JSON string holding the
    /// message) are unwrapped once.
    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Value>(payload)? {
            Value::String(inner) => serde_json::from_str(&inner),
            value => serde_json::from_value(value),
        }
    }

    /// Encodes the message as a bus payload.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Returns the origin tag carried by the message.
    #[must_use]
    pub fn origin(&self) -> Origin<'_> {
        match self {
            Self::Lfg { sender, .. }
            | Self::MatchOffer { sender, .. }
            | Self::MatchAccept { sender, .. }
            | Self::MatchReject { sender }
            | Self::GameInvite { sender, .. }
            | Self::FriendRequest { sender }
            | Self::FriendAccepted { sender }
            | Self::FriendRejected { sender } => Origin::Player(sender),
            Self::TowerPlaced { role, .. }
            | Self::StartWave { role, .. }
            | Self::SyncRequest { role }
            | Self::SyncData { role, .. }
            | Self::VoteSurrenderRequest { role }
            | Self::VoteSurrenderAccept { role }
            | Self::VoteSurrenderDeny { role } => Origin::Role(*role),
            Self::HostStartConfirm { .. } => Origin::Anonymous,
        }
    }

    /// Reports whether the message originates from the given role.
    #[must_use]
    pub fn is_from_role(&self, role: Role) -> bool {
        self.origin() == Origin::Role(role)
    }

    /// Reports whether the message originates from the given player.
    #[must_use]
    pub fn is_from_player(&self, player: &str) -> bool {
        self.origin() == Origin::Player(player)
    }
}

/// One line of a direct conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    /// Author of the line.
    pub sender: String,
    /// Trimmed text.
    pub text: String,
    /// Milliseconds since the Unix epoch at which the line was written.
    pub timestamp: u64,
}

/// Body of an outbound publication.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Tagged game message.
    Message(Message),
    /// Untagged chat line.
    Chat(ChatLine),
}

impl Payload {
    /// Encodes the payload for publication.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Message(message) => message.encode(),
            Self::Chat(line) => serde_json::to_string(line),
        }
    }
}

/// A publication requested by a sync component.
#[derive(Clone, Debug, PartialEq)]
pub struct Outbound {
    /// Topic to publish on.
    pub topic: String,
    /// Body to publish.
    pub payload: Payload,
    /// Delay before publishing, used for resends.
    pub delay: Duration,
}

impl Outbound {
    /// Publication of `message` on `topic` without delay.
    #[must_use]
    pub fn now(topic: impl Into<String>, message: Message) -> Self {
        Self {
            topic: topic.into(),
            payload: Payload::Message(message),
            delay: Duration::ZERO,
        }
    }

    /// Publication of `message` on `topic` after `delay`.
    #[must_use]
    pub fn after(topic: impl Into<String>, message: Message, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::now(topic, message)
        }
    }

    /// Returns the carried message, if the payload is one.
    #[must_use]
    pub fn message(&self) -> Option<&Message> {
        match &self.payload {
            Payload::Message(message) => Some(message),
            Payload::Chat(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_follow_deployed_protocol() {
        let encoded = Message::StartWave {
            role: Role::Host,
            wave_index: 2,
        }
        .encode()
        .expect("encode");
        assert_eq!(encoded, r#"{"type":"START_WAVE","role":"HOST","waveIndex":2}"#);
    }

    #[test]
    fn decodes_deployed_offer() {
        let payload = r#"{"type":"MATCH_OFFER","target":"BO_2","sender":"ZED_9","matchId":"bd_match_ZED_9_BO_2_5","level":1,"seed":77}"#;
        assert_eq!(
            Message::decode(payload).expect("decode"),
            Message::MatchOffer {
                target: "BO_2".into(),
                sender: "ZED_9".into(),
                match_id: "bd_match_ZED_9_BO_2_5".into(),
                level: 1,
                seed: 77,
            }
        );
    }

    #[test]
    fn unwraps_double_encoded_payloads() {
        let inner = r#"{"type":"SYNC_REQUEST","role":"CLIENT"}"#;
        let outer = serde_json::to_string(inner).expect("encode");
        assert_eq!(
            Message::decode(&outer).expect("decode"),
            Message::SyncRequest { role: Role::Client }
        );
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(Message::decode("not json").is_err());
        assert!(Message::decode(r#"{"type":"UNKNOWN"}"#).is_err());
        assert!(Message::decode(r#"{"type":"START_WAVE","role":"HOST"}"#).is_err());
    }

    #[test]
    fn invite_level_defaults_to_one() {
        let message =
            Message::decode(r#"{"type":"GAME_INVITE","sender":"A_1","matchId":"m"}"#).expect("decode");
        assert!(matches!(message, Message::GameInvite { level: 1, .. }));
    }

    #[test]
    fn origin_distinguishes_roles_and_players() {
        let placed = Message::SyncRequest { role: Role::Host };
        assert!(placed.is_from_role(Role::Host));
        assert!(!placed.is_from_role(Role::Client));

        let beacon = Message::Lfg {
            sender: "ANA_1".into(),
            level: 1,
        };
        assert!(beacon.is_from_player("ANA_1"));
        assert_eq!(
            Message::HostStartConfirm { seed: 1, level: 1 }.origin(),
            Origin::Anonymous
        );
    }
}
