//! Topic naming for the pub/sub bus.

/// Namespace prefix used by the deployed game.
pub const DEFAULT_NAMESPACE: &str = "bd";

/// Strips everything but ASCII letters, digits, and underscores, uppercasing letters.
#[must_use]
pub fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// Builds topic strings under a fixed namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    namespace: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl Topics {
    /// Creates a topic builder for `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Public lobby for players searching for a match on `level`.
    #[must_use]
    pub fn lobby(&self, level: u32) -> String {
        format!("{}_lobby_level_{level}_v4", self.namespace)
    }

    /// Signalling topic of a match between `host` and `guest`.
    #[must_use]
    pub fn match_topic(&self, host: &str, guest: &str, nonce: u64) -> String {
        format!(
            "{}_match_{}_{}_{nonce}",
            self.namespace,
            sanitize(host),
            sanitize(guest)
        )
    }

    /// Personal inbox of `player`.
    #[must_use]
    pub fn mailbox(&self, player: &str) -> String {
        format!("{}_mailbox_v2_{}", self.namespace, sanitize(player))
    }

    /// Direct-message topic shared by two players; symmetric in its arguments.
    #[must_use]
    pub fn chat(&self, a: &str, b: &str) -> String {
        let (a, b) = (sanitize(a), sanitize(b));
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        format!("{}_chat_v2_{first}_{second}", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_uppercases_and_strips() {
        assert_eq!(sanitize("neo-Player_42!"), "NEOPLAYER_42");
        assert_eq!(sanitize("çà"), "");
    }

    #[test]
    fn deployed_topic_shapes() {
        let topics = Topics::default();
        assert_eq!(topics.lobby(2), "bd_lobby_level_2_v4");
        assert_eq!(topics.mailbox("ana_1234"), "bd_mailbox_v2_ANA_1234");
        assert_eq!(
            topics.match_topic("ANA_1", "bo_2", 99),
            "bd_match_ANA_1_BO_2_99"
        );
    }

    #[test]
    fn chat_topic_is_symmetric() {
        let topics = Topics::default();
        assert_eq!(topics.chat("ZED_1", "amy_2"), topics.chat("AMY_2", "zed_1"));
        assert_eq!(topics.chat("ZED_1", "AMY_2"), "bd_chat_v2_AMY_2_ZED_1");
    }
}
