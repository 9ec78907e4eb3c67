//! Friends, mailbox and direct chat over the relay.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use brain_defense_relay::{Relay, Since};
use brain_defense_storage::KeyValueStore;
use brain_defense_system_sync::{
    topics::sanitize, ChatLine, Conversation, Mailbox, MailboxNotice, Message, Outbound,
    SeenMessages, Topics,
};
use tracing::{debug, info};

use crate::profile::{Accounts, FriendBook};

/// Social commands of one player.
pub(crate) struct Social<'a, S> {
    relay: &'a dyn Relay,
    accounts: &'a Accounts<S>,
    topics: Topics,
    history: Duration,
}

impl<'a, S: KeyValueStore> Social<'a, S> {
    pub(crate) fn new(
        relay: &'a dyn Relay,
        accounts: &'a Accounts<S>,
        topics: Topics,
        history: Duration,
    ) -> Self {
        Self {
            relay,
            accounts,
            topics,
            history,
        }
    }

    fn me(&self) -> &str {
        self.accounts.player()
    }

    pub(crate) fn mailbox(&self) -> Mailbox {
        self.accounts.friends().mailbox(self.me(), self.topics.clone())
    }

    pub(crate) fn keep(&self, mailbox: &Mailbox) -> Result<()> {
        self.accounts.save_friends(&FriendBook::from_mailbox(mailbox))
    }

    /// Reads the mailbox history, recording requests and answers.
    pub(crate) async fn inbox(&self) -> Result<Vec<MailboxNotice>> {
        let mut mailbox = self.mailbox();
        let topic = mailbox.topic();
        let deliveries = self
            .relay
            .poll(&topic, Since::Window(self.history))
            .await
            .with_context(|| format!("failed to read {topic}"))?;

        let mut seen = SeenMessages::default();
        let mut notices = Vec::new();
        for delivery in deliveries {
            if !seen.first_sighting(&delivery.id) {
                continue;
            }
            match Message::decode(&delivery.payload) {
                Ok(message) => notices.extend(mailbox.receive(&message)),
                Err(error) => debug!(id = %delivery.id, %error, "discarding malformed message"),
            }
        }
        self.keep(&mailbox)?;
        Ok(notices)
    }

    pub(crate) async fn send_request(&self, target: &str) -> Result<()> {
        let target = checked_peer(self.me(), target)?;
        let mailbox = self.mailbox();
        if mailbox.friends().contains(&target) {
            info!(%target, "already friends");
            return Ok(());
        }
        publish(self.relay, mailbox.send_request(&target)).await?;
        info!(%target, "friend request sent");
        Ok(())
    }

    pub(crate) async fn accept(&self, sender: &str) -> Result<()> {
        let sender = sanitize(sender);
        let mut mailbox = self.mailbox();
        if !mailbox.requests().contains(&sender) {
            bail!("no pending request from {sender}; run `friend inbox` first");
        }
        let answer = mailbox.accept_request(&sender);
        self.keep(&mailbox)?;
        publish(self.relay, answer).await
    }

    pub(crate) async fn reject(&self, sender: &str) -> Result<()> {
        let sender = sanitize(sender);
        let mut mailbox = self.mailbox();
        if !mailbox.requests().contains(&sender) {
            bail!("no pending request from {sender}; run `friend inbox` first");
        }
        let answer = mailbox.reject_request(&sender);
        self.keep(&mailbox)?;
        publish(self.relay, answer).await
    }

    pub(crate) fn remove(&self, friend: &str) -> Result<()> {
        let mut mailbox = self.mailbox();
        mailbox.remove_friend(&sanitize(friend));
        self.keep(&mailbox)
    }

    /// Replays the conversation with `friend`, optionally adding a line first.
    pub(crate) async fn chat(&self, friend: &str, text: Option<&str>) -> Result<Vec<ChatLine>> {
        let friend = checked_peer(self.me(), friend)?;
        let mut conversation = Conversation::open(self.me(), &friend, &self.topics);
        let deliveries = self
            .relay
            .poll(conversation.topic(), Since::Window(self.history))
            .await
            .with_context(|| format!("failed to read {}", conversation.topic()))?;
        for delivery in deliveries {
            let _ = conversation.receive(&delivery.payload);
        }

        if let Some(line) = text.and_then(|text| conversation.send(text, unix_millis())) {
            publish(self.relay, line).await?;
        }
        Ok(conversation.lines().to_vec())
    }
}

/// Publishes `outbound` once its delay has passed.
pub(crate) async fn publish(relay: &dyn Relay, outbound: Outbound) -> Result<()> {
    if !outbound.delay.is_zero() {
        tokio::time::sleep(outbound.delay).await;
    }
    let payload = outbound.payload.encode().context("failed to encode message")?;
    relay
        .publish(&outbound.topic, &payload)
        .await
        .with_context(|| format!("failed to publish on {}", outbound.topic))
}

fn checked_peer(me: &str, other: &str) -> Result<String> {
    let other = sanitize(other);
    if other.is_empty() {
        bail!("player ids use letters, digits and underscores");
    }
    if other == me {
        bail!("that is your own id");
    }
    Ok(other)
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}
