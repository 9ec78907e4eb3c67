use brain_defense_core::Role;
use brain_defense_system_sync::{
    HostState, InviteGuest, InviteHost, Mailbox, MailboxNotice, MatchEntropy, Matchmaker, Message,
    Outbound, Topics,
};

const ENTROPY: MatchEntropy = MatchEntropy {
    nonce: 1_700_000_000_000,
    seed: 1_700_000_000_001,
};

fn message(outbound: &Outbound) -> Message {
    outbound.message().cloned().expect("game message")
}

#[test]
fn searchers_agree_on_a_single_host() {
    for (first, second) in [("ALPHA_1", "BETA_2"), ("BETA_2", "ALPHA_1")] {
        let mut a = Matchmaker::new(first, 1, Topics::default());
        let mut b = Matchmaker::new(second, 1, Topics::default());
        let beacon_a = message(&a.announce());
        let beacon_b = message(&b.announce());

        let mut lobby = Vec::new();
        let found_a = a.receive(&beacon_b, ENTROPY, &mut lobby);
        let found_b = b.receive(&beacon_a, ENTROPY, &mut lobby);
        assert_eq!(lobby.len(), 1, "exactly one offer per pair");
        let offer = message(&lobby[0]);

        let (host, client) = match (found_a, found_b) {
            (Some(host), None) => (host, b.receive(&offer, ENTROPY, &mut lobby)),
            (None, Some(host)) => (host, a.receive(&offer, ENTROPY, &mut lobby)),
            other => panic!("expected exactly one host, got {other:?}"),
        };
        let client = client.expect("offer accepted");

        assert_eq!(host.descriptor.peer.as_deref(), Some("ALPHA_1"));
        assert_eq!(host.descriptor.role, Role::Host);
        assert_eq!(client.descriptor.role, Role::Client);
        assert_eq!(client.descriptor.peer.as_deref(), Some("BETA_2"));
        assert_eq!(client.descriptor.match_topic, host.descriptor.match_topic);
        assert_eq!(client.descriptor.seed, ENTROPY.seed);
        assert!(a.is_finished() && b.is_finished());
    }
}

#[test]
fn own_beacons_and_other_levels_are_ignored() {
    let mut matchmaker = Matchmaker::new("ZED_9", 1, Topics::default());
    let own = message(&matchmaker.announce());
    let mut out = Vec::new();
    assert_eq!(matchmaker.receive(&own, ENTROPY, &mut out), None);
    let elsewhere = Message::Lfg {
        sender: "AMY_1".into(),
        level: 2,
    };
    assert_eq!(matchmaker.receive(&elsewhere, ENTROPY, &mut out), None);
    assert!(out.is_empty());
}

#[test]
fn offers_for_someone_else_are_ignored() {
    let mut matchmaker = Matchmaker::new("AMY_1", 1, Topics::default());
    let offer = Message::MatchOffer {
        target: "BOB_2".into(),
        sender: "ZED_9".into(),
        match_id: "bd_match_ZED_9_BOB_2_1".into(),
        level: 1,
        seed: 3,
    };
    let mut out = Vec::new();
    assert_eq!(matchmaker.receive(&offer, ENTROPY, &mut out), None);
    assert!(!matchmaker.is_finished());
}

#[test]
fn friend_invite_handshake() {
    let topics = Topics::default();
    let (mut host, invite) = InviteHost::invite("ANA_1", "BO_2", &topics, ENTROPY);

    let mut mailbox = Mailbox::new("BO_2", topics.clone(), vec!["ANA_1".into()], Vec::new());
    assert_eq!(invite.topic, mailbox.topic());
    let Some(MailboxNotice::GameInvite(pending)) = mailbox.receive(&message(&invite)) else {
        panic!("invite not surfaced");
    };

    let (mut guest, accept) = InviteGuest::accept("BO_2", pending, &[1]);
    assert_eq!(accept.topic, host.match_topic());
    assert!(host.receive(&message(&accept)));
    assert_eq!(
        host.state(),
        &HostState::Accepted {
            guest_completed: vec![1]
        }
    );

    let mut confirmations = Vec::new();
    let host_found = host.start(2, &[1], &mut confirmations).expect("level 2 unlocked");
    let mut guest_found = None;
    for outbound in &confirmations {
        if let Some(found) = guest.receive(&message(outbound)) {
            assert!(guest_found.is_none(), "started twice");
            guest_found = Some(found);
        }
    }
    let guest_found = guest_found.expect("guest started");
    assert_eq!(guest_found.level, 2);
    assert_eq!(guest_found.descriptor.seed, host_found.descriptor.seed);
    assert_eq!(guest_found.descriptor.match_topic, host_found.descriptor.match_topic);
    assert_eq!(guest_found.descriptor.peer.as_deref(), Some("ANA_1"));
}
