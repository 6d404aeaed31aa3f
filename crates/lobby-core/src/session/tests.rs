use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::loopback::{LoopbackLobby, LoopbackPlatform, RecordingOutput};
use lobby_common::OutputHandle;
use lobby_config::DEFAULT_TALK_WINDOW_SECS as WINDOW;

type Session = LobbySession<LoopbackPlatform, RecordingOutput>;

fn uid(n: u64) -> UserId {
    UserId::new(n)
}

fn session(platform: LoopbackPlatform) -> Session {
    LobbySession::new(platform, RecordingOutput::default(), SessionSettings::default())
}

/// Alice (owner) and Bob, both initialized with their inboxes drained.
fn two_sessions() -> (LoopbackLobby, Session, Session) {
    let lobby = LoopbackLobby::create(LobbyId::new(7), "friday night");
    let a = lobby.join(uid(1), "alice");
    let b = lobby.join(uid(2), "bob");

    let mut alice = session(a);
    let mut bob = session(b);
    alice.initialize();
    bob.initialize();
    alice.pump_events();
    bob.pump_events();
    (lobby, alice, bob)
}

#[derive(Default)]
struct Counts {
    data: usize,
    chat: usize,
    light: usize,
    roster: usize,
}

struct CountingObserver(Rc<RefCell<Counts>>);

impl LobbyObserver for CountingObserver {
    fn on_lobby_data_updated(&mut self, _info: &LobbyInfo) {
        self.0.borrow_mut().data += 1;
    }

    fn on_lobby_chat_msg(&mut self, _msg: &ChatMessage) {
        self.0.borrow_mut().chat += 1;
    }

    fn on_light_tick(&mut self, _dt: f32) {
        self.0.borrow_mut().light += 1;
    }

    fn on_roster_changed(&mut self, _delta: &crate::membership::RosterDelta) {
        self.0.borrow_mut().roster += 1;
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn initialize_binds_identity_and_roster() {
    let (_lobby, alice, bob) = two_sessions();

    assert_eq!(alice.state(), SessionState::Active);
    assert_eq!(alice.local_user_id(), Some(uid(1)));
    assert_eq!(alice.lobby_id(), LobbyId::new(7));
    assert_eq!(alice.info().name, "friday night");
    assert_eq!(alice.member_count(), 2);
    assert_eq!(bob.member_by_index(1).map(|m| m.name.as_str()), Some("bob"));

    assert!(alice.is_local_owner());
    assert!(!bob.is_local_owner());
    assert_eq!(bob.owner_id(), Some(uid(1)));
}

#[test]
fn tick_before_initialize_is_a_no_op() {
    let lobby = LoopbackLobby::create(LobbyId::new(1), "l");
    let mut alice = session(lobby.join(uid(1), "alice"));

    alice.tick(5.0);
    alice.handle_event(PlatformEvent::ChatMessage {
        sender: uid(2),
        bytes: b"early".to_vec(),
    });

    assert_eq!(alice.state(), SessionState::Uninitialized);
    assert_eq!(alice.platform().stats().data_requests, 0);
    assert!(alice.chat_history().is_empty());
    assert_eq!(alice.member_count(), 0);
}

#[test]
fn initialize_twice_is_ignored() {
    let (_lobby, mut alice, _bob) = two_sessions();
    alice.initialize();
    assert_eq!(alice.platform().stats().data_requests, 1);
}

#[test]
fn shutdown_releases_once_and_leaves_once() {
    let (_lobby, mut alice, mut bob) = two_sessions();
    bob.set_voice_chat_enabled(true);
    bob.platform_mut().feed_microphone(vec![300; 160]);
    bob.tick(0.016);
    alice.pump_events();
    assert_eq!(alice.output().live(), 1);

    alice.shutdown();
    assert_eq!(alice.state(), SessionState::ShuttingDown);
    assert_eq!(alice.output().release_calls(), 1);
    assert_eq!(alice.output().live(), 0);
    assert_eq!(alice.platform().stats().leaves, 1);

    alice.shutdown();
    assert_eq!(alice.output().release_calls(), 1);
    assert_eq!(alice.platform().stats().leaves, 1);
}

#[test]
fn tick_after_shutdown_captures_nothing() {
    let (_lobby, mut alice, _bob) = two_sessions();
    alice.set_voice_chat_enabled(true);
    alice.shutdown();
    assert!(!alice.platform().is_recording());

    alice.set_voice_chat_enabled(true);
    alice.platform_mut().feed_microphone(vec![1; 16]);
    alice.tick(0.5);
    alice.tick(2.0);

    assert!(!alice.is_voice_chat_enabled());
    assert_eq!(alice.platform().stats().voice_sends, 0);
}

#[test]
fn shutdown_before_initialize_does_not_leave() {
    let lobby = LoopbackLobby::create(LobbyId::new(1), "l");
    let mut alice = session(lobby.join(uid(1), "alice"));

    alice.shutdown();
    assert_eq!(alice.state(), SessionState::ShuttingDown);
    assert_eq!(alice.platform().stats().leaves, 0);

    alice.initialize();
    assert_eq!(alice.state(), SessionState::ShuttingDown);
}

#[test]
fn shutdown_before_initialize_stops_recording() {
    let lobby = LoopbackLobby::create(LobbyId::new(1), "l");
    let mut alice = session(lobby.join(uid(1), "alice"));
    alice.set_voice_chat_enabled(true);
    assert!(alice.platform().is_recording());

    alice.shutdown();
    assert_eq!(alice.state(), SessionState::ShuttingDown);
    assert!(!alice.platform().is_recording());
    assert!(!alice.is_voice_chat_enabled());
}

#[test]
fn unusable_dt_does_not_stall_periodic_refresh() {
    for bad in [f32::NAN, -100.0, 0.0, f32::INFINITY] {
        let (lobby, mut alice, _bob) = two_sessions();
        lobby.set_name("saturday night");

        alice.tick(bad);
        for _ in 0..2 {
            alice.tick(0.6);
        }
        assert_eq!(alice.info().name, "saturday night", "dt = {bad}");
    }
}

#[test]
fn unusable_dt_leaves_talk_timers_alone() {
    let (_lobby, _alice, mut bob) = two_sessions();
    bob.handle_event(PlatformEvent::VoicePacket {
        sender: uid(1),
        bytes: LoopbackPlatform::encode(&[1; 4]),
    });

    bob.tick(f32::NAN);
    bob.tick(-1.0);
    assert!(bob.is_member_talking(0));
}

#[test]
fn lost_data_callback_is_retried_after_interval() {
    let lobby = LoopbackLobby::create(LobbyId::new(1), "l");
    let mut alice = session(lobby.join(uid(1), "alice"));
    alice.initialize();
    // Drop the confirmation instead of pumping it.
    while alice.platform_mut().poll_event().is_some() {}
    assert!(alice.info().data_requested);

    alice.refresh_lobby_data(false);
    assert_eq!(alice.platform().stats().data_requests, 1);

    alice.set_light_mode_enabled(true);
    alice.tick(1.5);
    alice.refresh_lobby_data(false);
    assert_eq!(alice.platform().stats().data_requests, 2);

    alice.pump_events();
    assert!(!alice.info().data_requested);
}

#[test]
fn voice_enabled_on_join_starts_recording() {
    let lobby = LoopbackLobby::create(LobbyId::new(1), "l");
    let settings = SessionSettings {
        voice_enabled_on_join: true,
        ..SessionSettings::default()
    };
    let mut alice = LobbySession::new(
        lobby.join(uid(1), "alice"),
        RecordingOutput::default(),
        settings,
    );

    assert!(!alice.platform().is_recording());
    alice.initialize();
    assert!(alice.is_voice_chat_enabled());
    assert!(alice.platform().is_recording());
}

// ---------------------------------------------------------------------------
// Authority
// ---------------------------------------------------------------------------

#[test]
fn member_limit_changes_only_for_owner() {
    let (lobby, mut alice, mut bob) = two_sessions();

    alice.set_lobby_member_limit(4).unwrap();
    assert_eq!(alice.lobby_member_limit(), 0);
    alice.pump_events();
    bob.pump_events();
    assert_eq!(alice.lobby_member_limit(), 4);
    assert_eq!(bob.lobby_member_limit(), 4);

    let result = bob.set_lobby_member_limit(2);
    assert!(matches!(result, Err(LobbyError::NotOwner { .. })));
    alice.pump_events();
    bob.pump_events();
    assert_eq!(lobby.member_limit(), 4);
    assert_eq!(alice.lobby_member_limit(), 4);
    assert_eq!(bob.lobby_member_limit(), 4);
}

#[test]
fn lobby_type_is_owner_only() {
    let (lobby, mut alice, mut bob) = two_sessions();

    assert!(bob.set_lobby_type(LobbyType::Private).is_err());
    assert_eq!(lobby.visibility(), LobbyType::Public);

    alice.set_lobby_type(LobbyType::FriendsOnly).unwrap();
    assert_eq!(lobby.visibility(), LobbyType::FriendsOnly);
}

#[test]
fn lobby_data_replicates_after_confirmation() {
    let (_lobby, mut alice, mut bob) = two_sessions();

    alice.set_lobby_data("map", "dust").unwrap();
    assert_eq!(alice.lobby_data("map"), "");

    alice.pump_events();
    bob.pump_events();
    assert_eq!(alice.lobby_data("map"), "dust");
    assert_eq!(bob.lobby_data("map"), "dust");

    assert!(bob.set_lobby_data("map", "office").is_err());
    alice.pump_events();
    bob.pump_events();
    assert_eq!(bob.lobby_data("map"), "dust");
    assert_eq!(bob.lobby_data("missing"), "");
}

#[test]
fn member_data_is_scoped_to_local_user() {
    let (_lobby, mut alice, mut bob) = two_sessions();

    bob.set_member_data("ready", "1").unwrap();
    alice.pump_events();
    bob.pump_events();

    assert_eq!(alice.member_data(1, "ready"), "1");
    assert_eq!(alice.member_data(0, "ready"), "");
    assert_eq!(bob.member_data(1, "ready"), "1");
    assert_eq!(alice.member_data(9, "ready"), "");
}

#[test]
fn mutators_reject_inactive_session() {
    let lobby = LoopbackLobby::create(LobbyId::new(1), "l");
    let mut alice = session(lobby.join(uid(1), "alice"));

    assert!(matches!(
        alice.set_lobby_data("k", "v"),
        Err(LobbyError::NotActive { .. })
    ));
    assert!(alice.send_lobby_chat_msg(b"hi").is_err());
    assert_eq!(alice.platform().stats().chat_sends, 0);
}

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

#[test]
fn capture_sends_until_light_mode_is_enabled() {
    let (_lobby, mut alice, _bob) = two_sessions();
    alice.set_voice_chat_enabled(true);

    alice.platform_mut().feed_microphone(vec![500; 160]);
    alice.tick(0.016);
    assert!(alice.local_talk_timer() > 0.0);
    assert_eq!(alice.platform().stats().voice_sends, 1);

    alice.set_light_mode_enabled(true);
    alice.platform_mut().feed_microphone(vec![500; 160]);
    alice.tick(0.016);
    assert_eq!(alice.platform().stats().voice_sends, 1);
}

#[test]
fn backlog_from_light_mode_goes_out_as_one_frame() {
    let (_lobby, mut alice, _bob) = two_sessions();
    alice.set_voice_chat_enabled(true);
    alice.set_light_mode_enabled(true);
    for _ in 0..50 {
        alice.platform_mut().feed_microphone(vec![9; 16]);
        alice.tick(0.016);
    }
    assert_eq!(alice.platform().stats().voice_sends, 0);

    alice.set_light_mode_enabled(false);
    for _ in 0..3 {
        alice.tick(0.016);
    }
    assert_eq!(alice.platform().stats().voice_sends, 1);
}

#[test]
fn two_feeds_before_a_tick_send_once() {
    let (_lobby, mut alice, mut bob) = two_sessions();
    alice.set_voice_chat_enabled(true);
    alice.platform_mut().feed_microphone(vec![5; 80]);
    alice.platform_mut().feed_microphone(vec![5; 80]);
    alice.tick(0.016);

    assert_eq!(alice.platform().stats().voice_sends, 1);
    assert_eq!(bob.pump_events(), 1);
    assert_eq!(bob.output().samples_queued(OutputHandle::new(1)), 160);
}

#[test]
fn injected_chat_is_recorded() {
    let (lobby, _alice, mut bob) = two_sessions();
    assert!(lobby.inject(
        uid(2),
        PlatformEvent::ChatMessage {
            sender: uid(1),
            bytes: b"ping".to_vec(),
        }
    ));
    bob.pump_events();
    assert_eq!(bob.chat_history().recent(1)[0].text(), "ping");
}

#[test]
fn friend_lobby_flag_is_pulled_on_refresh() {
    let (lobby, mut alice, _bob) = two_sessions();
    assert!(!alice.info().is_friend);
    lobby.set_friend_lobby(true);
    alice.refresh_lobby_data(true);
    assert!(alice.info().is_friend);
}

#[test]
fn received_voice_marks_speaker_talking() {
    let (_lobby, mut alice, mut bob) = two_sessions();
    alice.set_voice_chat_enabled(true);

    for _ in 0..3 {
        alice.platform_mut().feed_microphone(vec![42; 80]);
        alice.tick(0.016);
    }
    assert_eq!(bob.pump_events(), 3);

    assert!(bob.is_member_talking(0));
    assert!(!bob.is_member_talking(1));
    assert_eq!(bob.voice_buffer_count(), 1);
    assert_eq!(bob.output().created(), 1);
    assert_eq!(bob.output().speaker(OutputHandle::new(1)), Some(uid(1)));
    assert_eq!(bob.output().samples_queued(OutputHandle::new(1)), 240);
}

#[test]
fn talk_timer_decays_to_silence() {
    let (_lobby, mut alice, mut bob) = two_sessions();
    alice.set_voice_chat_enabled(true);
    alice.platform_mut().feed_microphone(vec![42; 80]);
    alice.tick(0.016);
    bob.pump_events();

    bob.tick(WINDOW * 0.4);
    bob.tick(WINDOW * 0.4);
    assert!(bob.is_member_talking(0));
    bob.tick(WINDOW * 0.4);
    assert!(!bob.is_member_talking(0));

    bob.tick(1.0);
    assert!(!bob.is_member_talking(0));
    assert_eq!(bob.voice_buffer_count(), 1);
}

#[test]
fn talk_timer_decays_in_light_mode() {
    let (_lobby, mut alice, mut bob) = two_sessions();
    alice.set_voice_chat_enabled(true);
    alice.platform_mut().feed_microphone(vec![42; 80]);
    alice.tick(0.016);
    bob.pump_events();

    bob.set_light_mode_enabled(true);
    bob.tick(WINDOW);
    assert!(!bob.is_member_talking(0));
}

#[test]
fn voice_from_unknown_identity_is_buffered() {
    let (_lobby, _alice, mut bob) = two_sessions();

    for _ in 0..2 {
        bob.handle_event(PlatformEvent::VoicePacket {
            sender: uid(99),
            bytes: LoopbackPlatform::encode(&[1, 2, 3]),
        });
    }

    assert_eq!(bob.member_index_by_id(uid(99)), None);
    assert_eq!(bob.voice_buffer_count(), 1);
    assert_eq!(bob.output().created(), 1);
    assert!(!bob.is_member_talking(0));
}

#[test]
fn volume_change_reaches_existing_streams() {
    let (_lobby, _alice, mut bob) = two_sessions();
    bob.handle_event(PlatformEvent::VoicePacket {
        sender: uid(1),
        bytes: LoopbackPlatform::encode(&[7; 8]),
    });

    bob.set_voice_volume(0.4);
    assert_eq!(bob.voice_volume(), 0.4);
    assert_eq!(bob.output().volume(OutputHandle::new(1)), Some(0.4));
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[test]
fn periodic_refresh_is_passive() {
    let (lobby, mut alice, _bob) = two_sessions();
    lobby.set_name("saturday night");

    alice.tick(0.5);
    assert_eq!(alice.info().name, "friday night");
    alice.tick(0.6);
    assert_eq!(alice.info().name, "saturday night");
    assert_eq!(alice.platform().stats().data_requests, 1);
}

#[test]
fn light_mode_skips_periodic_refresh() {
    let (lobby, mut alice, _bob) = two_sessions();
    alice.set_light_mode_enabled(true);
    lobby.set_name("saturday night");

    alice.tick(5.0);
    assert_eq!(alice.info().name, "friday night");
    assert!(alice.is_light_mode_enabled());
}

#[test]
fn data_request_outstanding_until_callback() {
    let lobby = LoopbackLobby::create(LobbyId::new(1), "l");
    let mut alice = session(lobby.join(uid(1), "alice"));
    alice.initialize();
    assert!(alice.info().data_requested);

    alice.refresh_lobby_data(false);
    assert_eq!(alice.platform().stats().data_requests, 1);

    alice.pump_events();
    assert!(!alice.info().data_requested);
}

#[test]
fn events_before_initialize_are_caught_up_by_initial_pull() {
    let lobby = LoopbackLobby::create(LobbyId::new(1), "l");
    let mut alice = session(lobby.join(uid(1), "alice"));
    alice.initialize();
    alice.set_lobby_data("mode", "ffa").unwrap();
    alice.pump_events();

    let mut bob = session(lobby.join(uid(2), "bob"));
    bob.handle_event(PlatformEvent::LobbyDataChanged { member: None });
    assert_eq!(bob.lobby_data("mode"), "");

    bob.initialize();
    assert_eq!(bob.lobby_data("mode"), "ffa");
    assert_eq!(bob.member_count(), 2);
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[test]
fn owner_leaving_promotes_next_member() {
    let (_lobby, mut alice, mut bob) = two_sessions();

    alice.shutdown();
    bob.pump_events();

    assert!(bob.is_local_owner());
    assert_eq!(bob.member_count(), 1);
    assert_eq!(bob.member_index_by_id(uid(2)), Some(0));
    assert_eq!(bob.member_index_by_id(uid(1)), None);
}

#[test]
fn late_joiner_appears_after_roster_callback() {
    let (lobby, mut alice, _bob) = two_sessions();
    let _carol = lobby.join(uid(3), "carol");

    assert_eq!(alice.member_count(), 2);
    alice.pump_events();
    assert_eq!(alice.member_count(), 3);
    assert_eq!(alice.member_by_index(2).map(|m| m.user_id), Some(uid(3)));
    assert!(alice.member_by_index(3).is_none());
    assert!(!alice.is_member_talking(3));
}

#[test]
fn member_by_id_mut_edits_cached_member() {
    let (_lobby, mut alice, _bob) = two_sessions();
    if let Some(member) = alice.member_by_id_mut(uid(2)) {
        member.name = "robert".into();
    }
    assert_eq!(alice.members()[1].name, "robert");
    assert!(alice.member_by_id_mut(uid(42)).is_none());
}

// ---------------------------------------------------------------------------
// Chat and hooks
// ---------------------------------------------------------------------------

#[test]
fn chat_reaches_every_peer() {
    let (_lobby, mut alice, mut bob) = two_sessions();

    alice.send_lobby_chat_msg(b"gg").unwrap();
    alice.pump_events();
    bob.pump_events();

    let received = bob.chat_history().recent(1);
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].sender, uid(1));
    assert_eq!(received[0].text(), "gg");
    assert_eq!(alice.chat_history().len(), 1);
}

#[test]
fn oversized_chat_is_rejected_both_ways() {
    let lobby = LoopbackLobby::create(LobbyId::new(1), "l");
    let settings = SessionSettings {
        max_chat_message_bytes: 4,
        ..SessionSettings::default()
    };
    let mut alice =
        LobbySession::new(lobby.join(uid(1), "alice"), RecordingOutput::default(), settings);
    alice.initialize();

    let result = alice.send_lobby_chat_msg(b"hello");
    assert!(matches!(
        result,
        Err(LobbyError::ChatMessageTooLong { len: 5, max: 4 })
    ));
    assert_eq!(alice.platform().stats().chat_sends, 0);

    alice.handle_event(PlatformEvent::ChatMessage {
        sender: uid(2),
        bytes: b"hello".to_vec(),
    });
    assert!(alice.chat_history().is_empty());
}

#[test]
fn observer_hooks_fire_at_documented_points() {
    let counts = Rc::new(RefCell::new(Counts::default()));
    let lobby = LoopbackLobby::create(LobbyId::new(1), "l");
    let a = lobby.join(uid(1), "alice");
    let mut bob = session(lobby.join(uid(2), "bob"));
    let mut alice = session(a).with_observer(CountingObserver(counts.clone()));

    alice.initialize();
    bob.initialize();
    assert_eq!(counts.borrow().roster, 1);

    alice.pump_events();
    assert_eq!(counts.borrow().roster, 1);
    assert_eq!(counts.borrow().data, 1);

    alice.tick(0.01);
    alice.set_light_mode_enabled(true);
    alice.tick(0.01);
    assert_eq!(counts.borrow().light, 1);

    bob.send_lobby_chat_msg(b"hi").unwrap();
    alice.pump_events();
    assert_eq!(counts.borrow().chat, 1);
}

#[test]
fn invite_opens_overlay() {
    let (_lobby, mut alice, _bob) = two_sessions();
    alice.invite_friends();
    assert_eq!(alice.platform().stats().invites_opened, 1);
}
