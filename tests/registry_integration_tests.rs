//! Registry Integration Tests
//!
//! End-to-end scenarios across the profile store, the connection registry
//! and the event bus, using the simulated tunnel drivers.

use libvpnctl::{
    ConnectionRegistry, ConnectionState, CreateProfileRequest, EventBus, ProfileStore,
    RegistryEvent, RegistrySettings, SimulatedDriver, TunnelType, UpdateProfileRequest,
    VpnctlError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn build(handshake_delay: Duration) -> (ProfileStore, ConnectionRegistry, EventBus) {
    let events = EventBus::new(256);
    let profiles = ProfileStore::new(events.clone());
    let mut connections =
        ConnectionRegistry::new(profiles.clone(), events.clone(), RegistrySettings::default());
    connections.register_driver(
        TunnelType::WireGuard,
        Arc::new(SimulatedDriver::new("wireguard-sim", handshake_delay)),
    );
    connections.register_driver(
        TunnelType::OpenVpn,
        Arc::new(SimulatedDriver::new("openvpn-sim", handshake_delay)),
    );
    (profiles, connections, events)
}

fn wireguard(name: &str) -> CreateProfileRequest {
    CreateProfileRequest {
        name: name.to_string(),
        tunnel_type: "wireguard".to_string(),
        config: "[Interface]\nPrivateKey = abc\n".to_string(),
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_profile_then_connect() {
        let (profiles, connections, _) = build(Duration::ZERO);

        let profile = profiles.create(wireguard("home")).await.unwrap();
        let conn = connections.connect("slot1", &profile.id).await.unwrap();
        assert_eq!(conn.state, ConnectionState::Connected);
        assert_eq!(conn.profile_id, profile.id);

        let listed = connections.list().await;
        let matching: Vec<_> = listed.iter().filter(|c| c.id == "slot1").collect();
        assert_eq!(listed.len(), 1);
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].state, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_uptime_grows_while_connected() {
        let (profiles, connections, _) = build(Duration::ZERO);
        let profile = profiles.create(wireguard("home")).await.unwrap();

        connections.connect("slot1", &profile.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(connections.get("slot1").await.unwrap().uptime_seconds >= 1);

        let conn = connections.disconnect("slot1").await.unwrap().unwrap();
        assert_eq!(conn.state, ConnectionState::Disconnected);
        assert_eq!(conn.uptime_seconds, 0);
    }

    #[tokio::test]
    async fn test_disconnect_unknown_is_absent() {
        let (_, connections, _) = build(Duration::ZERO);
        assert!(connections.disconnect("nope").await.unwrap().is_none());
        assert!(connections.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_connect_unknown_profile_creates_nothing() {
        let (_, connections, _) = build(Duration::ZERO);
        let err = connections.connect("slot1", "missing").await.unwrap_err();
        assert!(matches!(err, VpnctlError::NotFound(_)));
        assert!(connections.get("slot1").await.is_none());
    }

    #[tokio::test]
    async fn test_profile_delete_does_not_cascade() {
        let (profiles, connections, _) = build(Duration::ZERO);
        let profile = profiles.create(wireguard("home")).await.unwrap();

        connections.connect("slot1", &profile.id).await.unwrap();
        assert!(profiles.delete(&profile.id).await);
        assert!(!profiles.delete(&profile.id).await);

        let conn = connections.get("slot1").await.unwrap();
        assert_eq!(conn.profile_id, profile.id);
        assert_eq!(conn.state, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_field() {
        let (profiles, _, _) = build(Duration::ZERO);
        let profile = profiles.create(wireguard("home")).await.unwrap();

        let updated = profiles
            .update(
                &profile.id,
                UpdateProfileRequest {
                    name: Some("office".to_string()),
                    config: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "office");
        assert_eq!(updated.config, profile.config);
        assert_eq!(updated.tunnel_type, TunnelType::WireGuard);
    }
}

// =============================================================================
// Concurrency Tests
// =============================================================================

mod concurrency_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_connects_to_one_slot_leave_one_entry() {
        let (profiles, connections, _) = build(Duration::from_millis(5));
        let profile = profiles.create(wireguard("home")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let connections = connections.clone();
            let profile_id = profile.id.clone();
            handles.push(tokio::spawn(async move {
                connections.connect("slot1", &profile_id).await
            }));
        }

        let mut connected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(conn) => {
                    assert_eq!(conn.state, ConnectionState::Connected);
                    connected += 1;
                }
                Err(VpnctlError::Cancelled(_)) => {}
                Err(e) => panic!("unexpected error {}", e),
            }
        }

        // The newest attempt always commits
        assert!(connected >= 1);
        assert_eq!(connections.list().await.len(), 1);
        assert_eq!(
            connections.get("slot1").await.unwrap().state,
            ConnectionState::Connected
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_slots_are_independent() {
        let (profiles, connections, _) = build(Duration::from_millis(5));
        let profile = profiles.create(wireguard("home")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let connections = connections.clone();
            let profile_id = profile.id.clone();
            handles.push(tokio::spawn(async move {
                connections.connect(&format!("slot{}", i), &profile_id).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let listed = connections.list().await;
        assert_eq!(listed.len(), 32);
        assert!(listed.iter().all(|c| c.state == ConnectionState::Connected));

        connections.disconnect_all().await.unwrap();
        assert!(connections
            .list()
            .await
            .iter()
            .all(|c| c.state == ConnectionState::Disconnected));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_list_during_transition_is_consistent() {
        let (profiles, connections, _) = build(Duration::from_millis(50));
        let profile = profiles.create(wireguard("home")).await.unwrap();
        let done = Arc::new(AtomicBool::new(false));

        fn rank(state: ConnectionState) -> u8 {
            match state {
                ConnectionState::Disconnected => 0,
                ConnectionState::Connecting => 1,
                ConnectionState::Connected => 2,
                other => panic!("unexpected state {:?}", other),
            }
        }

        let mut readers = Vec::new();
        for _ in 0..4 {
            let connections = connections.clone();
            let done = done.clone();
            readers.push(tokio::spawn(async move {
                let mut highest = 0;
                let mut saw_connecting = false;
                while !done.load(Ordering::SeqCst) {
                    let listed = connections.list().await;
                    let slot: Vec<_> = listed.iter().filter(|c| c.id == "slot1").collect();
                    assert!(slot.len() <= 1);
                    if let Some(conn) = slot.first() {
                        let current = rank(conn.state);
                        assert!(current >= highest, "state went backwards");
                        highest = current;
                        saw_connecting |= conn.state == ConnectionState::Connecting;
                        if conn.state != ConnectionState::Connected {
                            assert_eq!(conn.uptime_seconds, 0);
                        }
                        assert!(conn.last_error.is_none());
                    }
                    tokio::task::yield_now().await;
                }
                saw_connecting
            }));
        }

        let conn = connections.connect("slot1", &profile.id).await.unwrap();
        assert_eq!(conn.state, ConnectionState::Connected);
        done.store(true, Ordering::SeqCst);

        let mut saw_connecting = false;
        for reader in readers {
            saw_connecting |= reader.await.unwrap();
        }
        assert!(saw_connecting);
    }

    #[tokio::test]
    async fn test_connecting_visible_with_handshake_delay() {
        let (profiles, connections, _) = build(Duration::from_millis(200));
        let profile = profiles.create(wireguard("home")).await.unwrap();

        let pending = connections.begin_connect("slot1", &profile.id).await.unwrap();
        let snapshot = connections.get("slot1").await.unwrap();
        assert_eq!(snapshot.state, ConnectionState::Connecting);

        let conn = pending.wait().await.unwrap();
        assert_eq!(conn.state, ConnectionState::Connected);
    }
}

// =============================================================================
// Event Tests
// =============================================================================

mod event_tests {
    use super::*;

    #[tokio::test]
    async fn test_events_follow_commit_order() {
        let (profiles, connections, events) = build(Duration::ZERO);
        let mut rx = events.subscribe();

        let profile = profiles.create(wireguard("home")).await.unwrap();
        connections.connect("slot1", &profile.id).await.unwrap();
        connections.disconnect("slot1").await.unwrap();

        match rx.recv().await.unwrap() {
            RegistryEvent::ProfileCreated { profile: created } => assert_eq!(created.id, profile.id),
            other => panic!("unexpected event {:?}", other),
        }

        let mut states = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let RegistryEvent::ConnectionChanged { connection } = event {
                states.push(connection.state);
            }
        }
        assert_eq!(
            states,
            vec![
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Disconnecting,
                ConnectionState::Disconnected,
            ]
        );
    }
}
