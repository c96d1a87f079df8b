#![allow(non_snake_case)]

use chrono::{
    TimeZone,
    Utc,
};
use farm_wallet::{
    OnboardingConfig,
    OnboardingContext,
    OnboardingHandle,
    Session,
    WalletAction,
    WalletEvent,
    WalletState,
    clock::ManualClock,
    errors::WalletProvider,
    simulated::{
        ServiceCall,
        SimulatedServices,
        SimulatedWorld,
    },
};
use std::time::Duration;

fn slow_world() -> SimulatedWorld {
    SimulatedWorld {
        latency_ms: 500,
        ..SimulatedWorld::default().with_wallet("metamask", "0xAAA", "MetaMask")
    }
}

fn spawn(world: SimulatedWorld) -> (OnboardingHandle, SimulatedServices) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap());
    let services = SimulatedServices::new(world, clock.clone());
    let handle =
        OnboardingHandle::spawn(services.clone(), clock, OnboardingConfig::default());
    (handle, services)
}

fn connect_metamask() -> WalletEvent {
    WalletEvent::ConnectToWallet {
        provider: WalletProvider::new("metamask"),
    }
}

#[tokio::test(start_paused = true)]
async fn reset_during_connect__discards_the_late_result() {
    // given
    let (handle, services) = spawn(slow_world());

    // when
    handle.send(connect_metamask()).unwrap();
    handle.send(WalletEvent::Reset).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    // then
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, WalletState::ChooseWallet);
    assert_eq!(snapshot.context, OnboardingContext::default());
    assert!(!snapshot.in_flight);
    assert_eq!(
        services.calls(),
        vec![ServiceCall::Connect(WalletProvider::new("metamask"))]
    );
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn account_changed_during_sign__does_not_reach_ready() {
    // given
    let (handle, services) = spawn(slow_world());
    handle.send(connect_metamask()).unwrap();
    handle
        .wait_for(|snapshot| snapshot.state == WalletState::Signing)
        .await
        .unwrap();

    // when
    handle.send(WalletEvent::AccountChanged).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    // then
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.state, WalletState::ChooseWallet);
    assert_eq!(snapshot.context.signature, None);
    assert_eq!(snapshot.context.wallet_address.as_deref(), Some("0xAAA"));
    assert!(
        services
            .calls()
            .iter()
            .any(|call| matches!(call, ServiceCall::Sign(_)))
    );
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn events_without_a_transition__leave_the_call_in_flight() {
    // given
    let (handle, _services) = spawn(slow_world());
    handle.send(connect_metamask()).unwrap();

    // when
    handle.send(WalletEvent::Mint).unwrap();
    handle.send(WalletEvent::Continue).unwrap();
    handle
        .send(WalletEvent::Initialise(Session {
            player_id: Some(1),
            ..Default::default()
        }))
        .unwrap();
    let snapshot = handle
        .wait_for(|snapshot| snapshot.state.is_ready() && !snapshot.in_flight)
        .await
        .unwrap();

    // then
    assert_eq!(snapshot.context.player_id, None);
    assert!(snapshot.context.signature.is_some());
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_after_reset__completes_with_fresh_call() {
    // given
    let (handle, services) = spawn(slow_world());
    handle
        .send(WalletEvent::Initialise(Session {
            pending_action: Some(WalletAction::Login),
            ..Default::default()
        }))
        .unwrap();
    handle.send(connect_metamask()).unwrap();
    handle.send(WalletEvent::Reset).unwrap();

    // when
    handle.send(connect_metamask()).unwrap();
    let snapshot = handle
        .wait_for(|snapshot| snapshot.state == WalletState::Ready)
        .await
        .unwrap();

    // then
    assert_eq!(snapshot.context.pending_action, None);
    let connects = services
        .calls()
        .iter()
        .filter(|call| matches!(call, ServiceCall::Connect(_)))
        .count();
    assert_eq!(connects, 2);
    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown__closes_the_snapshot_stream() {
    // given
    let (handle, _services) = spawn(SimulatedWorld::default());
    let mut snapshots = handle.subscribe();
    handle.shutdown().await;

    // when
    let changed = snapshots.changed().await;

    // then
    assert!(changed.is_err());
}
