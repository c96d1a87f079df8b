#![allow(non_snake_case)]

use chrono::Utc;
use farm_wallet::{
    OnboardingConfig,
    OnboardingSnapshot,
    WalletOnboardingController,
    WalletState,
    clock::ManualClock,
    config::seconds,
    simulated::{
        Scenario,
        ScenarioStep,
        SimulatedServices,
    },
};
use std::path::PathBuf;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join(name)
}

async fn replay(scenario: Scenario) -> Vec<OnboardingSnapshot> {
    let clock = ManualClock::new(scenario.start.unwrap_or_else(Utc::now));
    let services = SimulatedServices::new(scenario.world, clock.clone());
    let mut controller =
        WalletOnboardingController::new(services, clock.clone(), OnboardingConfig::default());
    let mut snapshots = Vec::new();
    for step in scenario.steps {
        match step {
            ScenarioStep::Wait { wait_secs } => {
                clock.advance(seconds(wait_secs).unwrap());
            }
            ScenarioStep::Event(event) => snapshots.push(controller.send(event).await),
        }
    }
    snapshots
}

#[tokio::test]
async fn purchase_with_mint__ends_ready_with_migrated_farm() {
    // given
    let scenario = Scenario::load(demo("purchase_with_mint.json")).unwrap();

    // when
    let snapshots = replay(scenario).await;

    // then
    let states: Vec<_> = snapshots.iter().map(|s| s.state).collect();
    assert_eq!(
        states,
        vec![
            WalletState::ChooseWallet,
            WalletState::RequiresNft,
            WalletState::WaitingForMint,
            WalletState::Ready,
        ]
    );
    let last = snapshots.last().unwrap();
    assert_eq!(last.context.farm_address.as_deref(), Some("0xFARM0007"));
}

#[tokio::test]
async fn wrong_wallet__stops_then_resets() {
    // given
    let scenario = Scenario::load(demo("wrong_wallet.json")).unwrap();

    // when
    let snapshots = replay(scenario).await;

    // then
    let states: Vec<_> = snapshots.iter().map(|s| s.state).collect();
    assert_eq!(
        states,
        vec![
            WalletState::ChooseWallet,
            WalletState::WrongWallet,
            WalletState::ChooseWallet,
        ]
    );
}

#[test]
fn scenario_load__reports_missing_file() {
    let err = Scenario::load(demo("does_not_exist.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read scenario"));
}

#[test]
fn snapshot__serialises_to_camel_case_json() {
    // given
    let machine = farm_wallet::WalletMachine::new(OnboardingConfig::default());

    // when
    let json = serde_json::to_value(machine.snapshot()).unwrap();

    // then
    assert_eq!(json["inFlight"], serde_json::json!(false));
    assert!(json["context"].get("playerId").is_some());
}
