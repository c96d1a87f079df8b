//! In-memory stand-in for the wallet provider, account backend and chain, driven by a
//! serialisable [`SimulatedWorld`]. Used by the CLI scenarios and the tests.

use crate::{
    clock::Clock,
    errors::{
        ServiceError,
        WalletProvider,
    },
    event::WalletEvent,
    migration::{
        PlayerProgress,
        check_migration_eligibility,
    },
    services::{
        ConnectedWallet,
        FarmStatus,
        LinkRequest,
        MigrateRequest,
        MigratedFarm,
        MintRequest,
        ServiceResult,
        WalletServices,
    },
};
use anyhow::{
    Context,
    Result,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use sha2::{
    Digest,
    Sha256,
};
use std::{
    collections::BTreeMap,
    fs,
    path::Path,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
    time::Duration,
};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct InstalledWallet {
    pub address: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub auth_token: String,
    #[serde(default)]
    pub linked_address: Option<String>,
    #[serde(default)]
    pub progress: PlayerProgress,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChainRecord {
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub farms: Vec<String>,
}

/// Messages returned instead of performing the call, classified with
/// [`ServiceError::from_message`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectedFailures {
    pub connect: Option<String>,
    pub sign: Option<String>,
    pub link: Option<String>,
    pub farm_status: Option<String>,
    pub mint: Option<String>,
    pub migrate: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedWorld {
    /// Wallet extensions installed in the browser, keyed by provider id.
    pub wallets: BTreeMap<WalletProvider, InstalledWallet>,
    pub wrong_chain: bool,
    pub accounts: BTreeMap<u64, AccountRecord>,
    pub chain: BTreeMap<String, ChainRecord>,
    pub failures: InjectedFailures,
    pub latency_ms: u64,
}

impl SimulatedWorld {
    pub fn with_wallet(
        mut self,
        provider: &str,
        address: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.wallets.insert(
            WalletProvider::new(provider),
            InstalledWallet {
                address: address.into(),
                name: name.into(),
            },
        );
        self
    }

    pub fn with_account(mut self, player_id: u64, account: AccountRecord) -> Self {
        self.accounts.insert(player_id, account);
        self
    }

    pub fn with_chain_record(mut self, address: impl Into<String>, record: ChainRecord) -> Self {
        self.chain.insert(address.into(), record);
        self
    }
}

/// Every call made against the simulation, in order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ServiceCall {
    Connect(WalletProvider),
    Sign(String),
    Link(LinkRequest),
    FarmStatus(String),
    Mint(MintRequest),
    Migrate(MigrateRequest),
}

#[derive(Clone)]
pub struct SimulatedServices {
    world: Arc<Mutex<SimulatedWorld>>,
    calls: Arc<Mutex<Vec<ServiceCall>>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SimulatedServices {
    pub fn new(world: SimulatedWorld, clock: impl Clock + Send + Sync + 'static) -> Self {
        Self {
            world: Arc::new(Mutex::new(world)),
            calls: Arc::new(Mutex::new(Vec::new())),
            clock: Arc::new(clock),
        }
    }

    pub fn world(&self) -> SimulatedWorld {
        self.lock_world().clone()
    }

    pub fn update_world(&self, update: impl FnOnce(&mut SimulatedWorld)) {
        update(&mut self.lock_world());
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn lock_world(&self) -> MutexGuard<'_, SimulatedWorld> {
        self.world.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: ServiceCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    async fn latency(&self) {
        let latency_ms = self.lock_world().latency_ms;
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }
    }

    fn injected(
        &self,
        select: impl FnOnce(&InjectedFailures) -> &Option<String>,
    ) -> ServiceResult<()> {
        match select(&self.lock_world().failures) {
            Some(message) => Err(ServiceError::from_message(message.clone())),
            None => Ok(()),
        }
    }

    fn authorised_account(
        world: &SimulatedWorld,
        player_id: u64,
        auth_token: &str,
    ) -> ServiceResult<AccountRecord> {
        let account = world
            .accounts
            .get(&player_id)
            .ok_or_else(|| ServiceError::Other(format!("Unknown player {player_id}")))?;
        if account.auth_token != auth_token {
            return Err(ServiceError::Other("Unauthorised".to_string()));
        }
        Ok(account.clone())
    }
}

pub fn simulated_signature(address: &str, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(address.as_bytes());
    hasher.update(message.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

impl WalletServices for SimulatedServices {
    async fn connect_wallet(
        &self,
        provider: &WalletProvider,
    ) -> ServiceResult<ConnectedWallet> {
        self.record(ServiceCall::Connect(provider.clone()));
        self.latency().await;
        self.injected(|f| &f.connect)?;
        let world = self.lock_world();
        let wallet = world
            .wallets
            .get(provider)
            .ok_or_else(|| ServiceError::ProviderUnavailable(provider.clone()))?;
        if world.wrong_chain {
            return Err(ServiceError::WrongChain);
        }
        Ok(ConnectedWallet {
            address: wallet.address.clone(),
            wallet_name: wallet.name.clone(),
        })
    }

    async fn sign_challenge(&self, address: &str, message: &str) -> ServiceResult<String> {
        self.record(ServiceCall::Sign(address.to_string()));
        self.latency().await;
        self.injected(|f| &f.sign)?;
        Ok(simulated_signature(address, message))
    }

    async fn link_wallet(&self, request: LinkRequest) -> ServiceResult<()> {
        self.record(ServiceCall::Link(request.clone()));
        self.latency().await;
        self.injected(|f| &f.link)?;
        let mut world = self.lock_world();
        Self::authorised_account(&world, request.player_id, &request.auth_token)?;
        let linked_elsewhere = world.accounts.iter().any(|(id, account)| {
            *id != request.player_id
                && account.linked_address.as_deref() == Some(request.address.as_str())
        });
        if linked_elsewhere {
            return Err(ServiceError::WalletAlreadyLinked);
        }
        if let Some(account) = world.accounts.get_mut(&request.player_id) {
            account.linked_address = Some(request.address);
        }
        Ok(())
    }

    async fn farm_status(&self, address: &str) -> ServiceResult<FarmStatus> {
        self.record(ServiceCall::FarmStatus(address.to_string()));
        self.latency().await;
        self.injected(|f| &f.farm_status)?;
        let world = self.lock_world();
        Ok(world
            .chain
            .get(address)
            .map(|record| FarmStatus {
                created_at: record.created_at,
                farms: record.farms.clone(),
            })
            .unwrap_or_default())
    }

    async fn mint_farm(&self, request: MintRequest) -> ServiceResult<()> {
        self.record(ServiceCall::Mint(request.clone()));
        self.latency().await;
        self.injected(|f| &f.mint)?;
        let now = self.clock.now();
        let mut world = self.lock_world();
        Self::authorised_account(&world, request.player_id, &request.auth_token)?;
        let record = world.chain.entry(request.address).or_default();
        if !record.farms.is_empty() {
            return Err(ServiceError::AlreadyHasFarm);
        }
        record.created_at = Some(now);
        record.farms.push(format!("0xFARM{:04}", request.player_id));
        Ok(())
    }

    async fn migrate_farm(&self, request: MigrateRequest) -> ServiceResult<MigratedFarm> {
        self.record(ServiceCall::Migrate(request.clone()));
        self.latency().await;
        self.injected(|f| &f.migrate)?;
        let world = self.lock_world();
        let account =
            Self::authorised_account(&world, request.player_id, &request.auth_token)?;
        check_migration_eligibility(&account.progress)
            .map_err(|err| ServiceError::Other(err.to_string()))?;
        let farm_address = account
            .linked_address
            .as_ref()
            .and_then(|address| world.chain.get(address))
            .and_then(|record| record.farms.first().cloned())
            .ok_or_else(|| ServiceError::Other("No farm to migrate".to_string()))?;
        Ok(MigratedFarm {
            farm_address,
            farm_id: request.player_id,
            nft_id: request.player_id + 1_000,
        })
    }
}

/// One line of a scenario script: either an event or a pause that moves the clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScenarioStep {
    Wait { wait_secs: u64 },
    Event(WalletEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub world: SimulatedWorld,
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_slice(&data)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::clock::SystemClock;

    fn account(token: &str) -> AccountRecord {
        AccountRecord {
            auth_token: token.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn connect_wallet__unknown_provider_is_unavailable() {
        // given
        let services = SimulatedServices::new(SimulatedWorld::default(), SystemClock);
        let provider = WalletProvider::new("phantom");

        // when
        let result = services.connect_wallet(&provider).await;

        // then
        assert_eq!(result, Err(ServiceError::ProviderUnavailable(provider)));
    }

    #[tokio::test]
    async fn link_wallet__address_owned_by_other_account_is_already_linked() {
        // given
        let world = SimulatedWorld::default()
            .with_account(
                1,
                AccountRecord {
                    linked_address: Some("0xAAA".to_string()),
                    ..account("one")
                },
            )
            .with_account(2, account("two"));
        let services = SimulatedServices::new(world, SystemClock);

        // when
        let result = services
            .link_wallet(LinkRequest {
                player_id: 2,
                auth_token: "two".to_string(),
                address: "0xAAA".to_string(),
                signature: "0xSIG".to_string(),
                transaction_id: "tx".to_string(),
            })
            .await;

        // then
        assert_eq!(result, Err(ServiceError::WalletAlreadyLinked));
        assert_eq!(services.world().accounts[&2].linked_address, None);
    }

    #[tokio::test]
    async fn mint_farm__second_mint_reports_existing_farm() {
        // given
        let world = SimulatedWorld::default().with_account(5, account("jwt"));
        let services = SimulatedServices::new(world, SystemClock);
        let request = MintRequest {
            address: "0xAAA".to_string(),
            player_id: 5,
            auth_token: "jwt".to_string(),
            transaction_id: "tx".to_string(),
        };
        services.mint_farm(request.clone()).await.unwrap();

        // when
        let result = services.mint_farm(request).await;

        // then
        assert_eq!(result, Err(ServiceError::AlreadyHasFarm));
        assert_eq!(services.world().chain["0xAAA"].farms, vec!["0xFARM0005"]);
    }

    #[test]
    fn scenario__parses_waits_and_events() {
        // given
        let raw = r#"{
            "world": {"wallets": {"metamask": {"address": "0xAAA", "name": "MetaMask"}}},
            "steps": [
                {"type": "CONNECT_TO_WALLET", "provider": "metamask"},
                {"wait_secs": 61},
                {"type": "CONTINUE"}
            ]
        }"#;

        // when
        let scenario: Scenario = serde_json::from_str(raw).unwrap();

        // then
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[1], ScenarioStep::Wait { wait_secs: 61 });
        assert_eq!(scenario.steps[2], ScenarioStep::Event(WalletEvent::Continue));
        assert!(
            scenario
                .world
                .wallets
                .contains_key(&WalletProvider::new("metamask"))
        );
    }
}
