use crate::errors::{
    ServiceError,
    WalletProvider,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConnectedWallet {
    pub address: String,
    pub wallet_name: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LinkRequest {
    pub player_id: u64,
    pub auth_token: String,
    pub address: String,
    pub signature: String,
    pub transaction_id: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MintRequest {
    pub address: String,
    pub player_id: u64,
    pub auth_token: String,
    pub transaction_id: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MigrateRequest {
    pub player_id: u64,
    pub auth_token: String,
    pub transaction_id: String,
}

/// On-chain view of the farms owned by an address.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FarmStatus {
    pub created_at: Option<DateTime<Utc>>,
    pub farms: Vec<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MigratedFarm {
    pub farm_address: String,
    pub farm_id: u64,
    pub nft_id: u64,
}

/// The wallet provider, account backend and chain RPC the onboarding flow talks to.
pub trait WalletServices {
    fn connect_wallet(
        &self,
        provider: &WalletProvider,
    ) -> impl Future<Output = ServiceResult<ConnectedWallet>> + Send;

    fn sign_challenge(
        &self,
        address: &str,
        message: &str,
    ) -> impl Future<Output = ServiceResult<String>> + Send;

    fn link_wallet(
        &self,
        request: LinkRequest,
    ) -> impl Future<Output = ServiceResult<()>> + Send;

    fn farm_status(
        &self,
        address: &str,
    ) -> impl Future<Output = ServiceResult<FarmStatus>> + Send;

    fn mint_farm(
        &self,
        request: MintRequest,
    ) -> impl Future<Output = ServiceResult<()>> + Send;

    fn migrate_farm(
        &self,
        request: MigrateRequest,
    ) -> impl Future<Output = ServiceResult<MigratedFarm>> + Send;
}
