use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeMap,
    fmt,
};

pub const NO_WEB3: &str = "NO_WEB3";
pub const NO_WEB3_BITGET: &str = "NO_WEB3_BITGET";
pub const NO_WEB3_CRYPTO_COM: &str = "NO_WEB3_CRYPTO_COM";
pub const NO_WEB3_PHANTOM: &str = "NO_WEB3_PHANTOM";
pub const WRONG_CHAIN: &str = "WRONG_CHAIN";
pub const WALLET_ALREADY_LINKED: &str = "WALLET_ALREADY_LINKED";
pub const ALREADY_HAS_FARM: &str = "ALREADY_HAS_FARM";
pub const MISSING_SESSION: &str = "MISSING_SESSION";

/// Identifier of a wallet connector, e.g. `metamask` or `phantom`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct WalletProvider(String);

impl From<String> for WalletProvider {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<WalletProvider> for String {
    fn from(provider: WalletProvider) -> Self {
        provider.0
    }
}

impl WalletProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_ascii_lowercase())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure reported by one of the external wallet, backend or chain calls.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("wallet provider '{0}' is not available")]
    ProviderUnavailable(WalletProvider),
    #[error("WRONG_CHAIN")]
    WrongChain,
    #[error("WALLET_ALREADY_LINKED")]
    WalletAlreadyLinked,
    #[error("ALREADY_HAS_FARM")]
    AlreadyHasFarm,
    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    /// Classifies a raw backend message against the known sentinels.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match message.as_str() {
            WRONG_CHAIN => ServiceError::WrongChain,
            WALLET_ALREADY_LINKED => ServiceError::WalletAlreadyLinked,
            ALREADY_HAS_FARM => ServiceError::AlreadyHasFarm,
            _ => ServiceError::Other(message),
        }
    }
}

/// Lookup from provider id to the user-facing code shown when that provider is missing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProviderErrorTable {
    #[serde(default)]
    codes: BTreeMap<WalletProvider, String>,
    #[serde(default = "default_code")]
    default: String,
}

fn default_code() -> String {
    NO_WEB3.to_string()
}

impl Default for ProviderErrorTable {
    fn default() -> Self {
        let codes = [
            ("okx", NO_WEB3),
            ("bitget", NO_WEB3_BITGET),
            ("crypto_com", NO_WEB3_CRYPTO_COM),
            ("phantom", NO_WEB3_PHANTOM),
        ]
        .into_iter()
        .map(|(id, code)| (WalletProvider::new(id), code.to_string()))
        .collect();
        Self {
            codes,
            default: default_code(),
        }
    }
}

impl ProviderErrorTable {
    pub fn with_code(mut self, provider: WalletProvider, code: impl Into<String>) -> Self {
        self.codes.insert(provider, code.into());
        self
    }

    pub fn code_for(&self, provider: &WalletProvider) -> &str {
        self.codes
            .get(provider)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}
