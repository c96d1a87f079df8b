use crate::{
    challenge::{
        DEFAULT_GREETING,
        DEFAULT_NONCE_BUCKET_SECS,
    },
    errors::ProviderErrorTable,
};
use anyhow::{
    Context,
    Result,
    anyhow,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEFAULT_SETTLEMENT_WINDOW_SECS: u64 = 60;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingConfig {
    /// Delay after a mint before the farm NFT is considered queryable.
    pub settlement_window_secs: u64,
    pub nonce_bucket_secs: u64,
    pub challenge_greeting: String,
    pub provider_errors: ProviderErrorTable,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            settlement_window_secs: DEFAULT_SETTLEMENT_WINDOW_SECS,
            nonce_bucket_secs: DEFAULT_NONCE_BUCKET_SECS,
            challenge_greeting: DEFAULT_GREETING.to_string(),
            provider_errors: ProviderErrorTable::default(),
        }
    }
}

impl OnboardingConfig {
    /// `None` when the configured window does not fit a `chrono::Duration`.
    pub fn settlement_window(&self) -> Option<chrono::Duration> {
        seconds(self.settlement_window_secs)
    }

    /// Rejects windows and buckets too large for millisecond timestamp arithmetic.
    pub fn validate(&self) -> Result<()> {
        if self.settlement_window().is_none() {
            return Err(anyhow!(
                "settlement_window_secs {} is out of range",
                self.settlement_window_secs
            ));
        }
        if seconds(self.nonce_bucket_secs).is_none() {
            return Err(anyhow!(
                "nonce_bucket_secs {} is out of range",
                self.nonce_bucket_secs
            ));
        }
        Ok(())
    }

    /// Reads a JSON config. An empty file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_slice(&data)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }
}

/// Whole seconds as a `chrono::Duration`, or `None` past chrono's range.
pub fn seconds(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
}

pub fn resolve_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
