use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// The operation the player was trying to perform when the wallet flow was opened.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WalletAction {
    Login,
    Deposit,
    Withdraw,
    Purchase,
    Donate,
    DailyReward,
    Sync,
    Dequip,
    WishingWell,
    ConnectWallet,
    ListTrade,
    Marketplace,
    SpecialEvent,
}

/// Actions that can be completed without owning a farm NFT.
pub const NFT_EXEMPT_ACTIONS: [WalletAction; 5] = [
    WalletAction::Login,
    WalletAction::Donate,
    WalletAction::DailyReward,
    WalletAction::SpecialEvent,
    WalletAction::Dequip,
];

impl WalletAction {
    pub const ALL: [WalletAction; 13] = [
        WalletAction::Login,
        WalletAction::Deposit,
        WalletAction::Withdraw,
        WalletAction::Purchase,
        WalletAction::Donate,
        WalletAction::DailyReward,
        WalletAction::Sync,
        WalletAction::Dequip,
        WalletAction::WishingWell,
        WalletAction::ConnectWallet,
        WalletAction::ListTrade,
        WalletAction::Marketplace,
        WalletAction::SpecialEvent,
    ];

    pub fn is_nft_exempt(self) -> bool {
        NFT_EXEMPT_ACTIONS.contains(&self)
    }
}

impl fmt::Display for WalletAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WalletAction::Login => "login",
            WalletAction::Deposit => "deposit",
            WalletAction::Withdraw => "withdraw",
            WalletAction::Purchase => "purchase",
            WalletAction::Donate => "donate",
            WalletAction::DailyReward => "dailyReward",
            WalletAction::Sync => "sync",
            WalletAction::Dequip => "dequip",
            WalletAction::WishingWell => "wishingWell",
            WalletAction::ConnectWallet => "connectWallet",
            WalletAction::ListTrade => "listTrade",
            WalletAction::Marketplace => "marketplace",
            WalletAction::SpecialEvent => "specialEvent",
        };
        write!(f, "{name}")
    }
}

/// An authenticated session handed to the flow by `INITIALISE`, usually after a page
/// reload.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub player_id: Option<u64>,
    pub auth_token: Option<String>,
    pub linked_address: Option<String>,
    pub farm_address: Option<String>,
    pub pending_action: Option<WalletAction>,
    pub transaction_id: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingContext {
    pub player_id: Option<u64>,
    pub wallet_address: Option<String>,
    pub wallet_name: Option<String>,
    pub linked_address: Option<String>,
    pub farm_address: Option<String>,
    pub farm_id: Option<u64>,
    pub nft_id: Option<u64>,
    pub auth_token: Option<String>,
    pub transaction_id: Option<String>,
    pub pending_action: Option<WalletAction>,
    pub signature: Option<String>,
    pub nft_ready_at: Option<DateTime<Utc>>,
    pub error_code: Option<String>,
}

impl OnboardingContext {
    /// Copies the session fields in, treating empty strings and player id 0 as absent.
    pub fn with_session(mut self, session: Session) -> Self {
        self.player_id = session.player_id.filter(|id| *id != 0);
        self.auth_token = non_empty(session.auth_token);
        self.linked_address = non_empty(session.linked_address);
        self.farm_address = non_empty(session.farm_address);
        self.pending_action = session.pending_action;
        self.transaction_id = non_empty(session.transaction_id);
        self
    }

    /// A missing action is treated as requiring an NFT.
    pub fn requires_nft(&self) -> bool {
        !self.pending_action.is_some_and(WalletAction::is_nft_exempt)
    }

    pub fn is_missing_farm(&self) -> bool {
        self.requires_nft() && self.farm_address.is_none()
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
