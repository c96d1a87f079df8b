use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WalletState {
    ChooseWallet,
    Connecting,
    /// Decision point evaluated on entry; a snapshot never rests here.
    Verifying,
    Signing,
    Linking,
    RequiresNft,
    Minting,
    WaitingForMint,
    Migrating,
    Ready,
    WrongWallet,
    WrongNetwork,
    AlreadyLinked,
    AlreadyHasFarm,
    Error,
}

impl WalletState {
    pub const ALL: [WalletState; 15] = [
        WalletState::ChooseWallet,
        WalletState::Connecting,
        WalletState::Verifying,
        WalletState::Signing,
        WalletState::Linking,
        WalletState::RequiresNft,
        WalletState::Minting,
        WalletState::WaitingForMint,
        WalletState::Migrating,
        WalletState::Ready,
        WalletState::WrongWallet,
        WalletState::WrongNetwork,
        WalletState::AlreadyLinked,
        WalletState::AlreadyHasFarm,
        WalletState::Error,
    ];

    /// States that hold an external invocation in flight.
    pub fn is_suspending(self) -> bool {
        matches!(
            self,
            WalletState::Connecting
                | WalletState::Signing
                | WalletState::Linking
                | WalletState::Minting
                | WalletState::Migrating
        )
    }

    pub fn is_terminal_error(self) -> bool {
        matches!(
            self,
            WalletState::WrongWallet
                | WalletState::WrongNetwork
                | WalletState::AlreadyLinked
                | WalletState::AlreadyHasFarm
                | WalletState::Error
        )
    }

    pub fn is_ready(self) -> bool {
        self == WalletState::Ready
    }
}

impl fmt::Display for WalletState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
