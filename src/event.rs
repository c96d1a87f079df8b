use crate::{
    context::Session,
    errors::WalletProvider,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Events a UI layer (or the wallet provider) submits to the onboarding flow.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletEvent {
    ConnectToWallet { provider: WalletProvider },
    Continue,
    Reset,
    Mint,
    Initialise(Session),
    ChainChanged,
    AccountChanged,
}

impl WalletEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WalletEvent::ConnectToWallet { .. } => "CONNECT_TO_WALLET",
            WalletEvent::Continue => "CONTINUE",
            WalletEvent::Reset => "RESET",
            WalletEvent::Mint => "MINT",
            WalletEvent::Initialise(_) => "INITIALISE",
            WalletEvent::ChainChanged => "CHAIN_CHANGED",
            WalletEvent::AccountChanged => "ACCOUNT_CHANGED",
        }
    }

    /// Events that supersede whatever the flow is doing, including in-flight calls.
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            WalletEvent::Reset | WalletEvent::ChainChanged | WalletEvent::AccountChanged
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::context::WalletAction;

    #[test]
    fn wallet_event__deserializes_tagged_json() {
        // given
        let raw = r#"[
            {"type": "CONNECT_TO_WALLET", "provider": "phantom"},
            {"type": "INITIALISE", "playerId": 3, "authToken": "jwt", "pendingAction": "purchase"},
            {"type": "CHAIN_CHANGED"}
        ]"#;

        // when
        let events: Vec<WalletEvent> = serde_json::from_str(raw).unwrap();

        // then
        assert_eq!(
            events[0],
            WalletEvent::ConnectToWallet {
                provider: WalletProvider::new("phantom")
            }
        );
        let WalletEvent::Initialise(session) = &events[1] else {
            panic!("expected INITIALISE, got {:?}", events[1]);
        };
        assert_eq!(session.player_id, Some(3));
        assert_eq!(session.pending_action, Some(WalletAction::Purchase));
        assert!(events[2].is_global());
    }
}
