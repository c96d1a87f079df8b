use crate::{
    challenge::{
        challenge_message,
        challenge_nonce,
    },
    config::OnboardingConfig,
    context::{
        OnboardingContext,
        non_empty,
    },
    errors::{
        ALREADY_HAS_FARM,
        MISSING_SESSION,
        ServiceError,
        WALLET_ALREADY_LINKED,
        WRONG_CHAIN,
        WalletProvider,
    },
    event::WalletEvent,
    services::{
        ConnectedWallet,
        LinkRequest,
        MigrateRequest,
        MigratedFarm,
        MintRequest,
        ServiceResult,
    },
    state::WalletState,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::Serialize;
use tracing::{
    debug,
    info,
    warn,
};

/// The single external call a state asks the driver to perform.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    ConnectWallet { provider: WalletProvider },
    SignChallenge { address: String, message: String },
    LinkWallet(LinkRequest),
    MintFarm(MintRequest),
    MigrateFarm(MigrateRequest),
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::ConnectWallet { .. } => "connect_wallet",
            Effect::SignChallenge { .. } => "sign_challenge",
            Effect::LinkWallet(_) => "link_wallet",
            Effect::MintFarm(_) => "mint_farm",
            Effect::MigrateFarm(_) => "migrate_farm",
        }
    }
}

/// How the farm NFT came to exist once the mint step finished.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MintReceipt {
    /// The account was created earlier and still owns a farm.
    AlreadySettled { created_at: DateTime<Utc> },
    /// A mint was submitted just now.
    Submitted { at: DateTime<Utc> },
}

impl MintReceipt {
    pub fn ready_at(&self, window: chrono::Duration) -> Option<DateTime<Utc>> {
        match self {
            MintReceipt::AlreadySettled { created_at } => {
                created_at.checked_add_signed(window)
            }
            MintReceipt::Submitted { at } => at.checked_add_signed(window),
        }
    }
}

/// Result of an [`Effect`], fed back into the machine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    Connected(ServiceResult<ConnectedWallet>),
    Signed(ServiceResult<String>),
    Linked(ServiceResult<()>),
    Minted(ServiceResult<MintReceipt>),
    Migrated(ServiceResult<MigratedFarm>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Input {
    Event(WalletEvent),
    Completed(Outcome),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Step {
    pub state: WalletState,
    pub context: OnboardingContext,
    pub effect: Option<Effect>,
    pub accepted: bool,
}

impl Step {
    fn settle(state: WalletState, context: OnboardingContext) -> Self {
        Self {
            state,
            context,
            effect: None,
            accepted: true,
        }
    }

    fn invoke(state: WalletState, context: OnboardingContext, effect: Effect) -> Self {
        Self {
            state,
            context,
            effect: Some(effect),
            accepted: true,
        }
    }

    fn ignored(state: WalletState, context: OnboardingContext) -> Self {
        Self {
            state,
            context,
            effect: None,
            accepted: false,
        }
    }

    fn fail(mut context: OnboardingContext, code: impl Into<String>) -> Self {
        context.error_code = Some(code.into());
        Self::settle(WalletState::Error, context)
    }

    fn conflict(
        state: WalletState,
        mut context: OnboardingContext,
        code: &'static str,
    ) -> Self {
        context.error_code = Some(code.to_string());
        Self::settle(state, context)
    }
}

/// Pure transition function. Never performs I/O; the returned effect is the call the
/// driver must make next.
pub fn transition(
    state: WalletState,
    context: OnboardingContext,
    input: Input,
    now: DateTime<Utc>,
    config: &OnboardingConfig,
) -> Step {
    match input {
        Input::Event(event) => on_event(state, context, event, now, config),
        Input::Completed(outcome) => on_outcome(state, context, outcome, now, config),
    }
}

fn on_event(
    state: WalletState,
    context: OnboardingContext,
    event: WalletEvent,
    now: DateTime<Utc>,
    config: &OnboardingConfig,
) -> Step {
    use WalletState::*;

    match (state, event) {
        (_, WalletEvent::Reset) => Step::settle(ChooseWallet, OnboardingContext::default()),
        (_, WalletEvent::ChainChanged | WalletEvent::AccountChanged) => {
            Step::settle(ChooseWallet, context)
        }
        (state, WalletEvent::Initialise(session)) if !state.is_suspending() => {
            enter_verifying(context.with_session(session), now, config)
        }
        (ChooseWallet, WalletEvent::ConnectToWallet { provider }) => {
            Step::invoke(Connecting, context, Effect::ConnectWallet { provider })
        }
        (RequiresNft, WalletEvent::Mint) => enter_minting(context),
        (WaitingForMint, WalletEvent::Continue) => enter_migrating(context),
        (state, _) => Step::ignored(state, context),
    }
}

fn on_outcome(
    state: WalletState,
    mut context: OnboardingContext,
    outcome: Outcome,
    now: DateTime<Utc>,
    config: &OnboardingConfig,
) -> Step {
    use WalletState::*;

    match (state, outcome) {
        (Connecting, Outcome::Connected(Ok(wallet))) => {
            context.wallet_address = non_empty(Some(wallet.address));
            context.wallet_name = non_empty(Some(wallet.wallet_name));
            enter_verifying(context, now, config)
        }
        (Connecting, Outcome::Connected(Err(ServiceError::WrongChain))) => {
            Step::conflict(WrongNetwork, context, WRONG_CHAIN)
        }
        (Connecting, Outcome::Connected(Err(ServiceError::ProviderUnavailable(provider)))) => {
            let code = config.provider_errors.code_for(&provider).to_string();
            Step::fail(context, code)
        }
        (Connecting, Outcome::Connected(Err(err))) => Step::fail(context, err.to_string()),

        (Signing, Outcome::Signed(Ok(signature))) => {
            context.signature = Some(signature);
            // No player id means the login screen: the signature is all that is needed.
            if context.player_id.is_none() {
                Step::settle(Ready, context)
            } else {
                enter_linking(context)
            }
        }
        (Signing, Outcome::Signed(Err(err))) => Step::fail(context, err.to_string()),

        (Linking, Outcome::Linked(Ok(()))) => {
            context.linked_address = context.wallet_address.clone();
            if context.is_missing_farm() {
                Step::settle(RequiresNft, context)
            } else {
                Step::settle(Ready, context)
            }
        }
        (Linking, Outcome::Linked(Err(ServiceError::WalletAlreadyLinked))) => {
            Step::conflict(AlreadyLinked, context, WALLET_ALREADY_LINKED)
        }
        (Linking, Outcome::Linked(Err(err))) => Step::fail(context, err.to_string()),

        (Minting, Outcome::Minted(Ok(receipt))) => {
            // An unrepresentable ready time never elapses; only CONTINUE moves on.
            match config
                .settlement_window()
                .and_then(|window| receipt.ready_at(window))
            {
                Some(ready_at) if now > ready_at => enter_migrating(context),
                ready_at => {
                    context.nft_ready_at = ready_at;
                    Step::settle(WaitingForMint, context)
                }
            }
        }
        (Minting, Outcome::Minted(Err(ServiceError::AlreadyHasFarm))) => {
            Step::conflict(AlreadyHasFarm, context, ALREADY_HAS_FARM)
        }
        (Minting, Outcome::Minted(Err(err))) => Step::fail(context, err.to_string()),

        (Migrating, Outcome::Migrated(Ok(farm))) => {
            context.farm_address = Some(farm.farm_address);
            context.farm_id = Some(farm.farm_id);
            context.nft_id = Some(farm.nft_id);
            Step::settle(Ready, context)
        }
        (Migrating, Outcome::Migrated(Err(err))) => Step::fail(context, err.to_string()),

        (state, _) => Step::ignored(state, context),
    }
}

/// Checks run in a fixed order: a wallet mismatch wins over a missing signature,
/// which wins over a missing farm.
fn enter_verifying(
    context: OnboardingContext,
    now: DateTime<Utc>,
    config: &OnboardingConfig,
) -> Step {
    let Some(address) = context.wallet_address.clone() else {
        return Step::settle(WalletState::ChooseWallet, context);
    };
    match context.linked_address.clone() {
        Some(linked) if linked != address => Step::settle(WalletState::WrongWallet, context),
        None => {
            let nonce = challenge_nonce(now, config.nonce_bucket_secs);
            let message = challenge_message(&config.challenge_greeting, &address, nonce);
            Step::invoke(
                WalletState::Signing,
                context,
                Effect::SignChallenge { address, message },
            )
        }
        Some(_) if context.is_missing_farm() => {
            Step::settle(WalletState::RequiresNft, context)
        }
        Some(_) => Step::settle(WalletState::Ready, context),
    }
}

fn enter_linking(context: OnboardingContext) -> Step {
    let request = match (
        context.player_id,
        &context.auth_token,
        &context.wallet_address,
        &context.signature,
        &context.transaction_id,
    ) {
        (
            Some(player_id),
            Some(auth_token),
            Some(address),
            Some(signature),
            Some(transaction_id),
        ) => LinkRequest {
            player_id,
            auth_token: auth_token.clone(),
            address: address.clone(),
            signature: signature.clone(),
            transaction_id: transaction_id.clone(),
        },
        _ => return Step::fail(context, MISSING_SESSION),
    };
    Step::invoke(WalletState::Linking, context, Effect::LinkWallet(request))
}

fn enter_minting(context: OnboardingContext) -> Step {
    let request = match (
        &context.wallet_address,
        context.player_id,
        &context.auth_token,
        &context.transaction_id,
    ) {
        (Some(address), Some(player_id), Some(auth_token), Some(transaction_id)) => {
            MintRequest {
                address: address.clone(),
                player_id,
                auth_token: auth_token.clone(),
                transaction_id: transaction_id.clone(),
            }
        }
        _ => return Step::fail(context, MISSING_SESSION),
    };
    Step::invoke(WalletState::Minting, context, Effect::MintFarm(request))
}

fn enter_migrating(context: OnboardingContext) -> Step {
    let request = match (
        context.player_id,
        &context.auth_token,
        &context.transaction_id,
    ) {
        (Some(player_id), Some(auth_token), Some(transaction_id)) => MigrateRequest {
            player_id,
            auth_token: auth_token.clone(),
            transaction_id: transaction_id.clone(),
        },
        _ => return Step::fail(context, MISSING_SESSION),
    };
    Step::invoke(WalletState::Migrating, context, Effect::MigrateFarm(request))
}

/// Identifies one issued invocation. Completions carrying any other ticket are stale.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct Ticket(u64);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Invocation {
    pub ticket: Ticket,
    pub effect: Effect,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Progress {
    /// The input does not apply to the current state; nothing changed.
    Ignored,
    /// The completion belongs to a superseded invocation and was dropped.
    Stale,
    /// The machine moved and is now idle.
    Settled,
    /// The machine moved and waits on this invocation.
    Invoke(Invocation),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingSnapshot {
    pub state: WalletState,
    pub context: OnboardingContext,
    pub in_flight: bool,
}

/// Owns the single mutable state/context pair and tracks which invocation, if any,
/// is outstanding.
#[derive(Debug)]
pub struct WalletMachine {
    config: OnboardingConfig,
    state: WalletState,
    context: OnboardingContext,
    epoch: u64,
    in_flight: Option<Ticket>,
}

impl WalletMachine {
    pub fn new(config: OnboardingConfig) -> Self {
        Self {
            config,
            state: WalletState::ChooseWallet,
            context: OnboardingContext::default(),
            epoch: 0,
            in_flight: None,
        }
    }

    pub fn config(&self) -> &OnboardingConfig {
        &self.config
    }

    pub fn state(&self) -> WalletState {
        self.state
    }

    pub fn context(&self) -> &OnboardingContext {
        &self.context
    }

    pub fn in_flight(&self) -> Option<Ticket> {
        self.in_flight
    }

    pub fn snapshot(&self) -> OnboardingSnapshot {
        OnboardingSnapshot {
            state: self.state,
            context: self.context.clone(),
            in_flight: self.in_flight.is_some(),
        }
    }

    pub fn dispatch(&mut self, event: WalletEvent, now: DateTime<Utc>) -> Progress {
        let name = event.name();
        let step = transition(
            self.state,
            std::mem::take(&mut self.context),
            Input::Event(event),
            now,
            &self.config,
        );
        if !step.accepted {
            debug!(event = name, state = ?self.state, "event ignored");
        }
        self.apply(step)
    }

    pub fn complete(
        &mut self,
        ticket: Ticket,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> Progress {
        if self.in_flight != Some(ticket) {
            warn!(?ticket, state = ?self.state, "discarding stale completion");
            return Progress::Stale;
        }
        let step = transition(
            self.state,
            std::mem::take(&mut self.context),
            Input::Completed(outcome),
            now,
            &self.config,
        );
        self.apply(step)
    }

    fn apply(&mut self, step: Step) -> Progress {
        let Step {
            state,
            context,
            effect,
            accepted,
        } = step;
        self.context = context;
        if !accepted {
            return Progress::Ignored;
        }
        if state != self.state {
            info!(from = ?self.state, to = ?state, "wallet state changed");
        }
        self.state = state;
        self.in_flight = None;
        if let Some(code) = &self.context.error_code
            && state.is_terminal_error()
        {
            warn!(state = ?state, error_code = %code, "onboarding stopped");
        }
        match effect {
            Some(effect) => {
                self.epoch += 1;
                let ticket = Ticket(self.epoch);
                self.in_flight = Some(ticket);
                Progress::Invoke(Invocation { ticket, effect })
            }
            None => Progress::Settled,
        }
    }
}
