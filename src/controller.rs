use crate::{
    challenge::challenge_digest,
    clock::Clock,
    config::OnboardingConfig,
    errors::ServiceError,
    event::WalletEvent,
    machine::{
        Effect,
        Invocation,
        MintReceipt,
        OnboardingSnapshot,
        Outcome,
        Progress,
        Ticket,
        WalletMachine,
    },
    services::{
        MintRequest,
        ServiceResult,
        WalletServices,
    },
    state::WalletState,
};
use futures::{
    StreamExt,
    future::BoxFuture,
    stream::FuturesUnordered,
};
use tokio::{
    sync::{
        mpsc,
        watch,
    },
    task::JoinHandle,
};
use tracing::{
    debug,
    info,
    warn,
};

/// Drives a [`WalletMachine`] against real services. `send` returns once the flow is
/// idle again, so no other event can interleave with an in-flight call.
pub struct WalletOnboardingController<S, C> {
    machine: WalletMachine,
    services: S,
    clock: C,
}

impl<S: WalletServices, C: Clock> WalletOnboardingController<S, C> {
    pub fn new(services: S, clock: C, config: OnboardingConfig) -> Self {
        Self {
            machine: WalletMachine::new(config),
            services,
            clock,
        }
    }

    pub fn state(&self) -> WalletState {
        self.machine.state()
    }

    pub fn snapshot(&self) -> OnboardingSnapshot {
        self.machine.snapshot()
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub async fn send(&mut self, event: WalletEvent) -> OnboardingSnapshot {
        let mut progress = self.machine.dispatch(event, self.clock.now());
        while let Progress::Invoke(Invocation { ticket, effect }) = progress {
            let outcome = perform(&self.services, &self.clock, effect).await;
            progress = self.machine.complete(ticket, outcome, self.clock.now());
        }
        self.snapshot()
    }
}

/// Runs the external call behind `effect`.
pub async fn perform<S, C>(services: &S, clock: &C, effect: Effect) -> Outcome
where
    S: WalletServices,
    C: Clock,
{
    let name = effect.name();
    let outcome = match effect {
        Effect::ConnectWallet { provider } => {
            info!(%provider, "connecting wallet");
            Outcome::Connected(services.connect_wallet(&provider).await)
        }
        Effect::SignChallenge { address, message } => {
            info!(%address, challenge = %challenge_digest(&message), "requesting signature");
            Outcome::Signed(services.sign_challenge(&address, &message).await)
        }
        Effect::LinkWallet(request) => {
            info!(player_id = request.player_id, address = %request.address, "linking wallet");
            Outcome::Linked(services.link_wallet(request).await)
        }
        Effect::MintFarm(request) => {
            info!(player_id = request.player_id, address = %request.address, "ensuring farm");
            Outcome::Minted(ensure_farm(services, clock, request).await)
        }
        Effect::MigrateFarm(request) => {
            info!(player_id = request.player_id, "migrating farm");
            Outcome::Migrated(services.migrate_farm(request).await)
        }
    };
    if let Some(err) = outcome_error(&outcome) {
        warn!(effect = name, error = %err, "invocation failed");
    }
    outcome
}

/// Reuses a farm that already exists on chain, otherwise mints one.
async fn ensure_farm<S, C>(
    services: &S,
    clock: &C,
    request: MintRequest,
) -> ServiceResult<MintReceipt>
where
    S: WalletServices,
    C: Clock,
{
    let status = services.farm_status(&request.address).await?;
    if let Some(created_at) = status.created_at
        && !status.farms.is_empty()
    {
        debug!(%created_at, farms = status.farms.len(), "farm already minted");
        return Ok(MintReceipt::AlreadySettled { created_at });
    }
    services.mint_farm(request).await?;
    Ok(MintReceipt::Submitted { at: clock.now() })
}

fn outcome_error(outcome: &Outcome) -> Option<&ServiceError> {
    match outcome {
        Outcome::Connected(Err(err))
        | Outcome::Signed(Err(err))
        | Outcome::Linked(Err(err))
        | Outcome::Minted(Err(err))
        | Outcome::Migrated(Err(err)) => Some(err),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
#[error("onboarding task has stopped")]
pub struct HandleClosed;

/// A controller running on its own task. Events may arrive while a call is in flight;
/// RESET and wallet events supersede it and its late result is dropped.
pub struct OnboardingHandle {
    events: mpsc::UnboundedSender<WalletEvent>,
    snapshots: watch::Receiver<OnboardingSnapshot>,
    task: JoinHandle<()>,
}

impl OnboardingHandle {
    pub fn spawn<S, C>(services: S, clock: C, config: OnboardingConfig) -> Self
    where
        S: WalletServices + Send + Sync + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let machine = WalletMachine::new(config);
        let (snapshot_tx, snapshots) = watch::channel(machine.snapshot());
        let (events, event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_onboarding(
            services,
            clock,
            machine,
            event_rx,
            snapshot_tx,
        ));
        Self {
            events,
            snapshots,
            task,
        }
    }

    pub fn send(&self, event: WalletEvent) -> Result<(), HandleClosed> {
        self.events.send(event).map_err(|_| HandleClosed)
    }

    pub fn snapshot(&self) -> OnboardingSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OnboardingSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&OnboardingSnapshot) -> bool,
    ) -> Result<OnboardingSnapshot, HandleClosed> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| HandleClosed)?;
        Ok(snapshot.clone())
    }

    /// Stops accepting events and waits for the task to finish.
    pub async fn shutdown(self) {
        drop(self.events);
        if let Err(err) = self.task.await {
            warn!(?err, "onboarding task ended abnormally");
        }
    }
}

async fn run_onboarding<S, C>(
    services: S,
    clock: C,
    mut machine: WalletMachine,
    mut events: mpsc::UnboundedReceiver<WalletEvent>,
    snapshots: watch::Sender<OnboardingSnapshot>,
) where
    S: WalletServices + Send + Sync,
    C: Clock + Send + Sync,
{
    // Superseded calls stay here until they finish; their results come back stale.
    let mut pending: FuturesUnordered<BoxFuture<'_, (Ticket, Outcome)>> =
        FuturesUnordered::new();

    info!("onboarding task started");
    loop {
        let progress = tokio::select! {
            event = events.recv() => match event {
                Some(event) => machine.dispatch(event, clock.now()),
                None => break,
            },
            Some((ticket, outcome)) = pending.next(), if !pending.is_empty() => {
                machine.complete(ticket, outcome, clock.now())
            }
        };
        if let Progress::Invoke(invocation) = progress {
            pending.push(start(&services, &clock, invocation));
        }
        snapshots.send_replace(machine.snapshot());
    }
    info!(state = ?machine.state(), "onboarding task stopped");
}

fn start<'a, S, C>(
    services: &'a S,
    clock: &'a C,
    invocation: Invocation,
) -> BoxFuture<'a, (Ticket, Outcome)>
where
    S: WalletServices + Sync,
    C: Clock + Sync,
{
    Box::pin(async move {
        let outcome = perform(services, clock, invocation.effect).await;
        (invocation.ticket, outcome)
    })
}
