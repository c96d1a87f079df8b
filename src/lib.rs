pub mod challenge;
pub mod clock;
pub mod config;
pub mod context;
pub mod controller;
pub mod errors;
pub mod event;
pub mod machine;
pub mod migration;
pub mod services;
pub mod simulated;
pub mod state;
pub mod telemetry;

pub use config::OnboardingConfig;
pub use context::{
    OnboardingContext,
    Session,
    WalletAction,
};
pub use controller::{
    OnboardingHandle,
    WalletOnboardingController,
};
pub use event::WalletEvent;
pub use machine::{
    OnboardingSnapshot,
    WalletMachine,
    transition,
};
pub use services::WalletServices;
pub use state::WalletState;
