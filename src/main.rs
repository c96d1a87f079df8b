use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use farm_wallet::{
    OnboardingConfig,
    OnboardingSnapshot,
    WalletOnboardingController,
    clock::{
        Clock,
        ManualClock,
    },
    config::{
        resolve_path,
        seconds,
    },
    simulated::{
        Scenario,
        ScenarioStep,
        SimulatedServices,
    },
    telemetry::init_tracing,
};
use serde::Serialize;

/// Replays an onboarding scenario against simulated wallet, backend and chain services.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON scenario: the simulated world plus the event script.
    #[arg(short, long)]
    scenario: String,

    /// JSON onboarding config. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Also write logs to a daily rolling file in this directory.
    #[arg(long)]
    log_dir: Option<String>,

    #[arg(short, long, default_value = "false")]
    tracing: bool,
}

#[derive(Serialize)]
struct ReplayLine<'a> {
    event: &'static str,
    snapshot: &'a OnboardingSnapshot,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let log_dir = args.log_dir.as_deref().map(resolve_path);
    let _guard = if args.tracing || log_dir.is_some() {
        init_tracing(log_dir.as_deref()).wrap_err("Failed to install tracing subscriber")?
    } else {
        None
    };

    let config = match &args.config {
        Some(raw) => OnboardingConfig::load(resolve_path(raw))
            .map_err(|e| eyre!("{e:#}"))?,
        None => OnboardingConfig::default(),
    };
    let scenario = Scenario::load(resolve_path(&args.scenario))
        .map_err(|e| eyre!("{e:#}"))?;

    let clock = ManualClock::new(scenario.start.unwrap_or_else(chrono::Utc::now));
    let services = SimulatedServices::new(scenario.world, clock.clone());
    let mut controller = WalletOnboardingController::new(services, clock.clone(), config);
    tracing::info!(steps = scenario.steps.len(), "replaying scenario");

    for step in scenario.steps {
        match step {
            ScenarioStep::Wait { wait_secs } => {
                let until = seconds(wait_secs)
                    .and_then(|by| clock.now().checked_add_signed(by))
                    .ok_or_else(|| eyre!("wait_secs {wait_secs} is out of range"))?;
                clock.set(until);
            }
            ScenarioStep::Event(event) => {
                let name = event.name();
                let snapshot = controller.send(event).await;
                let line = serde_json::to_string(&ReplayLine {
                    event: name,
                    snapshot: &snapshot,
                })
                .wrap_err("Failed to serialise snapshot")?;
                println!("{line}");
            }
        }
    }
    Ok(())
}
