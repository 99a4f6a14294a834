//! Runs scenarios through a [`Wallet`] and collects what happened.

use crate::error::DemoError;
use crate::scenarios::{Action, Scenario, ScenarioBook};
use crate::simulator::{Policy, SimulatedWallet};

use wallet_sdk::codec::{self, WireTransaction};
use wallet_sdk::transport::Host;
use wallet_sdk::transport::memory::MemoryHost;
use wallet_sdk::{Wallet, WalletConfig, WalletError};

use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::time::timeout;

/// Upper bound for one scenario, connect included.
pub const SCENARIO_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEMO_ACCOUNT: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Outcome {
    Success {
        result: Value,
    },
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<i64>,
    },
}

impl Outcome {
    fn failed(error: &WalletError) -> Self {
        Outcome::Failed {
            error: error.to_string(),
            code: error.code(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub key: String,
    pub name: String,
    pub method: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Runs demo scenarios against a simulated LiquidRoute wallet
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(name = "wallet-demo", version)]
pub struct DemoOptions {
    /// Scenario keys to run, in order; all when empty
    #[arg(value_name = "SCENARIO")]
    pub scenarios: Vec<String>,

    /// Present the wallet in a popup instead of an embedded frame
    #[arg(long = "popup")]
    pub prefer_popup: bool,

    /// Method the simulated user rejects (repeatable)
    #[arg(long, value_name = "METHOD")]
    pub reject: Vec<String>,
}

impl DemoOptions {
    fn policy(&self) -> Policy {
        self.reject
            .iter()
            .fold(Policy::approve_all(DEMO_ACCOUNT), |policy, method| {
                policy.rejecting(method.as_str())
            })
    }
}

/// Runs one scenario, connecting first when needed. Never fails: wallet
/// errors end up in the report.
pub async fn run_scenario(wallet: &Wallet, scenario: &Scenario) -> ScenarioReport {
    info!("Running scenario '{}' ({})", scenario.key, scenario.name);

    let outcome = match timeout(SCENARIO_TIMEOUT, execute(wallet, scenario)).await {
        Ok(Ok(result)) => Outcome::Success { result },
        Ok(Err(ScenarioFailure::Wallet(error))) => {
            warn!("Scenario '{}' failed: {error}", scenario.key);
            Outcome::failed(&error)
        }
        Ok(Err(ScenarioFailure::Demo(error))) => Outcome::Failed {
            error: error.to_string(),
            code: None,
        },
        Err(_) => {
            warn!("Scenario '{}' timed out", scenario.key);
            Outcome::Failed {
                error: format!("Timed out after {}s", SCENARIO_TIMEOUT.as_secs()),
                code: None,
            }
        }
    };

    ScenarioReport {
        key: scenario.key.clone(),
        name: scenario.name.clone(),
        method: scenario.method.clone(),
        outcome,
    }
}

enum ScenarioFailure {
    Wallet(WalletError),
    Demo(DemoError),
}

impl From<WalletError> for ScenarioFailure {
    fn from(error: WalletError) -> Self {
        ScenarioFailure::Wallet(error)
    }
}

async fn execute(wallet: &Wallet, scenario: &Scenario) -> Result<Value, ScenarioFailure> {
    let action = scenario.action().map_err(ScenarioFailure::Demo)?;
    if !wallet.is_connected() {
        wallet.connect().await?;
    }

    let result = match action {
        Action::SignMessage(message) => {
            let signature = wallet.sign_message(&message).await?;
            json!({ "signature": codec::encode(&signature) })
        }
        Action::SignTransaction(bytes) => {
            let signed = wallet
                .sign_transaction(&WireTransaction::Legacy(bytes))
                .await?;
            json!({ "signedTransaction": codec::encode(signed.bytes()) })
        }
        Action::Request { method, params } => wallet.request(method, Some(params)).await?,
    };
    Ok(result)
}

/// Runs the selected scenarios against a simulated wallet on an in-memory host.
///
/// Must run inside a [`tokio::task::LocalSet`]; the simulator is a local task.
pub async fn run_demo(
    config: WalletConfig,
    book: &ScenarioBook,
    options: &DemoOptions,
) -> Result<Vec<ScenarioReport>, DemoError> {
    let scenarios = book.select(&options.scenarios)?;
    let prefer_popup = config.prefer_popup || options.prefer_popup;
    let config = config.with_prefer_popup(prefer_popup);

    let host = MemoryHost::new();
    let shared: Rc<dyn Host> = Rc::new(host.clone());
    let wallet = Wallet::new(config, shared)?;
    info!(
        "Demo wallet at {} ({:?})",
        wallet.config().wallet_url,
        wallet.transport_kind()
    );

    let simulator = SimulatedWallet::new(
        host.clone(),
        wallet.config().origin.as_str(),
        options.policy(),
    );
    let serving = tokio::task::spawn_local(simulator.run());

    let mut reports = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        reports.push(run_scenario(&wallet, scenario).await);
    }

    if wallet.is_connected() {
        match timeout(SCENARIO_TIMEOUT, wallet.disconnect()).await {
            Ok(Ok(())) => info!("Demo wallet disconnected"),
            Ok(Err(e)) => warn!("Disconnect failed: {e}"),
            Err(_) => warn!("Disconnect timed out"),
        }
    }
    wallet.destroy();
    serving.abort();

    let succeeded = reports.iter().filter(|r| r.outcome.is_success()).count();
    info!("{succeeded}/{} scenario(s) succeeded", reports.len());
    Ok(reports)
}
