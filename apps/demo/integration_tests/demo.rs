use wallet_demo::runner::{DEMO_ACCOUNT, DemoOptions, Outcome, run_demo, run_scenario};
use wallet_demo::scenarios::ScenarioBook;
use wallet_demo::simulator::{Policy, SimulatedWallet};

use wallet_sdk::protocol::codes;
use wallet_sdk::transport::Host;
use wallet_sdk::transport::memory::MemoryHost;
use wallet_sdk::{Wallet, WalletConfig};

use std::rc::Rc;

use tokio::task::LocalSet;

const WALLET_HOST: &str = "https://wallet.liquidroute.com";

fn options(scenarios: &[&str]) -> DemoOptions {
    DemoOptions {
        scenarios: scenarios.iter().map(|s| s.to_string()).collect(),
        ..DemoOptions::default()
    }
}

/// **VALUE**: Runs every shipped scenario end to end against the simulator.
///
/// **WHY THIS MATTERS**: This is the closest we get to the browser demo page
/// without a browser: real bridge, real readiness handshake, simulated wallet.
///
/// **BUG THIS CATCHES**: Would catch the simulator missing a `ready`, a
/// scenario method the bridge mangles, or the runner leaving the wallet open.
#[tokio::test]
async fn given_built_in_book_when_run_embedded_then_every_scenario_succeeds() {
    // GIVEN: The shipped scenario book
    let book = ScenarioBook::built_in().expect("book parses");

    // WHEN: Running all of them
    let reports = LocalSet::new()
        .run_until(run_demo(
            WalletConfig::new().with_host(WALLET_HOST),
            &book,
            &DemoOptions::default(),
        ))
        .await
        .expect("demo runs");

    // THEN: All seven succeed
    assert_eq!(reports.len(), 7);
    for report in &reports {
        assert!(report.outcome.is_success(), "{} failed: {:?}", report.key, report.outcome);
    }

    let swap = &reports[0];
    assert_eq!(
        swap.outcome,
        Outcome::Success {
            result: serde_json::json!({ "id": "0x1" })
        }
    );
}

#[tokio::test]
async fn given_popup_option_when_run_then_scenarios_succeed_over_detached_transport() {
    let book = ScenarioBook::built_in().expect("book parses");
    let options = DemoOptions {
        prefer_popup: true,
        ..options(&["signMessage", "transfer", "stake"])
    };

    let reports = LocalSet::new()
        .run_until(run_demo(WalletConfig::new().with_host(WALLET_HOST), &book, &options))
        .await
        .expect("demo runs");

    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.outcome.is_success()));
}

/// **VALUE**: Verifies a user rejection shows up in the report with its code.
///
/// **BUG THIS CATCHES**: Would catch a rejection aborting the whole run, or
/// the wallet's 4001 being replaced by a generic error.
#[tokio::test]
async fn given_user_rejects_signing_when_run_then_only_that_scenario_fails() {
    // GIVEN: A simulated user who rejects message signing
    let book = ScenarioBook::built_in().expect("book parses");
    let options = DemoOptions {
        reject: vec!["signMessage".into()],
        ..options(&["signMessage", "defi"])
    };

    // WHEN: Running both scenarios
    let reports = LocalSet::new()
        .run_until(run_demo(WalletConfig::new().with_host(WALLET_HOST), &book, &options))
        .await
        .expect("demo runs");

    // THEN: Signing failed with 4001, the next scenario still ran
    match &reports[0].outcome {
        Outcome::Failed { code, .. } => assert_eq!(*code, Some(codes::USER_REJECTED)),
        other => panic!("Expected failure, got {other:?}"),
    }
    assert!(reports[1].outcome.is_success());
}

#[tokio::test]
async fn given_unknown_scenario_when_run_then_demo_error() {
    let book = ScenarioBook::built_in().expect("book parses");

    let result = LocalSet::new()
        .run_until(run_demo(
            WalletConfig::new().with_host(WALLET_HOST),
            &book,
            &options(&["bogus"]),
        ))
        .await;

    assert!(result.is_err());
}

/// **VALUE**: Verifies the simulator answers methods it does not know with 4200.
///
/// **WHY THIS MATTERS**: Pass-through requests are not validated locally;
/// the wallet's own error is what the caller sees.
#[tokio::test]
async fn given_unsupported_method_when_scenario_runs_then_wallet_error_code_reported() {
    LocalSet::new()
        .run_until(async {
            // GIVEN: A wallet served by the simulator
            let host = MemoryHost::new();
            let shared: Rc<dyn Host> = Rc::new(host.clone());
            let wallet =
                Wallet::new(WalletConfig::new().with_host(WALLET_HOST), shared).expect("valid");
            let simulator = SimulatedWallet::new(
                host.clone(),
                wallet.config().origin.as_str(),
                Policy::approve_all(DEMO_ACCOUNT),
            );
            let serving = tokio::task::spawn_local(simulator.run());

            // WHEN: Running a scenario the wallet does not support
            let book = ScenarioBook::parse(
                "[[scenario]]\nkey = \"caps\"\nname = \"Caps\"\ndescription = \"x\"\nmethod = \"wallet_getCapabilities\"\n",
            )
            .expect("parses");
            let report = run_scenario(&wallet, &book.scenarios()[0]).await;

            // THEN: Connected first, then the wallet's 4200 is reported
            assert_eq!(wallet.account().map(|a| a.to_string()), Some(DEMO_ACCOUNT.into()));
            match report.outcome {
                Outcome::Failed { code, .. } => assert_eq!(code, Some(codes::UNSUPPORTED_METHOD)),
                other => panic!("Expected failure, got {other:?}"),
            }

            wallet.destroy();
            serving.abort();
        })
        .await;
}
