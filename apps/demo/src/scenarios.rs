//! Demo scenarios: what the demo asks the wallet to do.
//!
//! Scenarios are data, loaded from TOML. The built-in book ships inside the
//! binary; a custom book can be loaded from disk with [`ScenarioBook::load`].

use crate::error::DemoError;

use wallet_sdk::protocol::Method;

use std::collections::HashSet;
use std::path::Path;

use log::{debug, info};
use serde::Deserialize;
use serde_json::{Map, Value, json};

const BUILT_IN_SCENARIOS: &str = include_str!("../scenarios.toml");

/// Size of the placeholder transaction signed by `signTransaction` scenarios.
const DEFAULT_TRANSACTION_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub key: String,
    pub name: String,
    pub description: String,
    pub method: String,
    /// UTF-8 text for `signMessage` scenarios.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub transaction_size: Option<usize>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub calls: Vec<Value>,
}

/// How a scenario is carried out against the wallet.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SignMessage(Vec<u8>),
    SignTransaction(Vec<u8>),
    Request { method: Method, params: Value },
}

impl Scenario {
    pub fn action(&self) -> Result<Action, DemoError> {
        match Method::from(self.method.as_str()) {
            Method::SignMessage => {
                let message = self.message.as_deref().ok_or_else(|| {
                    DemoError::scenario(format!("Scenario '{}' has no message", self.key))
                })?;
                Ok(Action::SignMessage(message.as_bytes().to_vec()))
            }
            Method::SignTransaction => {
                let size = self.transaction_size.unwrap_or(DEFAULT_TRANSACTION_SIZE);
                Ok(Action::SignTransaction(vec![0; size]))
            }
            Method::Connect | Method::Disconnect => Err(DemoError::scenario(format!(
                "Scenario '{}' uses reserved method '{}'",
                self.key, self.method
            ))),
            method => Ok(Action::Request {
                params: self.call_params(),
                method,
            }),
        }
    }

    /// `[{ method, metadata, calls }]`, the batch shape wallets expect for
    /// `wallet_sendCalls`.
    fn call_params(&self) -> Value {
        let mut call = Map::new();
        call.insert("method".into(), json!(self.method));
        if let Some(metadata) = &self.metadata {
            call.insert("metadata".into(), metadata.clone());
        }
        call.insert("calls".into(), Value::Array(self.calls.clone()));
        Value::Array(vec![Value::Object(call)])
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioBook {
    #[serde(rename = "scenario", default)]
    scenarios: Vec<Scenario>,
}

impl ScenarioBook {
    pub fn built_in() -> Result<Self, DemoError> {
        Self::parse(BUILT_IN_SCENARIOS)
    }

    pub fn load(path: &Path) -> Result<Self, DemoError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DemoError::scenario(format!("Failed to read {}: {e}", path.display()))
        })?;
        let book = Self::parse(&contents)?;
        info!(
            "Loaded {} scenario(s) from {}",
            book.scenarios.len(),
            path.display()
        );
        Ok(book)
    }

    pub fn parse(contents: &str) -> Result<Self, DemoError> {
        let book: ScenarioBook = toml::from_str(contents)
            .map_err(|e| DemoError::scenario(format!("Invalid scenario book: {e}")))?;
        book.validate()?;
        debug!("Parsed {} scenario(s)", book.scenarios.len());
        Ok(book)
    }

    fn validate(&self) -> Result<(), DemoError> {
        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            if !seen.insert(scenario.key.as_str()) {
                return Err(DemoError::scenario(format!(
                    "Duplicate scenario key '{}'",
                    scenario.key
                )));
            }
            scenario.action()?;
        }
        Ok(())
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn get(&self, key: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.key == key)
    }

    /// The scenarios named in `keys`, in that order; all of them when empty.
    pub fn select(&self, keys: &[String]) -> Result<Vec<&Scenario>, DemoError> {
        if keys.is_empty() {
            return Ok(self.scenarios.iter().collect());
        }

        keys.iter()
            .map(|key| {
                self.get(key)
                    .ok_or_else(|| DemoError::scenario(format!("Unknown scenario '{key}'")))
            })
            .collect()
    }
}
