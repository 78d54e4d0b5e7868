//! Configuration for the GHST upgrade verifier.
//!
//! A single TOML file describes the node to talk to, the deployment under
//! test, the signing account and the parameters of the upgrade checks.
//! `${VAR}` and `${VAR:-default}` references are resolved from the
//! environment before parsing, so private keys never need to live in the file.

pub mod builders;

use ghst_types::{
	Address, CHAIN_ID, NEW_IMPLEMENTATION_ADDRESS, OLD_IMPLEMENTATION_ADDRESS, PROXY_ADDRESS,
	PROXY_ADMIN_ADDRESS, U256,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// The full error embeds the whole input, which may contain keys.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub network: NetworkConfig,
	#[serde(default)]
	pub contracts: ContractsConfig,
	pub account: AccountConfig,
	pub harness: HarnessConfig,
}

/// Node the verifier talks to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// HTTP JSON-RPC endpoint, usually a local fork of Polygon.
	pub rpc_url: String,
	/// Chain id carried in the EIP-712 domain salt.
	#[serde(default = "default_chain_id")]
	pub chain_id: u64,
}

fn default_chain_id() -> u64 {
	CHAIN_ID
}

/// Addresses of the deployment under test. Defaults to the Polygon mainnet
/// deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractsConfig {
	#[serde(default = "default_proxy")]
	pub proxy: Address,
	#[serde(default = "default_proxy_admin")]
	pub proxy_admin: Address,
	#[serde(default = "default_old_implementation")]
	pub old_implementation: Address,
	#[serde(default = "default_new_implementation")]
	pub new_implementation: Address,
}

impl Default for ContractsConfig {
	fn default() -> Self {
		Self {
			proxy: PROXY_ADDRESS,
			proxy_admin: PROXY_ADMIN_ADDRESS,
			old_implementation: OLD_IMPLEMENTATION_ADDRESS,
			new_implementation: NEW_IMPLEMENTATION_ADDRESS,
		}
	}
}

fn default_proxy() -> Address {
	PROXY_ADDRESS
}

fn default_proxy_admin() -> Address {
	PROXY_ADMIN_ADDRESS
}

fn default_old_implementation() -> Address {
	OLD_IMPLEMENTATION_ADDRESS
}

fn default_new_implementation() -> Address {
	NEW_IMPLEMENTATION_ADDRESS
}

/// Configuration for account management.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Which implementation signs.
	pub primary: String,
	/// Map of account implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Parameters of the post-upgrade checks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HarnessConfig {
	/// Accounts whose balances, allowances and nonces are snapshotted.
	pub probe_accounts: Vec<Address>,
	/// Spender named in permits.
	pub spender: Address,
	/// Account votes are delegated to.
	pub delegatee: Address,
	/// Holder of `DEPOSITOR_ROLE` whose membership must survive the upgrade.
	pub depositor: Option<Address>,
	/// Allowance granted by the permit checks.
	#[serde(default = "default_permit_value")]
	pub permit_value: U256,
	/// Deadline and expiry used in signed messages, as a unix timestamp.
	#[serde(default = "default_deadline")]
	pub deadline: u64,
	/// Blocks mined before reading past votes.
	#[serde(default = "default_mine_blocks")]
	pub mine_blocks: u64,
}

fn default_permit_value() -> U256 {
	U256::from(10_000)
}

fn default_deadline() -> u64 {
	20_469_493_830
}

fn default_mine_blocks() -> u64 {
	1
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable
/// `VAR_NAME`, or with `default` for `${VAR_NAME:-default}` when unset.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					name.as_str()
				)))
			},
		};
		result.push_str(&input[last..full.start()]);
		result.push_str(&value);
		last = full.end();
	}
	result.push_str(&input[last..]);
	Ok(result)
}

impl Config {
	/// Loads and validates the configuration at `path`.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path).await?;
		content.parse()
	}

	/// Configuration of the primary account implementation.
	pub fn primary_account(&self) -> Option<&toml::Value> {
		self.account.implementations.get(&self.account.primary)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.network.rpc_url.is_empty() {
			return Err(ConfigError::Validation(
				"network.rpc_url cannot be empty".into(),
			));
		}
		if self.network.chain_id == 0 {
			return Err(ConfigError::Validation(
				"network.chain_id must be greater than 0".into(),
			));
		}

		if self.contracts.old_implementation == self.contracts.new_implementation {
			return Err(ConfigError::Validation(
				"contracts.old_implementation and contracts.new_implementation must differ".into(),
			));
		}
		if self.contracts.proxy.is_zero() {
			return Err(ConfigError::Validation(
				"contracts.proxy cannot be the zero address".into(),
			));
		}

		if self.account.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"Account implementation cannot be empty".into(),
			));
		}
		if self.primary_account().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary account '{}' not found in implementations",
				self.account.primary
			)));
		}

		if self.harness.probe_accounts.is_empty() {
			return Err(ConfigError::Validation(
				"harness.probe_accounts must name at least one account".into(),
			));
		}
		if self.harness.mine_blocks == 0 {
			return Err(ConfigError::Validation(
				"harness.mine_blocks must be at least 1".into(),
			));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const CONFIG: &str = r#"
[network]
rpc_url = "${GHST_TEST_RPC:-http://127.0.0.1:8545}"

[account]
primary = "local"
[account.implementations.local]
private_key = "${GHST_TEST_KEY:-0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80}"

[harness]
probe_accounts = ["0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"]
spender = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
delegatee = "0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"
permit_value = "10000"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("GHST_TEST_HOST", "localhost");
		std::env::set_var("GHST_TEST_PORT", "8545");

		let result = resolve_env_vars("url = \"http://${GHST_TEST_HOST}:${GHST_TEST_PORT}\"").unwrap();
		assert_eq!(result, "url = \"http://localhost:8545\"");

		std::env::remove_var("GHST_TEST_HOST");
		std::env::remove_var("GHST_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let result = resolve_env_vars("value = \"${GHST_MISSING_VAR:-fallback}\"").unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${GHST_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("GHST_MISSING_VAR"));
	}

	#[test]
	fn test_defaults_point_at_polygon_deployment() {
		let config: Config = CONFIG.parse().unwrap();
		assert_eq!(config.network.chain_id, 137);
		assert_eq!(config.contracts.proxy, PROXY_ADDRESS);
		assert_eq!(config.contracts.new_implementation, NEW_IMPLEMENTATION_ADDRESS);
		assert_eq!(config.harness.permit_value, U256::from(10_000));
		assert_eq!(config.harness.deadline, 20_469_493_830);
		assert_eq!(config.harness.mine_blocks, 1);
		assert!(config.harness.depositor.is_none());
		assert!(config.primary_account().is_some());
	}

	#[test]
	fn test_shipped_config_parses() {
		let config: Config = include_str!("../../../config/config.toml").parse().unwrap();
		assert_eq!(config.contracts.proxy_admin, PROXY_ADMIN_ADDRESS);
		assert_eq!(config.account.implementations.len(), 2);
		assert!(config.harness.depositor.is_some());
	}

	#[test]
	fn test_unknown_primary_account_rejected() {
		let config = CONFIG.replace("primary = \"local\"", "primary = \"hsm\"");
		let err = config.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary account 'hsm' not found"));
	}

	#[test]
	fn test_empty_probe_accounts_rejected() {
		let config = CONFIG.replace(
			"probe_accounts = [\"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\"]",
			"probe_accounts = []",
		);
		assert!(matches!(
			config.parse::<Config>(),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_same_implementations_rejected() {
		let config = format!(
			"{}\n[contracts]\nold_implementation = \"{}\"\nnew_implementation = \"{}\"\n",
			CONFIG, NEW_IMPLEMENTATION_ADDRESS, NEW_IMPLEMENTATION_ADDRESS
		);
		assert!(matches!(
			config.parse::<Config>(),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_parse_error_is_reported() {
		let err = "[network\nrpc_url = 1".parse::<Config>().unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[tokio::test]
	async fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(CONFIG.as_bytes()).unwrap();

		let config = Config::from_file(file.path().to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.network.rpc_url, "http://127.0.0.1:8545");
		assert_eq!(config.harness.probe_accounts.len(), 1);
	}

	#[tokio::test]
	async fn test_from_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("missing.toml");
		let err = Config::from_file(path.to_str().unwrap()).await.unwrap_err();
		assert!(matches!(err, ConfigError::Io(_)));
	}
}
