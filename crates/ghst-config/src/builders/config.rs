//! Configuration builder for tests and local development.

use crate::{AccountConfig, Config, ContractsConfig, HarnessConfig, NetworkConfig};
use ghst_types::{Address, U256};
use std::collections::HashMap;

/// Builds a [`Config`] backed by a local-key account.
///
/// Defaults target a local node on port 8545 with the Polygon deployment
/// addresses; every account field defaults to the zero address and must be
/// set for anything beyond parsing tests.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	rpc_url: String,
	chain_id: u64,
	contracts: ContractsConfig,
	private_key: String,
	probe_accounts: Vec<Address>,
	spender: Address,
	delegatee: Address,
	depositor: Option<Address>,
	permit_value: U256,
	deadline: u64,
	mine_blocks: u64,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			rpc_url: "http://127.0.0.1:8545".to_string(),
			chain_id: ghst_types::CHAIN_ID,
			contracts: ContractsConfig::default(),
			private_key: String::new(),
			probe_accounts: Vec::new(),
			spender: Address::ZERO,
			delegatee: Address::ZERO,
			depositor: None,
			permit_value: U256::from(10_000),
			deadline: 20_469_493_830,
			mine_blocks: 1,
		}
	}

	pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
		self.rpc_url = url.into();
		self
	}

	pub fn chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = chain_id;
		self
	}

	pub fn proxy(mut self, proxy: Address) -> Self {
		self.contracts.proxy = proxy;
		self
	}

	pub fn private_key(mut self, key: impl Into<String>) -> Self {
		self.private_key = key.into();
		self
	}

	pub fn probe_accounts(mut self, accounts: Vec<Address>) -> Self {
		self.probe_accounts = accounts;
		self
	}

	pub fn spender(mut self, spender: Address) -> Self {
		self.spender = spender;
		self
	}

	pub fn delegatee(mut self, delegatee: Address) -> Self {
		self.delegatee = delegatee;
		self
	}

	pub fn depositor(mut self, depositor: Address) -> Self {
		self.depositor = Some(depositor);
		self
	}

	pub fn deadline(mut self, deadline: u64) -> Self {
		self.deadline = deadline;
		self
	}

	pub fn build(self) -> Config {
		let mut local = toml::Table::new();
		local.insert(
			"private_key".to_string(),
			toml::Value::String(self.private_key),
		);
		let mut implementations = HashMap::new();
		implementations.insert("local".to_string(), toml::Value::Table(local));

		Config {
			network: NetworkConfig {
				rpc_url: self.rpc_url,
				chain_id: self.chain_id,
			},
			contracts: self.contracts,
			account: AccountConfig {
				primary: "local".to_string(),
				implementations,
			},
			harness: HarnessConfig {
				probe_accounts: self.probe_accounts,
				spender: self.spender,
				delegatee: self.delegatee,
				depositor: self.depositor,
				permit_value: self.permit_value,
				deadline: self.deadline,
				mine_blocks: self.mine_blocks,
			},
		}
	}
}
