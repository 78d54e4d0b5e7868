//! Builds an [`UpgradeHarness`] from configuration.
//!
//! The primary account implementation is selected by name from the account
//! registry. When it exposes a private key, transactions are signed locally
//! with it; otherwise the node is expected to hold the account unlocked.

use crate::harness::UpgradeHarness;
use crate::HarnessError;
use alloy_signer_local::PrivateKeySigner;
use ghst_account::AccountService;
use ghst_config::Config;
use ghst_delivery::implementations::evm::alloy::AlloyToken;
use ghst_delivery::{ProxyInterface, TokenInterface};
use ghst_types::{DomainRecord, DOMAIN_NAME, DOMAIN_VERSION};
use std::sync::Arc;

pub struct HarnessBuilder {
	config: Config,
}

impl HarnessBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Domain the token recomputes digests under: the fixed name and
	/// version, the configured proxy and chain.
	pub fn domain(&self) -> DomainRecord {
		DomainRecord::new(
			DOMAIN_NAME,
			DOMAIN_VERSION,
			self.config.contracts.proxy,
			self.config.network.chain_id,
		)
	}

	/// Account configuration of the primary implementation, with the
	/// network's RPC URL filled in when the implementation needs one and
	/// does not name its own.
	fn account_config(&self) -> Result<toml::Value, HarnessError> {
		let primary = &self.config.account.primary;
		let mut account = self.config.primary_account().cloned().ok_or_else(|| {
			HarnessError::Config(format!("Primary account '{}' is not configured", primary))
		})?;
		if primary == "rpc" {
			if let toml::Value::Table(table) = &mut account {
				if !table.contains_key("rpc_url") {
					table.insert(
						"rpc_url".to_string(),
						toml::Value::String(self.config.network.rpc_url.clone()),
					);
				}
			}
		}
		Ok(account)
	}

	pub fn account(&self) -> Result<AccountService, HarnessError> {
		let primary = &self.config.account.primary;
		let account = AccountService::from_config(primary, &self.account_config()?).map_err(|e| {
			tracing::error!(
				component = "account",
				implementation = %primary,
				error = %e,
				"Failed to create account implementation"
			);
			HarnessError::Config(format!(
				"Failed to create account implementation '{}': {}",
				primary, e
			))
		})?;
		tracing::info!(component = "account", implementation = %primary, "Loaded");
		Ok(account)
	}

	pub async fn build(self) -> Result<UpgradeHarness, HarnessError> {
		let account = self.account()?;
		let address = account.get_address().await?;

		let wallet = account
			.get_private_key()
			.map(|key| key.with_exposed(|k| k.parse::<PrivateKeySigner>()))
			.transpose()
			.map_err(|e| HarnessError::Config(format!("Invalid private key: {}", e)))?;

		let token = Arc::new(AlloyToken::new(
			&self.config.network.rpc_url,
			self.config.contracts.proxy,
			wallet,
			address,
		)?);
		tracing::info!(
			component = "delivery",
			rpc_url = %self.config.network.rpc_url,
			token = %self.config.contracts.proxy,
			sender = %address,
			"Loaded"
		);

		let domain = self.domain();
		let token_interface: Arc<dyn TokenInterface> = token.clone();
		let proxy_interface: Arc<dyn ProxyInterface> = token;
		Ok(UpgradeHarness::new(
			token_interface,
			proxy_interface,
			Arc::new(account),
			domain,
			self.config.contracts,
			self.config.harness,
		))
	}
}
