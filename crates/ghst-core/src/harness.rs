//! The upgrade procedure.

use crate::checks::{self, CheckContext, UpgradeReport};
use crate::flows::AuthorizationFlow;
use crate::snapshot::StateSnapshot;
use crate::HarnessError;
use chrono::Utc;
use ghst_account::AccountService;
use ghst_config::{ContractsConfig, HarnessConfig};
use ghst_delivery::{
	AuthorizationSubmitter, ProxyInterface, SubmissionReceipt, TokenInterface,
};
use ghst_signing::SignatureService;
use ghst_types::{Address, DomainRecord};
use std::sync::Arc;
use tracing::instrument;

/// Swaps the GHST proxy to its new implementation and verifies the result.
pub struct UpgradeHarness {
	token: Arc<dyn TokenInterface>,
	proxy: Arc<dyn ProxyInterface>,
	account: Arc<AccountService>,
	flow: AuthorizationFlow,
	contracts: ContractsConfig,
	settings: HarnessConfig,
}

impl UpgradeHarness {
	pub fn new(
		token: Arc<dyn TokenInterface>,
		proxy: Arc<dyn ProxyInterface>,
		account: Arc<AccountService>,
		domain: DomainRecord,
		contracts: ContractsConfig,
		settings: HarnessConfig,
	) -> Self {
		let flow = AuthorizationFlow::new(
			SignatureService::new(domain),
			AuthorizationSubmitter::new(token.clone()),
		);
		Self {
			token,
			proxy,
			account,
			flow,
			contracts,
			settings,
		}
	}

	pub fn flow(&self) -> &AuthorizationFlow {
		&self.flow
	}

	pub fn account(&self) -> &AccountService {
		&self.account
	}

	pub fn token(&self) -> &Arc<dyn TokenInterface> {
		&self.token
	}

	pub fn proxy(&self) -> &Arc<dyn ProxyInterface> {
		&self.proxy
	}

	/// Accounts whose state is compared around the swap: the configured
	/// probes plus the signer.
	pub async fn probe_accounts(&self) -> Result<Vec<Address>, HarnessError> {
		let mut probes = self.settings.probe_accounts.clone();
		let owner = self.account.get_address().await?;
		if !probes.contains(&owner) {
			probes.push(owner);
		}
		Ok(probes)
	}

	fn role_holders(&self) -> Vec<Address> {
		let mut holders = vec![self.contracts.proxy_admin];
		holders.extend(self.settings.depositor);
		holders
	}

	pub async fn snapshot(&self) -> Result<StateSnapshot, HarnessError> {
		let probes = self.probe_accounts().await?;
		Ok(StateSnapshot::capture(
			self.token.as_ref(),
			self.proxy.as_ref(),
			&probes,
			&self.role_holders(),
		)
		.await?)
	}

	/// Points the proxy at the new implementation, acting as the
	/// impersonated proxy admin.
	#[instrument(skip_all, fields(implementation = %self.contracts.new_implementation))]
	pub async fn swap_implementation(&self) -> Result<SubmissionReceipt, HarnessError> {
		let current = self.proxy.implementation().await?;
		if current != self.contracts.old_implementation {
			tracing::warn!(
				current = %current,
				expected = %self.contracts.old_implementation,
				"Proxy is not on the expected old implementation"
			);
		}

		self.proxy.impersonate(self.contracts.proxy_admin).await?;
		let receipt = self
			.proxy
			.update_implementation(self.contracts.proxy_admin, self.contracts.new_implementation)
			.await
			.map_err(|e| HarnessError::UpgradeFailed(e.to_string()))?;

		let updated = self.proxy.implementation().await?;
		if updated != self.contracts.new_implementation {
			return Err(HarnessError::UpgradeFailed(format!(
				"proxy points at {}, expected {}",
				updated, self.contracts.new_implementation
			)));
		}
		tracing::info!(
			from = %current,
			to = %updated,
			block = receipt.block_number,
			"Implementation swapped"
		);
		Ok(receipt)
	}

	/// Snapshot, swap, snapshot, then every post-upgrade check.
	///
	/// Only a failed swap or an unreadable snapshot is an error; failed
	/// checks are reported.
	#[instrument(skip_all)]
	pub async fn verify(&self) -> Result<UpgradeReport, HarnessError> {
		let before = self.snapshot().await?;
		self.swap_implementation().await?;
		let after = self.snapshot().await?;

		let storage_diff = before.diff(&after);
		let mut outcomes = vec![checks::storage_preserved(&storage_diff)];
		outcomes.extend(checks::run_all(&self.check_context()).await);

		let report = UpgradeReport {
			generated_at: Utc::now(),
			implementation_before: before.implementation,
			implementation_after: after.implementation,
			storage_diff,
			checks: outcomes,
		};
		tracing::info!(
			passed = report.passed(),
			checks = report.checks.len(),
			failed = report.failures().count(),
			"Verification finished"
		);
		Ok(report)
	}

	fn check_context(&self) -> CheckContext<'_> {
		CheckContext {
			token: &self.token,
			proxy: &self.proxy,
			flow: &self.flow,
			signer: self.account.signer(),
			settings: &self.settings,
		}
	}
}
