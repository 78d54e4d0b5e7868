//! Checks the upgraded implementation must pass.
//!
//! Each check drives the live token through its public surface and compares
//! what it reads back with what the new functionality promises. A check
//! never aborts the run: failures, reverts included, are recorded in its
//! outcome and the next check starts from whatever state is left.

use crate::flows::AuthorizationFlow;
use crate::snapshot::StateDiff;
use crate::HarnessError;
use alloy_sol_types::SolCall;
use chrono::{DateTime, Utc};
use ghst_account::AccountInterface;
use ghst_config::HarnessConfig;
use ghst_delivery::contracts::{IGhstToken, DEPOSITOR_ROLE};
use ghst_delivery::{DeliveryError, ProxyInterface, SubmissionReceipt, TokenInterface};
use ghst_types::{Address, AuthorizationRequest, RevertClass, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
	pub name: String,
	pub passed: bool,
	pub detail: String,
}

impl CheckOutcome {
	fn from_result(name: &str, result: Result<String, HarnessError>) -> Self {
		let outcome = match result {
			Ok(detail) => Self {
				name: name.to_string(),
				passed: true,
				detail,
			},
			Err(e) => Self {
				name: name.to_string(),
				passed: false,
				detail: e.to_string(),
			},
		};
		if outcome.passed {
			tracing::info!(check = %outcome.name, detail = %outcome.detail, "Check passed");
		} else {
			tracing::warn!(check = %outcome.name, detail = %outcome.detail, "Check failed");
		}
		outcome
	}
}

/// Result of a full verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeReport {
	pub generated_at: DateTime<Utc>,
	pub implementation_before: Address,
	pub implementation_after: Address,
	pub storage_diff: Vec<StateDiff>,
	pub checks: Vec<CheckOutcome>,
}

impl UpgradeReport {
	pub fn passed(&self) -> bool {
		self.checks.iter().all(|c| c.passed)
	}

	pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
		self.checks.iter().filter(|c| !c.passed)
	}
}

/// Everything the checks act through.
pub struct CheckContext<'a> {
	pub token: &'a Arc<dyn TokenInterface>,
	pub proxy: &'a Arc<dyn ProxyInterface>,
	pub flow: &'a AuthorizationFlow,
	pub signer: &'a dyn AccountInterface,
	pub settings: &'a HarnessConfig,
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), HarnessError> {
	if condition {
		Ok(())
	} else {
		Err(HarnessError::Check(message()))
	}
}

fn ensure_eq<T: PartialEq + std::fmt::Display>(
	what: &str,
	actual: T,
	expected: T,
) -> Result<(), HarnessError> {
	ensure(actual == expected, || {
		format!("{}: expected {}, got {}", what, expected, actual)
	})
}

/// The submission must have been rejected by the token.
fn expect_revert(
	result: Result<SubmissionReceipt, DeliveryError>,
	class: Option<RevertClass>,
) -> Result<String, HarnessError> {
	match result {
		Ok(receipt) => Err(HarnessError::Check(format!(
			"submission was accepted in tx {}",
			receipt.tx_hash
		))),
		Err(DeliveryError::Reverted { reason }) => match class {
			Some(expected) if reason.class() != expected => Err(HarnessError::Check(format!(
				"reverted with \"{}\", expected a {:?} rejection",
				reason, expected
			))),
			_ => Ok(format!("reverted with \"{}\"", reason)),
		},
		Err(e) => Err(e.into()),
	}
}

pub fn storage_preserved(diff: &[StateDiff]) -> CheckOutcome {
	let result = if diff.is_empty() {
		Ok("no storage differences".to_string())
	} else {
		let fields: Vec<String> = diff.iter().map(ToString::to_string).collect();
		Err(HarnessError::Check(fields.join("; ")))
	};
	CheckOutcome::from_result("storage preserved", result)
}

async fn no_votes_before_delegation(ctx: &CheckContext<'_>) -> Result<String, HarnessError> {
	let owner = ctx.signer.address().await?;
	let delegate = ctx.token.delegates(owner).await?;
	let votes = ctx.token.get_votes(owner).await?;
	ensure_eq("delegates(owner)", delegate, Address::ZERO)?;
	ensure_eq("getVotes(owner)", votes, U256::ZERO)?;
	Ok("owner has no delegate and no votes".into())
}

/// Self-delegates with a plain `delegate` call. Returns the block the
/// delegation landed in, for the past-votes check.
async fn direct_delegation(ctx: &CheckContext<'_>) -> Result<(String, u64), HarnessError> {
	let owner = ctx.signer.address().await?;
	let receipt = ctx.token.delegate(owner, owner).await?;
	ensure_eq("delegates(owner)", ctx.token.delegates(owner).await?, owner)?;
	Ok((
		format!("delegated to self in block {}", receipt.block_number),
		receipt.block_number,
	))
}

async fn votes_after_delegation(ctx: &CheckContext<'_>) -> Result<String, HarnessError> {
	let owner = ctx.signer.address().await?;
	let balance = ctx.token.balance_of(owner).await?;
	ensure_eq("getVotes(owner)", ctx.token.get_votes(owner).await?, balance)?;
	Ok(format!("{} votes", balance))
}

async fn past_votes_tracked(
	ctx: &CheckContext<'_>,
	delegation_block: u64,
) -> Result<String, HarnessError> {
	let owner = ctx.signer.address().await?;
	ctx.proxy.mine(ctx.settings.mine_blocks.max(1)).await?;
	let balance = ctx.token.balance_of(owner).await?;
	let past = ctx.token.get_past_votes(owner, delegation_block).await?;
	ensure_eq("getPastVotes(owner)", past, balance)?;
	Ok(format!("{} votes at block {}", past, delegation_block))
}

async fn delegation_by_signature(ctx: &CheckContext<'_>) -> Result<String, HarnessError> {
	let owner = ctx.signer.address().await?;
	let delegatee = ctx.settings.delegatee;
	let nonce = ctx.token.get_nonce(owner).await?;

	ctx.flow
		.delegation(ctx.signer, delegatee, U256::from(ctx.settings.deadline))
		.await?;

	ensure_eq(
		"getNonce(owner)",
		ctx.token.get_nonce(owner).await?,
		nonce + U256::from(1),
	)?;
	ensure_eq("delegates(owner)", ctx.token.delegates(owner).await?, delegatee)?;
	Ok(format!("delegated to {}, nonce now {}", delegatee, nonce + U256::from(1)))
}

/// Signs a delegation to the owner itself and submits it naming a
/// different delegatee.
async fn delegation_with_invalid_signature(
	ctx: &CheckContext<'_>,
) -> Result<String, HarnessError> {
	let owner = ctx.signer.address().await?;
	let delegate = ctx.token.delegates(owner).await?;
	let nonce = ctx.token.get_nonce(owner).await?;

	let signed = ctx
		.flow
		.prepare(
			ctx.signer,
			ghst_types::DelegationRequest {
				delegatee: owner,
				nonce,
				expiry: U256::from(ctx.settings.deadline),
			}
			.into(),
		)
		.await?;
	let AuthorizationRequest::Delegation(mut request) = signed.request else {
		return Err(HarnessError::Check("signed request is not a delegation".into()));
	};
	request.delegatee = ctx.settings.spender;

	let detail = expect_revert(
		ctx.flow
			.submitter()
			.submit_delegation(owner, &request, &signed.signature)
			.await,
		None,
	)?;
	ensure_eq("delegates(owner)", ctx.token.delegates(owner).await?, delegate)?;
	ensure_eq("getNonce(owner)", ctx.token.get_nonce(owner).await?, nonce)?;
	Ok(detail)
}

async fn permit_sets_allowance(ctx: &CheckContext<'_>) -> Result<String, HarnessError> {
	let owner = ctx.signer.address().await?;
	let spender = ctx.settings.spender;
	let nonce = ctx.token.get_nonce(owner).await?;

	ctx.flow
		.permit(
			ctx.signer,
			spender,
			ctx.settings.permit_value,
			U256::from(ctx.settings.deadline),
		)
		.await?;

	ensure_eq(
		"allowance(owner, spender)",
		ctx.token.allowance(owner, spender).await?,
		ctx.settings.permit_value,
	)?;
	ensure_eq(
		"getNonce(owner)",
		ctx.token.get_nonce(owner).await?,
		nonce + U256::from(1),
	)?;
	Ok(format!("allowance {}", ctx.settings.permit_value))
}

/// Signs a permit and submits it with the value raised by one.
async fn permit_with_invalid_signature(ctx: &CheckContext<'_>) -> Result<String, HarnessError> {
	let owner = ctx.signer.address().await?;
	let spender = ctx.settings.spender;
	let allowance = ctx.token.allowance(owner, spender).await?;
	let value = ctx.settings.permit_value + U256::from(1);

	let signed = ctx
		.flow
		.prepare(
			ctx.signer,
			ghst_types::PermitRequest {
				owner,
				spender,
				value,
				nonce: U256::ZERO,
				deadline: U256::from(ctx.settings.deadline),
			}
			.into(),
		)
		.await?;
	let AuthorizationRequest::Permit(mut request) = signed.request else {
		return Err(HarnessError::Check("signed request is not a permit".into()));
	};
	request.value = value + U256::from(1);

	let detail = expect_revert(
		ctx.flow
			.submitter()
			.submit_permit(&request, &signed.signature)
			.await,
		Some(RevertClass::InvalidSignature),
	)?;
	ensure_eq(
		"allowance(owner, spender)",
		ctx.token.allowance(owner, spender).await?,
		allowance,
	)?;
	Ok(detail)
}

async fn meta_transaction_approve(ctx: &CheckContext<'_>) -> Result<String, HarnessError> {
	let owner = ctx.signer.address().await?;
	let spender = ctx.settings.spender;
	let amount = ctx.settings.permit_value * U256::from(2);
	let nonce = ctx.token.get_nonce(owner).await?;

	let call = IGhstToken::approveCall { spender, amount };
	ctx.flow
		.meta_transaction(ctx.signer, call.abi_encode().into())
		.await?;

	ensure_eq(
		"allowance(owner, spender)",
		ctx.token.allowance(owner, spender).await?,
		amount,
	)?;
	ensure_eq(
		"getNonce(owner)",
		ctx.token.get_nonce(owner).await?,
		nonce + U256::from(1),
	)?;
	Ok(format!("approve({}, {}) executed", spender, amount))
}

async fn depositor_deposit(
	ctx: &CheckContext<'_>,
	depositor: Address,
) -> Result<String, HarnessError> {
	let owner = ctx.signer.address().await?;
	ensure(ctx.token.has_role(DEPOSITOR_ROLE, depositor).await?, || {
		format!("{} does not hold DEPOSITOR_ROLE", depositor)
	})?;

	let balance = ctx.token.balance_of(owner).await?;
	let amount = ctx.settings.permit_value;
	ctx.proxy.impersonate(depositor).await?;
	ctx.token.deposit(depositor, owner, amount).await?;

	ensure_eq(
		"balanceOf(owner)",
		ctx.token.balance_of(owner).await?,
		balance + amount,
	)?;
	Ok(format!("deposited {}", amount))
}

/// Runs every post-upgrade check in order.
///
/// The order matters: the invalid-signature delegation runs after a valid
/// one, so the owner's nonce is no longer the default any recovered
/// stranger would share.
pub async fn run_all(ctx: &CheckContext<'_>) -> Vec<CheckOutcome> {
	let mut outcomes = vec![CheckOutcome::from_result(
		"no votes before delegation",
		no_votes_before_delegation(ctx).await,
	)];

	let delegated = direct_delegation(ctx).await;
	let delegation_block = delegated.as_ref().ok().map(|(_, block)| *block);
	outcomes.push(CheckOutcome::from_result(
		"delegate",
		delegated.map(|(detail, _)| detail),
	));
	outcomes.push(CheckOutcome::from_result(
		"votes after delegation",
		votes_after_delegation(ctx).await,
	));
	let past_votes = match delegation_block {
		Some(block) => past_votes_tracked(ctx, block).await,
		None => Err(HarnessError::Check("no delegation to look back at".into())),
	};
	outcomes.push(CheckOutcome::from_result("past votes tracked", past_votes));

	outcomes.push(CheckOutcome::from_result(
		"delegation by signature increases nonce",
		delegation_by_signature(ctx).await,
	));
	outcomes.push(CheckOutcome::from_result(
		"delegation with invalid signature fails",
		delegation_with_invalid_signature(ctx).await,
	));
	outcomes.push(CheckOutcome::from_result(
		"permit increases allowance and nonce",
		permit_sets_allowance(ctx).await,
	));
	outcomes.push(CheckOutcome::from_result(
		"permit with invalid signature fails",
		permit_with_invalid_signature(ctx).await,
	));
	outcomes.push(CheckOutcome::from_result(
		"meta-transaction executes approve",
		meta_transaction_approve(ctx).await,
	));

	if let Some(depositor) = ctx.settings.depositor {
		outcomes.push(CheckOutcome::from_result(
			"depositor can deposit",
			depositor_deposit(ctx, depositor).await,
		));
	}

	outcomes
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_expect_revert() {
		let reverted = Err(DeliveryError::reverted("ERC20Permit: invalid signature"));
		assert!(expect_revert(reverted, Some(RevertClass::InvalidSignature)).is_ok());

		let reverted = Err(DeliveryError::reverted("ERC20Votes: invalid nonce"));
		assert!(expect_revert(reverted, Some(RevertClass::InvalidSignature)).is_err());

		let reverted = Err(DeliveryError::reverted("ERC20Votes: invalid nonce"));
		assert!(expect_revert(reverted, None).is_ok());

		let accepted = Ok(SubmissionReceipt {
			tx_hash: Default::default(),
			block_number: 1,
		});
		assert!(expect_revert(accepted, None).is_err());

		let network = Err(DeliveryError::Network("connection refused".into()));
		assert!(matches!(
			expect_revert(network, None),
			Err(HarnessError::Delivery(_))
		));
	}

	#[test]
	fn test_storage_preserved() {
		assert!(storage_preserved(&[]).passed);
		let outcome = storage_preserved(&[StateDiff {
			field: "symbol".into(),
			before: "GHST".into(),
			after: "gGHST".into(),
		}]);
		assert!(!outcome.passed);
		assert_eq!(outcome.detail, "Check failed: symbol: GHST -> gGHST");
	}
}
