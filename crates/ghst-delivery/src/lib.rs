//! Contract access for the GHST upgrade verifier.
//!
//! The token is the sole verifier of signed authorizations: it recomputes
//! the digest from the submitted fields and reverts when the signature, the
//! nonce or the deadline does not hold. This crate carries submissions to
//! it and reads state back, through [`TokenInterface`] for the token and
//! [`ProxyInterface`] for the proxy and the dev node it runs on. An alloy
//! implementation talks to a node; a mock replays the token's checks in
//! memory.

use async_trait::async_trait;
use ghst_signing::SignedAuthorization;
use ghst_types::{
	Address, AuthorizationRequest, Bytes, DelegationRequest, MetaTransactionRequest,
	PermitRequest, RevertReason, Signature, B256, U256,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub mod contracts;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	pub mod mock;
}

/// Errors that can occur while talking to the contracts.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The contract reverted; the reason is passed through verbatim.
	#[error("Reverted: {reason}")]
	Reverted { reason: RevertReason },
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// The transaction was mined but failed.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// A call returned data that could not be decoded.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

impl DeliveryError {
	pub fn reverted(reason: impl Into<String>) -> Self {
		DeliveryError::Reverted {
			reason: RevertReason::new(reason),
		}
	}

	/// Revert reason, if this is a revert.
	pub fn revert_reason(&self) -> Option<&RevertReason> {
		match self {
			DeliveryError::Reverted { reason } => Some(reason),
			_ => None,
		}
	}
}

/// Outcome of a mined state-changing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
	pub tx_hash: B256,
	pub block_number: u64,
}

/// The GHST token.
#[async_trait]
pub trait TokenInterface: Send + Sync {
	/// Address calls are sent to (the proxy).
	fn address(&self) -> Address;

	/// Current signature nonce of `account`, shared by all three kinds.
	async fn get_nonce(&self, account: Address) -> Result<U256, DeliveryError>;

	/// Calls `permit(owner, spender, value, deadline, v, r, s)`.
	async fn permit(
		&self,
		request: &PermitRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError>;

	/// Calls `executeMetaTransaction(nonce, from, functionSignature, v, r, s)`.
	async fn execute_meta_transaction(
		&self,
		request: &MetaTransactionRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError>;

	/// Calls `delegateBySig(delegatee, nonce, expiry, v, r, s)`.
	async fn delegate_by_sig(
		&self,
		request: &DelegationRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError>;

	/// Calls `delegate(delegatee)` as `from`.
	async fn delegate(
		&self,
		from: Address,
		delegatee: Address,
	) -> Result<SubmissionReceipt, DeliveryError>;

	/// Calls `deposit(user, abi.encode(amount))` as `from`, which must hold
	/// `DEPOSITOR_ROLE`.
	async fn deposit(
		&self,
		from: Address,
		user: Address,
		amount: U256,
	) -> Result<SubmissionReceipt, DeliveryError>;

	async fn name(&self) -> Result<String, DeliveryError>;
	async fn symbol(&self) -> Result<String, DeliveryError>;
	async fn decimals(&self) -> Result<u8, DeliveryError>;
	/// Chain id as reported by the contract.
	async fn chain_id(&self) -> Result<U256, DeliveryError>;
	/// Domain separator as computed by the contract.
	async fn domain_separator(&self) -> Result<B256, DeliveryError>;
	async fn balance_of(&self, account: Address) -> Result<U256, DeliveryError>;
	async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, DeliveryError>;
	async fn has_role(&self, role: B256, account: Address) -> Result<bool, DeliveryError>;
	async fn delegates(&self, account: Address) -> Result<Address, DeliveryError>;
	async fn get_votes(&self, account: Address) -> Result<U256, DeliveryError>;
	async fn get_past_votes(
		&self,
		account: Address,
		block_number: u64,
	) -> Result<U256, DeliveryError>;
}

/// The upgradeable proxy, and the dev node controls needed to drive it.
#[async_trait]
pub trait ProxyInterface: Send + Sync {
	/// Implementation the proxy currently delegates to.
	async fn implementation(&self) -> Result<Address, DeliveryError>;

	/// Calls `updateImplementation(new_implementation)` as `admin`.
	async fn update_implementation(
		&self,
		admin: Address,
		new_implementation: Address,
	) -> Result<SubmissionReceipt, DeliveryError>;

	/// Lets the node send transactions as `account` without its key.
	async fn impersonate(&self, account: Address) -> Result<(), DeliveryError>;

	/// Mines `blocks` empty blocks.
	async fn mine(&self, blocks: u64) -> Result<(), DeliveryError>;

	async fn block_number(&self) -> Result<u64, DeliveryError>;
}

/// Submits signed authorizations to the token.
///
/// One contract call per submission. Reverts are returned untouched; the
/// submitter neither classifies nor retries them.
#[derive(Clone)]
pub struct AuthorizationSubmitter {
	token: Arc<dyn TokenInterface>,
}

impl AuthorizationSubmitter {
	pub fn new(token: Arc<dyn TokenInterface>) -> Self {
		Self { token }
	}

	pub fn token(&self) -> &Arc<dyn TokenInterface> {
		&self.token
	}

	pub async fn get_nonce(&self, account: Address) -> Result<U256, DeliveryError> {
		self.token.get_nonce(account).await
	}

	pub async fn submit_permit(
		&self,
		request: &PermitRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError> {
		log_outcome("permit", request.owner, self.token.permit(request, signature).await)
	}

	pub async fn submit_meta_transaction(
		&self,
		request: &MetaTransactionRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError> {
		log_outcome(
			"executeMetaTransaction",
			request.from,
			self.token.execute_meta_transaction(request, signature).await,
		)
	}

	/// `signer` is the delegator; it only appears in logs.
	pub async fn submit_delegation(
		&self,
		signer: Address,
		request: &DelegationRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError> {
		log_outcome(
			"delegateBySig",
			signer,
			self.token.delegate_by_sig(request, signature).await,
		)
	}

	/// Submits any signed authorization through its entry point.
	pub async fn submit(
		&self,
		signed: &SignedAuthorization,
	) -> Result<SubmissionReceipt, DeliveryError> {
		match &signed.request {
			AuthorizationRequest::Permit(p) => self.submit_permit(p, &signed.signature).await,
			AuthorizationRequest::MetaTransaction(m) => {
				self.submit_meta_transaction(m, &signed.signature).await
			},
			AuthorizationRequest::Delegation(d) => {
				self.submit_delegation(signed.signer, d, &signed.signature)
					.await
			},
		}
	}
}

fn log_outcome(
	entry_point: &str,
	account: Address,
	result: Result<SubmissionReceipt, DeliveryError>,
) -> Result<SubmissionReceipt, DeliveryError> {
	match &result {
		Ok(receipt) => tracing::info!(
			entry_point,
			account = %account,
			tx_hash = %receipt.tx_hash,
			block = receipt.block_number,
			"Authorization accepted"
		),
		Err(DeliveryError::Reverted { reason }) => tracing::warn!(
			entry_point,
			account = %account,
			reason = %reason,
			"Authorization rejected by token"
		),
		Err(e) => tracing::error!(entry_point, account = %account, error = %e, "Submission failed"),
	}
	result
}

/// ABI-encodes a deposit amount the way the child chain manager does.
pub fn deposit_data(amount: U256) -> Bytes {
	Bytes::from(amount.to_be_bytes::<32>().to_vec())
}
