//! Signing of GHST authorizations.
//!
//! One typed-data request to the account per signature, never retried.

use crate::{encoder, SigningError};
use ghst_account::AccountInterface;
use ghst_types::{
	domain, utils::truncate_id, Address, AuthorizationRequest, Bytes, DelegationRequest,
	DomainRecord, MetaTransactionRequest, PermitRequest, Signature, U256,
};
use serde::{Deserialize, Serialize};

/// A request together with the signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAuthorization {
	/// Account that produced the signature.
	pub signer: Address,
	pub request: AuthorizationRequest,
	pub signature: Signature,
}

/// Produces signatures over GHST authorizations.
///
/// Holds the domain every message is signed under. The signer is passed per
/// call, so one service can drive any number of accounts.
#[derive(Debug, Clone)]
pub struct SignatureService {
	domain: DomainRecord,
}

impl Default for SignatureService {
	fn default() -> Self {
		Self::new(domain())
	}
}

impl SignatureService {
	pub fn new(domain: DomainRecord) -> Self {
		Self { domain }
	}

	pub fn domain(&self) -> &DomainRecord {
		&self.domain
	}

	/// Signs `request` with `signer`.
	///
	/// The authorizing party of the request (`owner` / `from`) is replaced
	/// by the signer's own address before encoding. The signer is asked
	/// exactly once; its failures are not retried.
	pub async fn sign(
		&self,
		signer: &dyn AccountInterface,
		request: AuthorizationRequest,
	) -> Result<SignedAuthorization, SigningError> {
		let account = signer.address().await?;
		let request = request.with_account(account);
		let envelope = encoder::encode_request(&self.domain, &request)?;

		let raw = signer
			.request_typed_data_signature(account, &envelope)
			.await?;
		let signature = Signature::from_raw(&raw).inspect_err(|e| {
			tracing::warn!(account = %account, error = %e, "Signer returned a malformed signature");
		})?;

		tracing::info!(
			kind = %request.kind(),
			account = %account,
			nonce = %request.nonce(),
			r = %truncate_id(&signature.r.to_string()),
			"Signed authorization"
		);
		Ok(SignedAuthorization {
			signer: account,
			request,
			signature,
		})
	}

	/// Signs `Permit(owner = signer, spender, value, nonce, deadline)`.
	pub async fn sign_permit(
		&self,
		signer: &dyn AccountInterface,
		spender: Address,
		value: U256,
		nonce: U256,
		deadline: U256,
	) -> Result<SignedAuthorization, SigningError> {
		let request = PermitRequest {
			owner: Address::ZERO,
			spender,
			value,
			nonce,
			deadline,
		};
		self.sign(signer, request.into()).await
	}

	/// Signs `MetaTransaction(nonce, from = signer, functionSignature)`.
	pub async fn sign_meta_transaction(
		&self,
		signer: &dyn AccountInterface,
		nonce: U256,
		function_signature: Bytes,
	) -> Result<SignedAuthorization, SigningError> {
		let request = MetaTransactionRequest {
			nonce,
			from: Address::ZERO,
			function_signature,
		};
		self.sign(signer, request.into()).await
	}

	/// Signs `Delegation(delegatee, nonce, expiry)`. The delegator is the
	/// signer and is recovered by the contract.
	pub async fn sign_delegation(
		&self,
		signer: &dyn AccountInterface,
		delegatee: Address,
		nonce: U256,
		expiry: U256,
	) -> Result<SignedAuthorization, SigningError> {
		let request = DelegationRequest {
			delegatee,
			nonce,
			expiry,
		};
		self.sign(signer, request.into()).await
	}
}
