//! Sign-and-submit pipelines.
//!
//! Each flow is strictly sequential: read the signer's current nonce, build
//! the message, sign it, submit it. Nothing serializes two flows for the same
//! account; if both read the same nonce the token rejects the second.

use crate::HarnessError;
use ghst_account::AccountInterface;
use ghst_delivery::{AuthorizationSubmitter, SubmissionReceipt};
use ghst_signing::{SignatureService, SignedAuthorization};
use ghst_types::{
	Address, AuthorizationRequest, Bytes, DelegationRequest, MetaTransactionRequest,
	PermitRequest, U256,
};
use tracing::instrument;

/// A signed authorization and the receipt of its submission.
#[derive(Debug, Clone)]
pub struct FlowOutcome {
	pub signed: SignedAuthorization,
	pub receipt: SubmissionReceipt,
}

#[derive(Clone)]
pub struct AuthorizationFlow {
	signatures: SignatureService,
	submitter: AuthorizationSubmitter,
}

impl AuthorizationFlow {
	pub fn new(signatures: SignatureService, submitter: AuthorizationSubmitter) -> Self {
		Self {
			signatures,
			submitter,
		}
	}

	pub fn signatures(&self) -> &SignatureService {
		&self.signatures
	}

	pub fn submitter(&self) -> &AuthorizationSubmitter {
		&self.submitter
	}

	/// Signs `request` at the signer's current nonce without submitting it.
	pub async fn prepare(
		&self,
		signer: &dyn AccountInterface,
		request: AuthorizationRequest,
	) -> Result<SignedAuthorization, HarnessError> {
		let account = signer.address().await?;
		let nonce = self.submitter.get_nonce(account).await?;
		Ok(self
			.signatures
			.sign(signer, request.with_nonce(nonce))
			.await?)
	}

	/// Runs the full pipeline for `request`. Its nonce and authorizing
	/// party are overwritten with the signer's.
	#[instrument(skip_all, fields(kind = %request.kind()))]
	pub async fn run(
		&self,
		signer: &dyn AccountInterface,
		request: AuthorizationRequest,
	) -> Result<FlowOutcome, HarnessError> {
		let signed = self.prepare(signer, request).await?;
		let receipt = self.submitter.submit(&signed).await?;
		Ok(FlowOutcome { signed, receipt })
	}

	/// Approves `spender` for `value` through `permit`.
	pub async fn permit(
		&self,
		signer: &dyn AccountInterface,
		spender: Address,
		value: U256,
		deadline: U256,
	) -> Result<FlowOutcome, HarnessError> {
		let request = PermitRequest {
			owner: Address::ZERO,
			spender,
			value,
			nonce: U256::ZERO,
			deadline,
		};
		self.run(signer, request.into()).await
	}

	/// Has the token execute `function_signature` on the signer's behalf.
	pub async fn meta_transaction(
		&self,
		signer: &dyn AccountInterface,
		function_signature: Bytes,
	) -> Result<FlowOutcome, HarnessError> {
		let request = MetaTransactionRequest {
			nonce: U256::ZERO,
			from: Address::ZERO,
			function_signature,
		};
		self.run(signer, request.into()).await
	}

	/// Delegates the signer's votes to `delegatee` through `delegateBySig`.
	pub async fn delegation(
		&self,
		signer: &dyn AccountInterface,
		delegatee: Address,
		expiry: U256,
	) -> Result<FlowOutcome, HarnessError> {
		let request = DelegationRequest {
			delegatee,
			nonce: U256::ZERO,
			expiry,
		};
		self.run(signer, request.into()).await
	}
}
