//! Alloy-based access to a deployed GHST token.
//!
//! State-changing calls are simulated with `eth_call` first so that a revert
//! surfaces with its reason string instead of as a failed receipt, then sent
//! and awaited. Transactions from the configured wallet are signed locally;
//! transactions from any other account (the impersonated proxy admin, a
//! depositor) are handed to the node to sign.

use crate::contracts::{IGhstToken, IUpgradeableProxy};
use crate::{
	deposit_data, DeliveryError, ProxyInterface, SubmissionReceipt, TokenInterface,
};
use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::{Address, B256, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{decode_revert_reason, SolCall};
use alloy_transport::TransportError;
use async_trait::async_trait;
use ghst_types::{
	utils::minimal_hex, DelegationRequest, MetaTransactionRequest, PermitRequest, Signature,
};

/// Token and proxy reached over JSON-RPC.
pub struct AlloyToken {
	/// Provider that signs with the configured wallet, if any.
	wallet_provider: Option<(Address, DynProvider)>,
	/// Provider that leaves signing to the node.
	node_provider: DynProvider,
	token: Address,
	/// Sender of authorization submissions.
	relayer: Address,
}

impl AlloyToken {
	/// Connects to `rpc_url`.
	///
	/// Submissions are sent from `wallet`'s address when a wallet is given,
	/// otherwise from `relayer`, which must then be unlocked on the node.
	pub fn new(
		rpc_url: &str,
		token: Address,
		wallet: Option<PrivateKeySigner>,
		relayer: Address,
	) -> Result<Self, DeliveryError> {
		let url: reqwest::Url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::Network(format!("Invalid RPC URL: {}", e)))?;

		let node_provider = ProviderBuilder::new().connect_http(url.clone()).erased();
		let (wallet_provider, relayer) = match wallet {
			Some(signer) => {
				let address = signer.address();
				let provider = ProviderBuilder::new()
					.wallet(EthereumWallet::from(signer))
					.connect_http(url)
					.erased();
				(Some((address, provider)), address)
			},
			None => (None, relayer),
		};

		Ok(Self {
			wallet_provider,
			node_provider,
			token,
			relayer,
		})
	}

	fn provider_for(&self, from: Address) -> &DynProvider {
		match &self.wallet_provider {
			Some((address, provider)) if *address == from => provider,
			_ => &self.node_provider,
		}
	}

	async fn read<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return, DeliveryError> {
		let request = TransactionRequest::default()
			.to(to)
			.input(call.abi_encode().into());
		let output = self
			.node_provider
			.call(request)
			.await
			.map_err(|e| classify(C::SIGNATURE, e))?;
		C::abi_decode_returns(&output).map_err(|e| {
			DeliveryError::InvalidResponse(format!("{} returned undecodable data: {}", C::SIGNATURE, e))
		})
	}

	async fn send<C: SolCall>(
		&self,
		from: Address,
		to: Address,
		call: C,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let request = TransactionRequest::default()
			.from(from)
			.to(to)
			.input(call.abi_encode().into());
		let provider = self.provider_for(from);

		// Surfaces the revert reason, which a failed receipt does not carry.
		provider
			.call(request.clone())
			.await
			.map_err(|e| classify(C::SIGNATURE, e))?;

		let pending = provider
			.send_transaction(request)
			.await
			.map_err(|e| classify(C::SIGNATURE, e))?;
		let receipt = pending
			.get_receipt()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {}", e)))?;

		if !receipt.status() {
			return Err(DeliveryError::TransactionFailed(format!(
				"{} reverted in transaction {}",
				C::SIGNATURE,
				receipt.transaction_hash()
			)));
		}
		tracing::debug!(
			call = C::SIGNATURE,
			from = %from,
			tx_hash = %receipt.transaction_hash(),
			"Transaction mined"
		);
		Ok(SubmissionReceipt {
			tx_hash: receipt.transaction_hash(),
			block_number: receipt.block_number().unwrap_or_default(),
		})
	}

	async fn node_request(
		&self,
		method: &'static str,
		params: serde_json::Value,
	) -> Result<serde_json::Value, DeliveryError> {
		self.node_provider
			.raw_request(method.into(), params)
			.await
			.map_err(|e| DeliveryError::Network(format!("{} failed: {}", method, e)))
	}
}

/// Turns an RPC error into a revert when the node reports one.
fn classify(call: &str, err: TransportError) -> DeliveryError {
	if let Some(payload) = err.as_error_resp() {
		if let Some(reason) = payload.as_revert_data().and_then(|data| decode_revert_reason(&data)) {
			return DeliveryError::reverted(reason);
		}
		if let Some(reason) = reason_from_message(&payload.message) {
			return DeliveryError::reverted(reason);
		}
	}
	DeliveryError::Network(format!("{} failed: {}", call, err))
}

/// Extracts the reason from node error messages such as
/// `execution reverted: ERC20Permit: invalid signature` or hardhat's
/// `... reverted with reason string 'ERC20Permit: invalid signature'`.
fn reason_from_message(message: &str) -> Option<String> {
	if let Some((_, rest)) = message.split_once("reverted with reason string '") {
		return rest.strip_suffix('\'').or(Some(rest)).map(str::to_string);
	}
	message
		.split_once("execution reverted: ")
		.map(|(_, reason)| reason.to_string())
}

#[async_trait]
impl TokenInterface for AlloyToken {
	fn address(&self) -> Address {
		self.token
	}

	async fn get_nonce(&self, account: Address) -> Result<U256, DeliveryError> {
		self.read(self.token, IGhstToken::getNonceCall { user: account })
			.await
	}

	async fn permit(
		&self,
		request: &PermitRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let call = IGhstToken::permitCall {
			owner: request.owner,
			spender: request.spender,
			value: request.value,
			deadline: request.deadline,
			v: signature.v,
			r: signature.r,
			s: signature.s,
		};
		self.send(self.relayer, self.token, call).await
	}

	async fn execute_meta_transaction(
		&self,
		request: &MetaTransactionRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let call = IGhstToken::executeMetaTransactionCall {
			nonce: request.nonce,
			from: request.from,
			functionSignature: request.function_signature.clone(),
			v: signature.v,
			r: signature.r,
			s: signature.s,
		};
		self.send(self.relayer, self.token, call).await
	}

	async fn delegate_by_sig(
		&self,
		request: &DelegationRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let call = IGhstToken::delegateBySigCall {
			delegatee: request.delegatee,
			nonce: request.nonce,
			expiry: request.expiry,
			v: signature.v,
			r: signature.r,
			s: signature.s,
		};
		self.send(self.relayer, self.token, call).await
	}

	async fn delegate(
		&self,
		from: Address,
		delegatee: Address,
	) -> Result<SubmissionReceipt, DeliveryError> {
		self.send(from, self.token, IGhstToken::delegateCall { delegatee })
			.await
	}

	async fn deposit(
		&self,
		from: Address,
		user: Address,
		amount: U256,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let call = IGhstToken::depositCall {
			user,
			depositData: deposit_data(amount),
		};
		self.send(from, self.token, call).await
	}

	async fn name(&self) -> Result<String, DeliveryError> {
		self.read(self.token, IGhstToken::nameCall {}).await
	}

	async fn symbol(&self) -> Result<String, DeliveryError> {
		self.read(self.token, IGhstToken::symbolCall {}).await
	}

	async fn decimals(&self) -> Result<u8, DeliveryError> {
		self.read(self.token, IGhstToken::decimalsCall {}).await
	}

	async fn chain_id(&self) -> Result<U256, DeliveryError> {
		self.read(self.token, IGhstToken::getChainIdCall {}).await
	}

	async fn domain_separator(&self) -> Result<B256, DeliveryError> {
		self.read(self.token, IGhstToken::getDomainSeperatorCall {})
			.await
	}

	async fn balance_of(&self, account: Address) -> Result<U256, DeliveryError> {
		self.read(self.token, IGhstToken::balanceOfCall { account })
			.await
	}

	async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, DeliveryError> {
		self.read(self.token, IGhstToken::allowanceCall { owner, spender })
			.await
	}

	async fn has_role(&self, role: B256, account: Address) -> Result<bool, DeliveryError> {
		self.read(self.token, IGhstToken::hasRoleCall { role, account })
			.await
	}

	async fn delegates(&self, account: Address) -> Result<Address, DeliveryError> {
		self.read(self.token, IGhstToken::delegatesCall { account })
			.await
	}

	async fn get_votes(&self, account: Address) -> Result<U256, DeliveryError> {
		self.read(self.token, IGhstToken::getVotesCall { account })
			.await
	}

	async fn get_past_votes(
		&self,
		account: Address,
		block_number: u64,
	) -> Result<U256, DeliveryError> {
		let call = IGhstToken::getPastVotesCall {
			account,
			blockNumber: U256::from(block_number),
		};
		self.read(self.token, call).await
	}
}

#[async_trait]
impl ProxyInterface for AlloyToken {
	async fn implementation(&self) -> Result<Address, DeliveryError> {
		self.read(self.token, IUpgradeableProxy::implementationCall {})
			.await
	}

	async fn update_implementation(
		&self,
		admin: Address,
		new_implementation: Address,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let call = IUpgradeableProxy::updateImplementationCall {
			newImplementation: new_implementation,
		};
		self.send(admin, self.token, call).await
	}

	async fn impersonate(&self, account: Address) -> Result<(), DeliveryError> {
		self.node_request("hardhat_impersonateAccount", serde_json::json!([account]))
			.await?;
		tracing::info!(account = %account, "Impersonating account");
		Ok(())
	}

	async fn mine(&self, blocks: u64) -> Result<(), DeliveryError> {
		self.node_request("hardhat_mine", serde_json::json!([minimal_hex(U256::from(blocks))]))
			.await?;
		tracing::debug!(blocks, "Mined blocks");
		Ok(())
	}

	async fn block_number(&self) -> Result<u64, DeliveryError> {
		self.node_provider
			.get_block_number()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get block number: {}", e)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_reason_from_geth_style_message() {
		assert_eq!(
			reason_from_message("execution reverted: ERC20Permit: invalid signature").as_deref(),
			Some("ERC20Permit: invalid signature")
		);
	}

	#[test]
	fn test_reason_from_hardhat_message() {
		let message = "Error: VM Exception while processing transaction: reverted with reason string 'ERC20Permit: expired deadline'";
		assert_eq!(
			reason_from_message(message).as_deref(),
			Some("ERC20Permit: expired deadline")
		);
	}

	#[test]
	fn test_plain_error_has_no_reason() {
		assert_eq!(reason_from_message("nonce too low"), None);
	}

	#[test]
	fn test_wallet_address_becomes_relayer() {
		let signer: PrivateKeySigner =
			"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
				.parse()
				.unwrap();
		let address = signer.address();
		let token = AlloyToken::new(
			"http://127.0.0.1:8545",
			ghst_types::PROXY_ADDRESS,
			Some(signer),
			Address::ZERO,
		)
		.unwrap();
		assert_eq!(token.relayer, address);
		assert_eq!(TokenInterface::address(&token), ghst_types::PROXY_ADDRESS);
	}

	#[test]
	fn test_invalid_url_rejected() {
		assert!(matches!(
			AlloyToken::new("not a url", Address::ZERO, None, Address::ZERO),
			Err(DeliveryError::Network(_))
		));
	}
}
