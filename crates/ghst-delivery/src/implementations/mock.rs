//! In-memory GHST token and proxy.
//!
//! Replays the checks the deployed token performs on signed authorizations:
//! it rebuilds the EIP-712 digest from the submitted fields and its own
//! domain, recovers the signer and compares nonces and deadlines, reverting
//! with the same reason strings. Every state-changing call mines one block.
//!
//! Permit and the votes extension only answer once the proxy points at the
//! upgraded implementation; meta-transactions work on both. Privileged calls
//! (`updateImplementation`, `deposit`) must come from an impersonated
//! account, as on a forked node.

use crate::contracts::{IGhstToken, DEPOSITOR_ROLE};
use crate::{DeliveryError, ProxyInterface, SubmissionReceipt, TokenInterface};
use alloy_primitives::keccak256;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use ghst_types::revert::{
	META_TX_CALL_FAILED, META_TX_INVALID_NONCE, META_TX_INVALID_SIGNATURE, META_TX_INVALID_SIGNER,
	PERMIT_EXPIRED, PERMIT_INVALID_SIGNATURE, VOTES_EXPIRED, VOTES_INVALID_NONCE,
};
use ghst_types::utils::eip712::{domain_separator, signing_hash};
use ghst_types::{
	current_timestamp, Address, AuthorizationRequest, DelegationRequest, DomainRecord,
	MetaTransactionRequest, PermitRequest, Signature, B256, NEW_IMPLEMENTATION_ADDRESS,
	OLD_IMPLEMENTATION_ADDRESS, PROXY_ADMIN_ADDRESS, U256,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

const UNKNOWN_SELECTOR: &str = "function selector was not recognized and there's no fallback function";
const ECDSA_INVALID_SIGNATURE: &str = "ECDSA: invalid signature";
const NOT_OWNER: &str = "NOT_OWNER";
const INSUFFICIENT_PERMISSIONS: &str = "INSUFFICIENT_PERMISSIONS";
const BLOCK_NOT_MINED: &str = "ERC20Votes: block not yet mined";

#[derive(Debug, Default)]
struct TokenState {
	implementation: Address,
	block_number: u64,
	timestamp: u64,
	tx_count: u64,
	balances: HashMap<Address, U256>,
	allowances: HashMap<(Address, Address), U256>,
	nonces: HashMap<Address, U256>,
	delegates: HashMap<Address, Address>,
	/// `(block, votes)` pairs, ascending by block.
	checkpoints: HashMap<Address, Vec<(u64, U256)>>,
	roles: HashSet<(B256, Address)>,
	impersonated: HashSet<Address>,
}

impl TokenState {
	fn nonce(&self, account: Address) -> U256 {
		self.nonces.get(&account).copied().unwrap_or_default()
	}

	fn balance(&self, account: Address) -> U256 {
		self.balances.get(&account).copied().unwrap_or_default()
	}

	fn votes(&self, account: Address) -> U256 {
		self.checkpoints
			.get(&account)
			.and_then(|c| c.last())
			.map(|(_, votes)| *votes)
			.unwrap_or_default()
	}

	fn delegate_of(&self, account: Address) -> Address {
		self.delegates.get(&account).copied().unwrap_or_default()
	}

	/// Timestamp of the block the next transaction lands in.
	fn next_timestamp(&self) -> U256 {
		U256::from(self.timestamp + 1)
	}

	fn use_nonce(&mut self, account: Address) {
		let next = self.nonce(account) + U256::from(1);
		self.nonces.insert(account, next);
	}

	fn write_checkpoint(&mut self, account: Address, votes: U256, block: u64) {
		let checkpoints = self.checkpoints.entry(account).or_default();
		match checkpoints.last_mut() {
			Some((last, value)) if *last == block => *value = votes,
			_ => checkpoints.push((block, votes)),
		}
	}

	fn move_voting_power(&mut self, from: Address, to: Address, amount: U256, block: u64) {
		if from == to || amount.is_zero() {
			return;
		}
		if !from.is_zero() {
			let votes = self.votes(from).saturating_sub(amount);
			self.write_checkpoint(from, votes, block);
		}
		if !to.is_zero() {
			let votes = self.votes(to) + amount;
			self.write_checkpoint(to, votes, block);
		}
	}

	fn delegate(&mut self, delegator: Address, delegatee: Address, block: u64) {
		let previous = self.delegate_of(delegator);
		self.delegates.insert(delegator, delegatee);
		let balance = self.balance(delegator);
		self.move_voting_power(previous, delegatee, balance, block);
	}

	fn transfer(&mut self, from: Address, to: Address, amount: U256, block: u64) -> bool {
		let balance = self.balance(from);
		if balance < amount {
			return false;
		}
		self.balances.insert(from, balance - amount);
		let to_balance = self.balance(to);
		self.balances.insert(to, to_balance + amount);
		let (from_delegate, to_delegate) = (self.delegate_of(from), self.delegate_of(to));
		self.move_voting_power(from_delegate, to_delegate, amount, block);
		true
	}

	/// Mines the block a transaction lands in.
	fn mine_tx(&mut self) -> SubmissionReceipt {
		self.block_number += 1;
		self.timestamp += 1;
		self.tx_count += 1;
		SubmissionReceipt {
			tx_hash: keccak256(self.tx_count.to_be_bytes()),
			block_number: self.block_number,
		}
	}
}

/// In-memory token behind an in-memory proxy.
#[derive(Debug)]
pub struct MockToken {
	domain: DomainRecord,
	admin: Address,
	upgraded_implementation: Address,
	state: RwLock<TokenState>,
}

impl MockToken {
	/// A token bound to `domain`, behind a proxy pointing at the old
	/// implementation. The clock starts at the current time.
	pub fn new(domain: DomainRecord) -> Self {
		let state = TokenState {
			implementation: OLD_IMPLEMENTATION_ADDRESS,
			block_number: 1,
			timestamp: current_timestamp(),
			..Default::default()
		};
		Self {
			domain,
			admin: PROXY_ADMIN_ADDRESS,
			upgraded_implementation: NEW_IMPLEMENTATION_ADDRESS,
			state: RwLock::new(state),
		}
	}

	/// Points the proxy at the upgraded implementation.
	pub fn upgraded(mut self) -> Self {
		self.state.get_mut().implementation = self.upgraded_implementation;
		self
	}

	pub fn with_balance(mut self, account: Address, amount: U256) -> Self {
		let state = self.state.get_mut();
		state.balances.insert(account, amount);
		let delegate = state.delegate_of(account);
		let block = state.block_number;
		state.move_voting_power(Address::ZERO, delegate, amount, block);
		self
	}

	pub fn with_allowance(mut self, owner: Address, spender: Address, amount: U256) -> Self {
		self.state.get_mut().allowances.insert((owner, spender), amount);
		self
	}

	pub fn with_role(mut self, role: B256, account: Address) -> Self {
		self.state.get_mut().roles.insert((role, account));
		self
	}

	pub fn domain(&self) -> &DomainRecord {
		&self.domain
	}

	/// Timestamp of the latest block.
	pub async fn timestamp(&self) -> u64 {
		self.state.read().await.timestamp
	}

	pub async fn set_timestamp(&self, timestamp: u64) {
		self.state.write().await.timestamp = timestamp;
	}

	fn require_upgraded(&self, state: &TokenState) -> Result<(), DeliveryError> {
		if state.implementation == self.upgraded_implementation {
			Ok(())
		} else {
			Err(DeliveryError::reverted(UNKNOWN_SELECTOR))
		}
	}

	fn require_impersonated(state: &TokenState, account: Address) -> Result<(), DeliveryError> {
		if state.impersonated.contains(&account) {
			Ok(())
		} else {
			Err(DeliveryError::Network(format!(
				"Sender account not recognized: {}",
				account
			)))
		}
	}

	/// Signer of `request` under this token's domain, if the signature
	/// recovers to anything.
	fn recover(
		&self,
		request: AuthorizationRequest,
		signature: &Signature,
	) -> Result<Option<Address>, DeliveryError> {
		let digest = signing_hash(&self.domain, request.kind(), &request.to_message())
			.map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;
		Ok(alloy_primitives::Signature::from_raw(&signature.to_bytes())
			.and_then(|sig| sig.recover_address_from_prehash(&digest))
			.ok())
	}
}

#[async_trait]
impl TokenInterface for MockToken {
	fn address(&self) -> Address {
		self.domain.verifying_contract
	}

	async fn get_nonce(&self, account: Address) -> Result<U256, DeliveryError> {
		Ok(self.state.read().await.nonce(account))
	}

	async fn permit(
		&self,
		request: &PermitRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let mut state = self.state.write().await;
		self.require_upgraded(&state)?;

		if state.next_timestamp() > request.deadline {
			return Err(DeliveryError::reverted(PERMIT_EXPIRED));
		}
		let signed = PermitRequest {
			nonce: state.nonce(request.owner),
			..request.clone()
		};
		if self.recover(signed.into(), signature)? != Some(request.owner) {
			return Err(DeliveryError::reverted(PERMIT_INVALID_SIGNATURE));
		}

		state.use_nonce(request.owner);
		state
			.allowances
			.insert((request.owner, request.spender), request.value);
		Ok(state.mine_tx())
	}

	async fn execute_meta_transaction(
		&self,
		request: &MetaTransactionRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let mut state = self.state.write().await;

		if request.from.is_zero() {
			return Err(DeliveryError::reverted(META_TX_INVALID_SIGNER));
		}
		if self.recover(request.clone().into(), signature)? != Some(request.from) {
			return Err(DeliveryError::reverted(META_TX_INVALID_SIGNATURE));
		}
		if request.nonce != state.nonce(request.from) {
			return Err(DeliveryError::reverted(META_TX_INVALID_NONCE));
		}

		// The embedded call runs with `from` as the sender; if it fails the
		// whole transaction reverts, nonce included.
		let data = request.function_signature.as_ref();
		let block = state.block_number + 1;
		if let Ok(call) = IGhstToken::approveCall::abi_decode(data) {
			state
				.allowances
				.insert((request.from, call.spender), call.amount);
		} else if let Ok(call) = IGhstToken::transferCall::abi_decode(data) {
			if !state.transfer(request.from, call.to, call.amount, block) {
				return Err(DeliveryError::reverted(META_TX_CALL_FAILED));
			}
		} else {
			return Err(DeliveryError::reverted(META_TX_CALL_FAILED));
		}

		state.use_nonce(request.from);
		Ok(state.mine_tx())
	}

	async fn delegate_by_sig(
		&self,
		request: &DelegationRequest,
		signature: &Signature,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let mut state = self.state.write().await;
		self.require_upgraded(&state)?;

		if state.next_timestamp() > request.expiry {
			return Err(DeliveryError::reverted(VOTES_EXPIRED));
		}
		let signer = self
			.recover(request.clone().into(), signature)?
			.filter(|signer| !signer.is_zero())
			.ok_or_else(|| DeliveryError::reverted(ECDSA_INVALID_SIGNATURE))?;
		if request.nonce != state.nonce(signer) {
			return Err(DeliveryError::reverted(VOTES_INVALID_NONCE));
		}

		state.use_nonce(signer);
		let block = state.block_number + 1;
		state.delegate(signer, request.delegatee, block);
		Ok(state.mine_tx())
	}

	async fn delegate(
		&self,
		from: Address,
		delegatee: Address,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let mut state = self.state.write().await;
		self.require_upgraded(&state)?;
		let block = state.block_number + 1;
		state.delegate(from, delegatee, block);
		Ok(state.mine_tx())
	}

	async fn deposit(
		&self,
		from: Address,
		user: Address,
		amount: U256,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let mut state = self.state.write().await;
		Self::require_impersonated(&state, from)?;
		if !state.roles.contains(&(DEPOSITOR_ROLE, from)) {
			return Err(DeliveryError::reverted(INSUFFICIENT_PERMISSIONS));
		}
		let balance = state.balance(user);
		state.balances.insert(user, balance + amount);
		let delegate = state.delegate_of(user);
		let block = state.block_number + 1;
		state.move_voting_power(Address::ZERO, delegate, amount, block);
		Ok(state.mine_tx())
	}

	async fn name(&self) -> Result<String, DeliveryError> {
		Ok(self.domain.name.clone())
	}

	async fn symbol(&self) -> Result<String, DeliveryError> {
		Ok("GHST".to_string())
	}

	async fn decimals(&self) -> Result<u8, DeliveryError> {
		Ok(18)
	}

	async fn chain_id(&self) -> Result<U256, DeliveryError> {
		Ok(U256::from_be_bytes(self.domain.salt.0))
	}

	async fn domain_separator(&self) -> Result<B256, DeliveryError> {
		Ok(domain_separator(&self.domain))
	}

	async fn balance_of(&self, account: Address) -> Result<U256, DeliveryError> {
		Ok(self.state.read().await.balance(account))
	}

	async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, DeliveryError> {
		Ok(self
			.state
			.read()
			.await
			.allowances
			.get(&(owner, spender))
			.copied()
			.unwrap_or_default())
	}

	async fn has_role(&self, role: B256, account: Address) -> Result<bool, DeliveryError> {
		Ok(self.state.read().await.roles.contains(&(role, account)))
	}

	async fn delegates(&self, account: Address) -> Result<Address, DeliveryError> {
		let state = self.state.read().await;
		self.require_upgraded(&state)?;
		Ok(state.delegate_of(account))
	}

	async fn get_votes(&self, account: Address) -> Result<U256, DeliveryError> {
		let state = self.state.read().await;
		self.require_upgraded(&state)?;
		Ok(state.votes(account))
	}

	async fn get_past_votes(
		&self,
		account: Address,
		block_number: u64,
	) -> Result<U256, DeliveryError> {
		let state = self.state.read().await;
		self.require_upgraded(&state)?;
		if block_number >= state.block_number {
			return Err(DeliveryError::reverted(BLOCK_NOT_MINED));
		}
		Ok(state
			.checkpoints
			.get(&account)
			.and_then(|c| c.iter().rev().find(|(block, _)| *block <= block_number))
			.map(|(_, votes)| *votes)
			.unwrap_or_default())
	}
}

#[async_trait]
impl ProxyInterface for MockToken {
	async fn implementation(&self) -> Result<Address, DeliveryError> {
		Ok(self.state.read().await.implementation)
	}

	async fn update_implementation(
		&self,
		admin: Address,
		new_implementation: Address,
	) -> Result<SubmissionReceipt, DeliveryError> {
		let mut state = self.state.write().await;
		Self::require_impersonated(&state, admin)?;
		if admin != self.admin {
			return Err(DeliveryError::reverted(NOT_OWNER));
		}
		state.implementation = new_implementation;
		Ok(state.mine_tx())
	}

	async fn impersonate(&self, account: Address) -> Result<(), DeliveryError> {
		self.state.write().await.impersonated.insert(account);
		Ok(())
	}

	async fn mine(&self, blocks: u64) -> Result<(), DeliveryError> {
		let mut state = self.state.write().await;
		state.block_number += blocks;
		state.timestamp += blocks;
		Ok(())
	}

	async fn block_number(&self) -> Result<u64, DeliveryError> {
		Ok(self.state.read().await.block_number)
	}
}
