//! Signer capability for the GHST upgrade verifier.
//!
//! An account produces EIP-712 signatures over typed-data envelopes. The
//! signing service never sees keys; it hands an envelope to an
//! [`AccountInterface`] and gets 65 raw bytes back. Two implementations are
//! provided: a local private key and a node-held account reached over
//! `eth_signTypedData_v4`.

use async_trait::async_trait;
use ghst_types::{Address, Bytes, ConfigSchema, ImplementationRegistry, SecretString, TypedDataEnvelope};
use thiserror::Error;

pub mod implementations {
	pub mod local;
	pub mod rpc;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// The signer refused or failed to produce a signature.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// A configured key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when interacting with the account implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Trait defining the interface for account implementations.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Returns the configuration schema for this account implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address the account signs as.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Asks the wallet to sign `envelope` as `account`.
	///
	/// Returns the raw `r || s || v` bytes exactly as the wallet produced
	/// them. Length and recovery id are checked by the caller.
	async fn request_typed_data_signature(
		&self,
		account: Address,
		envelope: &TypedDataEnvelope,
	) -> Result<Bytes, AccountError>;

	/// Private key, for implementations that hold one. Delivery uses it to
	/// sign transactions; node-held accounts return `None` and let the node
	/// sign instead.
	fn get_private_key(&self) -> Option<SecretString> {
		None
	}
}

/// Type alias for account factory functions.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Registry trait for account implementations.
pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Get all registered account implementations.
///
/// Returns a vector of (name, factory) tuples for all available account implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::{local, rpc};

	vec![
		(local::Registry::NAME, local::Registry::factory()),
		(rpc::Registry::NAME, rpc::Registry::factory()),
	]
}

/// Service that manages account operations.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// Builds the service from a named implementation and its configuration.
	pub fn from_config(name: &str, config: &toml::Value) -> Result<Self, AccountError> {
		let factory = get_all_implementations()
			.into_iter()
			.find_map(|(n, f)| (n == name).then_some(f))
			.ok_or_else(|| {
				AccountError::Implementation(format!("Unknown account implementation '{}'", name))
			})?;
		Ok(Self::new(factory(config)?))
	}

	pub async fn get_address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	pub fn get_private_key(&self) -> Option<SecretString> {
		self.implementation.get_private_key()
	}

	/// The underlying signer, for handing to the signature service.
	pub fn signer(&self) -> &dyn AccountInterface {
		self.implementation.as_ref()
	}
}
