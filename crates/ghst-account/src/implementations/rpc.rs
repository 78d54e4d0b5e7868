//! Node-held account.
//!
//! Forwards the envelope to a node's `eth_signTypedData_v4`, which is how
//! unlocked dev-node accounts (hardhat, anvil) sign. The node returns the
//! signature as a hex string; it is passed on unchecked.

use crate::{AccountError, AccountInterface};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;
use ghst_types::{
	Address, Bytes, ConfigSchema, Field, FieldType, Schema, TypedDataEnvelope, ValidationError,
};

/// Account whose key lives in the node.
pub struct RpcAccount {
	provider: DynProvider,
	address: Address,
}

impl RpcAccount {
	pub fn new(rpc_url: &str, address: Address) -> Result<Self, AccountError> {
		let url = rpc_url
			.parse()
			.map_err(|e| AccountError::Implementation(format!("Invalid RPC URL: {}", e)))?;
		let provider = ProviderBuilder::new().connect_http(url).erased();
		Ok(Self { provider, address })
	}
}

/// Configuration schema for node-held accounts.
pub struct RpcAccountSchema;

impl ConfigSchema for RpcAccountSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("rpc_url", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
							Ok(())
						},
						_ => Err("must be an http(s) URL".to_string()),
					}
				}),
				Field::new("address", FieldType::String).with_validator(|value| {
					value
						.as_str()
						.unwrap_or_default()
						.parse::<Address>()
						.map(|_| ())
						.map_err(|e| e.to_string())
				}),
			],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl AccountInterface for RpcAccount {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RpcAccountSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.address)
	}

	async fn request_typed_data_signature(
		&self,
		account: Address,
		envelope: &TypedDataEnvelope,
	) -> Result<Bytes, AccountError> {
		let json = envelope
			.to_json()
			.map_err(|e| AccountError::SigningFailed(format!("Unserializable envelope: {}", e)))?;

		let signature: Bytes = self
			.provider
			.raw_request("eth_signTypedData_v4".into(), (account, json))
			.await
			.map_err(|e| AccountError::SigningFailed(format!("eth_signTypedData_v4 failed: {}", e)))?;

		tracing::debug!(
			account = %account,
			primary_type = %envelope.primary_type,
			len = signature.len(),
			"Node signed typed data"
		);
		Ok(signature)
	}
}

/// Factory function to create a node-held account from configuration.
///
/// Configuration parameters:
/// - `rpc_url`: node endpoint
/// - `address`: unlocked account to sign as
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	RpcAccountSchema
		.validate(config)
		.map_err(|e| AccountError::Implementation(format!("Invalid configuration: {}", e)))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::Implementation("rpc_url is required".to_string()))?;
	let address = config
		.get("address")
		.and_then(|v| v.as_str())
		.and_then(|s| s.parse::<Address>().ok())
		.ok_or_else(|| AccountError::Implementation("address is required".to_string()))?;

	Ok(Box::new(RpcAccount::new(rpc_url, address)?))
}

/// Registry for the node-held account implementation.
pub struct Registry;

impl ghst_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "rpc";
	type Factory = crate::AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl crate::AccountRegistry for Registry {}
