//! Local private-key signer.
//!
//! Hashes the envelope the same way a wallet would for
//! `eth_signTypedData_v4` (through `alloy-dyn-abi`'s `TypedData`) and signs
//! the digest in-process. Deterministic, so it doubles as the test signer.

use crate::{AccountError, AccountInterface};
use alloy_dyn_abi::TypedData;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use ghst_types::{
	with_0x_prefix, Address, Bytes, ConfigSchema, Field, FieldType, Schema, SecretString,
	TypedDataEnvelope, ValidationError,
};

/// Account backed by a private key held in memory.
pub struct LocalWallet {
	signer: PrivateKeySigner,
	private_key: SecretString,
}

impl LocalWallet {
	/// Creates a wallet from a hex private key, with or without `0x`.
	pub fn new(private_key: &str) -> Result<Self, AccountError> {
		let signer = private_key
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;
		Ok(Self {
			signer,
			private_key: SecretString::from(with_0x_prefix(private_key)),
		})
	}

	pub fn address(&self) -> Address {
		self.signer.address()
	}
}

/// Configuration schema for the local wallet.
pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(|value| {
				let key = value.as_str().unwrap_or_default();
				let hex = key.strip_prefix("0x").unwrap_or(key);
				if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
					return Err("must be 32 bytes of hex".to_string());
				}
				Ok(())
			})],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalWalletSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn request_typed_data_signature(
		&self,
		account: Address,
		envelope: &TypedDataEnvelope,
	) -> Result<Bytes, AccountError> {
		if account != self.signer.address() {
			return Err(AccountError::SigningFailed(format!(
				"Local wallet holds {}, cannot sign as {}",
				self.signer.address(),
				account
			)));
		}

		let json = envelope
			.to_json()
			.map_err(|e| AccountError::SigningFailed(format!("Unserializable envelope: {}", e)))?;
		let typed: TypedData = serde_json::from_value(json)
			.map_err(|e| AccountError::SigningFailed(format!("Invalid typed data: {}", e)))?;
		let digest = typed
			.eip712_signing_hash()
			.map_err(|e| AccountError::SigningFailed(format!("Cannot hash typed data: {}", e)))?;

		let signature = self
			.signer
			.sign_hash(&digest)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;

		tracing::debug!(
			account = %account,
			primary_type = %envelope.primary_type,
			digest = %digest,
			"Signed typed data locally"
		);
		Ok(Bytes::from(signature.as_bytes().to_vec()))
	}

	fn get_private_key(&self) -> Option<SecretString> {
		Some(self.private_key.clone())
	}
}

/// Factory function to create a local wallet from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded private key
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(format!("Invalid configuration: {}", e)))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".to_string()))?;

	Ok(Box::new(LocalWallet::new(private_key)?))
}

/// Registry for the local wallet implementation.
pub struct Registry;

impl ghst_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl crate::AccountRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, U256};
	use alloy_sol_types::{eip712_domain, sol, SolStruct};
	use ghst_types::utils::eip712::signing_hash;
	use ghst_types::utils::formatting::{address_hex, bytes_hex, minimal_hex};
	use ghst_types::{
		domain, domain_schema, schema, EnvelopeDomain, MessageKind, PermitRequest, Signature,
	};
	use std::collections::BTreeMap;

	const HARDHAT_KEY_0: &str =
		"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const HARDHAT_KEY_1: &str =
		"0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

	sol! {
		struct Permit {
			address owner;
			address spender;
			uint256 value;
			uint256 nonce;
			uint256 deadline;
		}
	}

	fn permit_request(owner: Address) -> PermitRequest {
		PermitRequest {
			owner,
			spender: address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
			value: U256::from(10_000),
			nonce: U256::ZERO,
			deadline: U256::from(20_469_493_830u64),
		}
	}

	// Built by hand here; the signing crate owns the real encoder.
	fn permit_envelope(request: &PermitRequest) -> TypedDataEnvelope {
		let d = domain();
		let mut types = BTreeMap::new();
		types.insert(
			"EIP712Domain".to_string(),
			TypedDataEnvelope::type_entry(&domain_schema()),
		);
		types.insert(
			"Permit".to_string(),
			TypedDataEnvelope::type_entry(&schema(MessageKind::Permit)),
		);
		let mut message = serde_json::Map::new();
		message.insert("owner".into(), address_hex(&request.owner).into());
		message.insert("spender".into(), address_hex(&request.spender).into());
		message.insert("value".into(), minimal_hex(request.value).into());
		message.insert("nonce".into(), minimal_hex(request.nonce).into());
		message.insert("deadline".into(), minimal_hex(request.deadline).into());
		TypedDataEnvelope {
			types,
			primary_type: "Permit".to_string(),
			domain: EnvelopeDomain {
				name: d.name.clone(),
				version: d.version.clone(),
				verifying_contract: address_hex(&d.verifying_contract),
				salt: bytes_hex(d.salt.as_slice()),
			},
			message,
		}
	}

	#[test]
	fn test_hashing_paths_agree() {
		let request = permit_request(address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));

		let typed: TypedData =
			serde_json::from_value(permit_envelope(&request).to_json().unwrap()).unwrap();
		let via_dyn_abi = typed.eip712_signing_hash().unwrap();

		let via_struct_hash = signing_hash(
			&domain(),
			MessageKind::Permit,
			&ghst_types::AuthorizationRequest::from(request.clone()).to_message(),
		)
		.unwrap();

		let sol_domain = eip712_domain! {
			name: "Aavegotchi GHST Token (PoS)",
			version: "1",
			verifying_contract: ghst_types::PROXY_ADDRESS,
			salt: domain().salt,
		};
		let via_sol = Permit {
			owner: request.owner,
			spender: request.spender,
			value: request.value,
			nonce: request.nonce,
			deadline: request.deadline,
		}
		.eip712_signing_hash(&sol_domain);

		assert_eq!(via_dyn_abi, via_struct_hash);
		assert_eq!(via_sol, via_struct_hash);
	}

	#[tokio::test]
	async fn test_signature_recovers_to_wallet() {
		let wallet = LocalWallet::new(HARDHAT_KEY_0).unwrap();
		let request = permit_request(wallet.address());
		let envelope = permit_envelope(&request);

		let raw = wallet
			.request_typed_data_signature(wallet.address(), &envelope)
			.await
			.unwrap();
		let decomposed = Signature::from_raw(&raw).unwrap();
		assert!(decomposed.v == 27 || decomposed.v == 28);
		assert_eq!(decomposed.to_bytes().as_slice(), raw.as_ref());

		let digest = signing_hash(
			&domain(),
			MessageKind::Permit,
			&ghst_types::AuthorizationRequest::from(request).to_message(),
		)
		.unwrap();
		let recovered = alloy_primitives::Signature::from_raw(&raw)
			.unwrap()
			.recover_address_from_prehash(&digest)
			.unwrap();
		assert_eq!(recovered, wallet.address());
	}

	#[tokio::test]
	async fn test_signing_is_deterministic() {
		let wallet = LocalWallet::new(HARDHAT_KEY_0).unwrap();
		let envelope = permit_envelope(&permit_request(wallet.address()));
		let a = wallet
			.request_typed_data_signature(wallet.address(), &envelope)
			.await
			.unwrap();
		let b = wallet
			.request_typed_data_signature(wallet.address(), &envelope)
			.await
			.unwrap();
		assert_eq!(a, b);
	}

	#[tokio::test]
	async fn test_refuses_foreign_account() {
		let wallet = LocalWallet::new(HARDHAT_KEY_0).unwrap();
		let other = LocalWallet::new(HARDHAT_KEY_1).unwrap();
		let envelope = permit_envelope(&permit_request(other.address()));
		let err = wallet
			.request_typed_data_signature(other.address(), &envelope)
			.await
			.unwrap_err();
		assert!(matches!(err, AccountError::SigningFailed(_)));
	}

	#[test]
	fn test_config_validation() {
		let good: toml::Value = toml::from_str(&format!("private_key = \"{}\"", HARDHAT_KEY_0)).unwrap();
		assert!(create_account(&good).is_ok());

		let short: toml::Value = toml::from_str("private_key = \"0x1234\"").unwrap();
		assert!(matches!(
			create_account(&short),
			Err(AccountError::InvalidKey(_))
		));
	}

	#[test]
	fn test_private_key_is_prefixed() {
		let wallet = LocalWallet::new(HARDHAT_KEY_0.trim_start_matches("0x")).unwrap();
		let key = wallet.get_private_key().unwrap();
		assert_eq!(key.with_exposed(|k| k.to_string()), HARDHAT_KEY_0);
	}
}
