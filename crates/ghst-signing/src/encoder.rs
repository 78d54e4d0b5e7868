//! Builds `eth_signTypedData_v4` envelopes.
//!
//! The envelope carries the domain, both struct definitions and the message
//! in canonical hex. Hashing is left to whoever signs it.

use crate::SigningError;
use ghst_types::utils::formatting::{address_hex, bytes_hex};
use ghst_types::{
	domain_schema, schema, AuthorizationRequest, DomainRecord, EnvelopeDomain, Message,
	MessageError, MessageKind, TypedDataEnvelope,
};
use std::collections::BTreeMap;

/// Encodes `message` as a `kind` envelope under `domain`.
///
/// Every schema field must be present with a value of the declared type and
/// no other field may be present. Message values keep schema order.
pub fn encode(
	kind: MessageKind,
	domain: &DomainRecord,
	message: &Message,
) -> Result<TypedDataEnvelope, SigningError> {
	let schema = schema(kind);
	message.check(&schema)?;

	let mut types = BTreeMap::new();
	types.insert(
		domain_schema().primary_type.to_string(),
		TypedDataEnvelope::type_entry(&domain_schema()),
	);
	types.insert(
		kind.primary_type().to_string(),
		TypedDataEnvelope::type_entry(&schema),
	);

	let mut values = serde_json::Map::with_capacity(schema.fields.len());
	for (name, value) in message.ordered(&schema) {
		let value = value.ok_or_else(|| MessageError::MissingField {
			kind: kind.to_string(),
			field: name.to_string(),
		})?;
		values.insert(name.to_string(), value.to_canonical_hex().into());
	}

	Ok(TypedDataEnvelope {
		types,
		primary_type: kind.primary_type().to_string(),
		domain: EnvelopeDomain {
			name: domain.name.clone(),
			version: domain.version.clone(),
			verifying_contract: address_hex(&domain.verifying_contract),
			salt: bytes_hex(domain.salt.as_slice()),
		},
		message: values,
	})
}

/// Encodes a typed request.
pub fn encode_request(
	domain: &DomainRecord,
	request: &AuthorizationRequest,
) -> Result<TypedDataEnvelope, SigningError> {
	encode(request.kind(), domain, &request.to_message())
}

#[cfg(test)]
mod tests {
	use super::*;
	use ghst_types::{
		domain, Address, Bytes, DelegationRequest, MetaTransactionRequest, PermitRequest, U256,
	};
	use serde_json::json;

	fn owner() -> Address {
		"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap()
	}

	fn scenario_permit() -> AuthorizationRequest {
		PermitRequest {
			owner: owner(),
			spender: "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap(),
			value: U256::from(10_000),
			nonce: U256::ZERO,
			deadline: U256::from(20_469_493_830u64),
		}
		.into()
	}

	#[test]
	fn test_permit_envelope_shape() {
		let envelope = encode_request(&domain(), &scenario_permit()).unwrap();
		let expected = json!({
			"types": {
				"EIP712Domain": [
					{ "name": "name", "type": "string" },
					{ "name": "version", "type": "string" },
					{ "name": "verifyingContract", "type": "address" },
					{ "name": "salt", "type": "bytes32" }
				],
				"Permit": [
					{ "name": "owner", "type": "address" },
					{ "name": "spender", "type": "address" },
					{ "name": "value", "type": "uint256" },
					{ "name": "nonce", "type": "uint256" },
					{ "name": "deadline", "type": "uint256" }
				]
			},
			"primaryType": "Permit",
			"domain": {
				"name": "Aavegotchi GHST Token (PoS)",
				"version": "1",
				"verifyingContract": "0x385eeac5cb85a38a9a07a70c73e0a3271cfb54a7",
				"salt": "0x0000000000000000000000000000000000000000000000000000000000000089"
			},
			"message": {
				"owner": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
				"spender": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
				"value": "0x2710",
				"nonce": "0x0",
				"deadline": "0x4c413b046"
			}
		});
		assert_eq!(envelope.to_json().unwrap(), expected);
		assert_eq!(envelope.kind(), Some(MessageKind::Permit));
	}

	#[test]
	fn test_message_keeps_schema_order() {
		let request: AuthorizationRequest = MetaTransactionRequest {
			nonce: U256::from(1),
			from: owner(),
			function_signature: Bytes::from(vec![0x09, 0x5e, 0xa7, 0xb3]),
		}
		.into();
		let envelope = encode_request(&domain(), &request).unwrap();
		let keys: Vec<_> = envelope.message.keys().cloned().collect();
		assert_eq!(keys, vec!["nonce", "from", "functionSignature"]);
		assert_eq!(envelope.message["functionSignature"], json!("0x095ea7b3"));

		let delegation: AuthorizationRequest = DelegationRequest {
			delegatee: owner(),
			nonce: U256::ZERO,
			expiry: U256::from(1),
		}
		.into();
		let envelope = encode_request(&domain(), &delegation).unwrap();
		let keys: Vec<_> = envelope.message.keys().cloned().collect();
		assert_eq!(keys, vec!["delegatee", "nonce", "expiry"]);
	}

	#[test]
	fn test_missing_field_is_schema_mismatch() {
		let mut message = scenario_permit().to_message();
		message.remove("deadline");
		let err = encode(MessageKind::Permit, &domain(), &message).unwrap_err();
		assert!(matches!(
			err,
			SigningError::SchemaMismatch(MessageError::MissingField { ref field, .. }) if field == "deadline"
		));
	}

	#[test]
	fn test_extra_field_is_schema_mismatch() {
		let message = scenario_permit()
			.to_message()
			.with("expiry", U256::from(1));
		assert!(matches!(
			encode(MessageKind::Permit, &domain(), &message),
			Err(SigningError::SchemaMismatch(MessageError::UnexpectedField { .. }))
		));
	}

	#[test]
	fn test_message_encoded_under_wrong_kind() {
		let message = scenario_permit().to_message();
		assert!(matches!(
			encode(MessageKind::Delegation, &domain(), &message),
			Err(SigningError::SchemaMismatch(_))
		));
	}

	#[test]
	fn test_custom_verifying_contract() {
		let proxy = Address::repeat_byte(0xab);
		let envelope =
			encode_request(&domain().with_verifying_contract(proxy), &scenario_permit()).unwrap();
		assert_eq!(
			envelope.domain.verifying_contract,
			"0xabababababababababababababababababababab"
		);
	}
}
