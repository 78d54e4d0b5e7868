//! EIP-712 hashing primitives.
//!
//! These helpers provide:
//! - Domain separator computation for [`DomainRecord`]
//! - Struct hashing of a [`Message`] against its schema
//! - Final digest computation (0x1901 || domainHash || structHash)
//! - A minimal ABI encoder for the static words EIP-712 hashes over
//!
//! Signers do not use these (they hash the envelope themselves); verifiers
//! and tests do, to rebuild the digest a contract would compute.

use crate::domain::DomainRecord;
use crate::message::{FieldValue, Message, MessageError};
use crate::schema::{domain_schema, schema, MessageKind, SolidityType};
use alloy_primitives::{keccak256, Address, B256, U256};

/// Computes the domain separator:
/// `keccak256(typeHash || keccak(name) || keccak(version) || verifyingContract || salt)`.
pub fn domain_separator(domain: &DomainRecord) -> B256 {
	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&domain_schema().type_hash());
	enc.push_b256(&keccak256(domain.name.as_bytes()));
	enc.push_b256(&keccak256(domain.version.as_bytes()));
	enc.push_address(&domain.verifying_contract);
	enc.push_b256(&domain.salt);
	keccak256(enc.finish())
}

/// Computes `hashStruct(message)` for `kind`.
///
/// Fails if the message does not match the schema exactly.
pub fn struct_hash(kind: MessageKind, message: &Message) -> Result<B256, MessageError> {
	let schema = schema(kind);
	message.check(&schema)?;

	let mut enc = Eip712AbiEncoder::new();
	enc.push_b256(&schema.type_hash());
	for field in schema.fields {
		match (field.field_type, message.get(field.name)) {
			(SolidityType::Address, Some(FieldValue::Address(a))) => enc.push_address(a),
			(SolidityType::Uint256, Some(FieldValue::Uint(v))) => enc.push_u256(*v),
			(SolidityType::Bytes, Some(FieldValue::Bytes(b))) => enc.push_b256(&keccak256(b)),
			(SolidityType::Bytes32, Some(FieldValue::Bytes(b))) if b.len() == 32 => {
				enc.push_b256(&B256::from_slice(b))
			},
			(expected, _) => {
				return Err(MessageError::TypeMismatch {
					kind: schema.primary_type.to_string(),
					field: field.name.to_string(),
					expected: expected.to_string(),
				})
			},
		}
	}
	Ok(keccak256(enc.finish()))
}

/// Computes the full signing digest of `message` under `domain`.
pub fn signing_hash(
	domain: &DomainRecord,
	kind: MessageKind,
	message: &Message,
) -> Result<B256, MessageError> {
	let struct_hash = struct_hash(kind, message)?;
	Ok(compute_final_digest(&domain_separator(domain), &struct_hash))
}

/// Compute the final EIP-712 digest: keccak256(0x1901 || domainHash || structHash).
pub fn compute_final_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_hash.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

/// Minimal ABI encoder for static types used in EIP-712 struct hashing.
#[derive(Default)]
pub struct Eip712AbiEncoder {
	buf: Vec<u8>,
}

impl Eip712AbiEncoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}
