//! Message records and the authorization requests they are built from.
//!
//! A [`Message`] is the loosely-typed field map that gets encoded into a
//! typed-data envelope. An [`AuthorizationRequest`] is the strongly-typed
//! form callers work with; it knows its kind, its nonce and how to project
//! itself onto the schema of that kind.

use crate::schema::{schema, MessageKind, SolidityType, TypeSchema};
use crate::utils::formatting::{address_hex, bytes_hex, minimal_hex};
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised when a message does not fit its schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
	#[error("{kind} message is missing field '{field}'")]
	MissingField { kind: String, field: String },
	#[error("{kind} field '{field}' must be {expected}")]
	TypeMismatch {
		kind: String,
		field: String,
		expected: String,
	},
	#[error("{kind} schema has no field '{field}'")]
	UnexpectedField { kind: String, field: String },
}

/// A single message value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
	Address(Address),
	Uint(U256),
	Bytes(Bytes),
}

impl FieldValue {
	/// Whether this value can be encoded as `ty`.
	pub fn fits(&self, ty: SolidityType) -> bool {
		match (self, ty) {
			(FieldValue::Address(_), SolidityType::Address) => true,
			(FieldValue::Uint(_), SolidityType::Uint256) => true,
			(FieldValue::Bytes(_), SolidityType::Bytes) => true,
			(FieldValue::Bytes(b), SolidityType::Bytes32) => b.len() == 32,
			_ => false,
		}
	}

	/// Canonical hex form used at the signer boundary.
	pub fn to_canonical_hex(&self) -> String {
		match self {
			FieldValue::Address(a) => address_hex(a),
			FieldValue::Uint(v) => minimal_hex(*v),
			FieldValue::Bytes(b) => bytes_hex(b),
		}
	}
}

impl From<Address> for FieldValue {
	fn from(a: Address) -> Self {
		FieldValue::Address(a)
	}
}

impl From<U256> for FieldValue {
	fn from(v: U256) -> Self {
		FieldValue::Uint(v)
	}
}

impl From<Bytes> for FieldValue {
	fn from(b: Bytes) -> Self {
		FieldValue::Bytes(b)
	}
}

/// Field name to value map for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
	values: BTreeMap<String, FieldValue>,
}

impl Message {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder-style insert.
	pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
		self.insert(name, value);
		self
	}

	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
		self.values.insert(name.into(), value.into());
	}

	pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
		self.values.remove(name)
	}

	pub fn get(&self, name: &str) -> Option<&FieldValue> {
		self.values.get(name)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Checks that every schema field is present with a fitting value and
	/// that no undeclared field is present.
	pub fn check(&self, schema: &TypeSchema) -> Result<(), MessageError> {
		for field in schema.fields {
			let value = self
				.values
				.get(field.name)
				.ok_or_else(|| MessageError::MissingField {
					kind: schema.primary_type.to_string(),
					field: field.name.to_string(),
				})?;
			if !value.fits(field.field_type) {
				return Err(MessageError::TypeMismatch {
					kind: schema.primary_type.to_string(),
					field: field.name.to_string(),
					expected: field.field_type.to_string(),
				});
			}
		}
		if let Some(extra) = self.values.keys().find(|k| schema.field(k).is_none()) {
			return Err(MessageError::UnexpectedField {
				kind: schema.primary_type.to_string(),
				field: extra.clone(),
			});
		}
		Ok(())
	}

	/// Values in schema order. Call [`Message::check`] first.
	pub fn ordered<'a>(
		&'a self,
		schema: &'a TypeSchema,
	) -> impl Iterator<Item = (&'static str, Option<&'a FieldValue>)> + 'a {
		schema
			.fields
			.iter()
			.map(move |f| (f.name, self.values.get(f.name)))
	}
}

/// `Permit(owner, spender, value, nonce, deadline)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitRequest {
	pub owner: Address,
	pub spender: Address,
	pub value: U256,
	pub nonce: U256,
	pub deadline: U256,
}

/// `MetaTransaction(nonce, from, functionSignature)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaTransactionRequest {
	pub nonce: U256,
	pub from: Address,
	/// ABI-encoded call the token executes on behalf of `from`.
	pub function_signature: Bytes,
}

/// `Delegation(delegatee, nonce, expiry)`.
///
/// The delegator is not part of the message; the contract recovers it from
/// the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationRequest {
	pub delegatee: Address,
	pub nonce: U256,
	pub expiry: U256,
}

/// A signable authorization of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AuthorizationRequest {
	Permit(PermitRequest),
	MetaTransaction(MetaTransactionRequest),
	Delegation(DelegationRequest),
}

impl AuthorizationRequest {
	pub fn kind(&self) -> MessageKind {
		match self {
			AuthorizationRequest::Permit(_) => MessageKind::Permit,
			AuthorizationRequest::MetaTransaction(_) => MessageKind::MetaTransaction,
			AuthorizationRequest::Delegation(_) => MessageKind::Delegation,
		}
	}

	pub fn nonce(&self) -> U256 {
		match self {
			AuthorizationRequest::Permit(p) => p.nonce,
			AuthorizationRequest::MetaTransaction(m) => m.nonce,
			AuthorizationRequest::Delegation(d) => d.nonce,
		}
	}

	/// Account named in the message as the authorizing party, if any.
	pub fn account(&self) -> Option<Address> {
		match self {
			AuthorizationRequest::Permit(p) => Some(p.owner),
			AuthorizationRequest::MetaTransaction(m) => Some(m.from),
			AuthorizationRequest::Delegation(_) => None,
		}
	}

	/// Replaces the authorizing party (`owner` / `from`) with `account`.
	/// Delegations carry no such field and are left untouched.
	pub fn with_account(mut self, account: Address) -> Self {
		match &mut self {
			AuthorizationRequest::Permit(p) => p.owner = account,
			AuthorizationRequest::MetaTransaction(m) => m.from = account,
			AuthorizationRequest::Delegation(_) => {},
		}
		self
	}

	pub fn with_nonce(mut self, nonce: U256) -> Self {
		match &mut self {
			AuthorizationRequest::Permit(p) => p.nonce = nonce,
			AuthorizationRequest::MetaTransaction(m) => m.nonce = nonce,
			AuthorizationRequest::Delegation(d) => d.nonce = nonce,
		}
		self
	}

	/// Projects the request onto the message fields of its schema.
	pub fn to_message(&self) -> Message {
		match self {
			AuthorizationRequest::Permit(p) => Message::new()
				.with("owner", p.owner)
				.with("spender", p.spender)
				.with("value", p.value)
				.with("nonce", p.nonce)
				.with("deadline", p.deadline),
			AuthorizationRequest::MetaTransaction(m) => Message::new()
				.with("nonce", m.nonce)
				.with("from", m.from)
				.with("functionSignature", m.function_signature.clone()),
			AuthorizationRequest::Delegation(d) => Message::new()
				.with("delegatee", d.delegatee)
				.with("nonce", d.nonce)
				.with("expiry", d.expiry),
		}
	}

	pub fn schema(&self) -> TypeSchema {
		schema(self.kind())
	}
}

impl From<PermitRequest> for AuthorizationRequest {
	fn from(p: PermitRequest) -> Self {
		AuthorizationRequest::Permit(p)
	}
}

impl From<MetaTransactionRequest> for AuthorizationRequest {
	fn from(m: MetaTransactionRequest) -> Self {
		AuthorizationRequest::MetaTransaction(m)
	}
}

impl From<DelegationRequest> for AuthorizationRequest {
	fn from(d: DelegationRequest) -> Self {
		AuthorizationRequest::Delegation(d)
	}
}
