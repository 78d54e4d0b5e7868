//! The typed-data envelope handed to signers.
//!
//! Serializes to the JSON object `eth_signTypedData_v4` expects:
//! `{ types, primaryType, domain, message }`. Every value is already in its
//! canonical hex form; nothing in here hashes.

use crate::schema::{MessageKind, TypeSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `{ "name": ..., "type": ... }` entry of a `types` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeField {
	pub name: String,
	#[serde(rename = "type")]
	pub field_type: String,
}

/// Domain values in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeDomain {
	pub name: String,
	pub version: String,
	/// Lowercase, `0x`-prefixed.
	pub verifying_contract: String,
	/// `0x`-prefixed 32-byte word.
	pub salt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataEnvelope {
	pub types: BTreeMap<String, Vec<EnvelopeField>>,
	pub primary_type: String,
	pub domain: EnvelopeDomain,
	/// Message values keyed by field name, in schema order.
	pub message: serde_json::Map<String, serde_json::Value>,
}

impl TypedDataEnvelope {
	/// Converts a schema into its `types` entry, preserving field order.
	pub fn type_entry(schema: &TypeSchema) -> Vec<EnvelopeField> {
		schema
			.fields
			.iter()
			.map(|f| EnvelopeField {
				name: f.name.to_string(),
				field_type: f.field_type.to_string(),
			})
			.collect()
	}

	pub fn kind(&self) -> Option<MessageKind> {
		MessageKind::from_primary_type(&self.primary_type)
	}

	pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
		serde_json::to_value(self)
	}
}
