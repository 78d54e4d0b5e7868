//! EIP-712 type schemas for the three signed message kinds.
//!
//! Field order is part of the type string and therefore of the struct hash;
//! it must match the struct definitions compiled into the token.

use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of off-chain authorizations the token accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
	/// ERC-2612 style allowance approval.
	Permit,
	/// Meta-transaction relayed on behalf of `from`.
	MetaTransaction,
	/// ERC20Votes delegation by signature.
	Delegation,
}

impl MessageKind {
	pub const ALL: [MessageKind; 3] = [
		MessageKind::Permit,
		MessageKind::MetaTransaction,
		MessageKind::Delegation,
	];

	/// EIP-712 primary type name.
	pub fn primary_type(&self) -> &'static str {
		match self {
			MessageKind::Permit => "Permit",
			MessageKind::MetaTransaction => "MetaTransaction",
			MessageKind::Delegation => "Delegation",
		}
	}

	/// Looks up a kind by its primary type name.
	pub fn from_primary_type(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|k| k.primary_type() == name)
	}
}

impl fmt::Display for MessageKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.primary_type())
	}
}

/// Solidity types that appear in the schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolidityType {
	Address,
	Uint256,
	Bytes,
	Bytes32,
	String,
}

impl SolidityType {
	pub fn as_str(&self) -> &'static str {
		match self {
			SolidityType::Address => "address",
			SolidityType::Uint256 => "uint256",
			SolidityType::Bytes => "bytes",
			SolidityType::Bytes32 => "bytes32",
			SolidityType::String => "string",
		}
	}
}

impl fmt::Display for SolidityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One `(name, type)` member of a struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedField {
	pub name: &'static str,
	pub field_type: SolidityType,
}

const fn field(name: &'static str, field_type: SolidityType) -> TypedField {
	TypedField { name, field_type }
}

/// Ordered member list of an EIP-712 struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSchema {
	pub primary_type: &'static str,
	pub fields: &'static [TypedField],
}

impl TypeSchema {
	/// Renders the canonical type string, e.g.
	/// `Delegation(address delegatee,uint256 nonce,uint256 expiry)`.
	pub fn encode_type(&self) -> String {
		let members = self
			.fields
			.iter()
			.map(|f| format!("{} {}", f.field_type, f.name))
			.collect::<Vec<_>>()
			.join(",");
		format!("{}({})", self.primary_type, members)
	}

	/// keccak256 of the canonical type string.
	pub fn type_hash(&self) -> B256 {
		keccak256(self.encode_type().as_bytes())
	}

	pub fn field(&self, name: &str) -> Option<&TypedField> {
		self.fields.iter().find(|f| f.name == name)
	}
}

const DOMAIN_FIELDS: &[TypedField] = &[
	field("name", SolidityType::String),
	field("version", SolidityType::String),
	field("verifyingContract", SolidityType::Address),
	field("salt", SolidityType::Bytes32),
];

const PERMIT_FIELDS: &[TypedField] = &[
	field("owner", SolidityType::Address),
	field("spender", SolidityType::Address),
	field("value", SolidityType::Uint256),
	field("nonce", SolidityType::Uint256),
	field("deadline", SolidityType::Uint256),
];

const META_TRANSACTION_FIELDS: &[TypedField] = &[
	field("nonce", SolidityType::Uint256),
	field("from", SolidityType::Address),
	field("functionSignature", SolidityType::Bytes),
];

const DELEGATION_FIELDS: &[TypedField] = &[
	field("delegatee", SolidityType::Address),
	field("nonce", SolidityType::Uint256),
	field("expiry", SolidityType::Uint256),
];

pub const EIP712_DOMAIN_SCHEMA: TypeSchema = TypeSchema {
	primary_type: "EIP712Domain",
	fields: DOMAIN_FIELDS,
};

pub const PERMIT_SCHEMA: TypeSchema = TypeSchema {
	primary_type: "Permit",
	fields: PERMIT_FIELDS,
};

pub const META_TRANSACTION_SCHEMA: TypeSchema = TypeSchema {
	primary_type: "MetaTransaction",
	fields: META_TRANSACTION_FIELDS,
};

pub const DELEGATION_SCHEMA: TypeSchema = TypeSchema {
	primary_type: "Delegation",
	fields: DELEGATION_FIELDS,
};

/// Schema of the domain struct.
pub fn domain_schema() -> TypeSchema {
	EIP712_DOMAIN_SCHEMA
}

/// Schema of the message struct for `kind`.
pub fn schema(kind: MessageKind) -> TypeSchema {
	match kind {
		MessageKind::Permit => PERMIT_SCHEMA,
		MessageKind::MetaTransaction => META_TRANSACTION_SCHEMA,
		MessageKind::Delegation => DELEGATION_SCHEMA,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::b256;

	#[test]
	fn test_type_strings() {
		assert_eq!(
			schema(MessageKind::Permit).encode_type(),
			"Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)"
		);
		assert_eq!(
			schema(MessageKind::MetaTransaction).encode_type(),
			"MetaTransaction(uint256 nonce,address from,bytes functionSignature)"
		);
		assert_eq!(
			schema(MessageKind::Delegation).encode_type(),
			"Delegation(address delegatee,uint256 nonce,uint256 expiry)"
		);
		assert_eq!(
			domain_schema().encode_type(),
			"EIP712Domain(string name,string version,address verifyingContract,bytes32 salt)"
		);
	}

	#[test]
	fn test_permit_type_hash_matches_erc2612() {
		assert_eq!(
			schema(MessageKind::Permit).type_hash(),
			b256!("0x6e71edae12b1b97f4d1f60370fef10105fa2faae0126114a169c64845d6126c9")
		);
	}

	#[test]
	fn test_delegation_type_hash_matches_erc20_votes() {
		assert_eq!(
			schema(MessageKind::Delegation).type_hash(),
			b256!("0xe48329057bfd03d55e49b547132e39cffd9c1820ad7b9d4c5307691425d15adf")
		);
	}

	#[test]
	fn test_primary_type_lookup() {
		for kind in MessageKind::ALL {
			assert_eq!(MessageKind::from_primary_type(kind.primary_type()), Some(kind));
			assert_eq!(schema(kind).primary_type, kind.primary_type());
		}
		assert_eq!(MessageKind::from_primary_type("EIP712Domain"), None);
	}
}
