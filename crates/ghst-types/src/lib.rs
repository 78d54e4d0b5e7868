//! Common types for the GHST upgrade verifier.
//!
//! This crate holds the data shared by every other crate in the workspace:
//! the fixed EIP-712 domain and message schemas, the message and signature
//! records that flow through a signed authorization, the typed-data envelope
//! handed to signers, and the hashing primitives a verifier needs to rebuild
//! the digest.

/// The process-wide EIP-712 domain record and known deployment addresses.
pub mod domain;
/// Typed-data envelope in the `eth_signTypedData_v4` shape.
pub mod envelope;
/// Message values and the per-kind authorization requests.
pub mod message;
/// Self-registration of named implementations.
pub mod registry;
/// Contract revert reasons and their classification.
pub mod revert;
/// Ordered EIP-712 type schemas for each message kind.
pub mod schema;
/// Zeroizing wrapper for private keys.
pub mod secret_string;
/// Decomposed (v, r, s) signatures.
pub mod signature;
/// Hashing and hex formatting helpers.
pub mod utils;
/// TOML configuration validation.
pub mod validation;

pub use domain::{
	domain, DomainRecord, CHAIN_ID, DOMAIN_NAME, DOMAIN_VERSION, NEW_IMPLEMENTATION_ADDRESS,
	OLD_IMPLEMENTATION_ADDRESS, PROXY_ADDRESS, PROXY_ADMIN_ADDRESS,
};
pub use envelope::{EnvelopeDomain, EnvelopeField, TypedDataEnvelope};
pub use message::{
	AuthorizationRequest, DelegationRequest, FieldValue, Message, MessageError,
	MetaTransactionRequest, PermitRequest,
};
pub use registry::ImplementationRegistry;
pub use revert::{RevertClass, RevertReason};
pub use schema::{domain_schema, schema, MessageKind, SolidityType, TypeSchema, TypedField};
pub use secret_string::SecretString;
pub use signature::{Signature, SignatureError, SIGNATURE_LENGTH};
pub use utils::{current_timestamp, with_0x_prefix};
pub use validation::*;

/// Re-exported so downstream crates agree on one set of primitive types.
pub use alloy_primitives::{Address, Bytes, B256, U256};
