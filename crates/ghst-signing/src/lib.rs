//! Typed-data encoding and signing for GHST authorizations.
//!
//! [`encoder`] turns a message into the envelope a wallet signs;
//! [`SignatureService`] drives a signer through one authorization and hands
//! back the decomposed signature. Nothing here talks to the token.

pub mod encoder;
mod service;

use ghst_account::AccountError;
use ghst_types::{MessageError, SignatureError};
use thiserror::Error;

pub use encoder::{encode, encode_request};
pub use service::{SignatureService, SignedAuthorization};

/// Errors that can occur while producing a signature.
#[derive(Debug, Error)]
pub enum SigningError {
	/// The message does not fit the schema of its kind.
	#[error("Schema mismatch: {0}")]
	SchemaMismatch(#[from] MessageError),
	/// The signer refused, was unreachable or failed.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// The signer answered with something that is not a usable signature.
	#[error("Malformed signature: {0}")]
	MalformedSignature(#[from] SignatureError),
}

impl From<AccountError> for SigningError {
	fn from(err: AccountError) -> Self {
		SigningError::SigningFailed(err.to_string())
	}
}
