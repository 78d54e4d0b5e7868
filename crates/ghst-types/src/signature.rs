//! Recoverable ECDSA signatures split into the `(v, r, s)` triple that the
//! token's entry points take as separate arguments.

use crate::utils::formatting::bytes_hex;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a raw `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
	#[error("Expected 65-byte signature, got {0} bytes")]
	InvalidLength(usize),
	#[error("Invalid recovery id: {0}")]
	InvalidRecoveryId(u8),
}

/// Decomposed signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
	/// Recovery id, 27 or 28.
	pub v: u8,
	pub r: B256,
	pub s: B256,
}

impl Signature {
	/// Splits a raw 65-byte signature at fixed offsets: `r = [0..32]`,
	/// `s = [32..64]`, `v = [64]`.
	///
	/// Some signers report parity as 0/1 instead of 27/28; those are shifted
	/// into the 27/28 range the token expects.
	pub fn from_raw(raw: &[u8]) -> Result<Self, SignatureError> {
		if raw.len() != SIGNATURE_LENGTH {
			return Err(SignatureError::InvalidLength(raw.len()));
		}
		let v = match raw[64] {
			v @ (0 | 1) => v + 27,
			v @ (27 | 28) => v,
			v => return Err(SignatureError::InvalidRecoveryId(v)),
		};
		Ok(Self {
			v,
			r: B256::from_slice(&raw[..32]),
			s: B256::from_slice(&raw[32..64]),
		})
	}

	/// Reassembles `r || s || v`.
	pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
		let mut out = [0u8; SIGNATURE_LENGTH];
		out[..32].copy_from_slice(self.r.as_slice());
		out[32..64].copy_from_slice(self.s.as_slice());
		out[64] = self.v;
		out
	}

	pub fn to_hex(&self) -> String {
		bytes_hex(&self.to_bytes())
	}
}

impl TryFrom<&[u8]> for Signature {
	type Error = SignatureError;

	fn try_from(raw: &[u8]) -> Result<Self, Self::Error> {
		Self::from_raw(raw)
	}
}
