//! Revert reasons raised by the token's signature checks.
//!
//! The submitter passes reasons through untouched; callers that need to act
//! on them (mostly assertions) classify them here.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const PERMIT_INVALID_SIGNATURE: &str = "ERC20Permit: invalid signature";
pub const PERMIT_EXPIRED: &str = "ERC20Permit: expired deadline";
pub const VOTES_EXPIRED: &str = "ERC20Votes: signature expired";
pub const VOTES_INVALID_NONCE: &str = "ERC20Votes: invalid nonce";
pub const META_TX_INVALID_SIGNATURE: &str = "Signer and signature do not match";
pub const META_TX_INVALID_SIGNER: &str = "NativeMetaTransaction: INVALID_SIGNER";
pub const META_TX_INVALID_NONCE: &str = "NativeMetaTransaction: invalid nonce";
pub const META_TX_CALL_FAILED: &str = "Function call not successful";

/// Coarse category of a verifier rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevertClass {
	/// Recomputed digest does not match the signature.
	InvalidSignature,
	/// Nonce in the message is not the account's current nonce.
	NonceMismatch,
	/// Deadline or expiry has passed.
	Expired,
	Other,
}

/// Reason string carried by a contract revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevertReason(pub String);

impl RevertReason {
	pub fn new(reason: impl Into<String>) -> Self {
		Self(reason.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn class(&self) -> RevertClass {
		let reason = self.0.to_lowercase();
		if reason.contains("invalid signature")
			|| reason.contains("invalid_signer")
			|| reason.contains("signature do not match")
		{
			RevertClass::InvalidSignature
		} else if reason.contains("nonce") {
			RevertClass::NonceMismatch
		} else if reason.contains("expired") {
			RevertClass::Expired
		} else {
			RevertClass::Other
		}
	}
}

impl fmt::Display for RevertReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_known_reasons_are_classified() {
		let cases = [
			(PERMIT_INVALID_SIGNATURE, RevertClass::InvalidSignature),
			(META_TX_INVALID_SIGNATURE, RevertClass::InvalidSignature),
			(META_TX_INVALID_SIGNER, RevertClass::InvalidSignature),
			("ECDSA: invalid signature", RevertClass::InvalidSignature),
			(PERMIT_EXPIRED, RevertClass::Expired),
			(VOTES_EXPIRED, RevertClass::Expired),
			(VOTES_INVALID_NONCE, RevertClass::NonceMismatch),
			(META_TX_INVALID_NONCE, RevertClass::NonceMismatch),
			(META_TX_CALL_FAILED, RevertClass::Other),
		];
		for (reason, class) in cases {
			assert_eq!(RevertReason::new(reason).class(), class, "{reason}");
		}
	}
}
