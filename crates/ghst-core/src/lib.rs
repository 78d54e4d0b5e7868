//! Upgrade verification harness for the GHST token.
//!
//! Drives the signed-authorization flows end to end (read nonce, sign,
//! submit) and wraps them in the upgrade procedure: capture state, swap the
//! proxy's implementation, capture state again and run the checks that the
//! new implementation must pass.

use ghst_delivery::DeliveryError;
use ghst_signing::SigningError;
use thiserror::Error;

pub mod builder;
pub mod checks;
pub mod flows;
pub mod harness;
pub mod snapshot;

pub use builder::HarnessBuilder;
pub use checks::{CheckOutcome, UpgradeReport};
pub use flows::{AuthorizationFlow, FlowOutcome};
pub use harness::UpgradeHarness;
pub use snapshot::{StateDiff, StateSnapshot};

/// Errors that can occur while running the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
	/// Error related to configuration issues.
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Signing error: {0}")]
	Signing(#[from] SigningError),
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
	/// The proxy does not point at the expected implementation after a swap.
	#[error("Upgrade failed: {0}")]
	UpgradeFailed(String),
	/// A check observed state other than what it expected.
	#[error("Check failed: {0}")]
	Check(String),
}

impl From<ghst_account::AccountError> for HarnessError {
	fn from(err: ghst_account::AccountError) -> Self {
		HarnessError::Signing(err.into())
	}
}
