//! Hashing and formatting helpers shared across the workspace.

pub mod eip712;
pub mod formatting;

pub use eip712::{
	compute_final_digest, domain_separator, signing_hash, struct_hash, Eip712AbiEncoder,
};
pub use formatting::{address_hex, bytes_hex, minimal_hex, truncate_id, with_0x_prefix};

/// Current UNIX timestamp in seconds, 0 if the clock is before the epoch.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}
