//! Hex formatting in the forms the signer boundary expects.
//!
//! Integers are minimal hex (`0x0`, `0x2710`), addresses lowercase with a
//! `0x` prefix, byte strings even-length hex.

use alloy_primitives::{Address, U256};

/// Minimal hex form of an integer. Zero is `0x0`.
pub fn minimal_hex(value: U256) -> String {
	format!("{:#x}", value)
}

/// Lowercase, `0x`-prefixed address.
pub fn address_hex(address: &Address) -> String {
	format!("0x{}", hex::encode(address.as_slice()))
}

/// `0x`-prefixed even-length hex of a byte string.
pub fn bytes_hex(bytes: &[u8]) -> String {
	format!("0x{}", hex::encode(bytes))
}

/// Shortens an identifier for log lines.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Adds a `0x` prefix if missing.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	#[test]
	fn test_minimal_hex() {
		assert_eq!(minimal_hex(U256::ZERO), "0x0");
		assert_eq!(minimal_hex(U256::from(137)), "0x89");
		assert_eq!(minimal_hex(U256::from(10_000)), "0x2710");
		assert_eq!(minimal_hex(U256::from(20_469_493_830u64)), "0x4c413b046");
	}

	#[test]
	fn test_address_hex_is_lowercase() {
		let a = address!("0x385Eeac5cB85A38A9a07A70c73e0a3271CfB54A7");
		assert_eq!(address_hex(&a), "0x385eeac5cb85a38a9a07a70c73e0a3271cfb54a7");
	}

	#[test]
	fn test_bytes_hex() {
		assert_eq!(bytes_hex(&[]), "0x");
		assert_eq!(bytes_hex(&[0x01, 0xab]), "0x01ab");
	}

	#[test]
	fn test_with_0x_prefix() {
		assert_eq!(with_0x_prefix("abcd"), "0xabcd");
		assert_eq!(with_0x_prefix("0xabcd"), "0xabcd");
	}

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("0x1234"), "0x1234");
		assert_eq!(truncate_id("0x1234567890abcdef"), "0x12345678..");
	}
}
