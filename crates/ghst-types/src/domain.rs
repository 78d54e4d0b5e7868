//! The EIP-712 domain of the GHST token on Polygon.
//!
//! The token binds signatures to its deployment through a domain made of a
//! name, a version, the proxy address and a salt carrying the chain id. The
//! contract computes its domain separator once, so the record here is a
//! constant and must never drift from it.

use alloy_primitives::{address, Address, B256};
use std::sync::LazyLock;

/// Domain name baked into the token.
pub const DOMAIN_NAME: &str = "Aavegotchi GHST Token (PoS)";
/// Domain version baked into the token.
pub const DOMAIN_VERSION: &str = "1";
/// Polygon PoS chain id, the only chain this domain is bound to.
pub const CHAIN_ID: u64 = 137;

/// GHST proxy; also the verifying contract of every signed message.
pub const PROXY_ADDRESS: Address = address!("0x385Eeac5cB85A38A9a07A70c73e0a3271CfB54A7");
/// Admin allowed to call `updateImplementation` on the proxy.
pub const PROXY_ADMIN_ADDRESS: Address = address!("0x355b8E02e7F5301E6fac9b7cAc1D6D9c86C0343f");
/// Implementation the proxy is upgraded to.
pub const NEW_IMPLEMENTATION_ADDRESS: Address =
	address!("0xAa888e7bc9e38D6a78A24D219c00F3C9f0061d51");
/// Implementation the proxy points at before the upgrade.
pub const OLD_IMPLEMENTATION_ADDRESS: Address =
	address!("0x5004bc7E5B718c245cA859DB349Dd012CFD58395");

static DOMAIN: LazyLock<DomainRecord> =
	LazyLock::new(|| DomainRecord::new(DOMAIN_NAME, DOMAIN_VERSION, PROXY_ADDRESS, CHAIN_ID));

/// EIP-712 domain: `EIP712Domain(string name,string version,address verifyingContract,bytes32 salt)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
	pub name: String,
	pub version: String,
	pub verifying_contract: Address,
	/// Chain id as a big-endian, zero-padded 32-byte word.
	pub salt: B256,
}

impl DomainRecord {
	/// Builds a domain bound to `verifying_contract` on `chain_id`.
	pub fn new(
		name: impl Into<String>,
		version: impl Into<String>,
		verifying_contract: Address,
		chain_id: u64,
	) -> Self {
		Self {
			name: name.into(),
			version: version.into(),
			verifying_contract,
			salt: chain_salt(chain_id),
		}
	}

	/// Same name, version and chain, different verifying contract.
	///
	/// Used when the token is reached through a proxy other than the
	/// production one, e.g. a freshly deployed test proxy.
	pub fn with_verifying_contract(&self, verifying_contract: Address) -> Self {
		Self {
			verifying_contract,
			..self.clone()
		}
	}
}

/// Encodes a chain id as the domain salt.
pub fn chain_salt(chain_id: u64) -> B256 {
	B256::left_padding_from(&chain_id.to_be_bytes())
}

/// Returns the domain shared by the Permit, MetaTransaction and Delegation messages.
pub fn domain() -> DomainRecord {
	DOMAIN.clone()
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::b256;

	#[test]
	fn test_salt_encodes_chain_id() {
		assert_eq!(
			domain().salt,
			b256!("0x0000000000000000000000000000000000000000000000000000000000000089")
		);
	}

	#[test]
	fn test_domain_is_bound_to_proxy() {
		let d = domain();
		assert_eq!(d.name, "Aavegotchi GHST Token (PoS)");
		assert_eq!(d.version, "1");
		assert_eq!(d.verifying_contract, PROXY_ADDRESS);
		assert_eq!(d, domain());
	}

	#[test]
	fn test_with_verifying_contract_keeps_salt() {
		let other = Address::repeat_byte(0x11);
		let d = domain().with_verifying_contract(other);
		assert_eq!(d.verifying_contract, other);
		assert_eq!(d.salt, domain().salt);
	}
}
