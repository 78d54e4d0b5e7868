//! ABI bindings for the GHST token and its upgradeable proxy.

use alloy_primitives::{b256, B256};
use alloy_sol_types::sol;

/// `keccak256("DEPOSITOR_ROLE")`, held by the Polygon child chain manager.
pub const DEPOSITOR_ROLE: B256 =
	b256!("0x8f4f2da22e8ac8f11e15f9fc141cddbb5deea8800186560abb6e68c5496619a9");

sol! {
	/// GHST child token as deployed behind the Polygon proxy, with the
	/// permit and votes extensions of the new implementation.
	#[derive(Debug, PartialEq, Eq)]
	interface IGhstToken {
		function name() external view returns (string);
		function symbol() external view returns (string);
		function decimals() external view returns (uint8);
		function balanceOf(address account) external view returns (uint256);
		function allowance(address owner, address spender) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
		function transfer(address to, uint256 amount) external returns (bool);

		function getNonce(address user) external view returns (uint256);
		function getChainId() external pure returns (uint256);
		function getDomainSeperator() external view returns (bytes32);
		function hasRole(bytes32 role, address account) external view returns (bool);
		function deposit(address user, bytes depositData) external;

		function permit(
			address owner,
			address spender,
			uint256 value,
			uint256 deadline,
			uint8 v,
			bytes32 r,
			bytes32 s
		) external;
		function executeMetaTransaction(
			uint256 nonce,
			address from,
			bytes functionSignature,
			uint8 v,
			bytes32 r,
			bytes32 s
		) external payable returns (bytes);
		function delegateBySig(
			address delegatee,
			uint256 nonce,
			uint256 expiry,
			uint8 v,
			bytes32 r,
			bytes32 s
		) external;

		function delegate(address delegatee) external;
		function delegates(address account) external view returns (address);
		function getVotes(address account) external view returns (uint256);
		function getPastVotes(address account, uint256 blockNumber) external view returns (uint256);
	}

	/// Admin surface of the GHST proxy.
	#[derive(Debug, PartialEq, Eq)]
	interface IUpgradeableProxy {
		function implementation() external view returns (address);
		function updateImplementation(address newImplementation) external;
	}
}
