//! Token state captured around an implementation swap.
//!
//! An upgrade must leave everything the old implementation stored exactly
//! where it was. A snapshot reads that state through the public getters for
//! a fixed set of probe accounts; two snapshots taken on either side of the
//! swap must agree on everything except the implementation address.

use ghst_delivery::contracts::DEPOSITOR_ROLE;
use ghst_delivery::{DeliveryError, ProxyInterface, TokenInterface};
use ghst_types::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
	pub account: Address,
	pub balance: U256,
	pub nonce: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceState {
	pub owner: Address,
	pub spender: Address,
	pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleState {
	pub role: B256,
	pub account: Address,
	pub granted: bool,
}

/// Observable token state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
	pub block_number: u64,
	pub implementation: Address,
	pub name: String,
	pub symbol: String,
	pub decimals: u8,
	pub chain_id: U256,
	pub domain_separator: B256,
	pub accounts: Vec<AccountState>,
	/// Every ordered pair of probe accounts.
	pub allowances: Vec<AllowanceState>,
	pub roles: Vec<RoleState>,
}

/// One field that differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDiff {
	pub field: String,
	pub before: String,
	pub after: String,
}

impl fmt::Display for StateDiff {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {} -> {}", self.field, self.before, self.after)
	}
}

impl StateSnapshot {
	/// Reads the state of `probes`, and `DEPOSITOR_ROLE` membership of
	/// `role_holders`.
	pub async fn capture(
		token: &dyn TokenInterface,
		proxy: &dyn ProxyInterface,
		probes: &[Address],
		role_holders: &[Address],
	) -> Result<Self, DeliveryError> {
		let mut accounts = Vec::with_capacity(probes.len());
		for &account in probes {
			accounts.push(AccountState {
				account,
				balance: token.balance_of(account).await?,
				nonce: token.get_nonce(account).await?,
			});
		}

		let mut allowances = Vec::new();
		for &owner in probes {
			for &spender in probes {
				if owner == spender {
					continue;
				}
				allowances.push(AllowanceState {
					owner,
					spender,
					amount: token.allowance(owner, spender).await?,
				});
			}
		}

		let mut roles = Vec::with_capacity(role_holders.len());
		for &account in role_holders {
			roles.push(RoleState {
				role: DEPOSITOR_ROLE,
				account,
				granted: token.has_role(DEPOSITOR_ROLE, account).await?,
			});
		}

		let snapshot = Self {
			block_number: proxy.block_number().await?,
			implementation: proxy.implementation().await?,
			name: token.name().await?,
			symbol: token.symbol().await?,
			decimals: token.decimals().await?,
			chain_id: token.chain_id().await?,
			domain_separator: token.domain_separator().await?,
			accounts,
			allowances,
			roles,
		};
		tracing::debug!(
			block = snapshot.block_number,
			implementation = %snapshot.implementation,
			accounts = snapshot.accounts.len(),
			"Captured state snapshot"
		);
		Ok(snapshot)
	}

	/// Fields that differ from `other`. The implementation address and the
	/// block number are expected to move and are not compared.
	pub fn diff(&self, other: &StateSnapshot) -> Vec<StateDiff> {
		let mut diffs = Vec::new();
		let mut compare = |field: String, before: String, after: String| {
			if before != after {
				diffs.push(StateDiff {
					field,
					before,
					after,
				});
			}
		};

		compare("name".into(), self.name.clone(), other.name.clone());
		compare("symbol".into(), self.symbol.clone(), other.symbol.clone());
		compare(
			"decimals".into(),
			self.decimals.to_string(),
			other.decimals.to_string(),
		);
		compare(
			"chainId".into(),
			self.chain_id.to_string(),
			other.chain_id.to_string(),
		);
		compare(
			"domainSeparator".into(),
			self.domain_separator.to_string(),
			other.domain_separator.to_string(),
		);

		for (key, (before, after)) in paired(
			self.accounts.iter().map(|a| (a.account, (a.balance, a.nonce))),
			other.accounts.iter().map(|a| (a.account, (a.balance, a.nonce))),
		) {
			let (before_balance, before_nonce) = split(before);
			let (after_balance, after_nonce) = split(after);
			compare(format!("balanceOf({})", key), before_balance, after_balance);
			compare(format!("getNonce({})", key), before_nonce, after_nonce);
		}

		for ((owner, spender), (before, after)) in paired(
			self.allowances.iter().map(|a| ((a.owner, a.spender), a.amount)),
			other.allowances.iter().map(|a| ((a.owner, a.spender), a.amount)),
		) {
			compare(
				format!("allowance({}, {})", owner, spender),
				describe(before),
				describe(after),
			);
		}

		for ((role, account), (before, after)) in paired(
			self.roles.iter().map(|r| ((r.role, r.account), r.granted)),
			other.roles.iter().map(|r| ((r.role, r.account), r.granted)),
		) {
			compare(
				format!("hasRole({}, {})", role, account),
				describe(before),
				describe(after),
			);
		}

		diffs
	}
}

type Pair<V> = (Option<V>, Option<V>);

/// Joins two keyed sequences; a key missing on one side pairs with `None`.
fn paired<K: Ord, V>(
	before: impl Iterator<Item = (K, V)>,
	after: impl Iterator<Item = (K, V)>,
) -> BTreeMap<K, Pair<V>> {
	let mut joined: BTreeMap<K, Pair<V>> = BTreeMap::new();
	for (key, value) in before {
		joined.entry(key).or_insert((None, None)).0 = Some(value);
	}
	for (key, value) in after {
		joined.entry(key).or_insert((None, None)).1 = Some(value);
	}
	joined
}

fn split(state: Option<(U256, U256)>) -> (String, String) {
	match state {
		Some((balance, nonce)) => (balance.to_string(), nonce.to_string()),
		None => (describe::<U256>(None), describe::<U256>(None)),
	}
}

fn describe<V: ToString>(value: Option<V>) -> String {
	value.map_or_else(|| "<not captured>".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use ghst_delivery::implementations::mock::MockToken;
	use ghst_types::{domain, NEW_IMPLEMENTATION_ADDRESS, PROXY_ADMIN_ADDRESS};

	fn probes() -> Vec<Address> {
		vec![Address::repeat_byte(1), Address::repeat_byte(2)]
	}

	#[tokio::test]
	async fn test_capture_reads_probes() {
		let token = MockToken::new(domain())
			.with_balance(Address::repeat_byte(1), U256::from(50))
			.with_allowance(Address::repeat_byte(1), Address::repeat_byte(2), U256::from(7))
			.with_role(DEPOSITOR_ROLE, PROXY_ADMIN_ADDRESS);

		let snapshot = StateSnapshot::capture(&token, &token, &probes(), &[PROXY_ADMIN_ADDRESS])
			.await
			.unwrap();

		assert_eq!(snapshot.accounts.len(), 2);
		assert_eq!(snapshot.accounts[0].balance, U256::from(50));
		assert_eq!(snapshot.allowances.len(), 2);
		assert_eq!(snapshot.allowances[0].amount, U256::from(7));
		assert!(snapshot.roles[0].granted);
		assert_eq!(snapshot.chain_id, U256::from(137));
	}

	#[tokio::test]
	async fn test_swap_alone_is_not_a_difference() {
		let token = MockToken::new(domain()).with_balance(Address::repeat_byte(1), U256::from(50));
		let before = StateSnapshot::capture(&token, &token, &probes(), &[]).await.unwrap();

		token.impersonate(PROXY_ADMIN_ADDRESS).await.unwrap();
		token
			.update_implementation(PROXY_ADMIN_ADDRESS, NEW_IMPLEMENTATION_ADDRESS)
			.await
			.unwrap();
		let after = StateSnapshot::capture(&token, &token, &probes(), &[]).await.unwrap();

		assert_ne!(before.implementation, after.implementation);
		assert!(before.diff(&after).is_empty());
	}

	#[test]
	fn test_diff_lists_changed_fields() {
		let before = StateSnapshot {
			block_number: 1,
			implementation: Address::ZERO,
			name: "GHST".into(),
			symbol: "GHST".into(),
			decimals: 18,
			chain_id: U256::from(137),
			domain_separator: B256::ZERO,
			accounts: vec![AccountState {
				account: Address::repeat_byte(1),
				balance: U256::from(10),
				nonce: U256::ZERO,
			}],
			allowances: vec![],
			roles: vec![],
		};
		let mut after = before.clone();
		after.block_number = 9;
		after.symbol = "gGHST".into();
		after.accounts[0].nonce = U256::from(1);
		after.accounts.push(AccountState {
			account: Address::repeat_byte(2),
			balance: U256::ZERO,
			nonce: U256::ZERO,
		});

		let fields: Vec<String> = before.diff(&after).into_iter().map(|d| d.field).collect();
		assert_eq!(
			fields,
			vec![
				"symbol".to_string(),
				format!("getNonce({})", Address::repeat_byte(1)),
				format!("balanceOf({})", Address::repeat_byte(2)),
				format!("getNonce({})", Address::repeat_byte(2)),
			]
		);
	}
}
