//! Signed-authorization scenarios against the in-memory token.

use alloy_sol_types::SolCall;
use ghst_account::implementations::local::LocalWallet;
use ghst_core::{AuthorizationFlow, HarnessError};
use ghst_delivery::contracts::IGhstToken;
use ghst_delivery::implementations::mock::MockToken;
use ghst_delivery::{AuthorizationSubmitter, DeliveryError, TokenInterface};
use ghst_signing::SignatureService;
use ghst_types::{domain, Address, AuthorizationRequest, RevertClass, U256};
use std::sync::Arc;

const OWNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const OTHER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
const DEADLINE: u64 = 20_469_493_830;

fn spender() -> Address {
	"0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap()
}

fn delegatee() -> Address {
	"0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC".parse().unwrap()
}

struct Setup {
	token: Arc<MockToken>,
	owner: LocalWallet,
	flow: AuthorizationFlow,
}

fn setup() -> Setup {
	let token = Arc::new(MockToken::new(domain()).upgraded());
	let flow = AuthorizationFlow::new(
		SignatureService::new(domain()),
		AuthorizationSubmitter::new(token.clone()),
	);
	Setup {
		token,
		owner: LocalWallet::new(OWNER_KEY).unwrap(),
		flow,
	}
}

fn revert_class(err: &HarnessError) -> Option<RevertClass> {
	match err {
		HarnessError::Delivery(DeliveryError::Reverted { reason }) => Some(reason.class()),
		_ => None,
	}
}

fn revert_reason(err: &HarnessError) -> Option<String> {
	match err {
		HarnessError::Delivery(DeliveryError::Reverted { reason }) => {
			Some(reason.as_str().to_string())
		},
		_ => None,
	}
}

#[tokio::test]
async fn test_valid_permit_sets_allowance_and_nonce() {
	let s = setup();
	let owner = s.owner.address();
	assert_eq!(s.token.get_nonce(owner).await.unwrap(), U256::ZERO);

	s.flow
		.permit(&s.owner, spender(), U256::from(10_000), U256::from(DEADLINE))
		.await
		.unwrap();

	assert_eq!(s.token.get_nonce(owner).await.unwrap(), U256::from(1));
	assert_eq!(
		s.token.allowance(owner, spender()).await.unwrap(),
		U256::from(10_000)
	);
}

#[tokio::test]
async fn test_value_altered_after_signing_is_rejected() {
	let s = setup();
	let owner = s.owner.address();
	let signed = s
		.flow
		.signatures()
		.sign_permit(
			&s.owner,
			spender(),
			U256::from(10_000),
			U256::ZERO,
			U256::from(DEADLINE),
		)
		.await
		.unwrap();
	let AuthorizationRequest::Permit(mut request) = signed.request else {
		panic!("expected a permit");
	};
	request.value = U256::from(9_999);

	let err = s
		.flow
		.submitter()
		.submit_permit(&request, &signed.signature)
		.await
		.unwrap_err();
	assert_eq!(
		err.revert_reason().map(|r| r.as_str()),
		Some("ERC20Permit: invalid signature")
	);
	assert_eq!(s.token.get_nonce(owner).await.unwrap(), U256::ZERO);
	assert_eq!(s.token.allowance(owner, spender()).await.unwrap(), U256::ZERO);
}

#[tokio::test]
async fn test_past_deadline_is_rejected() {
	let s = setup();
	let err = s
		.flow
		.permit(&s.owner, spender(), U256::from(10_000), U256::ZERO)
		.await
		.unwrap_err();
	assert_eq!(
		revert_reason(&err).as_deref(),
		Some("ERC20Permit: expired deadline")
	);
	assert_eq!(revert_class(&err), Some(RevertClass::Expired));
}

#[tokio::test]
async fn test_delegation_by_signature() {
	let s = setup();
	let owner = s.owner.address();

	s.flow
		.delegation(&s.owner, delegatee(), U256::from(DEADLINE))
		.await
		.unwrap();

	assert_eq!(s.token.delegates(owner).await.unwrap(), delegatee());
	assert_eq!(s.token.get_nonce(owner).await.unwrap(), U256::from(1));
}

#[tokio::test]
async fn test_reused_nonce_is_rejected() {
	let s = setup();
	let call = IGhstToken::approveCall {
		spender: spender(),
		amount: U256::from(1),
	};
	let outcome = s
		.flow
		.meta_transaction(&s.owner, call.abi_encode().into())
		.await
		.unwrap();

	let err = s
		.flow
		.submitter()
		.submit(&outcome.signed)
		.await
		.unwrap_err();
	assert_eq!(
		err.revert_reason().map(|r| r.class()),
		Some(RevertClass::NonceMismatch)
	);
}

#[tokio::test]
async fn test_concurrent_submissions_with_one_nonce() {
	let s = setup();
	let owner = s.owner.address();
	let nonce = s.token.get_nonce(owner).await.unwrap();
	let service = s.flow.signatures();

	let first = service
		.sign_delegation(&s.owner, delegatee(), nonce, U256::from(DEADLINE))
		.await
		.unwrap();
	let second = service
		.sign_delegation(&s.owner, spender(), nonce, U256::from(DEADLINE))
		.await
		.unwrap();

	let submitter = s.flow.submitter();
	let (a, b) = tokio::join!(submitter.submit(&first), submitter.submit(&second));

	let (accepted, rejected): (Vec<_>, Vec<_>) = [a, b].into_iter().partition(|r| r.is_ok());
	assert_eq!(accepted.len(), 1);
	assert_eq!(rejected.len(), 1);
	let err = rejected.into_iter().next().unwrap().unwrap_err();
	assert_eq!(
		err.revert_reason().map(|r| r.class()),
		Some(RevertClass::NonceMismatch)
	);
	assert_eq!(s.token.get_nonce(owner).await.unwrap(), U256::from(1));
}

#[tokio::test]
async fn test_permit_signed_for_another_token_is_rejected() {
	let s = setup();
	let other = SignatureService::new(domain().with_verifying_contract(Address::repeat_byte(0xee)));
	let nonce = s.token.get_nonce(s.owner.address()).await.unwrap();
	let signed = other
		.sign_permit(
			&s.owner,
			spender(),
			U256::from(10_000),
			nonce,
			U256::from(DEADLINE),
		)
		.await
		.unwrap();

	let err = s.flow.submitter().submit(&signed).await.unwrap_err();
	assert_eq!(
		err.revert_reason().map(|r| r.class()),
		Some(RevertClass::InvalidSignature)
	);
}

#[tokio::test]
async fn test_nonce_is_shared_across_kinds() {
	let s = setup();
	let owner = s.owner.address();

	s.flow
		.delegation(&s.owner, delegatee(), U256::from(DEADLINE))
		.await
		.unwrap();
	let permit = s
		.flow
		.permit(&s.owner, spender(), U256::from(1), U256::from(DEADLINE))
		.await
		.unwrap();
	let call = IGhstToken::approveCall {
		spender: spender(),
		amount: U256::from(2),
	};
	let meta = s
		.flow
		.meta_transaction(&s.owner, call.abi_encode().into())
		.await
		.unwrap();

	assert_eq!(permit.signed.request.nonce(), U256::from(1));
	assert_eq!(meta.signed.request.nonce(), U256::from(2));
	assert_eq!(s.token.get_nonce(owner).await.unwrap(), U256::from(3));
	assert_eq!(s.token.allowance(owner, spender()).await.unwrap(), U256::from(2));
}

#[tokio::test]
async fn test_elapsed_delegation_expiry_is_rejected() {
	let s = setup();
	let owner = s.owner.address();

	let err = s
		.flow
		.delegation(&s.owner, delegatee(), U256::ZERO)
		.await
		.unwrap_err();
	assert_eq!(
		revert_reason(&err).as_deref(),
		Some("ERC20Votes: signature expired")
	);
	assert_eq!(revert_class(&err), Some(RevertClass::Expired));
	assert_eq!(s.token.delegates(owner).await.unwrap(), Address::ZERO);
	assert_eq!(s.token.get_nonce(owner).await.unwrap(), U256::ZERO);
}

#[tokio::test]
async fn test_meta_transaction_signed_by_another_key_is_rejected() {
	let s = setup();
	let owner = s.owner.address();
	let other = LocalWallet::new(OTHER_KEY).unwrap();
	let call = IGhstToken::approveCall {
		spender: spender(),
		amount: U256::from(1),
	};
	let signed = s
		.flow
		.signatures()
		.sign_meta_transaction(&other, U256::ZERO, call.abi_encode().into())
		.await
		.unwrap();
	let AuthorizationRequest::MetaTransaction(mut request) = signed.request else {
		panic!("expected a meta-transaction");
	};
	request.from = owner;

	let err = s
		.flow
		.submitter()
		.submit_meta_transaction(&request, &signed.signature)
		.await
		.unwrap_err();
	assert_eq!(
		err.revert_reason().map(|r| r.class()),
		Some(RevertClass::InvalidSignature)
	);
	assert_eq!(s.token.get_nonce(owner).await.unwrap(), U256::ZERO);
	assert_eq!(s.token.allowance(owner, spender()).await.unwrap(), U256::ZERO);
}

#[tokio::test]
async fn test_meta_transaction_from_zero_address_is_rejected() {
	let s = setup();
	let call = IGhstToken::approveCall {
		spender: spender(),
		amount: U256::from(1),
	};
	let signed = s
		.flow
		.signatures()
		.sign_meta_transaction(&s.owner, U256::ZERO, call.abi_encode().into())
		.await
		.unwrap();
	let AuthorizationRequest::MetaTransaction(mut request) = signed.request else {
		panic!("expected a meta-transaction");
	};
	request.from = Address::ZERO;

	let err = s
		.flow
		.submitter()
		.submit_meta_transaction(&request, &signed.signature)
		.await
		.unwrap_err();
	let reason = err.revert_reason().unwrap();
	assert_eq!(reason.as_str(), "NativeMetaTransaction: INVALID_SIGNER");
	assert_eq!(reason.class(), RevertClass::InvalidSignature);
}
