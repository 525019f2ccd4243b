//! Forwarder behaviour tests
//!
//! Pass-through, outcome propagation, commit/rollback, target swaps, hook
//! ordering and budget exhaustion, all observed from the invoker's side.

use lib_forwarder::{
    Address, Call, CallEnv, ExecutionError, FixedTarget, FrameKind, Forwarder, Host, Outcome,
    PreForwardHook, StorageSlotResolver, TargetResolver,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Helper to derive a test address
fn addr(label: &str) -> Address {
    Address::from_label(label)
}

fn alice() -> Address {
    addr("alice")
}

fn proxy() -> Address {
    addr("proxy")
}

fn echo(env: &mut CallEnv<'_>) -> Result<Vec<u8>, ExecutionError> {
    Ok(env.input().to_vec())
}

/// Host with `logic` deployed behind a storage-slot forwarder at `proxy()`
fn host_with_proxy(logic: Arc<dyn lib_forwarder::ContractCode>) -> Host {
    let mut host = Host::in_memory();
    host.deploy(addr("logic"), logic).unwrap();
    host.deploy(proxy(), Arc::new(Forwarder::new(StorageSlotResolver))).unwrap();
    StorageSlotResolver::install(&mut host, proxy(), addr("logic")).unwrap();
    host
}

/// Writes `counter`, bumps it, then succeeds or reverts depending on input[0]
fn counter_logic(env: &mut CallEnv<'_>) -> Result<Vec<u8>, ExecutionError> {
    let current = env
        .storage_read(b"counter")?
        .map(|raw| raw[0])
        .unwrap_or(0);
    env.storage_write(b"counter", &[current + 1])?;
    let caller = env.caller();
    env.storage_write(b"last_caller", caller.as_bytes())?;

    match env.input().first() {
        Some(1) => Err(env.revert(b"counter: rejected".to_vec())),
        _ => Ok(vec![current + 1]),
    }
}

// =============================================================================
// Pass-through properties
// =============================================================================

proptest! {
    #[test]
    fn prop_echo_target_returns_payload_verbatim(payload in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let mut host = host_with_proxy(Arc::new(echo));
        let receipt = host.invoke(Call::new(alice(), proxy(), payload.clone())).unwrap();
        prop_assert_eq!(receipt.outcome, Outcome::Success(payload));
    }

    #[test]
    fn prop_failure_payload_independent_of_input_length(len in 0usize..4096) {
        let error = b"fixed-length error payload".to_vec();
        let expected = error.clone();
        let fail = move |_env: &mut CallEnv<'_>| -> Result<Vec<u8>, ExecutionError> {
            Err(ExecutionError::Revert(error.clone()))
        };
        let mut host = host_with_proxy(Arc::new(fail));

        let receipt = host.invoke(Call::new(alice(), proxy(), vec![0xAB; len])).unwrap();
        prop_assert_eq!(receipt.outcome, Outcome::Failure(expected));
    }
}

#[test]
fn test_empty_payload_is_forwarded() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let logic = move |env: &mut CallEnv<'_>| -> Result<Vec<u8>, ExecutionError> {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(vec![env.input().len() as u8])
    };
    let mut host = host_with_proxy(Arc::new(logic));

    let receipt = host.invoke(Call::new(alice(), proxy(), vec![])).unwrap();
    assert_eq!(receipt.outcome, Outcome::Success(vec![0]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_large_result_is_relayed_in_full() {
    let logic = |_env: &mut CallEnv<'_>| -> Result<Vec<u8>, ExecutionError> {
        Ok((0..100_000u32).map(|i| (i % 251) as u8).collect())
    };
    let mut host = host_with_proxy(Arc::new(logic));

    let receipt = host.invoke(Call::new(alice(), proxy(), vec![1])).unwrap();
    let payload = receipt.outcome.into_result().unwrap();
    assert_eq!(payload.len(), 100_000);
    assert_eq!(payload[250], 250);
    assert_eq!(payload[251], 0);
}

#[test]
fn test_target_sees_invoker_and_value() {
    let logic = |env: &mut CallEnv<'_>| -> Result<Vec<u8>, ExecutionError> {
        let mut out = env.caller().as_bytes().to_vec();
        out.extend_from_slice(&env.value().to_le_bytes());
        out.extend_from_slice(env.address().as_bytes());
        Ok(out)
    };
    let mut host = host_with_proxy(Arc::new(logic));
    host.fund(alice(), 1_000).unwrap();

    let receipt = host
        .invoke(Call::new(alice(), proxy(), vec![]).with_value(250))
        .unwrap();
    let out = receipt.outcome.into_result().unwrap();

    assert_eq!(&out[..32], alice().as_bytes());
    assert_eq!(u128::from_le_bytes(out[32..48].try_into().unwrap()), 250);
    assert_eq!(&out[48..], proxy().as_bytes());

    // Value lands in the forwarder, never in the target
    assert_eq!(host.balance_of(&proxy()).unwrap(), 250);
    assert_eq!(host.balance_of(&addr("logic")).unwrap(), 0);
    assert_eq!(host.balance_of(&alice()).unwrap(), 750);
}

// =============================================================================
// Commit / rollback
// =============================================================================

#[test]
fn test_successful_target_writes_land_in_forwarder_scope() {
    let mut host = host_with_proxy(Arc::new(counter_logic));

    let receipt = host.invoke(Call::new(alice(), proxy(), vec![0])).unwrap();
    assert_eq!(receipt.outcome, Outcome::Success(vec![1]));

    assert_eq!(host.storage_at(&proxy(), b"counter").unwrap(), Some(vec![1]));
    assert_eq!(
        host.storage_at(&proxy(), b"last_caller").unwrap(),
        Some(alice().as_bytes().to_vec())
    );
    // The target's own scope is untouched
    assert!(host.storage_at(&addr("logic"), b"counter").unwrap().is_none());
}

#[test]
fn test_failing_target_leaves_state_unchanged() {
    let mut host = host_with_proxy(Arc::new(counter_logic));
    host.invoke(Call::new(alice(), proxy(), vec![0])).unwrap();

    let before = host.state_root(&proxy()).unwrap();
    let receipt = host.invoke(Call::new(addr("bob"), proxy(), vec![1])).unwrap();
    let after = host.state_root(&proxy()).unwrap();

    assert_eq!(receipt.outcome, Outcome::Failure(b"counter: rejected".to_vec()));
    assert_eq!(before, after);
    assert_eq!(host.storage_at(&proxy(), b"counter").unwrap(), Some(vec![1]));
}

#[test]
fn test_failing_target_refunds_value() {
    let mut host = host_with_proxy(Arc::new(counter_logic));
    host.fund(alice(), 100).unwrap();

    let receipt = host
        .invoke(Call::new(alice(), proxy(), vec![1]).with_value(60))
        .unwrap();
    assert!(!receipt.is_success());
    assert_eq!(host.balance_of(&alice()).unwrap(), 100);
    assert_eq!(host.balance_of(&proxy()).unwrap(), 0);
}

// =============================================================================
// Target swap
// =============================================================================

#[test]
fn test_swapping_target_changes_only_the_code_that_runs() {
    let mut host = Host::in_memory();
    let v1 = |env: &mut CallEnv<'_>| -> Result<Vec<u8>, ExecutionError> {
        env.storage_write(b"version", b"v1")?;
        let mut out = b"v1:".to_vec();
        out.extend_from_slice(env.input());
        Ok(out)
    };
    let v2 = |env: &mut CallEnv<'_>| -> Result<Vec<u8>, ExecutionError> {
        env.storage_write(b"version", b"v2")?;
        let mut out = env.input().to_vec();
        out.reverse();
        Err(ExecutionError::Revert(out))
    };
    host.deploy(addr("v1"), Arc::new(v1)).unwrap();
    host.deploy(addr("v2"), Arc::new(v2)).unwrap();
    host.deploy(proxy(), Arc::new(Forwarder::new(StorageSlotResolver))).unwrap();
    let payload = vec![1, 2, 3];

    StorageSlotResolver::install(&mut host, proxy(), addr("v1")).unwrap();
    let first = host.invoke(Call::new(alice(), proxy(), payload.clone())).unwrap();
    assert_eq!(first.outcome, Outcome::Success(vec![b'v', b'1', b':', 1, 2, 3]));
    assert_eq!(host.storage_at(&proxy(), b"version").unwrap(), Some(b"v1".to_vec()));

    StorageSlotResolver::install(&mut host, proxy(), addr("v2")).unwrap();
    let second = host.invoke(Call::new(alice(), proxy(), payload.clone())).unwrap();
    assert_eq!(second.outcome, Outcome::Failure(vec![3, 2, 1]));
    // v2 reverted, so v1's committed write is still the visible one
    assert_eq!(host.storage_at(&proxy(), b"version").unwrap(), Some(b"v1".to_vec()));

    // Both delegated frames received the identical captured payload
    let hash_of = |receipt: &lib_forwarder::Receipt| {
        receipt
            .frames_of(FrameKind::DelegateCall)
            .map(|f| (f.input_hash, f.input_len))
            .next()
            .unwrap()
    };
    assert_eq!(hash_of(&first), hash_of(&second));
}

// =============================================================================
// Hook ordering
// =============================================================================

struct FailingHook;

impl PreForwardHook for FailingHook {
    fn on_before_forward(&self, env: &mut CallEnv<'_>) -> Result<(), ExecutionError> {
        env.storage_write(b"hook_ran", b"yes")?;
        Err(ExecutionError::Revert(b"hook refused".to_vec()))
    }
}

struct RecordingResolver {
    target: Address,
    calls: Arc<AtomicUsize>,
}

impl TargetResolver for RecordingResolver {
    fn resolve_target(&self, _env: &mut CallEnv<'_>) -> Result<Address, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.target)
    }
}

#[test]
fn test_failing_hook_prevents_resolution_and_delegation() {
    let resolver_calls = Arc::new(AtomicUsize::new(0));
    let target_calls = Arc::new(AtomicUsize::new(0));
    let seen = target_calls.clone();
    let logic = move |_env: &mut CallEnv<'_>| -> Result<Vec<u8>, ExecutionError> {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(vec![])
    };

    let mut host = Host::in_memory();
    host.deploy(addr("logic"), Arc::new(logic)).unwrap();
    let resolver = RecordingResolver {
        target: addr("logic"),
        calls: resolver_calls.clone(),
    };
    host.deploy(proxy(), Arc::new(Forwarder::with_hook(resolver, FailingHook)))
        .unwrap();

    let receipt = host.invoke(Call::new(alice(), proxy(), vec![5])).unwrap();

    assert_eq!(receipt.outcome, Outcome::Failure(b"hook refused".to_vec()));
    assert_eq!(resolver_calls.load(Ordering::SeqCst), 0);
    assert_eq!(target_calls.load(Ordering::SeqCst), 0);
    assert_eq!(receipt.frames_of(FrameKind::DelegateCall).count(), 0);
    assert!(host.storage_at(&proxy(), b"hook_ran").unwrap().is_none());
}

#[test]
fn test_resolver_runs_once_per_invocation() {
    let resolver_calls = Arc::new(AtomicUsize::new(0));
    let mut host = Host::in_memory();
    host.deploy(addr("logic"), Arc::new(echo)).unwrap();
    let resolver = RecordingResolver {
        target: addr("logic"),
        calls: resolver_calls.clone(),
    };
    host.deploy(proxy(), Arc::new(Forwarder::new(resolver))).unwrap();

    for _ in 0..3 {
        host.invoke(Call::new(alice(), proxy(), vec![1])).unwrap();
    }
    assert_eq!(resolver_calls.load(Ordering::SeqCst), 3);
}

// =============================================================================
// Budget exhaustion
// =============================================================================

#[test]
fn test_budget_exhaustion_looks_like_ordinary_failure() {
    let burner = |env: &mut CallEnv<'_>| -> Result<Vec<u8>, ExecutionError> {
        let mut i: u64 = 0;
        loop {
            env.storage_write(&i.to_le_bytes(), b"x")?;
            i += 1;
        }
    };
    let quitter = |env: &mut CallEnv<'_>| -> Result<Vec<u8>, ExecutionError> {
        env.storage_write(b"k", b"x")?;
        Err(ExecutionError::Revert(Vec::new()))
    };

    let mut exhausted = host_with_proxy(Arc::new(burner));
    let mut reverted = host_with_proxy(Arc::new(quitter));
    exhausted.fund(alice(), 10).unwrap();
    reverted.fund(alice(), 10).unwrap();

    let before = exhausted.state_root(&proxy()).unwrap();
    let call = Call::new(alice(), proxy(), vec![9]).with_value(10).with_gas_limit(200_000);
    let exhausted_receipt = exhausted.invoke(call.clone()).unwrap();
    let reverted_receipt = reverted.invoke(call).unwrap();

    assert_eq!(exhausted_receipt.outcome, reverted_receipt.outcome);
    assert_eq!(exhausted_receipt.outcome, Outcome::Failure(vec![]));
    assert_eq!(exhausted.state_root(&proxy()).unwrap(), before);
    assert_eq!(exhausted.balance_of(&alice()).unwrap(), 10);
    assert_eq!(reverted.balance_of(&alice()).unwrap(), 10);
}

#[test]
fn test_missing_target_is_ordinary_failure() {
    let mut host = Host::in_memory();
    host.deploy(
        proxy(),
        Arc::new(Forwarder::new(FixedTarget::new(addr("never-deployed")))),
    )
    .unwrap();

    let receipt = host.invoke(Call::new(alice(), proxy(), vec![1, 2])).unwrap();
    assert_eq!(receipt.outcome, Outcome::Failure(vec![]));
}
