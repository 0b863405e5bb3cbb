//! Period engine behaviour: submission, quorum, publication, rollover

use std::sync::Arc;

use pretty_assertions::assert_eq;
use zkattest_core::{
    Address, EngineError, FixedClock, LedgerEvent, MemoryLedger, PeriodEngine, PeriodStatus,
};

/// Helper: engine with admin, exchange (A) and regulator (B) registered
fn setup(required: usize) -> (PeriodEngine<MemoryLedger>, Address, Address, Address) {
    let admin = Address::new("admin");
    let a = Address::new("0xexchange");
    let b = Address::new("0xregulator");

    let mut engine = PeriodEngine::genesis_with_clock(
        admin.clone(),
        required,
        Arc::new(FixedClock::new(1704067200000)),
    )
    .unwrap();
    engine.register_attestor(&admin, a.clone(), "exchange").unwrap();
    engine.register_attestor(&admin, b.clone(), "regulator").unwrap();
    engine.take_events();

    (engine, admin, a, b)
}

fn quorum_events(events: &[LedgerEvent]) -> Vec<LedgerEvent> {
    events
        .iter()
        .filter(|e| matches!(e, LedgerEvent::PeriodQuorumReached { .. }))
        .cloned()
        .collect()
}

#[test]
fn test_quorum_scenario() {
    let (mut engine, admin, a, b) = setup(2);

    engine.submit_attestation(&a, vec![0xaa]).unwrap();
    assert_eq!(engine.period_attestor_count(0).unwrap(), 1);
    assert!(quorum_events(&engine.take_events()).is_empty());

    engine.submit_attestation(&b, vec![0xbb]).unwrap();
    assert_eq!(engine.period_attestor_count(0).unwrap(), 2);
    assert_eq!(
        quorum_events(&engine.take_events()),
        vec![LedgerEvent::PeriodQuorumReached { period: 0, count: 2 }]
    );
    assert_eq!(engine.period_status(0).unwrap(), PeriodStatus::QuorumReached);

    engine
        .publish_verification_result(&admin, 0, true, b"proof".to_vec())
        .unwrap();
    assert_eq!(engine.current_period().unwrap(), 1);
    assert_eq!(engine.period_status(0).unwrap(), PeriodStatus::Verified);

    let events = engine.take_events();
    assert!(matches!(
        events[0],
        LedgerEvent::VerificationPublished {
            period: 0,
            passed: true,
            ..
        }
    ));
    assert_eq!(
        events[1],
        LedgerEvent::PeriodAdvanced {
            from: 0,
            to: 1,
            forced: false
        }
    );
}

#[test]
fn test_duplicate_submission_rejected() {
    let (mut engine, _admin, a, _b) = setup(2);

    engine.submit_attestation(&a, vec![1]).unwrap();
    let result = engine.submit_attestation(&a, vec![2]);

    assert!(matches!(
        result,
        Err(EngineError::DuplicateSubmission { period: 0, .. })
    ));
    assert_eq!(engine.period_attestor_count(0).unwrap(), 1);
    assert_eq!(engine.attestation(0, &a).unwrap().unwrap().payload, vec![1]);
}

#[test]
fn test_on_behalf_submission_shares_duplicate_rule() {
    let (mut engine, admin, a, _b) = setup(2);

    engine.submit_attestation(&a, vec![1]).unwrap();
    let result = engine.submit_attestation_on_behalf(&admin, &a, vec![2]);
    assert!(matches!(result, Err(EngineError::DuplicateSubmission { .. })));
}

#[test]
fn test_on_behalf_requires_admin_and_registered_attestor() {
    let (mut engine, admin, a, b) = setup(2);

    let not_admin = engine.submit_attestation_on_behalf(&a, &b, vec![1]);
    assert!(matches!(not_admin, Err(EngineError::Unauthorized { .. })));

    let unknown = engine.submit_attestation_on_behalf(&admin, &Address::new("0xghost"), vec![1]);
    assert!(matches!(unknown, Err(EngineError::Unauthorized { .. })));

    assert_eq!(engine.period_attestor_count(0).unwrap(), 0);
}

#[test]
fn test_quorum_fires_once_with_mixed_submission_paths() {
    let (mut engine, admin, a, b) = setup(2);
    let c = Address::new("0xauditor");
    engine.register_attestor(&admin, c.clone(), "auditor").unwrap();

    engine.submit_attestation(&a, vec![1]).unwrap();
    let receipt = engine
        .submit_attestation_on_behalf(&admin, &b, vec![2])
        .unwrap();
    assert!(receipt.quorum_reached);

    // Past quorum submissions are still accepted but never re-fire.
    let late = engine.submit_attestation(&c, vec![3]).unwrap();
    assert!(!late.quorum_reached);
    assert_eq!(late.attestor_count, 3);

    assert_eq!(
        quorum_events(&engine.take_events()),
        vec![LedgerEvent::PeriodQuorumReached { period: 0, count: 2 }]
    );
}

#[test]
fn test_unauthorized_submission_leaves_state_unchanged() {
    let (mut engine, _admin, _a, _b) = setup(2);
    let c = Address::new("0xstranger");

    let result = engine.submit_attestation(&c, vec![1]);

    assert!(matches!(result, Err(EngineError::Unauthorized { .. })));
    assert_eq!(engine.period_attestor_count(0).unwrap(), 0);
    assert!(engine.attestation(0, &c).unwrap().is_none());
    assert!(engine.take_events().is_empty());
}

#[test]
fn test_already_registered() {
    let (mut engine, admin, a, _b) = setup(2);
    let result = engine.register_attestor(&admin, a.clone(), "again");
    assert!(matches!(result, Err(EngineError::AlreadyRegistered(addr)) if addr == a));
    assert_eq!(engine.attestor_count().unwrap(), 2);
}

#[test]
fn test_registry_enumeration_order() {
    let (engine, _admin, a, b) = setup(2);
    let addresses: Vec<Address> = engine
        .attestors()
        .unwrap()
        .into_iter()
        .map(|attestor| attestor.address)
        .collect();
    assert_eq!(addresses, vec![a, b]);
}

#[test]
fn test_publish_requires_quorum() {
    let (mut engine, admin, a, _b) = setup(2);

    let empty = engine.publish_verification_result(&admin, 0, true, vec![1]);
    assert!(matches!(
        empty,
        Err(EngineError::PeriodNotComplete {
            period: 0,
            count: 0,
            required: 2
        })
    ));

    engine.submit_attestation(&a, vec![1]).unwrap();
    let partial = engine.publish_verification_result(&admin, 0, true, vec![1]);
    assert!(matches!(
        partial,
        Err(EngineError::PeriodNotComplete { count: 1, .. })
    ));

    assert!(engine.verification_result(0).unwrap().is_none());
    assert_eq!(engine.current_period().unwrap(), 0);
}

#[test]
fn test_publish_is_exactly_once() {
    let (mut engine, admin, a, b) = setup(2);
    engine.submit_attestation(&a, vec![1]).unwrap();
    engine.submit_attestation(&b, vec![2]).unwrap();

    engine
        .publish_verification_result(&admin, 0, true, vec![1])
        .unwrap();
    let second = engine.publish_verification_result(&admin, 0, false, vec![2]);

    assert!(matches!(second, Err(EngineError::ResultAlreadyPublished(0))));
    let stored = engine.verification_result(0).unwrap().unwrap();
    assert!(stored.passed);
    assert_eq!(stored.proof_data, vec![1]);
    assert_eq!(engine.current_period().unwrap(), 1);
}

#[test]
fn test_publish_requires_admin_and_proof() {
    let (mut engine, admin, a, b) = setup(2);
    engine.submit_attestation(&a, vec![1]).unwrap();
    engine.submit_attestation(&b, vec![2]).unwrap();

    let by_attestor = engine.publish_verification_result(&a, 0, true, vec![1]);
    assert!(matches!(by_attestor, Err(EngineError::Unauthorized { .. })));

    let no_proof = engine.publish_verification_result(&admin, 0, true, Vec::new());
    assert!(matches!(no_proof, Err(EngineError::InvalidInput(_))));

    assert!(engine.verification_result(0).unwrap().is_none());
}

#[test]
fn test_forced_advance_scenario() {
    let (mut engine, admin, a, b) = setup(2);

    engine.submit_attestation(&a, vec![1]).unwrap();
    assert_eq!(engine.force_advance_period(&admin).unwrap(), 1);
    assert_eq!(engine.current_period().unwrap(), 1);
    assert_eq!(engine.period_status(0).unwrap(), PeriodStatus::Abandoned);

    // The late submission lands in the current period, not the abandoned one.
    let receipt = engine.submit_attestation(&b, vec![2]).unwrap();
    assert_eq!(receipt.period, 1);
    assert!(!receipt.quorum_reached);
    assert_eq!(engine.period_attestor_count(0).unwrap(), 1);
    assert_eq!(engine.period_attestor_count(1).unwrap(), 1);
    assert!(quorum_events(&engine.take_events()).is_empty());

    // A already attested for period 0, but period 1 is a fresh slot.
    assert!(engine.submit_attestation(&a, vec![3]).unwrap().quorum_reached);
}

#[test]
fn test_force_advance_requires_admin() {
    let (mut engine, _admin, a, _b) = setup(2);
    let result = engine.force_advance_period(&a);
    assert!(matches!(result, Err(EngineError::Unauthorized { .. })));
    assert_eq!(engine.current_period().unwrap(), 0);
}

#[test]
fn test_publishing_past_period_does_not_move_pointer() {
    let (mut engine, admin, a, b) = setup(2);
    engine.submit_attestation(&a, vec![1]).unwrap();
    engine.submit_attestation(&b, vec![2]).unwrap();

    // Quorum reached for 0 but the pointer is pushed past it anyway.
    engine.force_advance_period(&admin).unwrap();
    engine.force_advance_period(&admin).unwrap();
    assert_eq!(engine.current_period().unwrap(), 2);
    engine.take_events();

    engine
        .publish_verification_result(&admin, 0, true, vec![1])
        .unwrap();

    assert_eq!(engine.current_period().unwrap(), 2);
    assert_eq!(engine.period_status(0).unwrap(), PeriodStatus::Verified);
    let events = engine.take_events();
    assert_eq!(events.len(), 1);
    assert!(!events
        .iter()
        .any(|e| matches!(e, LedgerEvent::PeriodAdvanced { .. })));
}

#[test]
fn test_pointer_is_monotonic_across_operations() {
    let (mut engine, admin, a, b) = setup(2);
    let mut last = engine.current_period().unwrap();

    for round in 0..3u8 {
        engine.submit_attestation(&a, vec![round + 1]).unwrap();
        assert_eq!(engine.current_period().unwrap(), last);
        engine.submit_attestation(&b, vec![round + 1]).unwrap();
        assert_eq!(engine.current_period().unwrap(), last);

        engine
            .publish_verification_result(&admin, last, round % 2 == 0, vec![round + 1])
            .unwrap();
        let now = engine.current_period().unwrap();
        assert_eq!(now, last + 1);
        last = now;
    }

    engine.force_advance_period(&admin).unwrap();
    assert_eq!(engine.current_period().unwrap(), last + 1);
}

#[test]
fn test_rules_append_only() {
    let (mut engine, admin, a, _b) = setup(2);

    let first = engine
        .add_verification_rule(&admin, "reserves >= liabilities", b"gte".to_vec())
        .unwrap();
    let second = engine
        .add_verification_rule(&admin, "solvency ratio", Vec::new())
        .unwrap();
    assert_eq!((first, second), (0, 1));
    assert_eq!(engine.rule_count().unwrap(), 2);
    assert_eq!(engine.rule(0).unwrap().unwrap().rule_data, b"gte".to_vec());
    assert!(engine.rule(2).unwrap().is_none());

    let denied = engine.add_verification_rule(&a, "nope", Vec::new());
    assert!(matches!(denied, Err(EngineError::Unauthorized { .. })));

    let events = engine.take_events();
    assert_eq!(
        events[0],
        LedgerEvent::VerificationRuleAdded {
            index: 0,
            description: "reserves >= liabilities".to_string()
        }
    );
}

#[test]
fn test_queries_return_absent_values() {
    let (engine, _admin, a, _b) = setup(2);
    assert_eq!(engine.period_attestor_count(99).unwrap(), 0);
    assert!(engine.attestation(99, &a).unwrap().is_none());
    assert!(engine.verification_result(99).unwrap().is_none());
    assert!(engine.attestor(&Address::new("0xnobody")).unwrap().is_none());
    assert_eq!(engine.period_status(99).unwrap(), PeriodStatus::Open);
}
