use {
    isocheck::{
        assert_taps, history, Backend, Checker, CheckerConfig, Error, History, IsolationLevel,
        OpKind, SessionId, Tap, TreeClockChecker, TxnId, Verdict, CONSTRUCTION, TRAVERSAL,
    },
    tracing_subscriber::EnvFilter,
};

type Hist = History<&'static str, u64>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn verify(h: &Hist, level: IsolationLevel) -> Verdict<&'static str> {
    init_tracing();
    TreeClockChecker::new(CheckerConfig::new(level))
        .verify(h)
        .unwrap()
}

/// Levels in `ok` accept the history and every other level rejects it.
fn assert_accepted_by(h: &Hist, ok: &[IsolationLevel]) {
    for level in IsolationLevel::ALL {
        let verdict = verify(h, level);
        assert_eq!(
            verdict.is_satisfied(),
            ok.contains(&level),
            "{level}: violations {:?}",
            verdict.violations()
        );
    }
}

/// T3 sees T2's write of `y`, so it must also see T2's overwrite of `x`.
fn non_monotonic_read() -> Hist {
    history! {
        0 => [1 => [w("x", 1)], 2 => [w("x", 2), w("y", 2)]],
        1 => [3 => [r("y", 2), r("x", 1)]],
    }
}

/// T3 observes T1's write of `y` but T2's later write of `y` is in its own session.
fn fractured_read() -> Hist {
    history! {
        0 => [1 => [w("x", 1), w("y", 1)]],
        1 => [2 => [r("x", 1), w("y", 2)], 3 => [r("x", 1), r("y", 1)]],
    }
}

/// T4 reads `x` from T1 though T3 overwrote it after T1, and T3 is visible to T4 via T2.
fn causal_violation() -> Hist {
    history! {
        0 => [1 => [w("x", 1)]],
        1 => [2 => [r("x", 2), w("y", 1)]],
        2 => [3 => [r("x", 1), w("x", 2)]],
        3 => [4 => [r("x", 1), r("y", 1)]],
    }
}

fn serializable() -> Hist {
    history! {
        0 => [1 => [w("x", 1), w("y", 1)]],
        1 => [2 => [r("x", 1), r("y", 1), w("x", 2)]],
        2 => [3 => [r("x", 1), r("y", 1), w("y", 2)]],
    }
}

#[test]
fn rejects_non_monotonic_read_at_read_committed() {
    let h = non_monotonic_read();
    let verdict = verify(&h, IsolationLevel::ReadCommitted);
    assert_taps!(verdict.report(), [Tap::NonMonoReadCO]);
    assert_eq!(verdict.violations(), vec![Tap::NonMonoReadCO]);
    assert_accepted_by(&h, &[IsolationLevel::RepeatableRead]);
}

#[test]
fn rejects_fractured_read_at_read_atomicity() {
    let h = fractured_read();
    let verdict = verify(&h, IsolationLevel::ReadAtomicity);
    assert_taps!(verdict.report(), [Tap::FracturedReadCO]);
    assert_accepted_by(
        &h,
        &[
            IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead,
        ],
    );
}

#[test]
fn rejects_causal_violation_only_at_causal_consistency() {
    let h = causal_violation();
    let verdict = verify(&h, IsolationLevel::CausalConsistency);
    assert_taps!(verdict.report(), [Tap::COConflictCM, Tap::ConflictCM]);
    assert_accepted_by(
        &h,
        &[
            IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead,
            IsolationLevel::ReadAtomicity,
        ],
    );
}

/// T1 must commit before T2 because T4 saw T1 and then read `y` from T2, yet T3 reads `x`
/// from T1 after its own session ran T2.
fn commit_order_violation() -> Hist {
    history! {
        0 => [1 => [w("x", 1), w("y", 1), w("z", 1)]],
        1 => [2 => [w("x", 2), w("y", 2)], 3 => [r("x", 1)]],
        2 => [4 => [r("z", 1), r("y", 2)]],
    }
}

#[test]
fn finds_commit_order_patterns() {
    let h = commit_order_violation();
    let verdict = verify(&h, IsolationLevel::CausalConsistency);
    assert_taps!(verdict.report(), [Tap::NonMonoReadCM, Tap::FracturedReadCM]);
    let fractured = verdict.report().witness(Tap::FracturedReadCM).unwrap();
    assert_eq!(fractured.transactions(), &[TxnId::from(1), TxnId::from(2), TxnId::from(3)]);
    assert_eq!(fractured.key(), Some(&"x"));
    // The commit edge T1 -> T2 is explained by T4's reads.
    for line in [
        r#"  "T1" -> "T2" [label="WW \"y\""];"#,
        r#"  "T2" -> "T4" [label="WR \"y\""];"#,
        r#"  "T1" -> "T4" [label="WR \"z\""];"#,
        r#"  "T2" -> "T3" [label="SO"];"#,
    ] {
        assert!(
            fractured.dot().lines().any(|l| l == line),
            "missing {line} in\n{}",
            fractured.dot()
        );
    }
    let non_mono = verdict.report().witness(Tap::NonMonoReadCM).unwrap();
    assert_eq!(non_mono.transactions(), &[TxnId::from(2), TxnId::from(1), TxnId::from(4)]);

    assert_accepted_by(&h, &[IsolationLevel::RepeatableRead]);
}

#[test]
fn accepts_serializable_history() {
    let h = serializable();
    for level in IsolationLevel::ALL {
        assert_taps!(verify(&h, level).report());
    }
    assert_accepted_by(&h, &IsolationLevel::ALL);
}

#[test]
fn accepts_empty_history() {
    assert_accepted_by(&History::new(), &IsolationLevel::ALL);
    let h: Hist = history! { 0 => [1 => []], 1 => [] };
    assert_accepted_by(&h, &IsolationLevel::ALL);
}

#[test]
fn repeatable_read_skips_commit_order() {
    // The commit order is never derived at this level, so commit-order patterns are not
    // reported even though the history contains one.
    let verdict = verify(&non_monotonic_read(), IsolationLevel::RepeatableRead);
    assert_taps!(verdict.report());
}

#[test]
fn witness_renders_triangle() {
    let verdict = verify(&non_monotonic_read(), IsolationLevel::ReadCommitted);
    let dot = verdict.to_dot().unwrap();
    assert!(dot.starts_with("digraph NonMonoReadCO {\n"), "{dot}");
    assert!(dot.ends_with("}\n"), "{dot}");
    for line in [
        r#"  "T1" [ops="[w(\"x\", 1)]"];"#,
        r#"  "T2" [ops="[w(\"x\", 2), w(\"y\", 2)]"];"#,
        r#"  "T3" [ops="[r(\"y\", 2), r(\"x\", 1)]"];"#,
        r#"  "T1" -> "T2" [label="SO"];"#,
        r#"  "T1" -> "T3" [label="WR \"x\""];"#,
        r#"  "T2" -> "T1" [label="WW \"x\""];"#,
        r#"  "T2" -> "T3" [label="WR \"y\""];"#,
    ] {
        assert!(dot.lines().any(|l| l == line), "missing {line} in\n{dot}");
    }
    assert_eq!(dot.lines().count(), 9, "{dot}");
}

#[test]
fn renders_earliest_detected_violation() {
    // The repeated read is found while building, the thin-air read only afterwards.
    let h: Hist = history! {
        0 => [1 => [w("x", 1)]],
        1 => [2 => [w("x", 2)]],
        2 => [3 => [r("x", 1), r("x", 2)]],
        3 => [4 => [r("y", 9)]],
    };
    let verdict = verify(&h, IsolationLevel::CausalConsistency);
    assert_taps!(
        verdict.report(),
        [Tap::ThinAirRead, Tap::NonRepeatableRead, Tap::ConflictCM]
    );
    let dot = verdict.to_dot().unwrap();
    assert!(dot.starts_with("digraph NonRepeatableRead {\n"), "{dot}");
}

#[test]
fn same_key_reads_do_not_order_the_commit_triangle() {
    // T3 reads `x` from both writers, so each writer must commit before the other. The
    // second read of `x` says nothing about when T3 observed the competing writer.
    let h: Hist = history! {
        0 => [1 => [w("x", 1)]],
        1 => [2 => [w("x", 2)]],
        2 => [3 => [r("x", 1), r("x", 2)]],
    };
    let verdict = verify(&h, IsolationLevel::CausalConsistency);
    assert!(!verdict.report().contains(Tap::FracturedReadCM));
    assert!(!verdict.report().contains(Tap::NonMonoReadCM));
    assert_eq!(verdict.report().count(Tap::ConflictCM), 2);
    assert_eq!(
        verdict
            .report()
            .witness(Tap::ConflictCM)
            .unwrap()
            .transactions(),
        &[TxnId::from(1), TxnId::from(2), TxnId::from(3)]
    );
}

#[test]
fn writes_dot_file() {
    let path = std::env::temp_dir().join(format!("isocheck-{}.dot", std::process::id()));
    let verdict = verify(&fractured_read(), IsolationLevel::ReadAtomicity);
    assert!(verdict.write_dot(&path).unwrap());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("digraph FracturedReadCO {"));
    std::fs::remove_file(&path).unwrap();

    // Nothing to write when the level is satisfied.
    let verdict = verify(&fractured_read(), IsolationLevel::ReadCommitted);
    assert_eq!(verdict.to_dot(), None);
    assert!(!verdict.write_dot(&path).unwrap());
    assert!(!path.exists());
}

#[test]
fn verdict_serializes_to_json() {
    let verdict = verify(&non_monotonic_read(), IsolationLevel::ReadCommitted);
    let json = serde_json::to_value(&verdict).unwrap();
    assert_eq!(json["level"], "ReadCommitted");
    assert_eq!(json["report"]["counts"]["NonMonoReadCO"], 1);
    let witness = &json["report"]["witnesses"][0];
    assert_eq!(witness["tap"], "NonMonoReadCO");
    assert_eq!(witness["key"], "x");
    assert_eq!(witness["transactions"], serde_json::json!([1, 2, 3]));
    assert!(json["profile"].is_null());
}

#[test]
fn profiles_stages_when_enabled() {
    let checker = TreeClockChecker::new(
        CheckerConfig::new(IsolationLevel::CausalConsistency).with_profile(true),
    );
    let verdict = checker.verify(&causal_violation()).unwrap();
    let info = verdict.profile_info().unwrap();
    assert_eq!(
        info.keys().map(String::as_str).collect::<Vec<_>>(),
        vec![CONSTRUCTION, TRAVERSAL]
    );
    assert!(verdict.profile().unwrap().stage(TRAVERSAL).is_some());
    let unprofiled = verify(&causal_violation(), IsolationLevel::ReadCommitted);
    assert_eq!(unprofiled.profile_info(), None);
}

#[test]
fn verification_is_deterministic() {
    let h = causal_violation();
    let first = verify(&h, IsolationLevel::CausalConsistency);
    for _ in 0..5 {
        assert_eq!(verify(&h, IsolationLevel::CausalConsistency), first);
    }
}

#[test]
fn init_session_does_not_change_verdicts() {
    let mut h = non_monotonic_read();
    h.add_init_session(0);
    let verdict = verify(&h, IsolationLevel::ReadCommitted);
    assert_taps!(verdict.report(), [Tap::NonMonoReadCO]);
}

#[test]
fn rejects_malformed_histories() {
    let checker = TreeClockChecker::new(CheckerConfig::new(IsolationLevel::ReadCommitted));

    let dangling: History<String, u64> = serde_json::from_str(
        r#"{
            "sessions": {"0": {"id": 0, "transactions": [1, 2]}},
            "transactions": {"1": {"id": 1, "session": 0, "ops": [], "success": true}},
            "aborted_writes": [],
            "keys": []
        }"#,
    )
    .unwrap();
    assert_eq!(
        checker.verify(&dangling),
        Err(Error::DanglingTransaction {
            txn: TxnId::from(2),
            session: SessionId::from(0),
        })
    );

    let misplaced: History<String, u64> = serde_json::from_str(
        r#"{
            "sessions": {"0": {"id": 0, "transactions": [1]}},
            "transactions": {"1": {"id": 1, "session": 0, "success": true, "ops": [
                {"kind": "Write", "key": "x", "value": 1, "txn": 1, "position": 3}
            ]}},
            "aborted_writes": [],
            "keys": ["x"]
        }"#,
    )
    .unwrap();
    assert_eq!(
        checker.verify(&misplaced),
        Err(Error::MisplacedOperation {
            txn: TxnId::from(1),
            position: 3,
        })
    );

    let duplicated: History<String, u64> = serde_json::from_str(
        r#"{
            "sessions": {"0": {"id": 0, "transactions": [1, 1]}},
            "transactions": {"1": {"id": 1, "session": 0, "success": true, "ops": [
                {"kind": "Write", "key": "x", "value": 1, "txn": 1, "position": 0}
            ]}},
            "aborted_writes": [],
            "keys": ["x"]
        }"#,
    )
    .unwrap();
    assert_eq!(
        checker.verify(&duplicated),
        Err(Error::DuplicateTransaction(TxnId::from(1)))
    );
}

#[test]
fn rejects_oversized_histories() {
    let checker = TreeClockChecker::new(
        CheckerConfig::new(IsolationLevel::ReadCommitted).with_max_clock_entries(3),
    );
    assert_eq!(
        checker.verify(&serializable()),
        Err(Error::CapacityExceeded {
            sessions: 3,
            transactions: 3,
        })
    );
}

#[test]
fn backends_are_shareable() {
    let checker: Box<dyn Checker<&'static str, u64> + Send + Sync> =
        "c4".parse::<Backend>().unwrap().build(CheckerConfig::new(
            IsolationLevel::CausalConsistency,
        ));
    assert_eq!(checker.name(), "C4");
    let histories = [
        non_monotonic_read(),
        fractured_read(),
        causal_violation(),
        serializable(),
    ];
    let checker = &checker;
    let satisfied: Vec<bool> = std::thread::scope(|s| {
        let handles: Vec<_> = histories
            .iter()
            .map(|h| s.spawn(move || checker.verify(h).unwrap().is_satisfied()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(satisfied, vec![false, false, false, true]);
}

/// Transactions executed one at a time in visit order, each reading two keys and writing a
/// fresh value to a third. Every level must accept such a history.
fn serial_history(sessions: i64, rounds: i64, keys: &[&'static str]) -> Hist {
    let mut h = History::new();
    let mut state = std::collections::HashMap::new();
    let mut seed = 0x2545_f491_4f6c_dd1d_u64;
    let mut next = move |n: usize| {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        (seed % n as u64) as usize
    };
    let mut fresh = 0;
    for round in 0..rounds {
        for session in 0..sessions {
            let mut ops = Vec::new();
            for _ in 0..2 {
                let key = keys[next(keys.len())];
                ops.push((OpKind::Read, key, *state.get(key).unwrap_or(&0)));
            }
            let key = keys[next(keys.len())];
            fresh += 1;
            state.insert(key, fresh);
            ops.push((OpKind::Write, key, fresh));
            h.push_transaction(
                SessionId::from(session),
                TxnId::from(round * sessions + session),
                ops,
            );
        }
    }
    h
}

#[test]
fn accepts_serial_executions() {
    let h = serial_history(6, 40, &["a", "b", "c", "d", "e"]);
    assert_eq!(h.transaction_count(), 240);
    for level in IsolationLevel::ALL {
        assert_taps!(verify(&h, level).report());
    }
}

#[test]
fn finds_corrupted_read_in_serial_execution() {
    let mut h = serial_history(3, 20, &["a", "b", "c"]);
    h.push_transaction(
        SessionId::from(1),
        TxnId::from(1_000),
        [(OpKind::Read, "a", 99_999)],
    );
    let verdict = verify(&h, IsolationLevel::ReadCommitted);
    assert_taps!(verdict.report(), [Tap::ThinAirRead]);
}
