//! Isocheck decides whether a recorded history of transactions satisfies a weak isolation
//! level: read committed, repeatable read, read atomicity or transactional causal
//! consistency.
//!
//! Rather than searching for a commit order, the checker looks for transactional anomaly
//! patterns ([`Tap`]s). Reachability is maintained incrementally with one per-session
//! clock per transaction, so each "does `a` precede `b`" query is a clock comparison.
//! Checking proceeds in two phases:
//!
//! 1. Build the *coordination order* (session order plus write-read edges) and match the
//!    patterns visible in it.
//! 2. Derive the *commit order* by adding the write-write edges every arbitration must
//!    contain. If it is acyclic the history is accepted; otherwise match the remaining
//!    patterns.
//!
//! # Example
//!
//! ```rust
//! use isocheck::{history, Backend, CheckerConfig, History, IsolationLevel, Tap};
//!
//! // T3 sees T2's write to `y` yet reads the older value of `x`.
//! let h: History<&str, u64> = history! {
//!     0 => [1 => [w("x", 1)], 2 => [w("x", 2), w("y", 2)]],
//!     1 => [3 => [r("y", 2), r("x", 1)]],
//! };
//! let checker =
//!     Backend::TreeClock.build::<&str, u64>(CheckerConfig::new(IsolationLevel::ReadCommitted));
//! let verdict = checker.verify(&h)?;
//! assert!(!verdict.is_satisfied());
//! assert_eq!(verdict.violations(), vec![Tap::NonMonoReadCO]);
//! println!("{}", verdict.to_dot().unwrap_or_default());
//! # Ok::<(), isocheck::Error>(())
//! ```
//!
//! Reads of the sentinel value (`V::default()` unless configured otherwise) are taken to
//! observe the initial state. Set `ISOCHECK_DEBUG` to print the visited transactions with
//! their clocks and the witnesses found, and install a `tracing` subscriber for progress
//! events.

#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod analysis;
mod checker;
mod commit;
mod coordination;
mod diagnostic;
mod graph;
mod profile;
mod report;

pub use {
    checker::{
        Backend, Checker, CheckerConfig, TreeClockChecker, Verdict, DEBUG_ENV,
        DEFAULT_MAX_CLOCK_ENTRIES, ISOLATION_ENV, PROFILE_ENV,
    },
    isocheck_core::{
        history, Datum, Error, History, KeyValue, OpKind, Operation, Session, SessionId,
        Transaction, TxnId,
    },
    isolation_model::{IsolationLevel, Tap},
    profile::{Profile, CONSTRUCTION, TRAVERSAL},
    report::{AnomalyReport, Witness},
};

/// Asserts that a report holds exactly the listed patterns, printing every witness on
/// failure.
///
/// ```
/// use isocheck::{assert_taps, history, Checker, CheckerConfig, History, IsolationLevel,
///                Tap, TreeClockChecker};
///
/// let h: History<&str, u64> = history! { 0 => [1 => [r("x", 5)]] };
/// let checker = TreeClockChecker::new(CheckerConfig::<u64>::new(IsolationLevel::ReadCommitted));
/// let verdict = checker.verify(&h).unwrap();
/// assert_taps!(verdict.report(), [Tap::ThinAirRead]);
/// ```
#[macro_export]
macro_rules! assert_taps {
    ($report:expr, [$($tap:expr),* $(,)?] $(,)?) => {
        match &$report {
            report => {
                let mut expected: ::std::vec::Vec<$crate::Tap> = ::std::vec![$($tap),*];
                expected.sort();
                let actual: ::std::vec::Vec<$crate::Tap> = report.taps().collect();
                if actual != expected {
                    for witness in report.witnesses() {
                        println!("{}", witness.dot());
                    }
                    panic!("expected patterns {:?}, found {:?}", expected, actual);
                }
            }
        }
    };
    ($report:expr $(,)?) => {
        $crate::assert_taps!($report, [])
    };
}
