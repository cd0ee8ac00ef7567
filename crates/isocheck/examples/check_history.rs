//! Checks a history against one or every isolation level.
//!
//! ```sh
//! $ cargo run --example check_history                      # built-in causality violation
//! $ cargo run --example check_history -- history.json      # a serialized History<String, i64>
//! $ ISOCHECK_ISOLATION=RA ISOCHECK_PROFILE=1 cargo run --example check_history
//! ```
//!
//! The witness of the first violation is written to `violation.dot`.

use isocheck::{history, Backend, CheckerConfig, History, IsolationLevel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let history: History<String, i64> = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => history! {
            0 => [1 => [w("x".to_string(), 1)]],
            1 => [2 => [r("x".to_string(), 2), w("y".to_string(), 1)]],
            2 => [3 => [r("x".to_string(), 1), w("x".to_string(), 2)]],
            3 => [4 => [r("x".to_string(), 1), r("y".to_string(), 1)]],
        },
    };

    let configs = match CheckerConfig::from_env() {
        Ok(config) => vec![config],
        Err(_) => IsolationLevel::ALL
            .into_iter()
            .map(CheckerConfig::new)
            .collect(),
    };
    for config in configs {
        let checker = Backend::TreeClock.build::<String, i64>(config);
        let verdict = checker.verify(&history)?;
        println!(
            "{}: {} under {}",
            checker.name(),
            if verdict.is_satisfied() { "ACCEPT" } else { "REJECT" },
            verdict.level()
        );
        for (tap, count) in verdict.report().counts() {
            let status = if verdict.level().prohibits(*tap) { "violation" } else { "allowed" };
            println!("  {} {tap} x{count} ({status})", tap.code());
        }
        if let Some(profile) = verdict.profile_info() {
            println!("  profile (ms): {profile:?}");
        }
        if verdict.write_dot("violation.dot")? {
            println!("  wrote witness to violation.dot");
        }
    }
    Ok(())
}
