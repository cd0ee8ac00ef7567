use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

/// Time spent building the coordination order.
pub const CONSTRUCTION: &str = "Construction";
/// Time spent matching patterns and deriving the commit order.
pub const TRAVERSAL: &str = "Traversal";

/// Wall-clock time per checking stage.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Profile {
    stages: BTreeMap<String, Duration>,
}

impl Profile {
    /// Runs `f`, adding its duration to `stage`.
    pub(crate) fn time<T>(&mut self, stage: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        *self.stages.entry(stage.to_string()).or_default() += start.elapsed();
        result
    }

    pub fn stage(&self, stage: &str) -> Option<Duration> {
        self.stages.get(stage).copied()
    }

    pub fn stages(&self) -> &BTreeMap<String, Duration> {
        &self.stages
    }

    /// Stage durations in whole milliseconds.
    pub fn to_millis(&self) -> BTreeMap<String, u128> {
        self.stages
            .iter()
            .map(|(stage, elapsed)| (stage.clone(), elapsed.as_millis()))
            .collect()
    }
}
