use {
    crate::{
        analysis::Analysis,
        profile::{Profile, CONSTRUCTION, TRAVERSAL},
        report::AnomalyReport,
    },
    isocheck_core::{Datum, Error, History},
    isolation_model::{IsolationLevel, Tap},
    std::{collections::BTreeMap, path::Path, str::FromStr},
    tracing::{debug, info},
};

/// Upper bound on clock entries: `sessions * transactions` for each of the two orders.
pub const DEFAULT_MAX_CLOCK_ENTRIES: usize = 1 << 30;

/// Environment variable naming the isolation level for [`CheckerConfig::from_env`].
pub const ISOLATION_ENV: &str = "ISOCHECK_ISOLATION";
/// Environment variable enabling stage timing for [`CheckerConfig::from_env`].
pub const PROFILE_ENV: &str = "ISOCHECK_PROFILE";
/// When set, checkers print every transaction with its clocks plus the witnesses found.
pub const DEBUG_ENV: &str = "ISOCHECK_DEBUG";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckerConfig<V> {
    pub isolation_level: IsolationLevel,
    /// The value a read returns when no committed write preceded it.
    pub sentinel: V,
    pub profile: bool,
    pub max_clock_entries: usize,
}

impl<V: Default> CheckerConfig<V> {
    /// A config for `isolation_level` with `V::default()` as the sentinel.
    pub fn new(isolation_level: IsolationLevel) -> Self {
        CheckerConfig {
            isolation_level,
            sentinel: V::default(),
            profile: false,
            max_clock_entries: DEFAULT_MAX_CLOCK_ENTRIES,
        }
    }

    /// Reads [`ISOLATION_ENV`] (required) and [`PROFILE_ENV`] (any value but `0`, `false` or
    /// empty enables profiling).
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`CheckerConfig::from_env`] but with variables resolved by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let level = lookup(ISOLATION_ENV)
            .ok_or(Error::MissingConfig(ISOLATION_ENV))?
            .parse::<IsolationLevel>()?;
        let profile = lookup(PROFILE_ENV).map_or(false, |v| {
            !matches!(v.trim().to_ascii_lowercase().as_str(), "" | "0" | "false")
        });
        Ok(CheckerConfig::new(level).with_profile(profile))
    }
}

impl<V> CheckerConfig<V> {
    pub fn with_sentinel(self, sentinel: V) -> Self {
        CheckerConfig { sentinel, ..self }
    }

    pub fn with_profile(self, profile: bool) -> Self {
        CheckerConfig { profile, ..self }
    }

    pub fn with_max_clock_entries(self, max_clock_entries: usize) -> Self {
        CheckerConfig {
            max_clock_entries,
            ..self
        }
    }
}

/// Decides whether a history satisfies an isolation level.
///
/// Implementations hold no state between calls, so one checker can verify any number of
/// histories, concurrently if it is `Sync`.
pub trait Checker<K, V> {
    fn name(&self) -> &'static str;

    /// Fails only if the history is malformed or too large. Anomalies are reported through
    /// the [`Verdict`].
    fn verify(&self, history: &History<K, V>) -> Result<Verdict<K>, Error>;
}

/// The outcome of checking one history.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Verdict<K> {
    level: IsolationLevel,
    report: AnomalyReport<K>,
    profile: Option<Profile>,
}

impl<K> Verdict<K> {
    pub fn level(&self) -> IsolationLevel {
        self.level
    }

    /// `true` iff no detected pattern is prohibited by the checked level.
    pub fn is_satisfied(&self) -> bool {
        self.report.taps().all(|tap| !self.level.prohibits(tap))
    }

    /// Detected patterns the checked level prohibits.
    pub fn violations(&self) -> Vec<Tap> {
        self.report.violations(self.level)
    }

    /// All detected patterns, including ones the level permits.
    pub fn report(&self) -> &AnomalyReport<K> {
        &self.report
    }

    /// DOT rendering of the earliest detected witness the level prohibits, if any.
    pub fn to_dot(&self) -> Option<&str> {
        self.report
            .witnesses()
            .iter()
            .find(|w| self.level.prohibits(w.tap()))
            .map(|w| w.dot())
    }

    /// Writes [`Verdict::to_dot`] to `path`. Returns whether anything was written.
    pub fn write_dot(&self, path: impl AsRef<Path>) -> std::io::Result<bool> {
        match self.to_dot() {
            None => Ok(false),
            Some(dot) => {
                std::fs::write(path, dot)?;
                Ok(true)
            }
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Milliseconds per stage (`Construction`, `Traversal`), if profiling was enabled.
    pub fn profile_info(&self) -> Option<BTreeMap<String, u128>> {
        self.profile.as_ref().map(Profile::to_millis)
    }
}

/// Checks histories by tracking reachability with one clock per transaction, first over the
/// coordination order and then, unless the level needs only that, over the derived commit
/// order. The commit order is only matched against if it is cyclic.
#[derive(Clone, Debug)]
pub struct TreeClockChecker<V> {
    config: CheckerConfig<V>,
}

impl<V> TreeClockChecker<V> {
    pub const NAME: &'static str = "C4";

    pub fn new(config: CheckerConfig<V>) -> Self {
        TreeClockChecker { config }
    }

    pub fn config(&self) -> &CheckerConfig<V> {
        &self.config
    }
}

impl<K: Datum, V: Datum> Checker<K, V> for TreeClockChecker<V> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn verify(&self, history: &History<K, V>) -> Result<Verdict<K>, Error> {
        history.validate()?;
        let level = self.config.isolation_level;
        let mut analysis = Analysis::new(
            history,
            self.config.sentinel.clone(),
            self.config.max_clock_entries,
        )?;

        let mut profile = Profile::default();
        profile.time(CONSTRUCTION, || analysis.build_coordination_order());
        profile.time(TRAVERSAL, || {
            analysis.check_coordination_order();
            if !level.checks_commit_order() {
                debug!(%level, "skipping commit order");
                return;
            }
            analysis.build_commit_order();
            if !analysis.has_commit_cycle() {
                debug!("commit order is acyclic");
                return;
            }
            analysis.check_commit_order();
        });

        if std::env::var(DEBUG_ENV).is_ok() {
            analysis.dump();
        }
        let verdict = Verdict {
            level,
            report: analysis.into_report(),
            profile: self.config.profile.then_some(profile),
        };
        info!(
            checker = Self::NAME,
            %level,
            transactions = history.transaction_count(),
            satisfied = verdict.is_satisfied(),
            anomalies = verdict.report.total(),
            "verified history"
        );
        Ok(verdict)
    }
}

/// Available checker implementations.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Backend {
    /// [`TreeClockChecker`].
    TreeClock,
}

impl Backend {
    pub const ALL: [Backend; 1] = [Backend::TreeClock];

    pub fn name(self) -> &'static str {
        match self {
            Backend::TreeClock => TreeClockChecker::<()>::NAME,
        }
    }

    pub fn build<K, V>(self, config: CheckerConfig<V>) -> Box<dyn Checker<K, V> + Send + Sync>
    where
        K: Datum,
        V: Datum + Send + Sync + 'static,
    {
        match self {
            Backend::TreeClock => Box::new(TreeClockChecker::new(config)),
        }
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C4" | "TREE_CLOCK" | "TREECLOCK" => Ok(Backend::TreeClock),
            _ => Err(Error::UnknownBackend(s.to_string())),
        }
    }
}
