//! This library names the transactional isolation levels a history can be checked against and
//! the catalogue of anomaly patterns ([`Tap`]s) that falsify them.
//!
//! # Levels
//!
//! [`IsolationLevel`]s form a chain: read committed, repeatable read, read atomicity and
//! transactional causal consistency. Each level's [`IsolationLevel::prohibited`] set contains
//! the sets of all weaker levels, so a history satisfying a level satisfies every weaker one.
//!
//! # Patterns
//!
//! A [`Tap`] is a shape over the dependency graph of a history built from session order (SO),
//! write-read dependencies (WR), the coordination order (CO, the transitive closure of SO and
//! WR) and the commit order (CM) derived from competing writers of a key. Patterns such as
//! [`Tap::ThinAirRead`] involve a single transaction; triangle patterns such as
//! [`Tap::FracturedReadCM`] involve three.
//!
//! # Additional Reading
//!
//! - ["Seeing is Believing: A Client-Centric Specification of Database
//!   Isolation"](https://dl.acm.org/doi/10.1145/3087801.3087802) by Crooks et al.
//! - ["On the Complexity of Checking Transactional Consistency"](https://arxiv.org/abs/1908.04509)
//!   by Biswas and Enea

#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod level;
mod tap;

pub use level::IsolationLevel;
pub use tap::Tap;
