//! # Transit Gateway Reachability Matrix
//!
//! Classifies every ordered pair of transit gateway attachments by whether
//! traffic can flow both ways.
//!
//! ## Classification
//!
//! ```text
//! (A, B)
//!     │
//!     ├─ A == B                         -> self
//!     ├─ A has no route table           -> no-route-table (whole row)
//!     └─ routes in A's table targeting B
//!            ├─ none                    -> empty cell
//!            └─ per prefix
//!                 ├─ no return route in B's table -> oneway
//!                 ├─ return + active              -> active
//!                 └─ return + blackhole           -> blackhole
//!
//! cell = active, overridden by blackhole, overridden by oneway
//! ```
//!
//! Routes without a target are blackhole without a return check and are kept
//! on the row, not on any cell.

mod classify;
mod error;
mod grid;

pub use classify::{
    aggregate, prefix_reachability, ClassifierConfig, FailurePolicy, ReachabilityClassifier,
    DEFAULT_CONCURRENCY, MAX_CONCURRENCY,
};
pub use error::{MatrixError, Result};
pub use grid::{
    Cell, Classification, GridStats, PrefixVerdict, Reachability, ReachabilityGrid, Row, RowState,
};
