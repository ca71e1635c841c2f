//! # Plasma ledger
//!
//! *Transaction admission and ledger state for a UTXO plasma child chain.*
//!
//! The chain settles against a rootchain contract. This crate decides whether a candidate
//! transaction may be admitted and keeps the canonical mapping from positions to their
//! spend state, along with per-address wallets and the plasma block sequence.
//!
//! * [`plasma`]: positions, inputs, outputs, deposits, transactions.
//! * [`store`]: ledger and block stores over a pluggable key-value backend.
//! * [`ante`] and [`handler`]: admission checks and the state transition.
//! * [`chain`]: block lifecycle driven by the host runtime.
//! * [`query`]: read-only JSON views.

pub mod ante;
pub mod chain;
pub mod error;
pub mod handler;
pub mod msgs;
pub mod plasma;
pub mod query;
pub mod rootchain;
pub mod store;
pub mod utils;

pub use error::{Error, Result};
