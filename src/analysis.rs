// SPDX-License-Identifier: BSD-3-Clause
//! Propagation engine: filters, rules, state, and the fixpoint driver.

mod error;
pub use error::*;
pub mod filter;
pub mod oracle;
pub mod propagate;
pub mod rules;
pub mod state;
