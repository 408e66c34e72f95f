//! Output side: downstream demand ledger.

mod ledger;

pub use ledger::{DemandLedger, OutputState, Registration};
