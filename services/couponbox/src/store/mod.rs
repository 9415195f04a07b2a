//! Reference persistence for extracted coupons

pub mod ledger;

pub use ledger::*;
