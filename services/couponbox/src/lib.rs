//! Promotional email → structured coupon extraction
//!
//! The crate turns raw email text (subject + body) into a [`CouponRecord`]:
//! 1. An AI strategy asks a chat-completion service for a JSON payload
//! 2. A deterministic regex strategy backs it up and never fails
//! 3. Optional ledger persistence with duplicate detection and brand counts
//!
//! [`batch`] runs the pipeline over saved emails with bounded concurrency.

pub mod batch;
pub mod config;
pub mod coupon;
pub mod error;
pub mod extract;
pub mod inbound;
pub mod store;

pub use coupon::{Category, CouponRecord, ExtractionInput};
pub use error::ExtractionError;
pub use extract::{AiExtractor, EmailCouponPipeline, Extractor, HeuristicExtractor};
