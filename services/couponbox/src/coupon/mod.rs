//! Coupon data model and the two pure helpers both extractors lean on

pub mod dates;
pub mod logo;
pub mod record;

pub use dates::*;
pub use logo::*;
pub use record::*;
