use anyhow::Result;
use async_trait::async_trait;

use crate::coupon::{CouponRecord, ExtractionInput};

/// A strategy that turns raw email text into a coupon record.
///
/// `Ok(None)` means the strategy declined; the pipeline moves on to the
/// next one. Errors are treated the same way.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &str;

    async fn extract(&self, input: &ExtractionInput) -> Result<Option<CouponRecord>>;
}
