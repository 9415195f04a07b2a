//! JSONL coupon ledger with duplicate detection and a brand registry

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::coupon::CouponRecord;

/// Coupon as persisted, with ownership and bookkeeping fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCoupon {
    pub id: String,
    #[serde(flatten)]
    pub coupon: CouponRecord,
    pub user_id: Option<String>,
    pub featured: bool,
    pub created_at: i64, // epoch ms
}

/// Brand registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandEntry {
    pub name: String,
    pub logo: String,
    pub coupon_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Inserted(StoredCoupon),
    Duplicate(StoredCoupon),
}

impl SaveOutcome {
    pub fn coupon(&self) -> &StoredCoupon {
        match self {
            SaveOutcome::Inserted(c) | SaveOutcome::Duplicate(c) => c,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, SaveOutcome::Duplicate(_))
    }
}

/// Stable id derived from the fields that define a duplicate
pub fn coupon_id(record: &CouponRecord, user_id: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    for part in [
        record.brand.as_str(),
        record.description.as_str(),
        record.savings.as_str(),
        user_id.unwrap_or(""),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

fn is_same_coupon(stored: &StoredCoupon, record: &CouponRecord, user_id: Option<&str>) -> bool {
    stored.coupon.brand == record.brand
        && stored.coupon.description == record.description
        && stored.coupon.savings == record.savings
        && stored.user_id.as_deref() == user_id
}

/// Ledger rooted at `<data_dir>/coupons`
pub struct CouponLedger {
    dir: PathBuf,
}

impl CouponLedger {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            dir: data_dir.as_ref().join("coupons"),
        }
    }

    fn coupons_path(&self) -> PathBuf {
        self.dir.join("coupons.jsonl")
    }

    fn brands_path(&self) -> PathBuf {
        self.dir.join("brands.json")
    }

    pub fn load_coupons(&self) -> Result<Vec<StoredCoupon>> {
        let path = self.coupons_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read coupon ledger: {:?}", path))?;
        let mut coupons = Vec::new();

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let coupon: StoredCoupon = serde_json::from_str(line)
                .with_context(|| format!("Failed to parse coupon: {}", line))?;
            coupons.push(coupon);
        }

        Ok(coupons)
    }

    /// Existing coupon with the same brand, description, savings and owner
    pub fn find_duplicate(&self, record: &CouponRecord, user_id: Option<&str>) -> Result<Option<StoredCoupon>> {
        Ok(self
            .load_coupons()?
            .into_iter()
            .find(|c| is_same_coupon(c, record, user_id)))
    }

    /// Insert unless a duplicate exists; new inserts bump the brand registry
    pub fn save_coupon(&self, record: &CouponRecord, user_id: Option<&str>) -> Result<SaveOutcome> {
        if let Some(existing) = self.find_duplicate(record, user_id)? {
            tracing::info!("Duplicate coupon found ({}), skipping insertion", existing.id);
            return Ok(SaveOutcome::Duplicate(existing));
        }

        let stored = StoredCoupon {
            id: coupon_id(record, user_id),
            coupon: record.clone(),
            user_id: user_id.map(|u| u.to_string()),
            featured: false,
            created_at: Utc::now().timestamp_millis(),
        };

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {:?}", self.dir))?;

        let path = self.coupons_path();
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open coupon ledger: {:?}", path))?;
        writeln!(file, "{}", serde_json::to_string(&stored)?)?;

        self.record_brand(&record.brand, &record.brand_logo)?;
        tracing::info!("Saved coupon {} for brand {}", stored.id, record.brand);

        Ok(SaveOutcome::Inserted(stored))
    }

    pub fn load_brands(&self) -> Result<BTreeMap<String, BrandEntry>> {
        let path = self.brands_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read brand registry: {:?}", path))?;
        serde_json::from_str(&content).context("Failed to parse brand registry")
    }

    /// Create the brand with a count of one, or increment its count
    fn record_brand(&self, name: &str, logo: &str) -> Result<BrandEntry> {
        let mut brands = self.load_brands()?;

        let entry = brands
            .entry(name.to_string())
            .and_modify(|b| b.coupon_count += 1)
            .or_insert_with(|| BrandEntry {
                name: name.to_string(),
                logo: logo.to_string(),
                coupon_count: 1,
            })
            .clone();

        let json = serde_json::to_string_pretty(&brands)?;
        std::fs::write(self.brands_path(), json)
            .with_context(|| format!("Failed to write brand registry: {:?}", self.brands_path()))?;

        Ok(entry)
    }
}
