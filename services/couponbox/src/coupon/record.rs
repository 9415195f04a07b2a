//! Core coupon types produced by the extraction pipeline

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::coupon::logo::resolve_brand_logo;
use crate::error::ExtractionError;

pub const DEFAULT_BRAND: &str = "Unknown";
pub const DEFAULT_SAVINGS: &str = "Special Offer";
pub const DEFAULT_CRITERIA: &str = "Received via email";
pub const DEFAULT_DEAL_LINK: &str = "#";

/// Days added to the extraction date when no expiry can be determined
pub const DEFAULT_EXPIRY_DAYS: i64 = 30;

/// Expiration used whenever a date is absent or unparsable
pub fn default_expiration(today: NaiveDate) -> NaiveDate {
    today + Duration::days(DEFAULT_EXPIRY_DAYS)
}

/// Coupon category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Food & Grocery")]
    FoodAndGrocery,
    Clothing,
    Electronics,
    Travel,
    Beauty,
    Entertainment,
    Other,
}

impl Default for Category {
    fn default() -> Self {
        Self::Other
    }
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::FoodAndGrocery,
        Category::Clothing,
        Category::Electronics,
        Category::Travel,
        Category::Beauty,
        Category::Entertainment,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::FoodAndGrocery => "Food & Grocery",
            Category::Clothing => "Clothing",
            Category::Electronics => "Electronics",
            Category::Travel => "Travel",
            Category::Beauty => "Beauty",
            Category::Entertainment => "Entertainment",
            Category::Other => "Other",
        }
    }

    /// Case-insensitive match against the category labels
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized coupon extracted from one email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRecord {
    pub brand: String,
    pub savings: String,
    pub description: String,
    pub expiration_date: NaiveDate,
    pub criteria: String,
    pub category: Category,
    pub deal_link: String,
    pub promo_code: String,
    pub brand_logo: String,
}

/// Field values as found by an extractor, before defaults are applied.
///
/// Empty strings are treated the same as missing values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CouponDraft {
    pub brand: Option<String>,
    pub savings: Option<String>,
    pub description: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub criteria: Option<String>,
    pub category: Option<Category>,
    pub deal_link: Option<String>,
    pub promo_code: Option<String>,
}

impl CouponDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply defaults and derive the logo, producing a fully populated record
    pub fn finalize(self, today: NaiveDate) -> CouponRecord {
        let brand = non_empty(self.brand).unwrap_or_else(|| DEFAULT_BRAND.to_string());
        let savings = non_empty(self.savings).unwrap_or_else(|| DEFAULT_SAVINGS.to_string());
        let description = non_empty(self.description)
            .unwrap_or_else(|| format!("{} at {}", savings, brand));
        let brand_logo = resolve_brand_logo(Some(&brand));

        CouponRecord {
            expiration_date: self.expiration_date.unwrap_or_else(|| default_expiration(today)),
            criteria: non_empty(self.criteria).unwrap_or_else(|| DEFAULT_CRITERIA.to_string()),
            category: self.category.unwrap_or_default(),
            deal_link: non_empty(self.deal_link).unwrap_or_else(|| DEFAULT_DEAL_LINK.to_string()),
            promo_code: non_empty(self.promo_code).unwrap_or_default(),
            brand,
            savings,
            description,
            brand_logo,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Raw email handed to the pipeline. At least one part is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionInput {
    pub content: String,
    pub subject: String,
}

impl ExtractionInput {
    /// Absent parts become empty strings; both empty is `NoInput`
    pub fn new(content: Option<&str>, subject: Option<&str>) -> Result<Self, ExtractionError> {
        let content = content.unwrap_or_default();
        let subject = subject.unwrap_or_default();

        if content.is_empty() && subject.is_empty() {
            return Err(ExtractionError::NoInput);
        }

        Ok(Self {
            content: content.to_string(),
            subject: subject.to_string(),
        })
    }
}
