//! Brand name → logo URL

use url::Url;

use crate::coupon::record::DEFAULT_BRAND;

pub const PLACEHOLDER_LOGO_URL: &str = "https://via.placeholder.com/80?text=Brand";
const LOGO_SERVICE_BASE: &str = "https://logo.clearbit.com";
const AVATAR_SERVICE_BASE: &str = "https://ui-avatars.com/api/";

/// Resolve a deterministic logo URL for a brand. Never fails.
pub fn resolve_brand_logo(brand: Option<&str>) -> String {
    let brand = match brand {
        Some(b) if !b.is_empty() && b != DEFAULT_BRAND => b,
        _ => return PLACEHOLDER_LOGO_URL.to_string(),
    };

    let cleaned = clean_brand_name(brand);

    if cleaned.is_empty() {
        return avatar_url(brand);
    }

    // cleaned is ASCII alphanumeric, nothing left to escape
    format!("{}/{}.com", LOGO_SERVICE_BASE, cleaned)
}

/// Lower-case and keep only ASCII letters and digits
pub fn clean_brand_name(brand: &str) -> String {
    brand
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

fn avatar_url(brand: &str) -> String {
    match Url::parse_with_params(AVATAR_SERVICE_BASE, &[("name", brand), ("size", "80")]) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::debug!("Failed to build avatar URL for {:?}: {}", brand, e);
            PLACEHOLDER_LOGO_URL.to_string()
        }
    }
}
