//! Deterministic coupon extraction from raw email text using ordered regex tables

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::coupon::{
    parse_date, Category, CouponDraft, CouponRecord, ExtractionInput, DEFAULT_BRAND,
    DEFAULT_CRITERIA, DEFAULT_SAVINGS,
};
use crate::extract::traits::Extractor;

/// Which part of the email a rule scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Subject,
    Content,
}

/// One alternative for a field: first rule that matches wins
struct Rule {
    scan: Scan,
    regex: Regex,
    render: fn(&str) -> String,
}

impl Rule {
    fn new(scan: Scan, pattern: &str, render: fn(&str) -> String) -> Self {
        Self {
            scan,
            regex: Regex::new(pattern).unwrap(),
            render,
        }
    }

    fn capture(scan: Scan, pattern: &str) -> Self {
        Self::new(scan, pattern, |s| s.trim().to_string())
    }
}

static BRAND_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::capture(Scan::Content, r"From: ([^<\r\n]+)"),
        Rule::capture(Scan::Subject, r"From: ([^<\r\n]+)"),
        Rule::capture(Scan::Content, r"\[image: ([^\]]+)\]"),
        Rule::capture(Scan::Subject, r"([A-Za-z0-9]+):"),
    ]
});

/// Literal brand names looked for in the body when no rule matched
const KNOWN_BRANDS: &[&str] = &["Postmates", "Uber"];

static SAVINGS_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(Scan::Subject, r"\$(\d+) off", |n| format!("${} off", n)),
        Rule::new(Scan::Content, r"\$(\d+) off", |n| format!("${} off", n)),
        Rule::new(Scan::Subject, r"(\d+)% off", |n| format!("{}% off", n)),
        Rule::new(Scan::Content, r"(\d+)% off", |n| format!("{}% off", n)),
    ]
});

static PROMO_CODE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::capture(Scan::Content, r"(?i)code\s+\*?([A-Z0-9]+)\*?"),
        Rule::capture(Scan::Content, r"(?i)promo\s+code\s+\*?([A-Z0-9]+)\*?"),
    ]
});

static EXPIRATION_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::capture(Scan::Content, r"Expires\s+on\s+([A-Za-z]+\s+\d+,\s+\d{4})"),
        Rule::capture(Scan::Content, r"Expires\s+([A-Za-z]+\s+\d+)"),
        Rule::capture(Scan::Content, r"Valid\s+until\s+([A-Za-z]+\s+\d+)"),
    ]
});

static MIN_PURCHASE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::capture(Scan::Content, r"\$(\d+)\s+and\s+over"),
        Rule::capture(Scan::Content, r"\$(\d+)\+"),
        Rule::capture(Scan::Content, r"\$(\d+)\s+minimum"),
        Rule::capture(Scan::Content, r"(?i)minimum\s+\$(\d+)"),
    ]
});

static DEAL_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"https?://[^\s<>"]+"#).unwrap());

static RESTRICTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Applies to orders \$\d+ and over[^.]+").unwrap());

/// Raw per-field matches, before criteria/description are assembled
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HeuristicMatches {
    pub brand: Option<String>,
    pub savings: Option<String>,
    pub promo_code: Option<String>,
    pub expiration_text: Option<String>,
    pub expiration_date: Option<NaiveDate>,
    pub min_purchase: Option<String>,
    pub deal_link: Option<String>,
    pub restriction: Option<String>,
    pub notes: Vec<String>,
}

impl HeuristicMatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_note(&mut self, note: &str) {
        self.notes.push(note.to_string());
    }
}

/// Regex/heuristic extractor. Total: every input yields a record.
#[derive(Debug, Clone, Default)]
pub struct HeuristicExtractor {
    reference_date: Option<NaiveDate>,
}

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin "today" so the 30-day expiry default is reproducible
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Extract a coupon record from subject and body
    pub fn extract_record(&self, content: &str, subject: &str) -> CouponRecord {
        let matches = match_fields(content, subject);
        tracing::debug!("Heuristic matches: {:?}", matches.notes);
        build_record(&matches, self.today())
    }
}

#[async_trait]
impl Extractor for HeuristicExtractor {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn extract(&self, input: &ExtractionInput) -> Result<Option<CouponRecord>> {
        Ok(Some(self.extract_record(&input.content, &input.subject)))
    }
}

/// Run every field's rule table independently over the email
pub fn match_fields(content: &str, subject: &str) -> HeuristicMatches {
    let mut result = HeuristicMatches::new();

    result.brand = first_match(&BRAND_RULES, content, subject).or_else(|| {
        KNOWN_BRANDS
            .iter()
            .find(|name| content.contains(*name))
            .map(|name| name.to_string())
    });
    if result.brand.is_some() {
        result.add_note("Brand extracted");
    }

    result.savings = first_match(&SAVINGS_RULES, content, subject);
    if result.savings.is_some() {
        result.add_note("Savings extracted");
    }

    result.promo_code = first_match(&PROMO_CODE_RULES, content, subject);
    if result.promo_code.is_some() {
        result.add_note("Promo code extracted");
    }

    result.expiration_text = first_match(&EXPIRATION_RULES, content, subject);
    result.expiration_date = result.expiration_text.as_deref().and_then(parse_date);
    if let Some(text) = result.expiration_text.clone() {
        if result.expiration_date.is_some() {
            result.add_note("Expiration date extracted");
        } else {
            result.add_note(&format!("Unparsable expiration text: {}", text));
        }
    }

    result.min_purchase = first_match(&MIN_PURCHASE_RULES, content, subject);
    if result.min_purchase.is_some() {
        result.add_note("Minimum purchase extracted");
    }

    result.deal_link = DEAL_LINK.find(content).map(|m| m.as_str().to_string());
    if result.deal_link.is_some() {
        result.add_note("Deal link extracted");
    }

    result.restriction = RESTRICTION.find(content).map(|m| m.as_str().to_string());

    result
}

fn first_match(rules: &[Rule], content: &str, subject: &str) -> Option<String> {
    rules.iter().find_map(|rule| {
        let haystack = match rule.scan {
            Scan::Subject => subject,
            Scan::Content => content,
        };
        let caps = rule.regex.captures(haystack)?;
        let value = (rule.render)(caps.get(1)?.as_str());
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

/// Assemble criteria, description and category from the raw matches
fn build_record(matches: &HeuristicMatches, today: NaiveDate) -> CouponRecord {
    let brand = matches.brand.clone().unwrap_or_else(|| DEFAULT_BRAND.to_string());
    let savings = matches
        .savings
        .clone()
        .unwrap_or_else(|| DEFAULT_SAVINGS.to_string());

    let mut criteria = match &matches.promo_code {
        Some(code) => format!("Use code: {}", code),
        None => DEFAULT_CRITERIA.to_string(),
    };
    if let Some(min) = &matches.min_purchase {
        criteria.push_str(&format!(". Minimum purchase: ${}", min));
    }
    if let Some(restriction) = &matches.restriction {
        criteria.push_str(&format!(". {}", restriction));
    }

    let mut description = savings.clone();
    if let Some(min) = &matches.min_purchase {
        description.push_str(&format!(" on orders over ${}", min));
    }
    description.push_str(&format!(" at {}", brand));

    CouponDraft {
        category: Some(categorize(&brand)),
        brand: Some(brand),
        savings: Some(savings),
        description: Some(description),
        expiration_date: matches.expiration_date,
        criteria: Some(criteria),
        deal_link: matches.deal_link.clone(),
        promo_code: matches.promo_code.clone(),
    }
    .finalize(today)
}

/// Only food delivery brands are recognised; everything else is Other
fn categorize(brand: &str) -> Category {
    if brand == "Postmates" || brand == "Uber Eats" || brand.contains("Food") {
        Category::FoodAndGrocery
    } else {
        Category::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> HeuristicExtractor {
        HeuristicExtractor::new().with_reference_date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
    }

    #[test]
    fn test_nike_scenario() {
        let record = extractor().extract_record(
            "Use code SAVE20 at checkout. Expires on June 15, 2025. $20 and over",
            "Nike: $20 off",
        );

        assert_eq!(record.brand, "Nike");
        assert_eq!(record.savings, "$20 off");
        assert_eq!(record.promo_code, "SAVE20");
        assert_eq!(record.expiration_date, NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        assert!(record.criteria.contains("Use code: SAVE20"));
        assert!(record.criteria.contains("Minimum purchase: $20"));
        assert_eq!(record.description, "$20 off on orders over $20 at Nike");
        assert_eq!(record.category, Category::Other);
        assert_eq!(record.deal_link, "#");
        assert_eq!(record.brand_logo, "https://logo.clearbit.com/nike.com");
    }

    #[test]
    fn test_defaults_for_plain_text() {
        let record = extractor().extract_record("Thanks for being a customer.", "");

        assert_eq!(record.brand, "Unknown");
        assert_eq!(record.savings, "Special Offer");
        assert_eq!(record.description, "Special Offer at Unknown");
        assert_eq!(record.criteria, "Received via email");
        assert_eq!(record.promo_code, "");
        assert_eq!(record.expiration_date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(record.brand_logo, "https://via.placeholder.com/80?text=Brand");
    }

    #[test]
    fn test_brand_rule_order() {
        // body From: beats subject prefix
        let m = match_fields("From: Adidas <deals@adidas.com>\nbig sale", "Nike: sale");
        assert_eq!(m.brand.as_deref(), Some("Adidas"));

        let m = match_fields("[image: Sephora]\nnew arrivals", "Weekly: picks");
        assert_eq!(m.brand.as_deref(), Some("Sephora"));

        let m = match_fields("no sender here", "Target: deals inside");
        assert_eq!(m.brand.as_deref(), Some("Target"));

        let m = match_fields("Your Uber ride credit", "hello");
        assert_eq!(m.brand.as_deref(), Some("Uber"));

        let m = match_fields("Postmates and Uber both deliver", "hello");
        assert_eq!(m.brand.as_deref(), Some("Postmates"));
    }

    #[test]
    fn test_savings_prefers_dollar_over_percent() {
        let m = match_fields("Take 15% off everything", "Get $10 off");
        assert_eq!(m.savings.as_deref(), Some("$10 off"));

        let m = match_fields("Take 15% off everything", "Sale");
        assert_eq!(m.savings.as_deref(), Some("15% off"));
    }

    #[test]
    fn test_promo_code_with_asterisks() {
        let m = match_fields("Enter promo code *WELCOME5* today", "");
        assert_eq!(m.promo_code.as_deref(), Some("WELCOME5"));
    }

    #[test]
    fn test_unparsable_expiry_falls_back() {
        let record = extractor().extract_record("Valid until Funday 99", "");
        assert_eq!(record.expiration_date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
    }

    #[test]
    fn test_min_purchase_variants() {
        assert_eq!(match_fields("orders $35+ ship free", "").min_purchase.as_deref(), Some("35"));
        assert_eq!(match_fields("$25 minimum applies", "").min_purchase.as_deref(), Some("25"));
        assert_eq!(match_fields("Minimum $50 order", "").min_purchase.as_deref(), Some("50"));
    }

    #[test]
    fn test_deal_link_and_restriction() {
        let record = extractor().extract_record(
            "From: Postmates <hi@postmates.com>\nGet $5 off. Applies to orders $15 and over in select cities. Order at https://postmates.com/promo?x=1 now",
            "",
        );

        assert_eq!(record.brand, "Postmates");
        assert_eq!(record.category, Category::FoodAndGrocery);
        assert_eq!(record.deal_link, "https://postmates.com/promo?x=1");
        assert_eq!(
            record.criteria,
            "Received via email. Minimum purchase: $15. Applies to orders $15 and over in select cities"
        );
    }

    #[test]
    fn test_food_brand_category() {
        assert_eq!(categorize("Whole Foods"), Category::FoodAndGrocery);
        assert_eq!(categorize("Uber Eats"), Category::FoodAndGrocery);
        assert_eq!(categorize("Uber"), Category::Other);
    }

    #[test]
    fn test_idempotent() {
        let ex = extractor();
        let a = ex.extract_record("Use code ABC. $10 off", "Gap: deal");
        let b = ex.extract_record("Use code ABC. $10 off", "Gap: deal");
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[tokio::test]
    async fn test_extractor_trait_never_declines() {
        let input = ExtractionInput::new(Some("anything"), None).unwrap();
        let record = extractor().extract(&input).await.unwrap();
        assert!(record.is_some());
    }
}
