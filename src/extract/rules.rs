//! Extraction rule tables
//!
//! Rules are ordered CSS selector lists. They live in a TOML file that is
//! reread at the start of every run, so stale selectors can be fixed without
//! rebuilding. When no file is configured the built-in tables below apply.

use crate::storage::{
    DATE_MAX_CHARS, LOCATION_MAX_CHARS, ORGANIZER_MAX_CHARS, PRICE_MAX_CHARS, TITLE_MAX_CHARS,
};
use crate::RuleError;
use scraper::Selector;
use serde::Deserialize;
use std::path::Path;

/// On-disk form of the extraction rules
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RuleConfig {
    /// Stored as the title when no title rule matches
    pub missing_title: String,

    /// Stored for every other field no rule matches
    pub missing_value: String,

    pub listing: ListingRuleConfig,

    pub detail: DetailRuleConfig,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            missing_title: "Unknown".to_string(),
            missing_value: String::new(),
            listing: ListingRuleConfig::default(),
            detail: DetailRuleConfig::default(),
        }
    }
}

/// Listing page rules
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ListingRuleConfig {
    /// Card selectors, tried in order; the first one matching anything wins for the page
    pub cards: Vec<String>,

    /// Heading-like elements inside a card
    pub title: String,

    /// Heading-like elements inside the card's parent, used when the card has none
    pub parent_title: String,

    /// Path fragment every event link contains
    pub item_link_marker: String,

    /// Shortest absolute event link accepted
    pub min_link_length: usize,
}

impl Default for ListingRuleConfig {
    fn default() -> Self {
        Self {
            cards: strings(&[
                r#"a[data-testid="event-card-link"]"#,
                "a.event-card-link",
                r#"a[href*="/e/"]"#,
                ".event-card a",
                r#"[data-testid="event-listing-card"] a"#,
                r#"article a[href*="/e/"]"#,
                ".search-event-card-wrapper a",
                r#"div[data-testid*="event"] a[href*="/e/"]"#,
            ]),
            title: r#"h3, h2, .event-card__title, [data-testid="event-title"], .event-title"#
                .to_string(),
            parent_title: r#"h1, h2, h3, h4, .title, [class*="title"]"#.to_string(),
            item_link_marker: "/e/".to_string(),
            min_link_length: 21,
        }
    }
}

/// One field's ordered selectors and length cap
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldRuleConfig {
    pub selectors: Vec<String>,
    #[serde(default)]
    pub max_length: Option<usize>,
}

impl FieldRuleConfig {
    fn new(selectors: &[&str], max_length: usize) -> Self {
        Self {
            selectors: strings(selectors),
            max_length: Some(max_length),
        }
    }
}

/// Detail page rules, one table per field
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetailRuleConfig {
    pub title: FieldRuleConfig,
    pub date: FieldRuleConfig,
    pub location: FieldRuleConfig,
    pub description: FieldRuleConfig,
    pub organizer: FieldRuleConfig,
    pub price: FieldRuleConfig,
}

impl Default for DetailRuleConfig {
    fn default() -> Self {
        Self {
            title: FieldRuleConfig::new(
                &[
                    r#"h1[data-testid="event-title"]"#,
                    "h1.event-title",
                    "h1.css-0",
                    "h1",
                    ".event-title h1",
                    r#"[data-testid*="title"] h1"#,
                    "header h1",
                ],
                TITLE_MAX_CHARS,
            ),
            date: FieldRuleConfig::new(
                &[
                    r#"[data-testid="event-start-date"]"#,
                    ".date-info__full-datetime",
                    "time",
                    ".event-details__data",
                    r#"[class*="date"]"#,
                    r#"[data-testid*="date"]"#,
                    ".event-date",
                ],
                DATE_MAX_CHARS,
            ),
            location: FieldRuleConfig::new(
                &[
                    r#"[data-testid="event-venue"]"#,
                    ".location-info__address-text",
                    ".venue-name",
                    r#"[class*="location"]"#,
                    r#"[data-testid*="venue"]"#,
                    ".event-location",
                ],
                LOCATION_MAX_CHARS,
            ),
            description: FieldRuleConfig::new(
                &[
                    r#"[data-testid="event-description"]"#,
                    ".event-description",
                    ".eds-text--left",
                    ".description-content",
                    r#"[class*="description"]"#,
                    ".event-details .description",
                ],
                10_000,
            ),
            organizer: FieldRuleConfig::new(
                &[
                    r#"[data-testid="organizer-name"]"#,
                    ".descriptive-organizer-info-mobile__name-link",
                    ".organizer-name",
                    r#"a[href*="/o/"]"#,
                    r#"[class*="organizer"] a"#,
                    ".event-organizer",
                ],
                ORGANIZER_MAX_CHARS,
            ),
            price: FieldRuleConfig::new(
                &[
                    r#"[data-testid="ticket-price"]"#,
                    ".CondensedConversionBar-module__priceTag___3AnIu",
                    ".ticket-price",
                    ".price",
                    r#"[class*="price"]"#,
                    ".ticket-info .price",
                ],
                PRICE_MAX_CHARS,
            ),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A compiled selector together with its source text
#[derive(Debug, Clone)]
pub struct Rule {
    pub source: String,
    pub selector: Selector,
}

impl Rule {
    pub fn parse(field: &str, source: &str) -> Result<Self, RuleError> {
        let selector = Selector::parse(source).map_err(|_| RuleError::InvalidSelector {
            field: field.to_string(),
            selector: source.to_string(),
        })?;

        Ok(Self {
            source: source.to_string(),
            selector,
        })
    }
}

/// Compiled rules for one record field
#[derive(Debug, Clone)]
pub struct FieldRules {
    pub rules: Vec<Rule>,
    pub max_length: Option<usize>,
}

impl FieldRules {
    pub fn compile(field: &str, config: &FieldRuleConfig) -> Result<Self, RuleError> {
        Ok(Self {
            rules: compile_list(field, &config.selectors)?,
            max_length: config.max_length,
        })
    }

    /// [`FieldRules::compile`] for a field stored in a length-checked column
    ///
    /// A missing `max-length` takes the column's limit; a larger one is
    /// rejected, since every value truncated to it could still fail the insert.
    pub fn compile_capped(
        field: &str,
        config: &FieldRuleConfig,
        column_limit: usize,
    ) -> Result<Self, RuleError> {
        let max_length = match config.max_length {
            Some(max) if max > column_limit => {
                return Err(RuleError::MaxLengthTooLarge {
                    field: field.to_string(),
                    max_length: max,
                    limit: column_limit,
                })
            }
            Some(max) => max,
            None => column_limit,
        };

        Ok(Self {
            rules: compile_list(field, &config.selectors)?,
            max_length: Some(max_length),
        })
    }
}

/// Compiled listing page rules
#[derive(Debug, Clone)]
pub struct ListingRules {
    pub cards: Vec<Rule>,
    pub title: Selector,
    pub parent_title: Selector,
    pub item_link_marker: String,
    pub min_link_length: usize,
}

/// Compiled detail page rules
#[derive(Debug, Clone)]
pub struct DetailRules {
    pub title: FieldRules,
    pub date: FieldRules,
    pub location: FieldRules,
    pub description: FieldRules,
    pub organizer: FieldRules,
    pub price: FieldRules,
}

/// Everything the scanners need, compiled and ready to evaluate
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    pub listing: ListingRules,
    pub detail: DetailRules,
    pub missing_title: String,
    pub missing_value: String,
}

impl RuleConfig {
    /// Compiles every selector, failing on the first invalid one
    pub fn compile(&self) -> Result<ExtractionRules, RuleError> {
        let listing = ListingRules {
            cards: compile_list("listing.cards", &self.listing.cards)?,
            title: Rule::parse("listing.title", &self.listing.title)?.selector,
            parent_title: Rule::parse("listing.parent-title", &self.listing.parent_title)?
                .selector,
            item_link_marker: self.listing.item_link_marker.clone(),
            min_link_length: self.listing.min_link_length,
        };

        let detail = DetailRules {
            title: FieldRules::compile_capped("detail.title", &self.detail.title, TITLE_MAX_CHARS)?,
            date: FieldRules::compile_capped("detail.date", &self.detail.date, DATE_MAX_CHARS)?,
            location: FieldRules::compile_capped(
                "detail.location",
                &self.detail.location,
                LOCATION_MAX_CHARS,
            )?,
            description: FieldRules::compile("detail.description", &self.detail.description)?,
            organizer: FieldRules::compile_capped(
                "detail.organizer",
                &self.detail.organizer,
                ORGANIZER_MAX_CHARS,
            )?,
            price: FieldRules::compile_capped("detail.price", &self.detail.price, PRICE_MAX_CHARS)?,
        };

        Ok(ExtractionRules {
            listing,
            detail,
            missing_title: self.missing_title.clone(),
            missing_value: self.missing_value.clone(),
        })
    }
}

fn compile_list(field: &str, sources: &[String]) -> Result<Vec<Rule>, RuleError> {
    if sources.is_empty() {
        return Err(RuleError::EmptyRuleList(field.to_string()));
    }

    sources.iter().map(|s| Rule::parse(field, s)).collect()
}

/// Loads and compiles rules from a TOML file, or the built-in tables when no
/// path is given
///
/// Tables missing from the file keep their built-in defaults.
pub fn load_rules(path: Option<&Path>) -> Result<ExtractionRules, RuleError> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let config: RuleConfig = toml::from_str(&content)?;
            tracing::info!("Loaded extraction rules from {}", path.display());
            config
        }
        None => RuleConfig::default(),
    };

    config.compile()
}
