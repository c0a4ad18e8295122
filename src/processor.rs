use rand::Rng;
use serde::{Deserialize, Serialize};
use simd_json::owned::Object;
use simd_json::OwnedValue;
use tracing::{info, warn};

/// Fields every recommendation carries after processing.
pub const REQUIRED_FIELDS: [&str; 5] = ["title", "author", "isbn", "genre", "reason"];

/// Field the processor adds to every record.
pub const AVAILABILITY_FIELD: &str = "is_in_store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Availability {
    #[serde(rename = "✅")]
    InStock,
    #[serde(rename = "❌")]
    OutOfStock,
}

impl Availability {
    pub fn marker(self) -> &'static str {
        match self {
            Availability::InStock => "✅",
            Availability::OutOfStock => "❌",
        }
    }
}

/// Decides whether a recommended book can be found in the store.
pub trait StockCheck: Send + Sync {
    fn check(&self, record: &Object) -> Availability;
}

/// Stand-in for a real inventory: marks a record in stock with a fixed probability.
#[derive(Debug, Clone, Copy)]
pub struct RandomStock {
    in_stock_ratio: f64,
}

impl RandomStock {
    pub const DEFAULT_RATIO: f64 = 0.75;

    /// Ratios outside `0.0..=1.0` are clamped; NaN falls back to the default.
    pub fn new(in_stock_ratio: f64) -> Self {
        let in_stock_ratio = if in_stock_ratio.is_nan() {
            warn!("In-stock ratio is NaN, using {}", Self::DEFAULT_RATIO);
            Self::DEFAULT_RATIO
        } else {
            in_stock_ratio.clamp(0.0, 1.0)
        };
        Self { in_stock_ratio }
    }

    pub fn ratio(&self) -> f64 {
        self.in_stock_ratio
    }
}

impl Default for RandomStock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RATIO)
    }
}

impl StockCheck for RandomStock {
    fn check(&self, _record: &Object) -> Availability {
        if rand::thread_rng().gen_bool(self.in_stock_ratio) {
            Availability::InStock
        } else {
            Availability::OutOfStock
        }
    }
}

/// Always answers the same.
#[derive(Debug, Clone, Copy)]
pub struct FixedStock(pub Availability);

impl StockCheck for FixedStock {
    fn check(&self, _record: &Object) -> Availability {
        self.0
    }
}

/// Fills in missing recommendation fields and tags each record with its availability.
pub struct RecordProcessor {
    stock: Box<dyn StockCheck>,
}

impl RecordProcessor {
    pub fn new(stock: impl StockCheck + 'static) -> Self {
        Self {
            stock: Box::new(stock),
        }
    }

    /// Values that are not objects are returned unchanged. Objects get an empty
    /// string for each missing required field, then the availability marker.
    /// Extra fields pass through untouched.
    pub fn process(&self, record: OwnedValue) -> OwnedValue {
        let mut fields = match record {
            OwnedValue::Object(fields) => fields,
            other => return other,
        };
        for field in REQUIRED_FIELDS {
            if !fields.contains_key(field) {
                fields.insert(field.to_string(), OwnedValue::from(""));
            }
        }
        let availability = self.stock.check(&fields);
        fields.insert(AVAILABILITY_FIELD.to_string(), OwnedValue::from(availability.marker()));

        info!(
            "📚 {} by {}",
            display_field(fields.get("title")),
            display_field(fields.get("author"))
        );
        OwnedValue::Object(fields)
    }
}

impl Default for RecordProcessor {
    fn default() -> Self {
        Self::new(RandomStock::default())
    }
}

pub(crate) fn display_field(value: Option<&OwnedValue>) -> String {
    match value {
        Some(OwnedValue::String(text)) => text.clone(),
        Some(other) => simd_json::to_string(other).unwrap_or_default(),
        None => String::new(),
    }
}

/// Typed view of a processed record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Book {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub reason: String,
    #[serde(rename = "is_in_store", default)]
    pub availability: Option<Availability>,
}

impl Book {
    pub fn from_record(record: OwnedValue) -> Result<Self, simd_json::Error> {
        simd_json::serde::from_owned_value(record)
    }
}
