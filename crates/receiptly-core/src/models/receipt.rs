//! Receipt records: best-effort parsing of vision-model output and strict
//! validation of user-confirmed edits.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::AppError;

/// Merchant used when the model output names none.
pub const UNKNOWN_MERCHANT: &str = "Unknown";

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Extracted or user-confirmed purchase facts.
///
/// `total` is non-negative with two decimal places and `currency_code` is
/// always a 3-letter uppercase code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReceiptRecord {
    pub merchant: String,
    #[schema(value_type = f64, example = 23.5)]
    pub total: Decimal,
    #[schema(example = "EUR")]
    pub currency_code: String,
    #[schema(value_type = String, example = "2024-03-01T10:00:00")]
    pub date: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A parsed model response together with the fields that fell back to defaults.
#[derive(Debug, Clone)]
pub struct ParsedReceipt {
    pub record: ReceiptRecord,
    pub defaulted_fields: Vec<&'static str>,
}

impl ReceiptRecord {
    /// Parse untrusted model output into a record.
    ///
    /// Never fails: unparseable output or missing fields degrade to
    /// `merchant = "Unknown"`, `total = 0`, `currency_code = fallback_currency`,
    /// `date = now`, and no category or notes.
    pub fn from_model_output(
        raw: &str,
        fallback_currency: &str,
        now: NaiveDateTime,
    ) -> ParsedReceipt {
        let fields = match serde_json::from_str::<Value>(strip_code_fences(raw)) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        let mut defaulted_fields = Vec::new();

        let merchant = match non_empty_str(fields.get("merchant")) {
            Some(merchant) => merchant,
            None => {
                defaulted_fields.push("merchant");
                UNKNOWN_MERCHANT.to_string()
            }
        };

        let total = match fields.get("total").and_then(lenient_amount) {
            Some(total) if !total.is_sign_negative() => round_cents(total),
            _ => {
                defaulted_fields.push("total");
                Decimal::ZERO
            }
        };

        let currency_code = match fields
            .get("currency_code")
            .or_else(|| fields.get("currencyCode"))
            .and_then(Value::as_str)
            .and_then(normalize_currency)
        {
            Some(code) => code,
            None => {
                defaulted_fields.push("currency_code");
                fallback_currency.to_string()
            }
        };

        let date = match fields
            .get("date")
            .and_then(Value::as_str)
            .and_then(parse_receipt_date)
        {
            Some(date) => date,
            None => {
                defaulted_fields.push("date");
                now
            }
        };

        ParsedReceipt {
            record: ReceiptRecord {
                merchant,
                total,
                currency_code,
                date,
                category: non_empty_str(fields.get("category")),
                notes: non_empty_str(fields.get("notes")),
            },
            defaulted_fields,
        }
    }
}

/// User-editable form of a receipt, validated before it can become a
/// [`ReceiptRecord`].
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReceiptDraft {
    #[serde(default)]
    pub merchant: String,
    #[serde(default, deserialize_with = "amount_text")]
    #[schema(value_type = String, example = "23.50")]
    pub total: String,
    #[serde(default, alias = "currencyCode")]
    pub currency_code: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReceiptDraft {
    /// Validate the draft; every problem is reported in one `Validation` error.
    pub fn validate(&self, fallback_currency: &str) -> Result<ReceiptRecord, AppError> {
        let mut problems = Vec::new();

        let merchant = self.merchant.trim();
        if merchant.is_empty() {
            problems.push("merchant must not be empty".to_string());
        }

        let total = match parse_amount(&self.total) {
            Some(total) if total.is_sign_negative() && !total.is_zero() => {
                problems.push("total must not be negative".to_string());
                None
            }
            Some(total) => Some(round_cents(total.abs())),
            None => {
                problems.push(format!("total '{}' is not a number", self.total.trim()));
                None
            }
        };

        let currency_code = if self.currency_code.trim().is_empty() {
            Some(fallback_currency.to_string())
        } else {
            let code = normalize_currency(&self.currency_code);
            if code.is_none() {
                problems.push(format!(
                    "currency_code '{}' is not a 3-letter code",
                    self.currency_code.trim()
                ));
            }
            code
        };

        let date = parse_receipt_date(&self.date);
        if date.is_none() {
            problems.push(format!("date '{}' is not a valid date", self.date.trim()));
        }

        match (total, currency_code, date) {
            (Some(total), Some(currency_code), Some(date)) if problems.is_empty() => {
                Ok(ReceiptRecord {
                    merchant: merchant.to_string(),
                    total,
                    currency_code,
                    date,
                    category: trimmed(self.category.as_deref()),
                    notes: trimmed(self.notes.as_deref()),
                })
            }
            _ => Err(AppError::Validation(problems.join("; "))),
        }
    }
}

impl From<&ReceiptRecord> for ReceiptDraft {
    fn from(record: &ReceiptRecord) -> Self {
        ReceiptDraft {
            merchant: record.merchant.clone(),
            total: format!("{:.2}", record.total),
            currency_code: record.currency_code.clone(),
            date: record.date.format("%Y-%m-%dT%H:%M:%S").to_string(),
            category: record.category.clone(),
            notes: record.notes.clone(),
        }
    }
}

fn amount_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "total must be a number or a string, got {}",
            other
        ))),
    }
}

/// Remove a surrounding ```json (or bare ```) fence from model output.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a receipt date in any of the accepted formats.
///
/// Dates without a time are placed at midnight. RFC 3339 values keep their
/// local wall-clock time.
pub fn parse_receipt_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Some(parsed) = DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(parsed);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_local())
}

/// Parse a decimal amount.
///
/// The right-most `.` or `,` is the decimal separator; any other `.` or `,`
/// is a thousands separator and dropped, so `1.234,56` and `1,234.56` agree.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw: String = raw.trim().chars().filter(|c| !c.is_whitespace()).collect();
    if raw.is_empty() {
        return None;
    }
    let normalized = match raw.rfind(['.', ',']) {
        Some(pos) => format!(
            "{}.{}",
            raw[..pos].replace(['.', ','], ""),
            &raw[pos + 1..]
        ),
        None => raw,
    };
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

fn lenient_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_amount(&n.to_string()),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
                .collect();
            parse_amount(&cleaned)
        }
        _ => None,
    }
}

fn normalize_currency(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    (code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())).then_some(code)
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    trimmed(value.and_then(Value::as_str))
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
