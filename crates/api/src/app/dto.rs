use axum::Json;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use billbook_accounting::CustomerStatement;
use billbook_core::{DomainError, PeriodFilter};
use billbook_sales::ChallanId;

// -------------------------
// Request DTOs
// -------------------------

/// `?years=2024,2025&months=0,11`. Months are 0-based.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub years: Option<String>,
    pub months: Option<String>,
}

fn csv<T: std::str::FromStr>(raw: Option<&str>, what: &str) -> Result<Vec<T>, DomainError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| DomainError::validation(format!("bad {what}: {s}"))))
        .collect()
}

impl PeriodQuery {
    pub fn to_filter(&self) -> Result<PeriodFilter, DomainError> {
        let years = csv(self.years.as_deref(), "year")?;
        let months: Vec<u32> = csv(self.months.as_deref(), "month")?;
        if let Some(m) = months.iter().find(|m| **m > 11) {
            return Err(DomainError::validation(format!("month {m} out of range 0-11")));
        }
        Ok(PeriodFilter::new(years, months))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

impl DateQuery {
    pub fn or_today(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub challan_ids: Vec<ChallanId>,
    pub date: Option<NaiveDate>,
    pub gst_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest<S> {
    pub status: S,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct StatementResponse {
    #[serde(flatten)]
    pub statement: CustomerStatement,
    pub final_balance_in_words: String,
}

impl From<CustomerStatement> for StatementResponse {
    fn from(statement: CustomerStatement) -> Self {
        let final_balance_in_words = statement.final_balance_in_words();
        Self {
            statement,
            final_balance_in_words,
        }
    }
}

pub fn items<T: Serialize>(items: Vec<T>) -> Json<serde_json::Value> {
    Json(json!({ "items": items }))
}
