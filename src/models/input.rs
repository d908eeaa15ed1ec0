//! Request bodies for create and update, and their normalisation into a
//! [`QuotationDraft`].
//!
//! Browser forms send numbers either as JSON numbers or as strings, and leave
//! fields out when they are blank. Missing text becomes `""` and missing
//! numbers become `0`; a value that is present but cannot be read, whatever
//! its JSON type, is a [`ValidationError`] naming the offending field.

use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::{InstallmentFields, QuotationDraft, QuotationHeader, ServiceFields};
use crate::reconcile::Desired;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A scalar as sent by a form: a JSON number, its text, or something else
/// that is rejected once the field is read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Lenient {
    Number(f64),
    Text(String),
    Other(Value),
}

impl Lenient {
    fn as_f64(&self, field: &str) -> Result<Option<f64>, ValidationError> {
        let value = match self {
            Lenient::Number(n) => *n,
            Lenient::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(None);
                }
                text.parse::<f64>()
                    .map_err(|_| ValidationError::new(field, format!("'{text}' is not a number")))?
            }
            Lenient::Other(_) => return Err(ValidationError::new(field, "must be a number")),
        };

        if !value.is_finite() {
            return Err(ValidationError::new(field, "must be a finite number"));
        }
        Ok(Some(value))
    }
}

fn amount(value: Option<&Lenient>, field: &str) -> Result<f64, ValidationError> {
    match value {
        Some(value) => Ok(value.as_f64(field)?.unwrap_or(0.0)),
        None => Ok(0.0),
    }
}

fn whole(value: Option<&Lenient>, field: &str) -> Result<Option<i32>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let Some(number) = value.as_f64(field)? else {
        return Ok(None);
    };

    if number.fract() != 0.0 || number < f64::from(i32::MIN) || number > f64::from(i32::MAX) {
        return Err(ValidationError::new(field, "must be a whole number"));
    }
    Ok(Some(number as i32))
}

fn count(value: Option<&Lenient>, field: &str) -> Result<i32, ValidationError> {
    Ok(whole(value, field)?.unwrap_or(0))
}

/// Child row ids: absent, blank and `0` all mean "new row".
fn row_id(value: Option<&Lenient>, field: &str) -> Result<Option<i32>, ValidationError> {
    match whole(value, field)? {
        None | Some(0) => Ok(None),
        Some(id) if id < 0 => Err(ValidationError::new(field, "must be a positive id")),
        Some(id) => Ok(Some(id)),
    }
}

fn text(value: Option<Lenient>, field: &str) -> Result<String, ValidationError> {
    match value {
        None => Ok(String::new()),
        Some(Lenient::Text(text)) => Ok(text),
        Some(Lenient::Number(n)) => Ok(n.to_string()),
        Some(Lenient::Other(_)) => Err(ValidationError::new(field, "must be text")),
    }
}

fn date(value: Option<Lenient>, field: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let value = text(value, field)?;
    let text = value.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(text)
        .map(|timestamp| Some(timestamp.date_naive()))
        .map_err(|_| ValidationError::new(field, format!("'{text}' is not a date")))
}

/// Reads a list of child rows, reporting a non-list or a non-object item by
/// its path.
fn rows<T: DeserializeOwned>(value: Option<Value>, field: &str) -> Result<Vec<T>, ValidationError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::new(field, "must be a list")),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|_| ValidationError::new(format!("{field}[{index}]"), "must be an object"))
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuotationInput {
    pub name: Option<Lenient>,
    pub email: Option<Lenient>,
    pub gender: Option<Lenient>,
    pub domain: Option<Lenient>,
    pub date: Option<Lenient>,
    pub total: Option<Lenient>,
    pub total_discount: Option<Lenient>,
    pub final_amount: Option<Lenient>,
    pub total_service: Option<Lenient>,
    pub input_count: Option<Lenient>,
    pub services: Option<Value>,
    pub installments: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceInput {
    pub id: Option<Lenient>,
    #[serde(alias = "serviceName")]
    pub service: Option<Lenient>,
    pub price: Option<Lenient>,
    pub discount: Option<Lenient>,
    pub grand_total: Option<Lenient>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallmentInput {
    pub id: Option<Lenient>,
    pub label: Option<Lenient>,
    pub due_when: Option<Lenient>,
    pub installment_amount: Option<Lenient>,
}

impl ServiceInput {
    fn into_desired(self, index: usize) -> Result<Desired<ServiceFields>, ValidationError> {
        let field = |name: &str| format!("services[{index}].{name}");
        Ok(Desired {
            id: row_id(self.id.as_ref(), &field("id"))?,
            fields: ServiceFields {
                service_name: text(self.service, &field("service"))?,
                price: amount(self.price.as_ref(), &field("price"))?,
                discount: amount(self.discount.as_ref(), &field("discount"))?,
                grand_total: amount(self.grand_total.as_ref(), &field("grandTotal"))?,
            },
        })
    }
}

impl InstallmentInput {
    fn into_desired(self, index: usize) -> Result<Desired<InstallmentFields>, ValidationError> {
        let field = |name: &str| format!("installments[{index}].{name}");
        Ok(Desired {
            id: row_id(self.id.as_ref(), &field("id"))?,
            fields: InstallmentFields {
                label: text(self.label, &field("label"))?,
                due_when: text(self.due_when, &field("dueWhen"))?,
                installment_amount: amount(
                    self.installment_amount.as_ref(),
                    &field("installmentAmount"),
                )?,
            },
        })
    }
}

impl QuotationInput {
    pub fn into_draft(self) -> Result<QuotationDraft, ValidationError> {
        let header = QuotationHeader {
            date: date(self.date, "date")?,
            total: amount(self.total.as_ref(), "total")?,
            total_discount: amount(self.total_discount.as_ref(), "totalDiscount")?,
            final_amount: amount(self.final_amount.as_ref(), "finalAmount")?,
            total_service: count(self.total_service.as_ref(), "totalService")?,
            input_count: count(self.input_count.as_ref(), "inputCount")?,
            name: text(self.name, "name")?,
            email: text(self.email, "email")?,
            gender: text(self.gender, "gender")?,
            domain: text(self.domain, "domain")?,
        };

        let services = rows::<ServiceInput>(self.services, "services")?
            .into_iter()
            .enumerate()
            .map(|(index, service)| service.into_desired(index))
            .collect::<Result<Vec<_>, _>>()?;

        let installments = rows::<InstallmentInput>(self.installments, "installments")?
            .into_iter()
            .enumerate()
            .map(|(index, installment)| installment.into_desired(index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QuotationDraft {
            header,
            services,
            installments,
        })
    }
}
