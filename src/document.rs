//! Document wire schema for the registration endpoint.
//!
//! Field names on the wire are fixed by the remote API and mix casing
//! conventions (`importRequest`, `participantInn` next to `doc_id`). Every
//! field carries its wire name explicitly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A document submitted for registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "description")]
    pub description: Description,

    #[serde(rename = "doc_id")]
    pub doc_id: String,

    #[serde(rename = "doc_status")]
    pub doc_status: String,

    #[serde(rename = "doc_type")]
    pub doc_type: String,

    #[serde(rename = "importRequest")]
    pub import_request: bool,

    #[serde(rename = "owner_inn")]
    pub owner_inn: String,

    #[serde(rename = "participant_inn")]
    pub participant_inn: String,

    #[serde(rename = "producer_inn")]
    pub producer_inn: String,

    #[serde(rename = "production_date", with = "wire_date")]
    pub production_date: NaiveDate,

    #[serde(rename = "production_type")]
    pub production_type: String,

    /// Always present on the wire, `[]` when empty
    #[serde(rename = "products")]
    pub products: Vec<Product>,

    #[serde(rename = "reg_date", with = "wire_date")]
    pub reg_date: NaiveDate,

    #[serde(rename = "reg_number")]
    pub reg_number: String,
}

/// Document description block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(rename = "participantInn")]
    pub participant_inn: String,
}

/// A single product entry of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "certificate_document")]
    pub certificate_document: String,

    #[serde(rename = "certificate_document_date", with = "wire_date")]
    pub certificate_document_date: NaiveDate,

    #[serde(rename = "certificate_document_number")]
    pub certificate_document_number: String,

    #[serde(rename = "owner_inn")]
    pub owner_inn: String,

    #[serde(rename = "producer_inn")]
    pub producer_inn: String,

    #[serde(rename = "production_date", with = "wire_date")]
    pub production_date: NaiveDate,

    #[serde(rename = "tnved_code")]
    pub tnved_code: String,

    #[serde(rename = "uit_code")]
    pub uit_code: String,

    #[serde(rename = "uitu_code")]
    pub uitu_code: String,
}

impl Document {
    /// Encode to the wire JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from wire JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// A filled-in document for demos and smoke tests.
    pub fn sample() -> Self {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();

        Self {
            description: Description {
                participant_inn: "123456789".to_string(),
            },
            doc_id: "doc123".to_string(),
            doc_status: "NEW".to_string(),
            doc_type: "LP_INTRODUCE_GOODS".to_string(),
            import_request: true,
            owner_inn: "123456789".to_string(),
            participant_inn: "987654321".to_string(),
            producer_inn: "456123789".to_string(),
            production_date: date(2023, 1, 23),
            production_type: "type1".to_string(),
            products: vec![Product {
                certificate_document: "cert123".to_string(),
                certificate_document_date: date(2023, 1, 20),
                certificate_document_number: "cert12345".to_string(),
                owner_inn: "123456789".to_string(),
                producer_inn: "456123789".to_string(),
                production_date: date(2023, 1, 23),
                tnved_code: "1001".to_string(),
                uit_code: "uit12345".to_string(),
                uitu_code: "uitu67890".to_string(),
            }],
            reg_date: date(2023, 1, 25),
            reg_number: "reg123".to_string(),
        }
    }
}

/// `yyyy-MM-dd` date strings.
mod wire_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(de::Error::custom)
    }
}
