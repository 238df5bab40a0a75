// src/domain/listing.rs

use crate::domain::decimal::Decimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An auction offer as delivered by the upstream snapshot, flattened and ready for comparison.
///
/// Equality covers every attribute; there are no bookkeeping fields on this type, so two
/// snapshots of the same offer compare equal exactly when nothing the user can filter on changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub source_id: String,

    // Location
    pub uf: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub address: String,

    // Details
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub selling_type: String,

    // Pricing
    #[serde(default)]
    pub asking_price: Decimal,
    #[serde(default)]
    pub evaluation_price: Decimal,
    #[serde(default)]
    pub discount_percent: Decimal,
}

impl Listing {
    /// Trims text fields and upper-cases the region code.
    ///
    /// Rejects listings that cannot be identified or partitioned.
    pub fn normalized(mut self) -> Result<Self, String> {
        self.source_id = self.source_id.trim().to_string();
        if self.source_id.is_empty() {
            return Err("Missing or empty source id".to_string());
        }

        self.uf = self.uf.trim().to_uppercase();
        if self.uf.is_empty() {
            return Err(format!("Missing uf for offer {}", self.source_id));
        }

        for field in [
            &mut self.city,
            &mut self.neighborhood,
            &mut self.address,
            &mut self.description,
            &mut self.property_type,
            &mut self.selling_type,
        ] {
            *field = field.trim().to_string();
        }

        Ok(self)
    }
}

/// An active offer as served by the read API: the latest version plus its head bookkeeping.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentOffer {
    pub version: i64,
    #[serde(flatten)]
    pub listing: Listing,
    pub created_at: NaiveDateTime,
    pub last_seen_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_trims_and_uppercases() {
        let listing = Listing {
            source_id: "  8555500012345 ".to_string(),
            uf: " sp".to_string(),
            city: "SAO PAULO ".to_string(),
            neighborhood: String::new(),
            address: "RUA A, 10".to_string(),
            description: String::new(),
            property_type: "Casa".to_string(),
            selling_type: "Venda Online".to_string(),
            asking_price: Decimal::from_int(100_000).unwrap(),
            evaluation_price: Decimal::from_int(150_000).unwrap(),
            discount_percent: Decimal::parse("33.33").unwrap(),
        };

        let normalized = listing.normalized().unwrap();
        assert_eq!(normalized.source_id, "8555500012345");
        assert_eq!(normalized.uf, "SP");
        assert_eq!(normalized.city, "SAO PAULO");
    }

    #[test]
    fn normalized_rejects_missing_identity() {
        let listing: Listing =
            serde_json::from_str(r#"{"sourceId": " ", "uf": "SP"}"#).unwrap();
        assert!(listing.normalized().is_err());

        let listing: Listing =
            serde_json::from_str(r#"{"sourceId": "1", "uf": ""}"#).unwrap();
        assert!(listing.normalized().is_err());
    }

    #[test]
    fn equality_is_by_numeric_value() {
        let a: Listing = serde_json::from_str(
            r#"{"sourceId": "1", "uf": "RJ", "askingPrice": "1500.50"}"#,
        )
        .unwrap();
        let b: Listing =
            serde_json::from_str(r#"{"sourceId": "1", "uf": "RJ", "askingPrice": 1500.5}"#)
                .unwrap();
        assert_eq!(a, b);
    }
}
