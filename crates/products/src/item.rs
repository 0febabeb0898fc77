use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult, Entity, record_id};

record_id!(
    /// Catalog item identifier.
    ItemId
);

/// A catalog item: something the business sells, with its HSN code and a
/// default rate used to pre-fill document lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub hsn_code: String,
    #[serde(default)]
    pub rate: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub hsn_code: Option<String>,
    #[serde(default)]
    pub rate: Option<Decimal>,
}

impl NewItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub hsn_code: Option<String>,
    pub rate: Option<Decimal>,
}

fn check_rate(rate: Decimal) -> DomainResult<Decimal> {
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(DomainError::validation("item rate cannot be negative"));
    }
    Ok(rate)
}

impl Item {
    pub fn register(id: ItemId, input: NewItem, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("item name is required"));
        }
        let rate = check_rate(input.rate.unwrap_or_default())?;

        Ok(Self {
            id,
            name,
            hsn_code: input.hsn_code.map(|h| h.trim().to_string()).unwrap_or_default(),
            rate,
            created_at: now,
        })
    }

    pub fn apply_update(&mut self, update: ItemUpdate) -> DomainResult<()> {
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("item name cannot be blank"));
            }
            self.name = name;
        }
        if let Some(hsn) = update.hsn_code {
            self.hsn_code = hsn.trim().to_string();
        }
        if let Some(rate) = update.rate {
            self.rate = check_rate(rate)?;
        }
        Ok(())
    }
}

/// Case-insensitive exact name lookup. First match wins.
pub fn find_by_name<'a>(items: &'a [Item], name: &str) -> Option<&'a Item> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    items.iter().find(|i| i.name.to_lowercase() == wanted)
}

/// HSN code for a line name, or `""` when the catalog has no such item.
pub fn hsn_for(items: &[Item], name: &str) -> String {
    find_by_name(items, name)
        .map(|i| i.hsn_code.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(name: &str, hsn: &str) -> Item {
        Item::register(
            ItemId::generate(),
            NewItem {
                name: name.into(),
                hsn_code: Some(hsn.into()),
                rate: Some(dec!(10)),
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn hsn_lookup_is_case_insensitive_and_best_effort() {
        let items = vec![item("Hex Bolt", "7318"), item("Washer", "7319")];
        assert_eq!(hsn_for(&items, "hex bolt"), "7318");
        assert_eq!(hsn_for(&items, "WASHER"), "7319");
        assert_eq!(hsn_for(&items, "Nut"), "");
    }

    #[test]
    fn lookup_requires_whole_name() {
        let items = vec![item("Hex Bolt", "7318")];
        assert!(find_by_name(&items, "Hex").is_none());
    }

    #[test]
    fn negative_rates_are_rejected() {
        let err = Item::register(
            ItemId::generate(),
            NewItem {
                name: "Bolt".into(),
                hsn_code: None,
                rate: Some(dec!(-1)),
            },
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn missing_optional_fields_default() {
        let i = Item::register(ItemId::generate(), NewItem::named("Bolt"), Utc::now()).unwrap();
        assert_eq!(i.hsn_code, "");
        assert_eq!(i.rate, Decimal::ZERO);
    }
}
