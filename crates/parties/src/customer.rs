use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult, Entity, record_id};

record_id!(
    /// Customer identifier.
    CustomerId
);

/// A customer the business sells to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// GSTIN; absent for unregistered customers.
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> CustomerId {
        self.id
    }
}

/// Input for registering a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewCustomer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update of a customer; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub gstin: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Customer {
    pub fn register(id: CustomerId, input: NewCustomer, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }

        Ok(Self {
            id,
            name,
            gstin: non_blank(input.gstin),
            address: non_blank(input.address).unwrap_or_default(),
            phone: non_blank(input.phone),
            created_at: now,
        })
    }

    pub fn apply_update(&mut self, update: CustomerUpdate) -> DomainResult<()> {
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("customer name cannot be blank"));
            }
            self.name = name;
        }
        if update.gstin.is_some() {
            self.gstin = non_blank(update.gstin);
        }
        if let Some(address) = update.address {
            self.address = address.trim().to_string();
        }
        if update.phone.is_some() {
            self.phone = non_blank(update.phone);
        }
        Ok(())
    }

    /// Reference to this customer for embedding in documents.
    pub fn to_ref(&self) -> CustomerRef {
        CustomerRef::linked(self.id, self.name.clone())
    }
}

/// How a document points at its customer.
///
/// The id is an optional foreign key: walk-in or legacy documents carry only
/// the denormalised name. Matching rules live in [`CustomerRef::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerRef {
    #[serde(default, rename = "customer_id")]
    pub id: Option<CustomerId>,
    #[serde(rename = "customer_name")]
    pub name: String,
}

impl CustomerRef {
    pub fn linked(id: CustomerId, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
        }
    }

    /// A reference without a customer record behind it.
    pub fn unlinked(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn is_linked(&self) -> bool {
        self.id.is_some()
    }

    /// Does `other` (usually taken from a stored document) refer to the same
    /// customer as `self`?
    ///
    /// - both sides linked: ids must be equal; names are ignored.
    /// - either side unlinked: exact, case-sensitive name equality.
    pub fn matches(&self, other: &CustomerRef) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => !self.name.is_empty() && self.name == other.name,
        }
    }
}

/// Find a customer by display name, ignoring ASCII and Unicode case.
///
/// Returns the first match in slice order when names collide.
pub fn resolve_customer<'a>(customers: &'a [Customer], name: &str) -> Option<&'a Customer> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    customers.iter().find(|c| c.name.to_lowercase() == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(name: &str) -> Customer {
        Customer::register(CustomerId::generate(), NewCustomer::named(name), Utc::now()).unwrap()
    }

    #[test]
    fn blank_names_are_rejected() {
        let err = Customer::register(CustomerId::generate(), NewCustomer::named("   "), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn optional_fields_default_sensibly() {
        let c = customer(" Acme Traders ");
        assert_eq!(c.name, "Acme Traders");
        assert_eq!(c.address, "");
        assert_eq!(c.gstin, None);
    }

    #[test]
    fn linked_refs_match_by_id_only() {
        let a = customer("Acme");
        let b = customer("Acme");
        assert!(a.to_ref().matches(&a.to_ref()));
        assert!(!a.to_ref().matches(&b.to_ref()));

        let renamed = CustomerRef::linked(a.id, "Acme Pvt Ltd");
        assert!(a.to_ref().matches(&renamed));
    }

    #[test]
    fn unlinked_refs_fall_back_to_exact_name() {
        let a = customer("Acme");
        assert!(a.to_ref().matches(&CustomerRef::unlinked("Acme")));
        assert!(CustomerRef::unlinked("Acme").matches(&a.to_ref()));
        assert!(!a.to_ref().matches(&CustomerRef::unlinked("acme")));
        assert!(!CustomerRef::unlinked("").matches(&CustomerRef::unlinked("")));
    }

    #[test]
    fn resolve_customer_ignores_case() {
        let customers = vec![customer("Acme"), customer("Bolt House")];
        let found = resolve_customer(&customers, "bolt house").unwrap();
        assert_eq!(found.name, "Bolt House");
        assert!(resolve_customer(&customers, "unknown").is_none());
        assert!(resolve_customer(&customers, "  ").is_none());
    }

    #[test]
    fn updates_keep_name_non_blank() {
        let mut c = customer("Acme");
        let err = c
            .apply_update(CustomerUpdate {
                name: Some(" ".into()),
                ..CustomerUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        c.apply_update(CustomerUpdate {
            gstin: Some("24ABCDE1234F1Z5".into()),
            address: Some("Jamnagar".into()),
            ..CustomerUpdate::default()
        })
        .unwrap();
        assert_eq!(c.gstin.as_deref(), Some("24ABCDE1234F1Z5"));
        assert_eq!(c.address, "Jamnagar");
    }
}
