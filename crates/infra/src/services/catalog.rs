use chrono::Utc;
use tracing::{info, instrument, warn};

use billbook_core::TenantId;
use billbook_events::{EventBus, RecordChanged};
use billbook_parties::{Customer, CustomerId, CustomerUpdate, NewCustomer, resolve_customer};
use billbook_products::{Item, ItemId, ItemUpdate, NewItem, find_by_name};

use super::BillBook;
use crate::error::{ServiceError, ServiceResult};
use crate::session::Session;
use crate::store::{ListQuery, RecordStore};

impl<S, B> BillBook<S, B>
where
    S: RecordStore,
    B: EventBus<RecordChanged>,
{
    pub async fn list_customers(&self, session: &Session) -> ServiceResult<Vec<Customer>> {
        let Some(tenant_id) = session.owner() else {
            return Ok(Vec::new());
        };
        Ok(self.books.list(tenant_id, &ListQuery::new().order_by("name")).await?)
    }

    pub async fn get_customer(&self, session: &Session, id: CustomerId) -> ServiceResult<Customer> {
        let tenant_id = session.require_owner()?;
        self.load_customer(tenant_id, id).await
    }

    /// Case-insensitive exact-name lookup.
    pub async fn find_customer(&self, session: &Session, name: &str) -> ServiceResult<Option<Customer>> {
        let Some(tenant_id) = session.owner() else {
            return Ok(None);
        };
        let customers: Vec<Customer> = self.books.all(tenant_id).await?;
        Ok(resolve_customer(&customers, name).cloned())
    }

    #[instrument(skip(self, session, input), fields(name = %input.name))]
    pub async fn create_customer(&self, session: &Session, input: NewCustomer) -> ServiceResult<Customer> {
        let tenant_id = session.require_owner()?;
        let customer = Customer::register(CustomerId::generate(), input, Utc::now())?;
        self.books.insert(tenant_id, &customer).await?;
        info!(%tenant_id, customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    pub async fn update_customer(
        &self,
        session: &Session,
        id: CustomerId,
        update: CustomerUpdate,
    ) -> ServiceResult<Customer> {
        let tenant_id = session.require_owner()?;
        let mut customer = self.load_customer(tenant_id, id).await?;
        customer.apply_update(update)?;
        self.books.save(tenant_id, &customer).await?;
        Ok(customer)
    }

    /// Documents keep their denormalised customer name, so deleting a
    /// customer leaves them readable but unlinked in practice.
    pub async fn delete_customer(&self, session: &Session, id: CustomerId) -> ServiceResult<()> {
        let tenant_id = session.require_owner()?;
        self.load_customer(tenant_id, id).await?;
        self.books.delete::<Customer>(tenant_id, id).await?;
        info!(%tenant_id, customer_id = %id, "customer deleted");
        Ok(())
    }

    pub async fn list_items(&self, session: &Session) -> ServiceResult<Vec<Item>> {
        let Some(tenant_id) = session.owner() else {
            return Ok(Vec::new());
        };
        Ok(self.books.list(tenant_id, &ListQuery::new().order_by("name")).await?)
    }

    pub async fn get_item(&self, session: &Session, id: ItemId) -> ServiceResult<Item> {
        let tenant_id = session.require_owner()?;
        self.load_item(tenant_id, id).await
    }

    pub async fn find_item(&self, session: &Session, name: &str) -> ServiceResult<Option<Item>> {
        let Some(tenant_id) = session.owner() else {
            return Ok(None);
        };
        let items: Vec<Item> = self.books.all(tenant_id).await?;
        Ok(find_by_name(&items, name).cloned())
    }

    #[instrument(skip(self, session, input), fields(name = %input.name))]
    pub async fn create_item(&self, session: &Session, input: NewItem) -> ServiceResult<Item> {
        let tenant_id = session.require_owner()?;
        let item = Item::register(ItemId::generate(), input, Utc::now())?;
        self.books.insert(tenant_id, &item).await?;
        info!(%tenant_id, item_id = %item.id, "item created");
        Ok(item)
    }

    pub async fn update_item(&self, session: &Session, id: ItemId, update: ItemUpdate) -> ServiceResult<Item> {
        let tenant_id = session.require_owner()?;
        let mut item = self.load_item(tenant_id, id).await?;
        item.apply_update(update)?;
        self.books.save(tenant_id, &item).await?;
        Ok(item)
    }

    pub async fn delete_item(&self, session: &Session, id: ItemId) -> ServiceResult<()> {
        let tenant_id = session.require_owner()?;
        self.load_item(tenant_id, id).await?;
        self.books.delete::<Item>(tenant_id, id).await?;
        Ok(())
    }

    async fn load_item(&self, tenant_id: TenantId, id: ItemId) -> ServiceResult<Item> {
        self.books
            .get::<Item>(tenant_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("item {id}")))
    }

    /// Return the customer named `input.name`, registering it first if the
    /// catalog has none.
    pub(crate) async fn ensure_customer(&self, tenant_id: TenantId, input: NewCustomer) -> ServiceResult<Customer> {
        let customers: Vec<Customer> = self.books.all(tenant_id).await?;
        if let Some(existing) = resolve_customer(&customers, &input.name) {
            return Ok(existing.clone());
        }
        let customer = Customer::register(CustomerId::generate(), input, Utc::now())?;
        self.books.insert(tenant_id, &customer).await?;
        info!(%tenant_id, customer_id = %customer.id, "customer registered from invoice");
        Ok(customer)
    }

    /// Register catalog items for names not seen before. Best effort: a
    /// failure is logged and the caller carries on without the item.
    pub(crate) async fn ensure_items(&self, tenant_id: TenantId, wanted: Vec<NewItem>) -> Vec<Item> {
        let mut items: Vec<Item> = match self.books.all(tenant_id).await {
            Ok(items) => items,
            Err(err) => {
                warn!(%tenant_id, error = %err, "could not load catalog for item registration");
                return Vec::new();
            }
        };

        for input in wanted {
            if find_by_name(&items, &input.name).is_some() {
                continue;
            }
            let name = input.name.clone();
            let registered = match Item::register(ItemId::generate(), input, Utc::now()) {
                Ok(item) => item,
                Err(err) => {
                    warn!(%tenant_id, %name, error = %err, "skipping item registration");
                    continue;
                }
            };
            match self.books.insert(tenant_id, &registered).await {
                Ok(()) => items.push(registered),
                Err(err) => warn!(%tenant_id, %name, error = %err, "item registration failed"),
            }
        }
        items
    }
}
