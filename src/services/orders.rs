use bigdecimal::BigDecimal;
use std::sync::Arc;

use crate::db::schema::{FieldMap, TableDef};
use crate::db::tables::Tables;
use crate::db::{sql, DbGateway};
use crate::domain::{Order, OrderAddress, OrderItem};
use crate::error::{NestPayError, Result};

/// Order lookup, idempotent creation and cascade persistence.
#[derive(Clone)]
pub struct OrderStore {
    db: Arc<dyn DbGateway>,
    tables: Arc<Tables>,
}

impl OrderStore {
    pub fn new(db: Arc<dyn DbGateway>, tables: Arc<Tables>) -> Self {
        OrderStore { db, tables }
    }

    /// Look up an order by merchant order id, with addresses and items
    /// attached.
    pub async fn by_oid(&self, oid: &str) -> Result<Option<Order>> {
        let sql_text = format!(
            "SELECT * FROM `{}` WHERE `oid`=\"{}\"",
            self.tables.orders.name(),
            self.db.escape(oid)
        );
        self.first_order(&sql_text).await
    }

    /// Look up an order by internal id.
    pub async fn by_id(&self, id: u64) -> Result<Option<Order>> {
        let sql_text = format!(
            "SELECT * FROM `{}` WHERE `id`={}",
            self.tables.orders.name(),
            id
        );
        self.first_order(&sql_text).await
    }

    /// Get a new or previously created order for the merchant order id.
    ///
    /// Amount and currency are immutable: re-requesting with different
    /// values is a validation error and leaves the stored order untouched.
    /// Re-requesting with matching values resets the item list and is
    /// otherwise idempotent.
    pub async fn get_new_order(
        &self,
        oid: &str,
        amount: BigDecimal,
        currency: u32,
        lang: &str,
        ok_url: &str,
        fail_url: &str,
    ) -> Result<Order> {
        let mut order = match self.by_oid(oid).await? {
            Some(existing) => {
                if existing.amount != amount || existing.currency != currency {
                    return Err(NestPayError::Validation(format!(
                        "order {} exists with different amount or currency",
                        oid
                    )));
                }
                existing
            }
            None => Order::new(oid, amount.clone(), currency, lang, ok_url, fail_url),
        };

        order.amount = amount;
        order.currency = currency;
        order.lang = lang.to_string();
        order.ok_url = ok_url.to_string();
        order.fail_url = fail_url.to_string();
        order.items.clear();

        self.save(&mut order).await?;
        Ok(order)
    }

    /// Cascade save: addresses first (so their ids exist for the order
    /// row), then the order, then each item tagged with the order id.
    /// Items of a previously saved order are replaced wholesale, matching
    /// the reset-on-re-request semantics.
    pub async fn save(&self, order: &mut Order) -> Result<()> {
        if let Some(address) = order.billing_address.as_mut() {
            self.save_address(address).await?;
        }
        if let Some(address) = order.shipping_address.as_mut() {
            self.save_address(address).await?;
        }

        let existing = order.id.is_some();
        let map = order.to_field_map();
        if let Some(id) = self.upsert(&self.tables.orders, &map).await? {
            order.id = Some(id);
        }
        let order_id = order
            .id
            .ok_or_else(|| NestPayError::Database("order saved without an id".to_string()))?;

        if existing {
            self.db
                .execute(&format!(
                    "DELETE FROM `{}` WHERE `orderId`={}",
                    self.tables.items.name(),
                    order_id
                ))
                .await?;
        }
        for item in order.items.iter_mut() {
            item.order_id = Some(order_id);
            item.id = None;
            let map = item.to_field_map();
            if let Some(id) = self.upsert(&self.tables.items, &map).await? {
                item.id = Some(id);
            }
        }
        Ok(())
    }

    async fn save_address(&self, address: &mut OrderAddress) -> Result<()> {
        let map = address.to_field_map();
        if let Some(id) = self.upsert(&self.tables.address, &map).await? {
            address.id = Some(id);
        }
        Ok(())
    }

    /// INSERT when the map carries no primary-key value, UPDATE otherwise.
    /// Returns the assigned id for inserts.
    async fn upsert(&self, table: &TableDef, map: &FieldMap) -> Result<Option<u64>> {
        let escape = |s: &str| self.db.escape(s);
        if map.get("id").is_null() {
            let sql_text = sql::insert_sql(table, map, &escape)?;
            self.db.execute(&sql_text).await?;
            Ok(Some(self.db.last_insert_id().await?))
        } else {
            let sql_text = sql::update_sql(table, map, &escape)?;
            self.db.execute(&sql_text).await?;
            Ok(None)
        }
    }

    async fn first_order(&self, sql_text: &str) -> Result<Option<Order>> {
        let rows = self.db.rows(sql_text, &self.tables.orders).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Attach the owned addresses and the ordered item list to a decoded
    /// order row.
    async fn hydrate(&self, row: FieldMap) -> Result<Order> {
        let mut order = Order::from_field_map(&row);
        let (billing_id, shipping_id) = Order::address_ids(&row);

        if let Some(id) = billing_id {
            order.billing_address = self.address_by_id(id).await?;
        }
        if let Some(id) = shipping_id {
            order.shipping_address = self.address_by_id(id).await?;
        }
        if let Some(order_id) = order.id {
            let sql_text = format!(
                "SELECT * FROM `{}` WHERE `orderId`={} ORDER BY `nr` ASC",
                self.tables.items.name(),
                order_id
            );
            order.items = self
                .db
                .rows(&sql_text, &self.tables.items)
                .await?
                .iter()
                .map(OrderItem::from_field_map)
                .collect();
        }
        Ok(order)
    }

    async fn address_by_id(&self, id: u64) -> Result<Option<OrderAddress>> {
        let sql_text = format!(
            "SELECT * FROM `{}` WHERE `id`={}",
            self.tables.address.name(),
            id
        );
        let rows = self.db.rows(&sql_text, &self.tables.address).await?;
        Ok(rows.first().map(OrderAddress::from_field_map))
    }
}
