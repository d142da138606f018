use bigdecimal::BigDecimal;

use crate::db::schema::{FieldMap, Value};

/// One order line. `nr` is the 1-based sequence number within the order,
/// assigned at append time; the line total is derived, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Option<u64>,
    pub order_id: Option<u64>,
    pub nr: u32,
    pub item_id: String,
    pub item_number: String,
    pub product_code: String,
    pub qty: BigDecimal,
    pub description: String,
    pub unit_price: BigDecimal,
}

impl OrderItem {
    pub fn new(
        nr: u32,
        item_id: &str,
        item_number: &str,
        product_code: &str,
        qty: BigDecimal,
        description: &str,
        unit_price: BigDecimal,
    ) -> Self {
        OrderItem {
            id: None,
            order_id: None,
            nr,
            item_id: item_id.to_string(),
            item_number: item_number.to_string(),
            product_code: product_code.to_string(),
            qty,
            description: description.to_string(),
            unit_price,
        }
    }

    /// Line total, quantity times unit price.
    pub fn total(&self) -> BigDecimal {
        &self.qty * &self.unit_price
    }

    /// Hosted-page parameters for this line, indexed by sequence number.
    pub fn redirect_params(&self) -> Vec<(String, String)> {
        vec![
            (format!("id{}", self.nr), self.item_id.clone()),
            (format!("itemnumber{}", self.nr), self.item_number.clone()),
            (format!("productcode{}", self.nr), self.product_code.clone()),
            (format!("desc{}", self.nr), self.description.clone()),
            (format!("qty{}", self.nr), self.qty.to_string()),
            (format!("price{}", self.nr), self.unit_price.to_string()),
            (format!("total{}", self.nr), self.total().to_string()),
        ]
    }

    pub fn to_field_map(&self) -> FieldMap {
        let mut m = FieldMap::new();
        if let Some(id) = self.id {
            m.set("id", Value::Int(id as i64));
        }
        if let Some(order_id) = self.order_id {
            m.set("orderId", Value::Int(order_id as i64));
        }
        m.set("nr", Value::Int(i64::from(self.nr)));
        m.set("itemId", Value::from_opt_text(Some(&self.item_id)));
        m.set("itemNumber", Value::from_opt_text(Some(&self.item_number)));
        m.set("productCode", Value::from_opt_text(Some(&self.product_code)));
        m.set("qty", Value::Decimal(self.qty.clone()));
        m.set("description", Value::from_opt_text(Some(&self.description)));
        m.set("unitPrice", Value::Decimal(self.unit_price.clone()));
        m
    }

    pub fn from_field_map(m: &FieldMap) -> Self {
        OrderItem {
            id: m.id("id"),
            order_id: m.id("orderId"),
            nr: m.int("nr").unwrap_or(0) as u32,
            item_id: m.text("itemId").unwrap_or_default(),
            item_number: m.text("itemNumber").unwrap_or_default(),
            product_code: m.text("productCode").unwrap_or_default(),
            qty: m.decimal("qty").unwrap_or_default(),
            description: m.text("description").unwrap_or_default(),
            unit_price: m.decimal("unitPrice").unwrap_or_default(),
        }
    }
}
