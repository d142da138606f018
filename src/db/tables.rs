//! The four table definitions, built once from [`Config`] at startup and
//! passed by reference into the generator and the stores. Column names match
//! the gateway's callback parameter names where a column mirrors one.

use crate::config::Config;
use crate::db::schema::{FieldDef, FieldType, TableDef};

use FieldType::{Decimal, Integer, Timestamp, Varchar};

#[derive(Debug, Clone)]
pub struct Tables {
    pub orders: TableDef,
    pub address: TableDef,
    pub items: TableDef,
    pub transactions: TableDef,
}

impl Tables {
    pub fn new(config: &Config) -> Self {
        Tables {
            orders: orders_table(&config.orders_table),
            address: address_table(&config.address_table()),
            items: items_table(&config.items_table()),
            transactions: transactions_table(&config.transactions_table),
        }
    }
}

fn orders_table(name: &str) -> TableDef {
    TableDef::new(name)
        .field(FieldDef::new("id", Integer, "11").primary_key())
        .field(FieldDef::new("oid", Varchar, "64").not_null().indexed())
        .field(FieldDef::new("amount", Decimal, "20,2"))
        .field(FieldDef::new("currency", Varchar, "3"))
        .field(FieldDef::new("lang", Varchar, "8"))
        .field(FieldDef::new("okUrl", Varchar, "255"))
        .field(FieldDef::new("failUrl", Varchar, "255"))
        .field(FieldDef::new("description", Varchar, "255"))
        .field(FieldDef::new("comments", Varchar, "255"))
        .field(FieldDef::new("installment", Integer, "3"))
        .field(FieldDef::new("gracePeriod", Integer, "3"))
        .field(FieldDef::new("email", Varchar, "64"))
        .field(FieldDef::new("tel", Varchar, "32"))
        .field(FieldDef::new("shopUrl", Varchar, "255"))
        .field(FieldDef::new("recurringPaymentNumber", Integer, "6"))
        .field(FieldDef::new("recurringFrequencyUnit", Varchar, "1"))
        .field(FieldDef::new("recurringFrequency", Integer, "6"))
        .field(FieldDef::new("billingAddress", Integer, "11"))
        .field(FieldDef::new("shippingAddress", Integer, "11"))
}

fn address_table(name: &str) -> TableDef {
    TableDef::new(name)
        .field(FieldDef::new("id", Integer, "11").primary_key())
        .field(FieldDef::new("company", Varchar, "255"))
        .field(FieldDef::new("name", Varchar, "255"))
        .field(FieldDef::new("street1", Varchar, "255"))
        .field(FieldDef::new("street2", Varchar, "255"))
        .field(FieldDef::new("city", Varchar, "64"))
        .field(FieldDef::new("stateProv", Varchar, "32"))
        .field(FieldDef::new("postalCode", Varchar, "32"))
        .field(FieldDef::new("country", Varchar, "3"))
        .field(FieldDef::new("isShipping", Integer, "1"))
}

fn items_table(name: &str) -> TableDef {
    TableDef::new(name)
        .field(FieldDef::new("id", Integer, "11").primary_key())
        .field(FieldDef::new("orderId", Integer, "11").not_null().indexed())
        .field(FieldDef::new("nr", Integer, "6"))
        .field(FieldDef::new("itemId", Varchar, "128"))
        .field(FieldDef::new("itemNumber", Varchar, "128"))
        .field(FieldDef::new("productCode", Varchar, "64"))
        .field(FieldDef::new("qty", Decimal, "20,2"))
        .field(FieldDef::new("description", Varchar, "128"))
        .field(FieldDef::new("unitPrice", Decimal, "20,2"))
}

fn transactions_table(name: &str) -> TableDef {
    TableDef::new(name)
        .field(FieldDef::new("id", Integer, "11").primary_key())
        .field(FieldDef::new("orderId", Integer, "11").not_null().indexed())
        .field(FieldDef::new("oid", Varchar, "64").not_null().indexed())
        .field(FieldDef::new("authCode", Varchar, "6"))
        .field(FieldDef::new("xid", Varchar, "32"))
        .field(FieldDef::new("response", Varchar, "16"))
        .field(FieldDef::new("procReturnCode", Varchar, "2"))
        .field(FieldDef::new("transId", Varchar, "64").indexed())
        .field(FieldDef::new("errMsg", Varchar, "255"))
        .field(FieldDef::new("clientIp", Varchar, "16"))
        .field(FieldDef::new("maskedPan", Varchar, "16"))
        .field(FieldDef::new("cardBrand", Varchar, "16"))
        .field(FieldDef::new("expYear", Varchar, "2"))
        .field(FieldDef::new("expMonth", Varchar, "2"))
        .field(FieldDef::unsized_field("extraTrxDate", Timestamp))
        .field(FieldDef::new("mdStatus", Varchar, "1"))
        .field(FieldDef::new("txstatus", Varchar, "1"))
        .field(FieldDef::new("iReqCode", Varchar, "2"))
        .field(FieldDef::new("iReqDetail", Varchar, "64"))
        .field(FieldDef::new("vendorCode", Varchar, "255"))
        .field(FieldDef::new("paResSyntaxOK", Varchar, "1"))
        .field(FieldDef::new("paResVerified", Varchar, "1"))
        .field(FieldDef::new("eci", Varchar, "2"))
        .field(FieldDef::new("cavv", Varchar, "32"))
        .field(FieldDef::new("cavvAlgorithm", Varchar, "1"))
        .field(FieldDef::new("md", Varchar, "255"))
        .field(FieldDef::new("version", Varchar, "3"))
        .field(FieldDef::new("sid", Varchar, "255"))
        .field(FieldDef::new("mdErrorMsg", Varchar, "512"))
        .field(FieldDef::new("status", Integer, "1"))
        .field(FieldDef::unsized_field("timeAuthorized", Timestamp))
        .field(FieldDef::unsized_field("timeCaptoredOrVoided", Timestamp))
        // Storage-level idempotency guard for duplicate callbacks: the
        // (oid, xid) pair identifies one authorization attempt.
        .unique(&["oid", "xid"])
}
