//! Integration-facing facade.
//!
//! [`NestPay`] is the surface a merchant application talks to: it wires the
//! order store, the transaction ledger and the capture/void client together
//! and absorbs their errors at this boundary. Every method logs the failure
//! through `tracing` and returns `None`/`false`, so callers branch on
//! outcomes instead of matching error types.

use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::CaptureVoidClient;
use crate::config::Config;
use crate::db::sql;
use crate::db::tables::Tables;
use crate::db::DbGateway;
use crate::domain::{Order, Transaction, TransactionStatus};
use crate::error::Result;
use crate::services::ledger::TransactionLedger;
use crate::services::orders::OrderStore;

pub struct NestPay {
    config: Arc<Config>,
    db: Arc<dyn DbGateway>,
    tables: Arc<Tables>,
    orders: OrderStore,
    ledger: TransactionLedger,
    client: CaptureVoidClient,
}

impl NestPay {
    pub fn new(config: Config, db: Arc<dyn DbGateway>) -> Result<Self> {
        let config = Arc::new(config);
        let tables = Arc::new(Tables::new(&config));
        let orders = OrderStore::new(Arc::clone(&db), Arc::clone(&tables));
        let ledger = TransactionLedger::new(
            Arc::clone(&db),
            Arc::clone(&tables),
            Arc::clone(&config),
            OrderStore::new(Arc::clone(&db), Arc::clone(&tables)),
        );
        let client = CaptureVoidClient::new(Arc::clone(&config))?;
        Ok(NestPay {
            config,
            db,
            tables,
            orders,
            ledger,
            client,
        })
    }

    /// Create the four storage tables if they do not exist yet. Idempotent.
    pub async fn setup(&self) -> bool {
        for table in [
            &self.tables.transactions,
            &self.tables.items,
            &self.tables.address,
            &self.tables.orders,
        ] {
            let sql_text = sql::create_table_sql(table);
            if let Err(e) = self.db.execute(&sql_text).await {
                error!(table = table.name(), error = %e, "failed creating table");
                return false;
            }
        }
        true
    }

    /// Get a new or previously created order for the merchant order id.
    pub async fn get_order(
        &self,
        oid: &str,
        amount: BigDecimal,
        currency: u32,
        lang: &str,
        ok_url: &str,
        fail_url: &str,
    ) -> Option<Order> {
        match self
            .orders
            .get_new_order(oid, amount, currency, lang, ok_url, fail_url)
            .await
        {
            Ok(order) => Some(order),
            Err(e) => {
                error!(oid, error = %e, "failed getting order");
                None
            }
        }
    }

    pub async fn order_by_oid(&self, oid: &str) -> Option<Order> {
        match self.orders.by_oid(oid).await {
            Ok(order) => order,
            Err(e) => {
                error!(oid, error = %e, "failed loading order");
                None
            }
        }
    }

    /// Persist caller-side changes to an order (addresses, items, contact
    /// fields) before rendering the payment form.
    pub async fn save_order(&self, order: &mut Order) -> bool {
        match self.orders.save(order).await {
            Ok(()) => true,
            Err(e) => {
                error!(oid = %order.oid, error = %e, "failed saving order");
                false
            }
        }
    }

    /// Render the redirection form for the hosted payment page.
    ///
    /// Refused when the order does not exist, is already paid, or has used
    /// up its payment attempts.
    pub async fn pay_form(
        &self,
        oid: &str,
        complete_page: bool,
        button_text: Option<&str>,
    ) -> Option<String> {
        let order = match self.orders.by_oid(oid).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                error!(oid, "failed redirecting to payment: order doesn't exist");
                return None;
            }
            Err(e) => {
                error!(oid, error = %e, "failed redirecting to payment");
                return None;
            }
        };
        if self.is_paid(oid).await {
            error!(oid, "failed redirecting to payment: order is already paid");
            return None;
        }
        if !self.can_retry(oid).await {
            error!(oid, "failed redirecting to payment: number of tries exceeded");
            return None;
        }
        match order.redirect_form(&self.config, complete_page, button_text) {
            Ok(form) => Some(form),
            Err(e) => {
                error!(oid, error = %e, "failed building redirect form");
                None
            }
        }
    }

    /// Ingest the parameters posted back by the gateway and return the
    /// recorded transaction. `None` means the callback was rejected
    /// (bad signature, unknown order, echoed identity mismatch).
    pub async fn read_results(&self, params: &HashMap<String, String>) -> Option<Transaction> {
        match self.ledger.read_transaction(params).await {
            Ok(transaction) => Some(transaction),
            Err(e) => {
                error!(error = %e, "failed getting transaction details");
                None
            }
        }
    }

    pub async fn last_transaction(&self, oid: &str) -> Option<Transaction> {
        match self.ledger.last_for_order(oid).await {
            Ok(transaction) => transaction,
            Err(e) => {
                error!(oid, error = %e, "failed loading last transaction");
                None
            }
        }
    }

    /// An order is paid once it has any approved transaction, whatever its
    /// later capture/void state.
    pub async fn is_paid(&self, oid: &str) -> bool {
        matches!(self.successful(oid).await, Some(_))
    }

    pub async fn is_captured(&self, oid: &str) -> bool {
        matches!(
            self.successful(oid).await,
            Some(t) if t.status == TransactionStatus::Captured
        )
    }

    pub async fn is_voided(&self, oid: &str) -> bool {
        matches!(
            self.successful(oid).await,
            Some(t) if t.status == TransactionStatus::Voided
        )
    }

    /// Whether the order has payment attempts left.
    pub async fn can_retry(&self, oid: &str) -> bool {
        match self.ledger.can_retry(oid).await {
            Ok(can) => can,
            Err(e) => {
                error!(oid, error = %e, "failed counting payment attempts");
                false
            }
        }
    }

    pub async fn capture(&self, oid: &str) -> bool {
        self.capture_or_void(oid, false).await
    }

    pub async fn void(&self, oid: &str) -> bool {
        self.capture_or_void(oid, true).await
    }

    async fn capture_or_void(&self, oid: &str, void: bool) -> bool {
        let operation = if void { "void" } else { "capture" };
        let order = match self.orders.by_oid(oid).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                error!(oid, operation, "capture/void failed: order not found");
                return false;
            }
            Err(e) => {
                error!(oid, operation, error = %e, "capture/void failed loading order");
                return false;
            }
        };
        match self.ledger.capture_or_void(&order, void, &self.client).await {
            Ok(approved) => {
                info!(
                    oid,
                    operation,
                    approved,
                    "capture/void completed"
                );
                approved
            }
            Err(e) => {
                error!(oid, operation, error = %e, "capture/void failed");
                false
            }
        }
    }

    async fn successful(&self, oid: &str) -> Option<Transaction> {
        match self.ledger.successful_for_order(oid).await {
            Ok(transaction) => transaction,
            Err(e) => {
                error!(oid, error = %e, "failed loading successful transaction");
                None
            }
        }
    }
}
