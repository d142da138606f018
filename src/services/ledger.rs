use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::CaptureVoidClient;
use crate::config::Config;
use crate::db::{sql, DbGateway};
use crate::db::tables::Tables;
use crate::domain::transaction::PROC_RETURN_CODE_OK;
use crate::domain::{Order, Transaction, TransactionStatus};
use crate::error::{NestPayError, Result};
use crate::services::orders::OrderStore;
use crate::sign;

/// Transaction lifecycle state machine: callback ingestion, history
/// queries, retry bookkeeping and the capture/void transitions.
pub struct TransactionLedger {
    db: Arc<dyn DbGateway>,
    tables: Arc<Tables>,
    config: Arc<Config>,
    orders: OrderStore,
}

impl TransactionLedger {
    pub fn new(
        db: Arc<dyn DbGateway>,
        tables: Arc<Tables>,
        config: Arc<Config>,
        orders: OrderStore,
    ) -> Self {
        TransactionLedger {
            db,
            tables,
            config,
            orders,
        }
    }

    /// Ingest one gateway callback.
    ///
    /// Verifies echoed identity and the signature over the gateway-declared
    /// field list before trusting anything, then persists a new transaction
    /// for a first-seen (oid, xid) pair. A replayed pair returns the stored
    /// transaction flagged `already_processed`, with no second row and no
    /// state change; the storage-level unique key closes the race between
    /// concurrent duplicates.
    pub async fn read_transaction(&self, params: &HashMap<String, String>) -> Result<Transaction> {
        info!(
            params = %serde_json::to_string(params).unwrap_or_default(),
            "reading transaction result"
        );

        let oid = require_param(params, "oid")?;
        if let Some(return_oid) = params.get("ReturnOid") {
            if return_oid != oid {
                return Err(NestPayError::Validation(
                    "no return oid or different oids".to_string(),
                ));
            }
        }
        if let Some(merchant_id) = params.get("merchantID") {
            if merchant_id != self.config.merchant_id()? {
                return Err(NestPayError::Validation("invalid merchant id".to_string()));
            }
        }

        self.verify_signature(params)?;

        let xid = require_param(params, "xid")?;
        let order = self
            .orders
            .by_oid(oid)
            .await?
            .ok_or_else(|| NestPayError::NotFound(format!("no order found for oid: {}", oid)))?;
        let order_id = order
            .id
            .ok_or_else(|| NestPayError::Database("order row without id".to_string()))?;

        if let Some(mut existing) = self.by_oid_and_xid(oid, xid).await? {
            existing.already_processed = true;
            return Ok(existing);
        }

        let mut transaction = Transaction::from_callback(
            params,
            order_id,
            self.config.dms_mode,
            Utc::now().naive_utc(),
        );
        match self.save(&mut transaction).await {
            Ok(()) => Ok(transaction),
            // a concurrent duplicate callback won the insert; treat this
            // one as the replay it is
            Err(NestPayError::UniqueViolation(_)) => {
                warn!(oid, xid, "duplicate callback lost insert race");
                let mut existing = self.by_oid_and_xid(oid, xid).await?.ok_or_else(|| {
                    NestPayError::Database(format!(
                        "transaction for {}/{} vanished after unique violation",
                        oid, xid
                    ))
                })?;
                existing.already_processed = true;
                Ok(existing)
            }
            Err(e) => Err(e),
        }
    }

    /// Verify the callback hash over the field order the gateway declared
    /// in `HASHPARAMS`. Fails closed.
    fn verify_signature(&self, params: &HashMap<String, String>) -> Result<()> {
        let hash_params = require_param(params, "HASHPARAMS")?;
        let supplied_hash = require_param(params, "HASH")?;
        let values: Vec<&str> = hash_params
            .split('|')
            .map(|key| params.get(key).map(String::as_str).unwrap_or(""))
            .collect();
        if !sign::verify_fields(values, supplied_hash, self.config.store_key()?) {
            return Err(NestPayError::Validation(
                "returned hash is not valid".to_string(),
            ));
        }
        Ok(())
    }

    /// All transactions for the order, oldest first.
    pub async fn all_for_order(&self, oid: &str) -> Result<Vec<Transaction>> {
        self.query(&format!(
            "SELECT * FROM `{}` WHERE `oid`=\"{}\" ORDER BY `id` ASC",
            self.tables.transactions.name(),
            self.db.escape(oid)
        ))
        .await
    }

    /// Most recent transaction for the order.
    pub async fn last_for_order(&self, oid: &str) -> Result<Option<Transaction>> {
        let mut transactions = self
            .query(&format!(
                "SELECT * FROM `{}` WHERE `oid`=\"{}\" ORDER BY `id` DESC",
                self.tables.transactions.name(),
                self.db.escape(oid)
            ))
            .await?;
        Ok(if transactions.is_empty() {
            None
        } else {
            Some(transactions.remove(0))
        })
    }

    /// The transaction with return code "00", the authoritative "is paid"
    /// signal.
    pub async fn successful_for_order(&self, oid: &str) -> Result<Option<Transaction>> {
        let mut transactions = self
            .query(&format!(
                "SELECT * FROM `{}` WHERE `oid`=\"{}\" AND `procReturnCode`=\"{}\"",
                self.tables.transactions.name(),
                self.db.escape(oid),
                PROC_RETURN_CODE_OK
            ))
            .await?;
        Ok(if transactions.is_empty() {
            None
        } else {
            Some(transactions.remove(0))
        })
    }

    pub async fn by_oid_and_xid(&self, oid: &str, xid: &str) -> Result<Option<Transaction>> {
        let mut transactions = self
            .query(&format!(
                "SELECT * FROM `{}` WHERE `oid`=\"{}\" AND `xid`=\"{}\"",
                self.tables.transactions.name(),
                self.db.escape(oid),
                self.db.escape(xid)
            ))
            .await?;
        Ok(if transactions.is_empty() {
            None
        } else {
            Some(transactions.remove(0))
        })
    }

    /// A payer may start another end-to-end attempt while the number of
    /// recorded transactions stays below the configured maximum.
    pub async fn can_retry(&self, oid: &str) -> Result<bool> {
        let tries = self.all_for_order(oid).await?.len();
        Ok(tries < self.config.max_tries as usize)
    }

    /// Capture or void the order's successful transaction via the
    /// synchronous API.
    ///
    /// Requesting void on an already voided transaction (or capture on an
    /// already captured one) is a no-op success. Any other non-authorized
    /// state is a hard validation failure. On a successful remote response
    /// the status transitions and the second timestamp is stamped.
    pub async fn capture_or_void(
        &self,
        order: &Order,
        void: bool,
        client: &CaptureVoidClient,
    ) -> Result<bool> {
        let mut transaction = self.successful_for_order(&order.oid).await?.ok_or_else(|| {
            NestPayError::NotFound(format!(
                "capture/void failed: no successful transaction for {}",
                order.oid
            ))
        })?;

        match transaction.status {
            TransactionStatus::Voided if void => return Ok(true),
            TransactionStatus::Captured if !void => return Ok(true),
            TransactionStatus::Authorized => {}
            status => {
                return Err(NestPayError::Validation(format!(
                    "capture/void failed: invalid transaction status {:?} for {}",
                    status, order.oid
                )))
            }
        }

        let approved = client.capture_or_void(&order.oid, void).await?;
        if approved {
            transaction.status = if void {
                TransactionStatus::Voided
            } else {
                TransactionStatus::Captured
            };
            transaction.time_captured_or_voided = Some(Utc::now().naive_utc());
            self.save(&mut transaction).await?;
        }
        Ok(approved)
    }

    /// Persist a transaction: INSERT when it has no id yet, UPDATE after.
    pub async fn save(&self, transaction: &mut Transaction) -> Result<()> {
        let escape = |s: &str| self.db.escape(s);
        let map = transaction.to_field_map();
        if transaction.id.is_none() {
            let sql_text = sql::insert_sql(&self.tables.transactions, &map, &escape)?;
            self.db.execute(&sql_text).await?;
            transaction.id = Some(self.db.last_insert_id().await?);
        } else {
            let sql_text = sql::update_sql(&self.tables.transactions, &map, &escape)?;
            self.db.execute(&sql_text).await?;
        }
        Ok(())
    }

    async fn query(&self, sql_text: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .db
            .rows(sql_text, &self.tables.transactions)
            .await?
            .iter()
            .map(Transaction::from_field_map)
            .collect())
    }
}

fn require_param<'a>(params: &'a HashMap<String, String>, name: &str) -> Result<&'a String> {
    params
        .get(name)
        .ok_or_else(|| NestPayError::Validation(format!("missing callback parameter {}", name)))
}
