//! Merchant-side integration library for NestPay hosted-page card payments.
//!
//! The gateway owns the card entry form; this crate covers everything on the
//! merchant's side of that boundary: building the signed redirection form,
//! verifying and recording the signed callback, tracking each order's
//! transaction history, and driving deferred capture and void through the
//! gateway's synchronous XML API. Orders, addresses, items and transactions
//! persist through a schema-driven SQL layer behind the [`DbGateway`] trait.
//!
//! Typical wiring:
//!
//! ```no_run
//! use std::sync::Arc;
//! use nestpay::{Config, MySqlGateway, NestPay};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let db = Arc::new(MySqlGateway::connect("mysql://shop:pw@localhost/shop").await?);
//! let nestpay = NestPay::new(config, db)?;
//! nestpay.setup().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod services;
pub mod sign;

pub use api::CaptureVoidClient;
pub use config::Config;
pub use db::mysql::MySqlGateway;
pub use db::tables::Tables;
pub use db::DbGateway;
pub use domain::{
    FrequencyUnit, Order, OrderAddress, OrderItem, RecurringPayment, Transaction,
    TransactionStatus,
};
pub use error::{NestPayError, Result};
pub use services::NestPay;

/// ISO 4217 numeric code for the Serbian dinar, the currency most NestPay
/// deployments settle in.
pub const CURRENCY_RSD: u32 = 941;
