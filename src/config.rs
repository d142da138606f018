use dotenvy::dotenv;
use std::env;

use crate::error::{NestPayError, Result};

const HOSTED_3D_TEST_URL: &str = "https://testsecurepay.eway2pay.com/fim/est3Dgate";
const HOSTED_3D_LIVE_URL: &str = "https://bib.eway2pay.com/fim/est3Dgate";
const API_TEST_URL: &str = "https://testsecurepay.eway2pay.com/fim/api";
const API_LIVE_URL: &str = "https://bib.eway2pay.com/fim/api";

/// Merchant-side gateway configuration.
///
/// Plain data, constructed by the caller and passed into [`crate::NestPay`];
/// there is no process-global instance. Required credentials are read through
/// the fallible accessors so a missing setting surfaces as
/// [`NestPayError::Config`] at the point of use.
#[derive(Debug, Clone)]
pub struct Config {
    /// Merchant ID assigned by the gateway, maximum 15 characters.
    pub merchant_id: String,
    /// Shared secret ("store key") for hash signing and verification.
    pub store_key: String,
    /// Username for the synchronous XML API.
    pub api_user: String,
    /// Password for the synchronous XML API.
    pub api_pass: String,
    /// Selects the test endpoints for both the hosted page and the API.
    pub test_mode: bool,
    /// Deferred-capture (DMS) mode: authorize first, capture separately.
    pub dms_mode: bool,
    /// Use the non-3D hosted payment model (`pay_hosting`).
    pub disable_3d: bool,
    /// Maximum number of end-to-end payment attempts per order.
    pub max_tries: u32,
    /// Redirection counter on the hosted page, in seconds.
    pub refresh_time: u32,
    /// Hosted 3-D-Secure page URLs (live/test).
    pub hosted_3d_url: String,
    pub hosted_3d_test_url: String,
    /// Synchronous XML API URLs (live/test).
    pub api_url: String,
    pub api_test_url: String,
    /// Optional HTTP proxy for outbound API calls.
    pub proxy_host: Option<String>,
    pub proxy_port: Option<u16>,
    /// Orders table name; address and item tables derive from it.
    pub orders_table: String,
    /// Transactions table name.
    pub transactions_table: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            merchant_id: String::new(),
            store_key: String::new(),
            api_user: String::new(),
            api_pass: String::new(),
            test_mode: false,
            dms_mode: false,
            disable_3d: false,
            max_tries: 3,
            refresh_time: 5,
            hosted_3d_url: HOSTED_3D_LIVE_URL.to_string(),
            hosted_3d_test_url: HOSTED_3D_TEST_URL.to_string(),
            api_url: API_LIVE_URL.to_string(),
            api_test_url: API_TEST_URL.to_string(),
            proxy_host: None,
            proxy_port: None,
            orders_table: "nestpay_orders".to_string(),
            transactions_table: "nestpay_transactions".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let defaults = Config::default();
        Ok(Config {
            merchant_id: env::var("NESTPAY_MERCHANT_ID").unwrap_or_default(),
            store_key: env::var("NESTPAY_STORE_KEY").unwrap_or_default(),
            api_user: env::var("NESTPAY_API_USER").unwrap_or_default(),
            api_pass: env::var("NESTPAY_API_PASS").unwrap_or_default(),
            test_mode: env_flag("NESTPAY_TEST_MODE"),
            dms_mode: env_flag("NESTPAY_DMS_MODE"),
            disable_3d: env_flag("NESTPAY_DISABLE_3D"),
            max_tries: env_u32("NESTPAY_MAX_TRIES", defaults.max_tries)?,
            refresh_time: env_u32("NESTPAY_REFRESH_TIME", defaults.refresh_time)?,
            hosted_3d_url: env::var("NESTPAY_HOSTED_3D_URL").unwrap_or(defaults.hosted_3d_url),
            hosted_3d_test_url: env::var("NESTPAY_HOSTED_3D_TEST_URL")
                .unwrap_or(defaults.hosted_3d_test_url),
            api_url: env::var("NESTPAY_API_URL").unwrap_or(defaults.api_url),
            api_test_url: env::var("NESTPAY_API_TEST_URL").unwrap_or(defaults.api_test_url),
            proxy_host: env::var("NESTPAY_PROXY_HOST").ok(),
            proxy_port: env::var("NESTPAY_PROXY_PORT")
                .ok()
                .map(|v| v.parse())
                .transpose()?,
            orders_table: env::var("NESTPAY_ORDERS_TABLE").unwrap_or(defaults.orders_table),
            transactions_table: env::var("NESTPAY_TRANSACTIONS_TABLE")
                .unwrap_or(defaults.transactions_table),
        })
    }

    /// Merchant ID, required for every outbound parameter set.
    pub fn merchant_id(&self) -> Result<&str> {
        require(&self.merchant_id, "merchant id not set")
    }

    /// Shared signing secret.
    pub fn store_key(&self) -> Result<&str> {
        require(&self.store_key, "store key not set")
    }

    pub fn api_user(&self) -> Result<&str> {
        require(&self.api_user, "API user not set")
    }

    pub fn api_pass(&self) -> Result<&str> {
        require(&self.api_pass, "API password not set")
    }

    /// Hosted 3-D page URL, test or live depending on mode.
    pub fn hosted_3d_url(&self) -> &str {
        if self.test_mode {
            &self.hosted_3d_test_url
        } else {
            &self.hosted_3d_url
        }
    }

    /// XML API URL, test or live depending on mode.
    pub fn api_url(&self) -> &str {
        if self.test_mode {
            &self.api_test_url
        } else {
            &self.api_url
        }
    }

    pub fn address_table(&self) -> String {
        format!("{}_address", self.orders_table)
    }

    pub fn items_table(&self) -> String {
        format!("{}_items", self.orders_table)
    }
}

fn require<'a>(value: &'a str, msg: &str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(NestPayError::Config(msg.to_string()));
    }
    Ok(value)
}

fn env_flag(name: &str) -> bool {
    matches!(
        env::var(name).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn env_u32(name: &str, default: u32) -> anyhow::Result<u32> {
    match env::var(name) {
        Ok(v) => Ok(v.parse()?),
        Err(_) => Ok(default),
    }
}
