use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;

use crate::db::schema::{FieldMap, Value};

pub const PROC_RETURN_CODE_OK: &str = "00";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Closed transaction lifecycle. `Failed`, `Captured` and `Voided` are
/// terminal; only `Authorized` may transition (to `Captured` or `Voided`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionStatus {
    Failed,
    Authorized,
    Captured,
    Voided,
}

impl TransactionStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            TransactionStatus::Failed => 0,
            TransactionStatus::Authorized => 1,
            TransactionStatus::Captured => 2,
            TransactionStatus::Voided => 3,
        }
    }

    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(TransactionStatus::Failed),
            1 => Some(TransactionStatus::Authorized),
            2 => Some(TransactionStatus::Captured),
            3 => Some(TransactionStatus::Voided),
            _ => None,
        }
    }
}

/// One authorization attempt as reported by the gateway callback. Uniquely
/// identified by the (oid, xid) pair; rows are append-only and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: Option<u64>,
    /// Internal id of the owning order.
    pub order_id: u64,
    /// Merchant order id, denormalized for lookup.
    pub oid: String,
    /// Approval code, 6 characters.
    pub auth_code: Option<String>,
    /// Gateway transaction identifier, 28 characters, base64.
    pub xid: String,
    /// "Approved", "Error" or "Declined".
    pub response: Option<String>,
    /// "00" for authorized, "99" for gateway errors, ISO-8583 codes otherwise.
    pub proc_return_code: String,
    pub trans_id: Option<String>,
    pub err_msg: Option<String>,
    pub client_ip: Option<String>,
    /// Stored with the stronger mask applied; never the raw PAN.
    pub masked_pan: Option<String>,
    pub card_brand: Option<String>,
    pub exp_year: Option<String>,
    pub exp_month: Option<String>,
    /// Gateway transaction date, normalized to `yyyy-MM-dd HH:mm:ss`.
    pub extra_trx_date: Option<String>,
    /// 3-D status code: 1 authenticated, 2-4 attempt, 5-8 unavailable, 0 failed.
    pub md_status: Option<String>,
    pub tx_status: Option<String>,
    pub i_req_code: Option<String>,
    pub i_req_detail: Option<String>,
    pub vendor_code: Option<String>,
    pub pares_syntax_ok: Option<String>,
    pub pares_verified: Option<String>,
    pub eci: Option<String>,
    pub cavv: Option<String>,
    pub cavv_algorithm: Option<String>,
    pub md: Option<String>,
    pub version: Option<String>,
    pub sid: Option<String>,
    pub md_error_msg: Option<String>,
    pub status: TransactionStatus,
    pub time_authorized: Option<NaiveDateTime>,
    pub time_captured_or_voided: Option<NaiveDateTime>,
    /// Set when a callback replays an (oid, xid) pair that is already stored.
    /// Not persisted.
    pub already_processed: bool,
}

impl Transaction {
    /// Build a fresh transaction from verified callback parameters.
    /// Signature and identity checks happen in the ledger before this runs.
    pub fn from_callback(
        params: &HashMap<String, String>,
        order_id: u64,
        dms_mode: bool,
        now: NaiveDateTime,
    ) -> Self {
        let p = |name: &str| params.get(name).filter(|v| !v.is_empty()).cloned();
        let proc_return_code = p("ProcReturnCode").unwrap_or_default();
        let status = if proc_return_code == PROC_RETURN_CODE_OK {
            if dms_mode {
                TransactionStatus::Authorized
            } else {
                TransactionStatus::Captured
            }
        } else {
            TransactionStatus::Failed
        };

        Transaction {
            id: None,
            order_id,
            oid: p("oid").unwrap_or_default(),
            auth_code: p("AuthCode"),
            xid: p("xid").unwrap_or_default(),
            response: p("Response"),
            proc_return_code,
            trans_id: p("TransId"),
            err_msg: p("ErrMsg"),
            client_ip: p("clientIp"),
            masked_pan: p("MaskedPan").map(|pan| apply_stronger_mask(&pan)),
            card_brand: p("EXTRA_CARDBRAND"),
            exp_year: p("Ecom_Payment_Card_ExpDate_Year"),
            exp_month: p("Ecom_Payment_Card_ExpDate_Month"),
            extra_trx_date: p("EXTRA_TRXDATE").map(|d| convert_trx_date(&d)),
            md_status: p("mdStatus"),
            tx_status: p("txstatus"),
            i_req_code: p("iReqCode"),
            i_req_detail: p("iReqDetail"),
            vendor_code: p("vendorCode"),
            pares_syntax_ok: p("PAResSyntaxOK"),
            pares_verified: p("PAResVerified"),
            eci: p("eci"),
            cavv: p("cavv"),
            cavv_algorithm: p("cavvAlgorithm"),
            md: p("md"),
            version: p("version"),
            sid: p("SID"),
            md_error_msg: p("mdErrorMsg"),
            status,
            time_authorized: Some(now),
            time_captured_or_voided: None,
            already_processed: false,
        }
    }

    /// Authoritative "is paid" signal for the owning order.
    pub fn is_successful(&self) -> bool {
        self.proc_return_code == PROC_RETURN_CODE_OK
    }

    pub fn to_field_map(&self) -> FieldMap {
        let mut m = FieldMap::new();
        if let Some(id) = self.id {
            m.set("id", Value::Int(id as i64));
        }
        m.set("orderId", Value::Int(self.order_id as i64));
        m.set("oid", Value::from_opt_text(Some(&self.oid)));
        m.set("authCode", Value::from_opt_text(self.auth_code.as_deref()));
        m.set("xid", Value::from_opt_text(Some(&self.xid)));
        m.set("response", Value::from_opt_text(self.response.as_deref()));
        m.set(
            "procReturnCode",
            Value::from_opt_text(Some(&self.proc_return_code)),
        );
        m.set("transId", Value::from_opt_text(self.trans_id.as_deref()));
        m.set("errMsg", Value::from_opt_text(self.err_msg.as_deref()));
        m.set("clientIp", Value::from_opt_text(self.client_ip.as_deref()));
        m.set("maskedPan", Value::from_opt_text(self.masked_pan.as_deref()));
        m.set("cardBrand", Value::from_opt_text(self.card_brand.as_deref()));
        m.set("expYear", Value::from_opt_text(self.exp_year.as_deref()));
        m.set("expMonth", Value::from_opt_text(self.exp_month.as_deref()));
        m.set(
            "extraTrxDate",
            Value::from_opt_text(self.extra_trx_date.as_deref()),
        );
        m.set("mdStatus", Value::from_opt_text(self.md_status.as_deref()));
        m.set("txstatus", Value::from_opt_text(self.tx_status.as_deref()));
        m.set("iReqCode", Value::from_opt_text(self.i_req_code.as_deref()));
        m.set(
            "iReqDetail",
            Value::from_opt_text(self.i_req_detail.as_deref()),
        );
        m.set(
            "vendorCode",
            Value::from_opt_text(self.vendor_code.as_deref()),
        );
        m.set(
            "paResSyntaxOK",
            Value::from_opt_text(self.pares_syntax_ok.as_deref()),
        );
        m.set(
            "paResVerified",
            Value::from_opt_text(self.pares_verified.as_deref()),
        );
        m.set("eci", Value::from_opt_text(self.eci.as_deref()));
        m.set("cavv", Value::from_opt_text(self.cavv.as_deref()));
        m.set(
            "cavvAlgorithm",
            Value::from_opt_text(self.cavv_algorithm.as_deref()),
        );
        m.set("md", Value::from_opt_text(self.md.as_deref()));
        m.set("version", Value::from_opt_text(self.version.as_deref()));
        m.set("sid", Value::from_opt_text(self.sid.as_deref()));
        m.set(
            "mdErrorMsg",
            Value::from_opt_text(self.md_error_msg.as_deref()),
        );
        m.set("status", Value::Int(self.status.as_i64()));
        m.set(
            "timeAuthorized",
            Value::from_opt_text(
                self.time_authorized
                    .map(|t| t.format(TIME_FORMAT).to_string())
                    .as_deref(),
            ),
        );
        m.set(
            "timeCaptoredOrVoided",
            Value::from_opt_text(
                self.time_captured_or_voided
                    .map(|t| t.format(TIME_FORMAT).to_string())
                    .as_deref(),
            ),
        );
        m
    }

    pub fn from_field_map(m: &FieldMap) -> Self {
        let parse_time = |name: &str| {
            m.text(name)
                .and_then(|t| NaiveDateTime::parse_from_str(&t, TIME_FORMAT).ok())
        };
        Transaction {
            id: m.id("id"),
            order_id: m.id("orderId").unwrap_or(0),
            oid: m.text("oid").unwrap_or_default(),
            auth_code: m.text("authCode"),
            xid: m.text("xid").unwrap_or_default(),
            response: m.text("response"),
            proc_return_code: m.text("procReturnCode").unwrap_or_default(),
            trans_id: m.text("transId"),
            err_msg: m.text("errMsg"),
            client_ip: m.text("clientIp"),
            masked_pan: m.text("maskedPan"),
            card_brand: m.text("cardBrand"),
            exp_year: m.text("expYear"),
            exp_month: m.text("expMonth"),
            extra_trx_date: m.text("extraTrxDate"),
            md_status: m.text("mdStatus"),
            tx_status: m.text("txstatus"),
            i_req_code: m.text("iReqCode"),
            i_req_detail: m.text("iReqDetail"),
            vendor_code: m.text("vendorCode"),
            pares_syntax_ok: m.text("paResSyntaxOK"),
            pares_verified: m.text("paResVerified"),
            eci: m.text("eci"),
            cavv: m.text("cavv"),
            cavv_algorithm: m.text("cavvAlgorithm"),
            md: m.text("md"),
            version: m.text("version"),
            sid: m.text("sid"),
            md_error_msg: m.text("mdErrorMsg"),
            status: m
                .int("status")
                .and_then(TransactionStatus::from_i64)
                .unwrap_or(TransactionStatus::Failed),
            time_authorized: parse_time("timeAuthorized"),
            time_captured_or_voided: parse_time("timeCaptoredOrVoided"),
            already_processed: false,
        }
    }
}

/// Replace the gateway's `XXXXXX***XXXX` mask with the stronger
/// `X*****...` variant: first character kept, five mask characters, the
/// remainder from index 6 on verbatim. PANs of six characters or fewer
/// pass through unchanged.
pub fn apply_stronger_mask(pan: &str) -> String {
    let chars: Vec<char> = pan.chars().collect();
    if chars.len() <= 6 {
        return pan.to_string();
    }
    let mut out = String::with_capacity(chars.len());
    out.push(chars[0]);
    out.push_str("*****");
    out.extend(&chars[6..]);
    out
}

/// Normalize the gateway's compact `yyyyMMdd HH:mm:ss` transaction date to
/// `yyyy-MM-dd HH:mm:ss`. Shorter values pass through unchanged.
pub fn convert_trx_date(date: &str) -> String {
    if date.len() > 8 && date.is_char_boundary(4) && date.is_char_boundary(6) {
        format!("{}-{}-{}", &date[..4], &date[4..6], &date[6..])
    } else {
        date.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 14)
            .unwrap()
            .and_hms_opt(17, 43, 12)
            .unwrap()
    }

    fn callback(proc_return_code: &str) -> HashMap<String, String> {
        let mut p = HashMap::new();
        p.insert("oid".to_string(), "TEST_ORDER_1000".to_string());
        p.insert("xid".to_string(), "XID-0001".to_string());
        p.insert("ProcReturnCode".to_string(), proc_return_code.to_string());
        p.insert("AuthCode".to_string(), "497890".to_string());
        p.insert("MaskedPan".to_string(), "411111***1111".to_string());
        p.insert("EXTRA_TRXDATE".to_string(), "20240714 17:43:12".to_string());
        p.insert("EXTRA_CARDBRAND".to_string(), "VISA".to_string());
        p
    }

    #[test]
    fn test_mask_preserves_first_and_tail() {
        assert_eq!(apply_stronger_mask("4111111111111111"), "4*****1111111111");
        assert_eq!(apply_stronger_mask("411111***1111"), "4********1111");
        // six or fewer characters left alone
        assert_eq!(apply_stronger_mask("411111"), "411111");
        assert_eq!(apply_stronger_mask(""), "");
    }

    #[test]
    fn test_convert_trx_date() {
        assert_eq!(convert_trx_date("20160714 17:43:12"), "2016-07-14 17:43:12");
        assert_eq!(convert_trx_date("20160714"), "20160714");
        assert_eq!(convert_trx_date(""), "");
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TransactionStatus::Failed,
            TransactionStatus::Authorized,
            TransactionStatus::Captured,
            TransactionStatus::Voided,
        ] {
            assert_eq!(TransactionStatus::from_i64(status.as_i64()), Some(status));
        }
        assert_eq!(TransactionStatus::from_i64(9), None);
    }

    #[test]
    fn test_from_callback_authorized_in_dms_mode() {
        let t = Transaction::from_callback(&callback("00"), 5, true, now());
        assert_eq!(t.status, TransactionStatus::Authorized);
        assert_eq!(t.order_id, 5);
        assert_eq!(t.masked_pan.as_deref(), Some("4********1111"));
        assert_eq!(t.extra_trx_date.as_deref(), Some("2024-07-14 17:43:12"));
        assert_eq!(t.time_authorized, Some(now()));
        assert!(t.is_successful());
    }

    #[test]
    fn test_from_callback_captured_without_dms() {
        let t = Transaction::from_callback(&callback("00"), 5, false, now());
        assert_eq!(t.status, TransactionStatus::Captured);
    }

    #[test]
    fn test_from_callback_failed_on_error_code() {
        let t = Transaction::from_callback(&callback("99"), 5, true, now());
        assert_eq!(t.status, TransactionStatus::Failed);
        assert!(!t.is_successful());
    }

    #[test]
    fn test_field_map_round_trip() {
        let mut t = Transaction::from_callback(&callback("00"), 5, true, now());
        t.id = Some(1);
        let restored = Transaction::from_field_map(&t.to_field_map());
        assert_eq!(restored, t);
    }
}
