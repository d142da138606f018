use bigdecimal::BigDecimal;

use crate::config::Config;
use crate::db::schema::{FieldMap, Value};
use crate::domain::{OrderAddress, OrderItem};
use crate::error::{NestPayError, Result};
use crate::sign;

/// Frequency unit for recurring payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyUnit {
    Day,
    Week,
    Month,
    Year,
}

impl FrequencyUnit {
    pub fn code(self) -> &'static str {
        match self {
            FrequencyUnit::Day => "D",
            FrequencyUnit::Week => "W",
            FrequencyUnit::Month => "M",
            FrequencyUnit::Year => "Y",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "D" => Some(FrequencyUnit::Day),
            "W" => Some(FrequencyUnit::Week),
            "M" => Some(FrequencyUnit::Month),
            "Y" => Some(FrequencyUnit::Year),
            _ => None,
        }
    }
}

/// Recurring payment descriptor: all three parts required together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurringPayment {
    pub count: u32,
    pub frequency_unit: FrequencyUnit,
    pub frequency: u32,
}

impl RecurringPayment {
    pub fn new(count: u32, frequency_unit: FrequencyUnit, frequency: u32) -> Result<Self> {
        if count == 0 || frequency == 0 {
            return Err(NestPayError::Validation(
                "invalid recurring parameters".to_string(),
            ));
        }
        Ok(RecurringPayment {
            count,
            frequency_unit,
            frequency,
        })
    }
}

/// Merchant order: identity, amount/currency, return URLs and the owned
/// child entities (addresses, line items). Amount and currency are immutable
/// once the order is first persisted; the store enforces that on re-creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Option<u64>,
    /// Merchant order id, unique, maximum 64 characters.
    pub oid: String,
    pub amount: BigDecimal,
    /// ISO 4217 numeric currency code, treated as opaque.
    pub currency: u32,
    /// Hosted page language ("en", "tr", ...).
    pub lang: String,
    pub ok_url: String,
    pub fail_url: String,
    pub description: Option<String>,
    pub comments: Option<String>,
    pub installment: Option<u32>,
    pub grace_period: Option<u32>,
    pub email: Option<String>,
    pub tel: Option<String>,
    pub shop_url: Option<String>,
    pub recurring: Option<RecurringPayment>,
    pub billing_address: Option<OrderAddress>,
    pub shipping_address: Option<OrderAddress>,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn new(
        oid: &str,
        amount: BigDecimal,
        currency: u32,
        lang: &str,
        ok_url: &str,
        fail_url: &str,
    ) -> Self {
        Order {
            id: None,
            oid: oid.to_string(),
            amount,
            currency,
            lang: lang.to_string(),
            ok_url: ok_url.to_string(),
            fail_url: fail_url.to_string(),
            description: None,
            comments: None,
            installment: None,
            grace_period: None,
            email: None,
            tel: None,
            shop_url: None,
            recurring: None,
            billing_address: None,
            shipping_address: None,
            items: Vec::new(),
        }
    }

    /// Append a line item; the 1-based sequence number is assigned here.
    pub fn add_item(
        &mut self,
        item_id: &str,
        item_number: &str,
        product_code: &str,
        qty: BigDecimal,
        description: &str,
        unit_price: BigDecimal,
    ) -> &mut Self {
        let nr = self.items.len() as u32 + 1;
        self.items.push(OrderItem::new(
            nr,
            item_id,
            item_number,
            product_code,
            qty,
            description,
            unit_price,
        ));
        self
    }

    pub fn set_recurring(
        &mut self,
        count: u32,
        frequency_unit: FrequencyUnit,
        frequency: u32,
    ) -> Result<&mut Self> {
        self.recurring = Some(RecurringPayment::new(count, frequency_unit, frequency)?);
        Ok(self)
    }

    /// Assemble the full ordered parameter set for the hosted payment page,
    /// including the signature over the fixed outbound field order.
    pub fn redirect_params(&self, config: &Config) -> Result<Vec<(String, String)>> {
        let client_id = config.merchant_id()?.to_string();
        let store_key = config.store_key()?;

        let storetype = if config.disable_3d {
            "pay_hosting"
        } else {
            "3d_pay_hosting"
        };
        let trantype = if config.dms_mode { "PreAuth" } else { "Auth" };
        let amount = self.amount.to_string();
        let currency = self.currency.to_string();
        let instalment = self
            .installment
            .map(|i| i.to_string())
            .unwrap_or_default();

        let mut params: Vec<(String, String)> = vec![
            ("clientid".to_string(), client_id.clone()),
            ("storetype".to_string(), storetype.to_string()),
            ("trantype".to_string(), trantype.to_string()),
            ("amount".to_string(), amount.clone()),
            ("currency".to_string(), currency.clone()),
            ("lang".to_string(), self.lang.clone()),
            ("okUrl".to_string(), self.ok_url.clone()),
            ("failUrl".to_string(), self.fail_url.clone()),
            ("oid".to_string(), self.oid.clone()),
        ];

        if let Some(description) = &self.description {
            params.push(("description".to_string(), description.clone()));
        }
        if let Some(comments) = &self.comments {
            params.push(("comments".to_string(), comments.clone()));
        }
        // always present: participates in the signature even when empty
        params.push(("instalment".to_string(), instalment.clone()));
        if let Some(grace_period) = self.grace_period {
            params.push(("GRACEPERIOD".to_string(), grace_period.to_string()));
        }
        if let Some(email) = &self.email {
            params.push(("email".to_string(), email.clone()));
        }
        if let Some(tel) = &self.tel {
            params.push(("tel".to_string(), tel.clone()));
        }
        if let Some(shop_url) = &self.shop_url {
            params.push(("shopurl".to_string(), shop_url.clone()));
        }
        if let Some(recurring) = &self.recurring {
            params.push((
                "RecurringPaymentNumber".to_string(),
                recurring.count.to_string(),
            ));
            params.push((
                "RecurringFrequencyUnit".to_string(),
                recurring.frequency_unit.code().to_string(),
            ));
            params.push((
                "RecurringFrequency".to_string(),
                recurring.frequency.to_string(),
            ));
        }

        let rnd = sign::nonce(&self.oid);
        let hash = sign::sign_fields(
            [
                client_id.as_str(),
                self.oid.as_str(),
                amount.as_str(),
                self.ok_url.as_str(),
                self.fail_url.as_str(),
                trantype,
                instalment.as_str(),
                rnd.as_str(),
                "",
                "",
                "",
                currency.as_str(),
            ],
            store_key,
        );
        params.push(("rnd".to_string(), rnd));
        params.push(("hash".to_string(), hash));
        params.push(("hashAlgorithm".to_string(), "Ver2".to_string()));
        params.push(("encoding".to_string(), "utf-8".to_string()));

        if let Some(address) = &self.billing_address {
            params.extend(address.redirect_params());
        }
        if let Some(address) = &self.shipping_address {
            params.extend(address.redirect_params());
        }
        for item in &self.items {
            params.extend(item.redirect_params());
        }

        params.push((
            "printBillTo".to_string(),
            self.billing_address.is_some().to_string(),
        ));
        params.push((
            "printShipTo".to_string(),
            self.shipping_address.is_some().to_string(),
        ));
        params.push(("refreshtime".to_string(), config.refresh_time.to_string()));

        Ok(params)
    }

    /// Render the auto-submitting redirect form, optionally wrapped in a
    /// complete HTML page and with a fallback submit button for clients
    /// where the script does not run.
    pub fn redirect_form(
        &self,
        config: &Config,
        complete_page: bool,
        button_text: Option<&str>,
    ) -> Result<String> {
        let mut form = String::new();
        if complete_page {
            form.push_str(
                "<html>\n<head>\n<title>Redirecting to NestPay...</title>\n\
                 <meta http-equiv=\"Content-Language\" content=\"en\">\n\
                 <meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\">\n\
                 </head>\n<body>\n",
            );
        }

        form.push_str(&format!(
            "<form name=\"nestpayForm\" action=\"{}\" method=\"post\">\n",
            config.hosted_3d_url()
        ));
        for (name, value) in self.redirect_params(config)? {
            form.push_str(&format!(
                "<input type=\"hidden\" name=\"{}\" value=\"{}\" />\n",
                name,
                value.replace('"', "'")
            ));
        }
        if let Some(text) = button_text {
            form.push_str(&format!(
                "<input type=\"submit\" name=\"send\" value=\"{}\" />\n",
                text
            ));
        }
        form.push_str("</form>\n");
        form.push_str("<script>document.forms[\"nestpayForm\"].submit();</script>\n");
        if complete_page {
            form.push_str("</body></html>");
        }
        Ok(form)
    }

    pub fn to_field_map(&self) -> FieldMap {
        let mut m = FieldMap::new();
        if let Some(id) = self.id {
            m.set("id", Value::Int(id as i64));
        }
        m.set("oid", Value::from_opt_text(Some(&self.oid)));
        m.set("amount", Value::Decimal(self.amount.clone()));
        m.set(
            "currency",
            Value::Text(self.currency.to_string()),
        );
        m.set("lang", Value::from_opt_text(Some(&self.lang)));
        m.set("okUrl", Value::from_opt_text(Some(&self.ok_url)));
        m.set("failUrl", Value::from_opt_text(Some(&self.fail_url)));
        m.set("description", Value::from_opt_text(self.description.as_deref()));
        m.set("comments", Value::from_opt_text(self.comments.as_deref()));
        m.set(
            "installment",
            self.installment
                .map(|v| Value::Int(i64::from(v)))
                .unwrap_or(Value::Null),
        );
        m.set(
            "gracePeriod",
            self.grace_period
                .map(|v| Value::Int(i64::from(v)))
                .unwrap_or(Value::Null),
        );
        m.set("email", Value::from_opt_text(self.email.as_deref()));
        m.set("tel", Value::from_opt_text(self.tel.as_deref()));
        m.set("shopUrl", Value::from_opt_text(self.shop_url.as_deref()));
        m.set(
            "recurringPaymentNumber",
            self.recurring
                .map(|r| Value::Int(i64::from(r.count)))
                .unwrap_or(Value::Null),
        );
        m.set(
            "recurringFrequencyUnit",
            self.recurring
                .map(|r| Value::Text(r.frequency_unit.code().to_string()))
                .unwrap_or(Value::Null),
        );
        m.set(
            "recurringFrequency",
            self.recurring
                .map(|r| Value::Int(i64::from(r.frequency)))
                .unwrap_or(Value::Null),
        );
        m.set(
            "billingAddress",
            self.billing_address
                .as_ref()
                .and_then(|a| a.id)
                .map(|id| Value::Int(id as i64))
                .unwrap_or(Value::Null),
        );
        m.set(
            "shippingAddress",
            self.shipping_address
                .as_ref()
                .and_then(|a| a.id)
                .map(|id| Value::Int(id as i64))
                .unwrap_or(Value::Null),
        );
        m
    }

    /// Decode the order row alone; addresses and items are attached by the
    /// store, which owns the follow-up lookups.
    pub fn from_field_map(m: &FieldMap) -> Self {
        let recurring = match (
            m.int("recurringPaymentNumber"),
            m.text("recurringFrequencyUnit")
                .as_deref()
                .and_then(FrequencyUnit::from_code),
            m.int("recurringFrequency"),
        ) {
            (Some(count), Some(unit), Some(frequency)) if count > 0 && frequency > 0 => {
                Some(RecurringPayment {
                    count: count as u32,
                    frequency_unit: unit,
                    frequency: frequency as u32,
                })
            }
            _ => None,
        };

        Order {
            id: m.id("id"),
            oid: m.text("oid").unwrap_or_default(),
            amount: m.decimal("amount").unwrap_or_default(),
            currency: m
                .text("currency")
                .and_then(|c| c.parse().ok())
                .unwrap_or(0),
            lang: m.text("lang").unwrap_or_default(),
            ok_url: m.text("okUrl").unwrap_or_default(),
            fail_url: m.text("failUrl").unwrap_or_default(),
            description: m.text("description"),
            comments: m.text("comments"),
            installment: m.int("installment").map(|v| v as u32),
            grace_period: m.int("gracePeriod").map(|v| v as u32),
            email: m.text("email"),
            tel: m.text("tel"),
            shop_url: m.text("shopUrl"),
            recurring,
            billing_address: None,
            shipping_address: None,
            items: Vec::new(),
        }
    }

    /// Address row ids, for the store's follow-up lookups.
    pub fn address_ids(m: &FieldMap) -> (Option<u64>, Option<u64>) {
        (m.id("billingAddress"), m.id("shippingAddress"))
    }
}
