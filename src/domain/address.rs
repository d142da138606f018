use crate::db::schema::{FieldMap, Value};

/// Billing or shipping address, owned by exactly one order. The shipping
/// discriminator selects the outward parameter names (`BillTo*`/`ShipTo*`).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAddress {
    pub id: Option<u64>,
    pub company: String,
    pub name: String,
    pub street1: String,
    pub street2: String,
    pub city: String,
    pub state_prov: String,
    pub postal_code: String,
    pub country: String,
    pub shipping: bool,
}

impl OrderAddress {
    #[allow(clippy::too_many_arguments)]
    pub fn billing(
        company: &str,
        name: &str,
        street1: &str,
        street2: &str,
        city: &str,
        state_prov: &str,
        postal_code: &str,
        country: &str,
    ) -> Self {
        Self::new(
            company, name, street1, street2, city, state_prov, postal_code, country, false,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn shipping(
        company: &str,
        name: &str,
        street1: &str,
        street2: &str,
        city: &str,
        state_prov: &str,
        postal_code: &str,
        country: &str,
    ) -> Self {
        Self::new(
            company, name, street1, street2, city, state_prov, postal_code, country, true,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn new(
        company: &str,
        name: &str,
        street1: &str,
        street2: &str,
        city: &str,
        state_prov: &str,
        postal_code: &str,
        country: &str,
        shipping: bool,
    ) -> Self {
        OrderAddress {
            id: None,
            company: company.to_string(),
            name: name.to_string(),
            street1: street1.to_string(),
            street2: street2.to_string(),
            city: city.to_string(),
            state_prov: state_prov.to_string(),
            postal_code: postal_code.to_string(),
            country: country.to_string(),
            shipping,
        }
    }

    /// Hosted-page parameters for this address.
    pub fn redirect_params(&self) -> Vec<(String, String)> {
        let prefix = if self.shipping { "ShipTo" } else { "BillTo" };
        [
            ("Company", &self.company),
            ("Name", &self.name),
            ("Street1", &self.street1),
            ("Street2", &self.street2),
            ("City", &self.city),
            ("StateProv", &self.state_prov),
            ("PostalCode", &self.postal_code),
            ("Country", &self.country),
        ]
        .into_iter()
        .map(|(suffix, value)| (format!("{}{}", prefix, suffix), value.clone()))
        .collect()
    }

    pub fn to_field_map(&self) -> FieldMap {
        let mut m = FieldMap::new();
        if let Some(id) = self.id {
            m.set("id", Value::Int(id as i64));
        }
        m.set("company", Value::from_opt_text(Some(&self.company)));
        m.set("name", Value::from_opt_text(Some(&self.name)));
        m.set("street1", Value::from_opt_text(Some(&self.street1)));
        m.set("street2", Value::from_opt_text(Some(&self.street2)));
        m.set("city", Value::from_opt_text(Some(&self.city)));
        m.set("stateProv", Value::from_opt_text(Some(&self.state_prov)));
        m.set("postalCode", Value::from_opt_text(Some(&self.postal_code)));
        m.set("country", Value::from_opt_text(Some(&self.country)));
        m.set("isShipping", Value::Int(i64::from(self.shipping)));
        m
    }

    pub fn from_field_map(m: &FieldMap) -> Self {
        OrderAddress {
            id: m.id("id"),
            company: m.text("company").unwrap_or_default(),
            name: m.text("name").unwrap_or_default(),
            street1: m.text("street1").unwrap_or_default(),
            street2: m.text("street2").unwrap_or_default(),
            city: m.text("city").unwrap_or_default(),
            state_prov: m.text("stateProv").unwrap_or_default(),
            postal_code: m.text("postalCode").unwrap_or_default(),
            country: m.text("country").unwrap_or_default(),
            shipping: m.int("isShipping").unwrap_or(0) != 0,
        }
    }
}
