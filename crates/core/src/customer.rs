//! Customer records and customer-form validation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::contact;
use crate::cpf;
use crate::error::FieldError;
use crate::id::CustomerId;

const NAME_MAX: usize = 255;
const EMAIL_MAX: usize = 255;
const PHONE_MAX: usize = 20;
const ADDRESS_MAX: usize = 500;
const CITY_MAX: usize = 100;
const STATE_MAX: usize = 2;

/// Customer as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub cpf: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

fn default_active() -> bool {
    true
}

/// Customer form contents as typed by the user (masks included).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomerDraft {
    pub name: String,
    pub cpf: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub active: bool,
}

/// Body sent to the backend on create/update: masks removed, blanks omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    pub name: String,
    pub cpf: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    pub active: bool,
}

impl CustomerDraft {
    /// A blank form; new customers start active.
    pub fn new() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    /// Pre-fill the edit form, re-applying the input masks.
    pub fn from_customer(customer: &Customer) -> Self {
        Self {
            name: customer.name.clone(),
            cpf: cpf::format(&customer.cpf),
            email: customer.email.clone().unwrap_or_default(),
            phone: contact::format_phone(customer.phone.as_deref().unwrap_or_default()),
            address: customer.address.clone().unwrap_or_default(),
            city: customer.city.clone().unwrap_or_default(),
            state: customer.state.clone().unwrap_or_default(),
            zip_code: contact::format_zip_code(customer.zip_code.as_deref().unwrap_or_default()),
            active: customer.active,
        }
    }

    /// Validate the form, reporting the first failing field.
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.name.trim().is_empty() {
            return Err(FieldError::new("name", "name is required"));
        }
        if self.cpf.trim().is_empty() {
            return Err(FieldError::new("cpf", "CPF is required"));
        }
        if !cpf::validate(&self.cpf) {
            return Err(FieldError::new("cpf", "invalid CPF"));
        }
        let email = self.email.trim();
        if !email.is_empty() && !contact::is_valid_email(email) {
            return Err(FieldError::new("email", "invalid e-mail"));
        }
        let zip = self.zip_code.trim();
        if !zip.is_empty() && !contact::is_valid_zip_code(zip) {
            return Err(FieldError::new("zipCode", "invalid CEP"));
        }

        max_len("name", self.name.trim(), NAME_MAX)?;
        max_len("email", email, EMAIL_MAX)?;
        max_len("phone", &contact::digits_only(&self.phone), PHONE_MAX)?;
        max_len("address", self.address.trim(), ADDRESS_MAX)?;
        max_len("city", self.city.trim(), CITY_MAX)?;
        max_len("state", self.state.trim(), STATE_MAX)?;
        Ok(())
    }

    /// Validate and build the request body.
    pub fn to_payload(&self) -> Result<CustomerPayload, FieldError> {
        self.validate()?;
        Ok(CustomerPayload {
            name: self.name.trim().to_string(),
            cpf: cpf::clean(&self.cpf),
            email: non_blank(self.email.trim().to_string()),
            phone: non_blank(contact::digits_only(&self.phone)),
            address: non_blank(self.address.trim().to_string()),
            city: non_blank(self.city.trim().to_string()),
            state: non_blank(self.state.trim().to_uppercase()),
            zip_code: non_blank(contact::digits_only(&self.zip_code)),
            active: self.active,
        })
    }
}

fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), FieldError> {
    if value.chars().count() > max {
        return Err(FieldError::new(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

fn non_blank(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> CustomerDraft {
        CustomerDraft {
            name: "Maria Souza".to_string(),
            cpf: "111.444.777-35".to_string(),
            email: "maria@example.com".to_string(),
            phone: "(11) 98888-7777".to_string(),
            address: "Rua A, 10".to_string(),
            city: "São Paulo".to_string(),
            state: "sp".to_string(),
            zip_code: "01310-100".to_string(),
            active: true,
        }
    }

    #[test]
    fn new_draft_starts_active() {
        assert!(CustomerDraft::new().active);
    }

    #[test]
    fn valid_draft_builds_clean_payload() {
        let payload = filled().to_payload().unwrap();
        assert_eq!(payload.cpf, "11144477735");
        assert_eq!(payload.phone.as_deref(), Some("11988887777"));
        assert_eq!(payload.zip_code.as_deref(), Some("01310100"));
        assert_eq!(payload.state.as_deref(), Some("SP"));
    }

    #[test]
    fn first_failing_field_is_reported() {
        let mut draft = filled();
        draft.name = "  ".to_string();
        draft.cpf = String::new();
        assert_eq!(draft.validate().unwrap_err().field, "name");

        draft.name = "Maria".to_string();
        assert_eq!(draft.validate().unwrap_err().message, "CPF is required");

        draft.cpf = "111.444.777-36".to_string();
        assert_eq!(draft.validate().unwrap_err().message, "invalid CPF");
    }

    #[test]
    fn email_is_optional_but_checked_when_present() {
        let mut draft = filled();
        draft.email = String::new();
        assert!(draft.validate().is_ok());

        draft.email = "maria@".to_string();
        assert_eq!(draft.validate().unwrap_err().field, "email");
    }

    #[test]
    fn length_limits_follow_backend_columns() {
        let mut draft = filled();
        draft.state = "SPX".to_string();
        assert_eq!(draft.validate().unwrap_err().field, "state");
    }

    #[test]
    fn blank_optionals_are_omitted_from_payload() {
        let mut draft = filled();
        draft.email.clear();
        draft.phone.clear();
        let json = serde_json::to_value(draft.to_payload().unwrap()).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("phone").is_none());
        assert_eq!(json["zipCode"], "01310100");
    }

    #[test]
    fn edit_form_reapplies_masks() {
        let customer: Customer = serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "Maria",
            "cpf": "11144477735",
            "phone": "1133334444",
            "zipCode": "01310100",
            "createdAt": "2024-03-01T10:15:00"
        }))
        .unwrap();

        let draft = CustomerDraft::from_customer(&customer);
        assert_eq!(draft.cpf, "111.444.777-35");
        assert_eq!(draft.phone, "(11) 3333-4444");
        assert_eq!(draft.zip_code, "01310-100");
        assert!(draft.active);
    }
}
