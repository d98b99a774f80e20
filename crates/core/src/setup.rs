//! First-run setup wizard: request body and per-step validation.
//!
//! The wizard collects three groups of data (administrator account, company,
//! site appearance) and submits them in one request. Each step is validated
//! before the user may advance, so validation is exposed per step as well as
//! for the whole request.

use serde::Serialize;

use crate::contact;
use crate::error::FieldError;

pub const DEFAULT_PRIMARY_COLOR: &str = "#1976d2";
pub const DEFAULT_SECONDARY_COLOR: &str = "#dc004e";

/// Minimum administrator password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupStep {
    Admin,
    Company,
    Site,
}

impl SetupStep {
    pub const ALL: [SetupStep; 3] = [SetupStep::Admin, SetupStep::Company, SetupStep::Site];

    pub fn title(&self) -> &'static str {
        match self {
            SetupStep::Admin => "Administrator account",
            SetupStep::Company => "Company information",
            SetupStep::Site => "Site customisation",
        }
    }

    pub fn next(&self) -> Option<SetupStep> {
        match self {
            SetupStep::Admin => Some(SetupStep::Company),
            SetupStep::Company => Some(SetupStep::Site),
            SetupStep::Site => None,
        }
    }
}

/// Body of `POST /initial-setup`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRequest {
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
    /// Form-only confirmation field; never sent.
    #[serde(skip)]
    pub confirm_password: String,

    pub company_name: String,
    pub company_cnpj: String,
    pub company_address: String,
    pub company_phone: String,
    pub company_email: String,
    pub company_website: String,

    pub site_title: String,
    pub site_description: String,
    pub primary_color: String,
    pub secondary_color: String,
}

impl Default for SetupRequest {
    fn default() -> Self {
        Self {
            admin_name: String::new(),
            admin_email: String::new(),
            admin_password: String::new(),
            confirm_password: String::new(),
            company_name: String::new(),
            company_cnpj: String::new(),
            company_address: String::new(),
            company_phone: String::new(),
            company_email: String::new(),
            company_website: String::new(),
            site_title: String::new(),
            site_description: String::new(),
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            secondary_color: DEFAULT_SECONDARY_COLOR.to_string(),
        }
    }
}

impl core::fmt::Debug for SetupRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SetupRequest")
            .field("admin_name", &self.admin_name)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"<redacted>")
            .field("company_name", &self.company_name)
            .field("site_title", &self.site_title)
            .finish_non_exhaustive()
    }
}

impl SetupRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate one wizard step, reporting the first failing field.
    pub fn validate_step(&self, step: SetupStep) -> Result<(), FieldError> {
        match step {
            SetupStep::Admin => self.validate_admin(),
            SetupStep::Company => self.validate_company(),
            SetupStep::Site => self.validate_site(),
        }
    }

    /// Validate every step in wizard order.
    pub fn validate_all(&self) -> Result<(), FieldError> {
        SetupStep::ALL
            .iter()
            .try_for_each(|step| self.validate_step(*step))
    }

    fn validate_admin(&self) -> Result<(), FieldError> {
        required("adminName", &self.admin_name)?;
        max_len("adminName", &self.admin_name, 255)?;

        required("adminEmail", &self.admin_email)?;
        email("adminEmail", &self.admin_email)?;
        max_len("adminEmail", &self.admin_email, 255)?;

        required("adminPassword", &self.admin_password)?;
        if self.admin_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FieldError::new(
                "adminPassword",
                format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        required("confirmPassword", &self.confirm_password)?;
        if self.confirm_password != self.admin_password {
            return Err(FieldError::new("confirmPassword", "passwords must match"));
        }
        Ok(())
    }

    fn validate_company(&self) -> Result<(), FieldError> {
        required("companyName", &self.company_name)?;
        max_len("companyName", &self.company_name, 255)?;
        max_len("companyCnpj", &self.company_cnpj, 20)?;
        max_len("companyAddress", &self.company_address, 500)?;
        max_len("companyPhone", &self.company_phone, 20)?;

        if !self.company_email.trim().is_empty() {
            email("companyEmail", &self.company_email)?;
        }
        max_len("companyEmail", &self.company_email, 255)?;

        let website = self.company_website.trim();
        if !website.is_empty() && !contact::is_valid_url(website) {
            return Err(FieldError::new("companyWebsite", "invalid URL"));
        }
        max_len("companyWebsite", &self.company_website, 255)
    }

    fn validate_site(&self) -> Result<(), FieldError> {
        required("siteTitle", &self.site_title)?;
        max_len("siteTitle", &self.site_title, 255)?;
        max_len("siteDescription", &self.site_description, 500)?;
        max_len("primaryColor", &self.primary_color, 7)?;
        max_len("secondaryColor", &self.secondary_color, 7)
    }
}

fn required(field: &'static str, value: &str) -> Result<(), FieldError> {
    if value.trim().is_empty() {
        return Err(FieldError::new(field, "required"));
    }
    Ok(())
}

fn email(field: &'static str, value: &str) -> Result<(), FieldError> {
    if !contact::is_valid_email(value.trim()) {
        return Err(FieldError::new(field, "invalid e-mail"));
    }
    Ok(())
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
