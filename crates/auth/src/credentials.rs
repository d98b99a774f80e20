use isperp_core::FieldError;
use isperp_core::contact;

/// Login form input.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Form-level checks done before anything is sent to the backend.
    pub fn validate(&self) -> Result<(), FieldError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(FieldError::new("email", "e-mail is required"));
        }
        if !contact::is_valid_email(email) {
            return Err(FieldError::new("email", "invalid e-mail"));
        }
        if self.password.is_empty() {
            return Err(FieldError::new("password", "password is required"));
        }
        Ok(())
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
