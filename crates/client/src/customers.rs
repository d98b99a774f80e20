//! Customer endpoints (`/customers`).

use reqwest::Method;

use isperp_core::customer::{Customer, CustomerDraft, CustomerPayload};
use isperp_core::{CustomerId, FieldError};

use crate::error::ClientError;
use crate::http::ApiClient;

/// Field a customer search matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerSearch {
    Name,
    Cpf,
}

impl CustomerSearch {
    fn param(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Cpf => "cpf",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CustomerApiError {
    #[error("invalid customer: {0}")]
    Invalid(FieldError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

#[derive(Debug, Clone)]
pub struct CustomerApi {
    api: ApiClient,
}

impl CustomerApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Active customers only, unless `include_inactive`.
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Customer>, ClientError> {
        let path = if include_inactive {
            "/customers"
        } else {
            "/customers/active"
        };
        self.api.send_json(self.api.request(Method::GET, path)).await
    }

    /// Search by name or CPF. A blank term lists active customers.
    pub async fn search(&self, by: CustomerSearch, term: &str) -> Result<Vec<Customer>, ClientError> {
        let term = term.trim();
        if term.is_empty() {
            return self.list(false).await;
        }
        let req = self
            .api
            .request(Method::GET, &format!("/customers/search/{}", by.param()))
            .query(&[(by.param(), term)]);
        self.api.send_json(req).await
    }

    /// `None` when the backend answers 404.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, ClientError> {
        let req = self.api.request(Method::GET, &format!("/customers/{id}"));
        match self.api.send_json(req).await {
            Ok(customer) => Ok(Some(customer)),
            Err(err) if err.status() == Some(404) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Validate the form, strip masks and create the customer.
    pub async fn create(&self, draft: &CustomerDraft) -> Result<Customer, CustomerApiError> {
        let payload = draft.to_payload().map_err(CustomerApiError::Invalid)?;
        let created = self.send_payload(Method::POST, "/customers".to_string(), &payload).await?;
        tracing::info!(customer_id = %created.id, "customer created");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: CustomerId,
        draft: &CustomerDraft,
    ) -> Result<Customer, CustomerApiError> {
        let payload = draft.to_payload().map_err(CustomerApiError::Invalid)?;
        let updated = self
            .send_payload(Method::PUT, format!("/customers/{id}"), &payload)
            .await?;
        tracing::info!(customer_id = %id, "customer updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: CustomerId) -> Result<(), ClientError> {
        let req = self.api.request(Method::DELETE, &format!("/customers/{id}"));
        self.api.send_empty(req).await?;
        tracing::info!(customer_id = %id, "customer deleted");
        Ok(())
    }

    pub async fn set_active(&self, id: CustomerId, active: bool) -> Result<(), ClientError> {
        let action = if active { "activate" } else { "deactivate" };
        let req = self
            .api
            .request(Method::PATCH, &format!("/customers/{id}/{action}"));
        self.api.send_empty(req).await
    }

    async fn send_payload(
        &self,
        method: Method,
        path: String,
        payload: &CustomerPayload,
    ) -> Result<Customer, ClientError> {
        let req = self.api.request(method, &path).json(payload);
        self.api.send_json(req).await
    }
}
