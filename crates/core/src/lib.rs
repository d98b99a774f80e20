//! `isperp-core`: domain building blocks for the ISP ERP client.
//!
//! This crate is **pure**: no IO, no async, no global state. It holds the CPF
//! checksum module, the contact input masks, and the field validation used by
//! the customer form and the first-run setup wizard.

pub mod contact;
pub mod cpf;
pub mod customer;
pub mod error;
pub mod id;
pub mod setup;
pub mod value_object;

pub use cpf::Cpf;
pub use customer::CustomerDraft;
pub use error::{DomainError, DomainResult, FieldError};
pub use id::{ContextId, CustomerId};
pub use setup::{SetupRequest, SetupStep};
pub use value_object::ValueObject;
