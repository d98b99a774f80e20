//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and no lifecycle: two instances holding the
/// same digits are the same value. A [`Cpf`](crate::Cpf) is the canonical
/// example in this crate; it is never "updated", only parsed again.
///
/// The trait requires:
/// - **Clone**: values are copied around freely between forms and requests
/// - **PartialEq**: comparison is by attribute values
/// - **Debug**: values show up in logs and test failures
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
