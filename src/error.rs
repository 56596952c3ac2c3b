//! Crate-wide error taxonomy.

use std::collections::BTreeMap;

use thiserror::Error;
use uuid::Uuid;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::checkout::BlockingItem;
use crate::domain::value_objects::MoneyError;
use crate::providers::measurement::MeasurementProviderError;
use crate::providers::payment::PaymentProviderError;

/// Field name -> human readable messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum MarketplaceError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("unknown suit model '{0}'")]
    InvalidModel(String),

    #[error("fabric {0} not found")]
    FabricNotFound(Uuid),

    #[error("fabric {0} is no longer available")]
    FabricInactive(Uuid),

    #[error("fabric {fabric_id} is used by {product_count} product(s)")]
    FabricInUse { fabric_id: Uuid, product_count: i64 },

    #[error("product {0} not found")]
    ProductNotFound(Uuid),

    #[error("product {0} is not available")]
    ProductInactive(Uuid),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{message}")]
    Conflict { message: String, existing_item_id: Option<Uuid> },

    #[error("not allowed to access this resource")]
    Forbidden,

    #[error("authentication required")]
    Unauthorized,

    #[error("cart is empty")]
    EmptyCart,

    #[error("{} item(s) have no measurement session", .0.len())]
    MissingMeasurements(Vec<BlockingItem>),

    #[error("{} item(s) have incomplete measurements", .0.len())]
    IncompleteMeasurements(Vec<BlockingItem>),

    #[error("pricing configuration invalid: {0}")]
    PricingConfig(String),

    #[error("checkout failed: {0}")]
    CheckoutFailed(String),

    #[error("measurement provider failed: {0}")]
    MeasurementProvider(String),

    #[error("money arithmetic failed: {0}")]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl MarketplaceError {
    /// Single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        Self::Validation(fields)
    }
}

impl From<ValidationErrors> for MarketplaceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        flatten_validation_errors(None, &errors, &mut fields);
        Self::Validation(fields)
    }
}

impl From<PaymentProviderError> for MarketplaceError {
    fn from(error: PaymentProviderError) -> Self {
        Self::CheckoutFailed(error.to_string())
    }
}

impl From<MeasurementProviderError> for MarketplaceError {
    fn from(error: MeasurementProviderError) -> Self {
        match error {
            MeasurementProviderError::SessionNotFound(_) => Self::NotFound { entity: "measurement session" },
            other => Self::MeasurementProvider(other.to_string()),
        }
    }
}

/// Field keys follow the wire names, so `monogram_text` reports as `monogramText`.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn flatten_validation_errors(prefix: Option<&str>, errors: &ValidationErrors, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let field = camel_case(field);
        let path = match prefix {
            Some(p) => format!("{p}.{field}"),
            None => field,
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let messages = list
                    .iter()
                    .map(|e| e.message.as_ref().map_or_else(|| e.code.to_string(), ToString::to_string))
                    .collect::<Vec<_>>();
                out.entry(path).or_default().extend(messages);
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(Some(&path), inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(Some(&format!("{path}[{index}]")), inner, out);
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketplaceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(range(min = 1, max = 10, message = "quantity must be between 1 and 10"))]
        quantity: Option<u32>,
        #[validate(length(max = 3))]
        notes: Option<String>,
        #[validate(length(max = 2))]
        postal_code: Option<String>,
    }

    #[test]
    fn test_validation_errors_flatten_to_fields() {
        let payload = Payload { quantity: Some(15), notes: Some("long".into()), postal_code: None };
        let err: MarketplaceError = payload.validate().unwrap_err().into();
        let MarketplaceError::Validation(fields) = err else { panic!("expected validation error") };
        assert_eq!(fields["quantity"], vec!["quantity must be between 1 and 10".to_string()]);
        assert_eq!(fields["notes"], vec!["length".to_string()]);
    }

    #[test]
    fn test_field_keys_use_wire_names() {
        let payload = Payload { quantity: None, notes: None, postal_code: Some("W1S 3PQ".into()) };
        let err: MarketplaceError = payload.validate().unwrap_err().into();
        let MarketplaceError::Validation(fields) = err else { panic!("expected validation error") };
        assert!(fields.contains_key("postalCode"), "got {fields:?}");
        assert!(!fields.contains_key("postal_code"));
    }

    #[test]
    fn test_provider_not_found_maps_to_not_found() {
        let err: MarketplaceError = MeasurementProviderError::SessionNotFound("abc".into()).into();
        assert!(matches!(err, MarketplaceError::NotFound { .. }));
    }
}
