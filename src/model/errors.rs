//! Object model error types.

use miette::Diagnostic;
use thiserror::Error;

/// Error raised by the configuration object model.
#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("type `{type_name}` has no property named `{property}`")]
    #[diagnostic(code(gantry::model::unknown_property))]
    UnknownProperty { type_name: String, property: String },

    #[error("property `{property}` of `{type_name}` is a {actual} property, not a {expected} property")]
    #[diagnostic(code(gantry::model::wrong_property_kind))]
    WrongPropertyKind {
        type_name: String,
        property: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("the value for property `{property}` of `{type_name}` is final and cannot be changed any further")]
    #[diagnostic(
        code(gantry::model::property_finalized),
        help("Configure the property before the feature that owns it is applied")
    )]
    PropertyFinalized { type_name: String, property: String },

    #[error("cannot instantiate abstract type `{type_name}`")]
    #[diagnostic(
        code(gantry::model::abstract_type),
        help("Register a concrete implementation type for `{type_name}`")
    )]
    AbstractType { type_name: String },

    #[error("container `{container}` already has an element named `{element}`")]
    #[diagnostic(code(gantry::model::duplicate_element))]
    DuplicateElement { container: String, element: String },

    #[error("could not find method `{method}` on object of type `{type_name}`")]
    #[diagnostic(code(gantry::model::missing_method))]
    MissingMethod { type_name: String, method: String },

    #[error("no service of type `{service}` is registered")]
    #[diagnostic(code(gantry::model::unknown_service))]
    UnknownService { service: &'static str },
}
