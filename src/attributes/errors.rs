//! Attribute schema errors.

use miette::Diagnostic;
use thiserror::Error;

use crate::attributes::value::AttributeType;
use crate::util::diagnostic::Diagnostic as GantryDiagnostic;

/// Error raised while declaring attributes or building attribute sets.
#[derive(Debug, Error, Diagnostic)]
pub enum AttributeError {
    #[error("unknown attribute type `{ty}` for attribute `{attribute}`")]
    #[diagnostic(
        code(gantry::attributes::unknown_type),
        help("Attribute types are `string`, `bool` and `int`")
    )]
    UnknownType { attribute: String, ty: String },

    /// A value could not be read as the attribute's type.
    #[error("`{value}` is not a valid {expected} value for attribute `{attribute}`")]
    #[diagnostic(code(gantry::attributes::invalid_value))]
    InvalidValue {
        attribute: String,
        value: String,
        expected: AttributeType,
    },

    #[error("attribute `{name}` is declared more than once")]
    #[diagnostic(code(gantry::attributes::duplicate_attribute))]
    DuplicateAttribute { name: String },

    #[error("attribute `{name}` appears more than once in the precedence order")]
    #[diagnostic(
        code(gantry::attributes::duplicate_precedence),
        help("List each attribute at most once in `precedence`")
    )]
    DuplicatePrecedence { name: String },

    /// An attribute with this name already exists with another type.
    #[error("attribute `{name}` is declared as {existing} and cannot also be {requested}")]
    #[diagnostic(code(gantry::attributes::conflicting_type))]
    ConflictingType {
        name: String,
        existing: AttributeType,
        requested: AttributeType,
    },
}

impl AttributeError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> GantryDiagnostic {
        GantryDiagnostic::from_report(self)
    }
}
