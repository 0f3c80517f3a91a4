//! Attributes and their typed values.

use std::fmt;

use serde::Serialize;

use crate::attributes::errors::AttributeError;
use crate::util::InternedString;

/// The value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Bool,
    Int,
}

impl AttributeType {
    /// Parse a type name as written in a matching file.
    pub fn parse(attribute: &str, ty: &str) -> Result<Self, AttributeError> {
        match ty {
            "string" => Ok(AttributeType::String),
            "bool" | "boolean" => Ok(AttributeType::Bool),
            "int" | "integer" => Ok(AttributeType::Int),
            other => Err(AttributeError::UnknownType {
                attribute: attribute.to_string(),
                ty: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::String => write!(f, "string"),
            AttributeType::Bool => write!(f, "bool"),
            AttributeType::Int => write!(f, "int"),
        }
    }
}

/// A named, typed dimension used to describe variants.
///
/// Two attributes are equal when both name and type agree. Lookups against
/// attribute sets go by name, so a desugared `string` attribute still finds
/// the value of its strongly typed counterpart.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Attribute {
    name: InternedString,
    #[serde(rename = "type")]
    ty: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<InternedString>, ty: AttributeType) -> Self {
        Attribute {
            name: name.into(),
            ty,
        }
    }

    pub fn string(name: impl Into<InternedString>) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn bool(name: impl Into<InternedString>) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn int(name: impl Into<InternedString>) -> Self {
        Self::new(name, AttributeType::Int)
    }

    pub fn name(&self) -> InternedString {
        self.name
    }

    pub fn ty(&self) -> AttributeType {
        self.ty
    }

    /// Read `raw` as a value of this attribute's type.
    pub fn parse_value(&self, raw: &str) -> Result<AttributeValue, AttributeError> {
        AttributeValue::from_str_as(raw, self.ty).ok_or_else(|| AttributeError::InvalidValue {
            attribute: self.name.to_string(),
            value: raw.to_string(),
            expected: self.ty,
        })
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())
    }
}

/// The value of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(InternedString),
    Bool(bool),
    Int(i64),
}

impl AttributeValue {
    pub fn ty(&self) -> AttributeType {
        match self {
            AttributeValue::String(_) => AttributeType::String,
            AttributeValue::Bool(_) => AttributeType::Bool,
            AttributeValue::Int(_) => AttributeType::Int,
        }
    }

    fn from_str_as(raw: &str, ty: AttributeType) -> Option<Self> {
        match ty {
            AttributeType::String => Some(AttributeValue::String(raw.into())),
            AttributeType::Bool => raw.trim().parse().ok().map(AttributeValue::Bool),
            AttributeType::Int => raw.trim().parse().ok().map(AttributeValue::Int),
        }
    }

    /// Rehydrate this value as `ty`.
    ///
    /// Values that cannot be read as `ty` are returned unchanged. They never
    /// compare equal to a value of `ty`, so they only match when a rule
    /// explicitly accepts them.
    pub fn coerce(self, ty: AttributeType) -> Self {
        if self.ty() == ty {
            return self;
        }
        let coerced = match (self, ty) {
            (AttributeValue::String(raw), _) => Self::from_str_as(raw.as_str(), ty),
            (other, AttributeType::String) => {
                Some(AttributeValue::String(other.to_string().into()))
            }
            _ => None,
        };
        coerced.unwrap_or_else(|| {
            tracing::trace!(value = %self, %ty, "value cannot be coerced");
            self
        })
    }

    /// The string content, for string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s.as_str()),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.into())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s.into())
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_by_type() {
        assert_eq!(
            Attribute::int("jvm.version").parse_value("17").unwrap(),
            AttributeValue::Int(17)
        );
        assert_eq!(
            Attribute::bool("debuggable").parse_value("true").unwrap(),
            AttributeValue::Bool(true)
        );
        assert_eq!(Attribute::string("usage").parse_value("api").unwrap(), "api".into());

        let err = Attribute::int("jvm.version").parse_value("latest").unwrap_err();
        assert!(matches!(err, AttributeError::InvalidValue { expected: AttributeType::Int, .. }));
    }

    #[test]
    fn test_coerce_desugared_values() {
        assert_eq!(AttributeValue::from("11").coerce(AttributeType::Int), AttributeValue::Int(11));
        assert_eq!(
            AttributeValue::from("false").coerce(AttributeType::Bool),
            AttributeValue::Bool(false)
        );
        assert_eq!(AttributeValue::Int(8).coerce(AttributeType::String), "8".into());
        // Unreadable values are kept as they are
        assert_eq!(AttributeValue::from("eleven").coerce(AttributeType::Int), "eleven".into());
    }

    #[test]
    fn test_attribute_identity_includes_type() {
        assert_ne!(Attribute::string("jvm.version"), Attribute::int("jvm.version"));
        assert_eq!(Attribute::int("jvm.version").name(), Attribute::string("jvm.version").name());
    }

    #[test]
    fn test_unknown_type_name() {
        assert_eq!(AttributeType::parse("usage", "string").unwrap(), AttributeType::String);
        assert!(matches!(
            AttributeType::parse("usage", "float"),
            Err(AttributeError::UnknownType { .. })
        ));
    }
}
