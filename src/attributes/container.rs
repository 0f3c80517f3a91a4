//! Immutable, interned attribute sets.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::attributes::value::{Attribute, AttributeValue};
use crate::util::interning::Interner;

#[derive(PartialEq, Eq)]
struct AttributeSet {
    entries: Box<[(Attribute, AttributeValue)]>,
    hash: u64,
}

impl AttributeSet {
    fn new(entries: Vec<(Attribute, AttributeValue)>) -> Self {
        let mut hasher = DefaultHasher::new();
        entries.hash(&mut hasher);
        AttributeSet {
            entries: entries.into_boxed_slice(),
            hash: hasher.finish(),
        }
    }
}

impl Hash for AttributeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// An immutable mapping from attributes to values.
///
/// At most one entry exists per attribute name, and entries keep the order in
/// which they were first added. Sets are interned by their factory, so
/// equality is a pointer comparison in the common case and falls back to
/// comparing contents (order included). The content hash is computed once.
#[derive(Clone)]
pub struct ImmutableAttributes {
    inner: Arc<AttributeSet>,
}

static EMPTY: Lazy<ImmutableAttributes> = Lazy::new(|| ImmutableAttributes {
    inner: Arc::new(AttributeSet::new(Vec::new())),
});

impl ImmutableAttributes {
    /// The empty set.
    pub fn empty() -> ImmutableAttributes {
        EMPTY.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Attributes in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.inner.entries.iter().map(|(attribute, _)| *attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, AttributeValue)> + '_ {
        self.inner.entries.iter().copied()
    }

    /// The value of exactly `attribute` (name and type).
    pub fn get(&self, attribute: &Attribute) -> Option<AttributeValue> {
        self.inner
            .entries
            .iter()
            .find(|(key, _)| key == attribute)
            .map(|(_, value)| *value)
    }

    /// The entry whose attribute is named `name`, whatever its type.
    pub fn find_entry(&self, name: &str) -> Option<(Attribute, AttributeValue)> {
        self.inner
            .entries
            .iter()
            .find(|(key, _)| key.name().as_str() == name)
            .copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find_entry(name).is_some()
    }

    /// The precomputed content hash.
    pub fn content_hash(&self) -> u64 {
        self.inner.hash
    }

    /// Whether both handles share the same interned set.
    pub fn ptr_eq(&self, other: &ImmutableAttributes) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for ImmutableAttributes {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.inner.hash == other.inner.hash && self.inner == other.inner)
    }
}

impl Eq for ImmutableAttributes {}

impl Hash for ImmutableAttributes {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.inner.hash);
    }
}

impl fmt::Display for ImmutableAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (attribute, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", attribute, value)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for ImmutableAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Creates and interns attribute sets.
pub struct AttributesFactory {
    interner: Interner<AttributeSet>,
}

static SHARED: Lazy<AttributesFactory> = Lazy::new(AttributesFactory::new);

impl AttributesFactory {
    pub fn new() -> Self {
        AttributesFactory {
            interner: Interner::new(),
        }
    }

    /// The process-wide factory.
    pub fn shared() -> &'static AttributesFactory {
        &SHARED
    }

    /// Build a set from `entries`. A later entry replaces the value of an
    /// earlier one with the same name, keeping the earlier position.
    pub fn of<I, V>(&self, entries: I) -> ImmutableAttributes
    where
        I: IntoIterator<Item = (Attribute, V)>,
        V: Into<AttributeValue>,
    {
        let mut collected: Vec<(Attribute, AttributeValue)> = Vec::new();
        for (attribute, value) in entries {
            let value = value.into();
            match collected
                .iter_mut()
                .find(|(key, _)| key.name() == attribute.name())
            {
                Some(slot) => *slot = (attribute, value),
                None => collected.push((attribute, value)),
            }
        }
        self.intern(collected)
    }

    /// `base` overridden by `overrides`.
    pub fn concat(
        &self,
        base: &ImmutableAttributes,
        overrides: &ImmutableAttributes,
    ) -> ImmutableAttributes {
        if overrides.is_empty() {
            return base.clone();
        }
        if base.is_empty() {
            return overrides.clone();
        }
        self.of(base.iter().chain(overrides.iter()))
    }

    fn intern(&self, entries: Vec<(Attribute, AttributeValue)>) -> ImmutableAttributes {
        if entries.is_empty() {
            return ImmutableAttributes::empty();
        }
        ImmutableAttributes {
            inner: self.interner.intern(AttributeSet::new(entries)),
        }
    }

    /// Number of distinct non-empty sets created so far.
    pub fn len(&self) -> usize {
        self.interner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interner.is_empty()
    }
}

impl Default for AttributesFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_sets_are_interned() {
        let factory = AttributesFactory::new();
        let usage = Attribute::string("usage");
        let a = factory.of([(usage, "api")]);
        let b = factory.of([(usage, "api")]);
        assert!(a.ptr_eq(&b));
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn test_equality_across_factories() {
        let usage = Attribute::string("usage");
        let a = AttributesFactory::new().of([(usage, "api")]);
        let b = AttributesFactory::new().of([(usage, "api")]);
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_later_entries_replace_by_name() {
        let factory = AttributesFactory::new();
        let set = factory.of([
            (Attribute::string("usage"), AttributeValue::from("api")),
            (Attribute::int("jvm.version"), AttributeValue::Int(8)),
            (Attribute::string("usage"), AttributeValue::from("runtime")),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.find_entry("usage").map(|(_, v)| v), Some("runtime".into()));
        assert_eq!(set.keys().next().unwrap().name().as_str(), "usage");
    }

    #[test]
    fn test_find_entry_ignores_type() {
        let factory = AttributesFactory::new();
        let set = factory.of([(Attribute::string("jvm.version"), "11")]);
        assert!(set.get(&Attribute::int("jvm.version")).is_none());
        let (attribute, value) = set.find_entry("jvm.version").unwrap();
        assert_eq!(attribute, Attribute::string("jvm.version"));
        assert_eq!(value, "11".into());
    }

    #[test]
    fn test_concat_and_display() {
        let factory = AttributesFactory::new();
        let usage = Attribute::string("usage");
        let base = factory.of([(usage, "api")]);
        let both = factory.concat(&base, &factory.of([(Attribute::bool("debug"), true)]));
        assert_eq!(both.to_string(), "{usage=api, debug=true}");
        assert_eq!(factory.concat(&base, &ImmutableAttributes::empty()), base);
    }
}
