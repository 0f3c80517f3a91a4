//! Interning for identifiers and immutable value sets.
//!
//! [`InternedString`] provides O(1) equality checks and zero-cost cloning for
//! names (attribute names, type names, feature names, plugin ids) by storing
//! every distinct string once in a global interner.
//!
//! [`Interner`] is the general form: it hands out a shared `Arc<T>` for every
//! distinct value, so two equal values interned through the same interner are
//! pointer-equal. Attribute sets use it to make identity the fast path for
//! equality.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A set of shared values, one `Arc` per distinct value.
pub struct Interner<T: Eq + Hash> {
    values: RwLock<HashSet<Arc<T>>>,
}

impl<T: Eq + Hash> Interner<T> {
    /// Create an empty interner.
    pub fn new() -> Self {
        Interner {
            values: RwLock::new(HashSet::new()),
        }
    }

    /// Return the shared instance equal to `value`, storing it if it is new.
    pub fn intern(&self, value: T) -> Arc<T> {
        // Fast path: read lock only
        if let Some(existing) = self.values.read().get(&value) {
            return Arc::clone(existing);
        }

        let mut values = self.values.write();
        // Double-check after acquiring write lock
        if let Some(existing) = values.get(&value) {
            return Arc::clone(existing);
        }

        let shared = Arc::new(value);
        values.insert(Arc::clone(&shared));
        shared
    }

    /// Number of distinct values interned so far.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Check if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl<T: Eq + Hash> Default for Interner<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Global string interner. Strings are leaked so they can be handed out as `&'static str`.
static STRINGS: LazyLock<RwLock<HashSet<&'static str>>> =
    LazyLock::new(|| RwLock::new(HashSet::new()));

/// An interned string that provides O(1) equality and zero-cost cloning.
///
/// All InternedStrings with the same content point to the same memory location,
/// making equality checks a simple pointer comparison.
#[derive(Clone, Copy)]
pub struct InternedString {
    inner: &'static str,
}

impl InternedString {
    /// Create a new interned string from any string-like type.
    pub fn new(s: impl AsRef<str>) -> Self {
        let s = s.as_ref();

        if let Some(&interned) = STRINGS.read().get(s) {
            return InternedString { inner: interned };
        }

        let mut strings = STRINGS.write();
        if let Some(&interned) = strings.get(s) {
            return InternedString { inner: interned };
        }

        let leaked: &'static str = Box::leak(s.to_string().into_boxed_str());
        strings.insert(leaked);

        InternedString { inner: leaked }
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.inner
    }

    /// Check if the string is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for InternedString {
    fn default() -> Self {
        InternedString::new("")
    }
}

impl Deref for InternedString {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        self.inner
    }
}

impl AsRef<str> for InternedString {
    #[inline]
    fn as_ref(&self) -> &str {
        self.inner
    }
}

impl Borrow<str> for InternedString {
    #[inline]
    fn borrow(&self) -> &str {
        self.inner
    }
}

impl PartialEq for InternedString {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for InternedString {}

impl PartialOrd for InternedString {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InternedString {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(other.inner)
    }
}

impl Hash for InternedString {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Content hash, so the hash agrees with `Borrow<str>` lookups.
        self.inner.hash(state)
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.inner, f)
    }
}

impl fmt::Display for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner, f)
    }
}

impl From<&str> for InternedString {
    fn from(s: &str) -> Self {
        InternedString::new(s)
    }
}

impl From<String> for InternedString {
    fn from(s: String) -> Self {
        InternedString::new(s)
    }
}

impl From<&String> for InternedString {
    fn from(s: &String) -> Self {
        InternedString::new(s)
    }
}

impl Serialize for InternedString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.inner.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InternedString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(InternedString::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_equality() {
        let a = InternedString::new("flavor");
        let b = InternedString::new("flavor");
        let c = InternedString::new("platform");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(std::ptr::eq(a.inner, b.inner));
    }

    #[test]
    fn test_str_lookup_in_set() {
        let mut set = HashSet::new();
        set.insert(InternedString::new("usage"));

        assert!(set.contains("usage"));
        assert!(!set.contains("category"));
    }

    #[test]
    fn test_interner_shares_equal_values() {
        let interner: Interner<Vec<u32>> = Interner::new();
        let a = interner.intern(vec![1, 2, 3]);
        let b = interner.intern(vec![1, 2, 3]);
        let c = interner.intern(vec![3, 2, 1]);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(interner.len(), 2);
    }
}
