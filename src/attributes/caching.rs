//! Memoizing schema decorator.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::attributes::container::ImmutableAttributes;
use crate::attributes::schema::{AttributeSelectionSchema, PrecedenceResult};
use crate::attributes::value::{Attribute, AttributeValue};
use crate::util::cache::InMemoryLoadingCache;

type DisambiguationKey = (Attribute, Option<AttributeValue>, BTreeSet<AttributeValue>);

/// Wraps a schema and caches the results of its per-value operations.
///
/// The wrapped schema must be deterministic: every result is computed once
/// per distinct argument tuple and reused afterwards.
pub struct CachingAttributeSelectionSchema {
    delegate: Arc<dyn AttributeSelectionSchema>,
    matches: InMemoryLoadingCache<(Attribute, AttributeValue, AttributeValue), bool>,
    disambiguations: InMemoryLoadingCache<DisambiguationKey, Option<BTreeSet<AttributeValue>>>,
    extra_attributes:
        InMemoryLoadingCache<(Vec<ImmutableAttributes>, ImmutableAttributes), Arc<[Attribute]>>,
    precedence: InMemoryLoadingCache<Vec<Attribute>, PrecedenceResult>,
}

impl CachingAttributeSelectionSchema {
    pub fn new(delegate: Arc<dyn AttributeSelectionSchema>) -> Self {
        CachingAttributeSelectionSchema {
            delegate,
            matches: InMemoryLoadingCache::new("match-value"),
            disambiguations: InMemoryLoadingCache::new("disambiguate"),
            extra_attributes: InMemoryLoadingCache::new("extra-attributes"),
            precedence: InMemoryLoadingCache::new("precedence"),
        }
    }

    pub fn delegate(&self) -> &Arc<dyn AttributeSelectionSchema> {
        &self.delegate
    }

    /// Total number of delegate computations across all caches.
    pub fn misses(&self) -> u64 {
        self.matches.misses()
            + self.disambiguations.misses()
            + self.extra_attributes.misses()
            + self.precedence.misses()
    }
}

impl AttributeSelectionSchema for CachingAttributeSelectionSchema {
    fn attribute(&self, name: &str) -> Option<Attribute> {
        self.delegate.attribute(name)
    }

    fn match_value(
        &self,
        attribute: &Attribute,
        requested: &AttributeValue,
        candidate: &AttributeValue,
    ) -> bool {
        self.matches.get((*attribute, *requested, *candidate), || {
            self.delegate.match_value(attribute, requested, candidate)
        })
    }

    fn disambiguate(
        &self,
        attribute: &Attribute,
        requested: Option<&AttributeValue>,
        candidates: &BTreeSet<AttributeValue>,
    ) -> Option<BTreeSet<AttributeValue>> {
        self.disambiguations
            .get((*attribute, requested.copied(), candidates.clone()), || {
                self.delegate.disambiguate(attribute, requested, candidates)
            })
    }

    fn collect_extra_attributes(
        &self,
        candidates: &[ImmutableAttributes],
        requested: &ImmutableAttributes,
    ) -> Vec<Attribute> {
        self.extra_attributes
            .get((candidates.to_vec(), requested.clone()), || {
                self.delegate
                    .collect_extra_attributes(candidates, requested)
                    .into()
            })
            .to_vec()
    }

    fn order_by_precedence(&self, attributes: &[Attribute]) -> PrecedenceResult {
        self.precedence.get(attributes.to_vec(), || {
            self.delegate.order_by_precedence(attributes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::schema::DefaultAttributeSelectionSchema;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSchema {
        inner: DefaultAttributeSelectionSchema,
        calls: AtomicUsize,
    }

    impl AttributeSelectionSchema for CountingSchema {
        fn attribute(&self, name: &str) -> Option<Attribute> {
            self.inner.attribute(name)
        }

        fn match_value(
            &self,
            attribute: &Attribute,
            requested: &AttributeValue,
            candidate: &AttributeValue,
        ) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.match_value(attribute, requested, candidate)
        }

        fn disambiguate(
            &self,
            attribute: &Attribute,
            requested: Option<&AttributeValue>,
            candidates: &BTreeSet<AttributeValue>,
        ) -> Option<BTreeSet<AttributeValue>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.disambiguate(attribute, requested, candidates)
        }

        fn order_by_precedence(&self, attributes: &[Attribute]) -> PrecedenceResult {
            self.inner.order_by_precedence(attributes)
        }
    }

    #[test]
    fn test_results_computed_once() {
        let delegate = Arc::new(CountingSchema {
            inner: DefaultAttributeSelectionSchema::new(),
            calls: AtomicUsize::new(0),
        });
        let schema = CachingAttributeSelectionSchema::new(delegate.clone());
        let flavor = Attribute::string("flavor");

        for _ in 0..3 {
            assert!(!schema.match_value(&flavor, &"debug".into(), &"release".into()));
            assert!(schema.match_value(&flavor, &"debug".into(), &"debug".into()));
        }
        assert_eq!(delegate.calls.load(Ordering::SeqCst), 2);

        let candidates =
            BTreeSet::from([AttributeValue::from("debug"), AttributeValue::from("release")]);
        for _ in 0..3 {
            let picked = schema.disambiguate(&flavor, Some(&"debug".into()), &candidates);
            assert_eq!(picked, Some(BTreeSet::from([AttributeValue::from("debug")])));
        }
        assert_eq!(delegate.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_concurrent_lookups_compute_once() {
        let delegate = Arc::new(CountingSchema {
            inner: DefaultAttributeSelectionSchema::new(),
            calls: AtomicUsize::new(0),
        });
        let schema = Arc::new(CachingAttributeSelectionSchema::new(delegate.clone()));
        let flavor = Attribute::string("flavor");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let schema = Arc::clone(&schema);
                std::thread::spawn(move || {
                    schema.match_value(&flavor, &"debug".into(), &"release".into())
                })
            })
            .collect();
        for handle in handles {
            assert!(!handle.join().unwrap());
        }
        assert_eq!(delegate.calls.load(Ordering::SeqCst), 1);
        assert_eq!(schema.misses(), 1);
    }
}
