//! Attribute matching.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Serialize;

use crate::attributes::container::ImmutableAttributes;
use crate::attributes::explanation::{AttributeMatchingExplanationBuilder, NoopExplanationBuilder};
use crate::attributes::multiple::MultipleCandidateMatcher;
use crate::attributes::schema::AttributeSelectionSchema;
use crate::attributes::value::{Attribute, AttributeValue};
use crate::util::cache::InMemoryLoadingCache;

/// Anything that exposes attributes to be matched.
pub trait AttributeMatchingCandidate {
    fn attributes(&self) -> &ImmutableAttributes;
}

impl AttributeMatchingCandidate for ImmutableAttributes {
    fn attributes(&self) -> &ImmutableAttributes {
        self
    }
}

/// A named candidate, such as a published variant of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    name: String,
    attributes: ImmutableAttributes,
}

impl Variant {
    pub fn new(name: impl Into<String>, attributes: ImmutableAttributes) -> Self {
        Variant {
            name: name.into(),
            attributes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl AttributeMatchingCandidate for Variant {
    fn attributes(&self) -> &ImmutableAttributes {
        &self.attributes
    }
}

/// How one requested attribute compares with what a candidate declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchingDescription {
    pub attribute: Attribute,
    pub requested: AttributeValue,
    /// The candidate's value, rehydrated; `None` when it declares none.
    pub found: Option<AttributeValue>,
    pub matches: bool,
}

impl fmt::Display for MatchingDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.found {
            None => write!(f, "{}: requested {}, not declared", self.attribute, self.requested),
            Some(found) if self.matches => {
                write!(
                    f,
                    "{}: requested {}, found compatible {}",
                    self.attribute, self.requested, found
                )
            }
            Some(found) => {
                write!(
                    f,
                    "{}: requested {}, found incompatible {}",
                    self.attribute, self.requested, found
                )
            }
        }
    }
}

pub trait AttributeMatcher: Send + Sync {
    fn schema(&self) -> &dyn AttributeSelectionSchema;

    /// Whether `candidate` satisfies every requested attribute it declares.
    fn is_matching_candidate(
        &self,
        candidate: &ImmutableAttributes,
        requested: &ImmutableAttributes,
    ) -> bool;

    /// Like [`is_matching_candidate`](Self::is_matching_candidate), accepting
    /// a value that matches in either direction.
    fn are_mutually_compatible(
        &self,
        first: &ImmutableAttributes,
        second: &ImmutableAttributes,
    ) -> bool;

    /// Indices of the best candidates for `requested`, ascending. An empty
    /// result is a valid outcome.
    fn match_candidate_indices(
        &self,
        candidates: &[ImmutableAttributes],
        requested: &ImmutableAttributes,
        explanation: &mut dyn AttributeMatchingExplanationBuilder,
    ) -> Vec<usize>;

    /// The best of `candidates` for `requested`.
    fn match_multiple_candidates<'c, T>(
        &self,
        candidates: &'c [T],
        requested: &ImmutableAttributes,
        explanation: &mut dyn AttributeMatchingExplanationBuilder,
    ) -> Vec<&'c T>
    where
        Self: Sized,
        T: AttributeMatchingCandidate,
    {
        let attributes: Vec<ImmutableAttributes> = candidates
            .iter()
            .map(|candidate| candidate.attributes().clone())
            .collect();
        self.match_candidate_indices(&attributes, requested, explanation)
            .into_iter()
            .map(|index| &candidates[index])
            .collect()
    }

    /// One description per requested attribute.
    fn describe_matching(
        &self,
        candidate: &ImmutableAttributes,
        requested: &ImmutableAttributes,
    ) -> Vec<MatchingDescription>;
}

/// Cache key for a multi-candidate query, compared by content.
struct CachedQuery {
    requested: ImmutableAttributes,
    candidates: Box<[ImmutableAttributes]>,
    hash: u64,
}

impl CachedQuery {
    fn new(requested: &ImmutableAttributes, candidates: &[ImmutableAttributes]) -> Self {
        let mut hash = requested.content_hash();
        for candidate in candidates {
            hash = hash.wrapping_mul(31).wrapping_add(candidate.content_hash());
        }
        CachedQuery {
            requested: requested.clone(),
            candidates: candidates.into(),
            hash,
        }
    }
}

impl PartialEq for CachedQuery {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.requested == other.requested
            && self.candidates == other.candidates
    }
}

impl Eq for CachedQuery {}

impl Hash for CachedQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// The standard matcher over one schema.
///
/// Multi-candidate results are cached by the content of the request and the
/// candidates' attribute sets, so structurally identical queries share an
/// entry. Only indices are cached.
pub struct DefaultAttributeMatcher {
    schema: Arc<dyn AttributeSelectionSchema>,
    cache: Option<InMemoryLoadingCache<CachedQuery, Arc<[usize]>>>,
}

impl DefaultAttributeMatcher {
    pub fn new(schema: Arc<dyn AttributeSelectionSchema>) -> Self {
        DefaultAttributeMatcher {
            schema,
            cache: Some(InMemoryLoadingCache::new("multiple-candidates")),
        }
    }

    /// A matcher that recomputes every query.
    pub fn uncached(schema: Arc<dyn AttributeSelectionSchema>) -> Self {
        DefaultAttributeMatcher { schema, cache: None }
    }

    /// Number of multi-candidate queries actually computed through the cache.
    pub fn cache_misses(&self) -> u64 {
        self.cache.as_ref().map_or(0, |cache| cache.misses())
    }

    fn is_matching(
        &self,
        candidate: &ImmutableAttributes,
        requested: &ImmutableAttributes,
        mutual: bool,
    ) -> bool {
        if requested.is_empty() || candidate.is_empty() {
            return true;
        }
        requested.iter().all(|(attribute, requested_value)| {
            let Some((_, found)) = candidate.find_entry(attribute.name().as_str()) else {
                return true;
            };
            let coerced = found.coerce(attribute.ty());
            self.schema.match_value(&attribute, &requested_value, &coerced)
                || (mutual && self.schema.match_value(&attribute, &coerced, &requested_value))
        })
    }

    fn match_single_candidate(
        &self,
        candidate: &ImmutableAttributes,
        requested: &ImmutableAttributes,
        explanation: &mut dyn AttributeMatchingExplanationBuilder,
    ) -> Vec<usize> {
        if self.is_matching_candidate(candidate, requested) {
            return vec![0];
        }
        explanation.candidate_does_not_match_attributes(0, requested);
        Vec::new()
    }
}

impl AttributeMatcher for DefaultAttributeMatcher {
    fn schema(&self) -> &dyn AttributeSelectionSchema {
        self.schema.as_ref()
    }

    fn is_matching_candidate(
        &self,
        candidate: &ImmutableAttributes,
        requested: &ImmutableAttributes,
    ) -> bool {
        self.is_matching(candidate, requested, false)
    }

    fn are_mutually_compatible(
        &self,
        first: &ImmutableAttributes,
        second: &ImmutableAttributes,
    ) -> bool {
        self.is_matching(first, second, true)
    }

    fn match_candidate_indices(
        &self,
        candidates: &[ImmutableAttributes],
        requested: &ImmutableAttributes,
        explanation: &mut dyn AttributeMatchingExplanationBuilder,
    ) -> Vec<usize> {
        match candidates {
            [] => {
                explanation.no_candidates(requested);
                Vec::new()
            }
            [candidate] => self.match_single_candidate(candidate, requested, explanation),
            _ => match &self.cache {
                Some(cache) if explanation.can_skip_explanation() => {
                    let query = CachedQuery::new(requested, candidates);
                    cache
                        .get(query, || {
                            tracing::debug!(
                                %requested,
                                candidates = candidates.len(),
                                "matching candidates"
                            );
                            let mut noop = NoopExplanationBuilder;
                            MultipleCandidateMatcher::new(
                                self.schema.as_ref(),
                                candidates,
                                requested,
                                &mut noop,
                            )
                            .matches()
                            .into()
                        })
                        .to_vec()
                }
                _ => MultipleCandidateMatcher::new(
                    self.schema.as_ref(),
                    candidates,
                    requested,
                    explanation,
                )
                .matches(),
            },
        }
    }

    fn describe_matching(
        &self,
        candidate: &ImmutableAttributes,
        requested: &ImmutableAttributes,
    ) -> Vec<MatchingDescription> {
        requested
            .iter()
            .map(|(attribute, requested_value)| {
                match candidate.find_entry(attribute.name().as_str()) {
                    Some((_, found)) => {
                        let coerced = found.coerce(attribute.ty());
                        MatchingDescription {
                            attribute,
                            requested: requested_value,
                            found: Some(coerced),
                            matches: self
                                .schema
                                .match_value(&attribute, &requested_value, &coerced),
                        }
                    }
                    None => MatchingDescription {
                        attribute,
                        requested: requested_value,
                        found: None,
                        matches: false,
                    },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::caching::CachingAttributeSelectionSchema;
    use crate::attributes::container::AttributesFactory;
    use crate::attributes::explanation::{MatchingEvent, RecordingExplanationBuilder};
    use crate::attributes::schema::DefaultAttributeSelectionSchema;
    use crate::test_support::fixtures;

    fn flavor_matcher() -> DefaultAttributeMatcher {
        let mut schema = DefaultAttributeSelectionSchema::new();
        schema.attribute_strategy(Attribute::string("flavor")).unwrap();
        DefaultAttributeMatcher::new(Arc::new(schema))
    }

    #[test]
    fn test_example_flavor_selection() {
        let matcher = flavor_matcher();
        let factory = AttributesFactory::new();
        let flavor = Attribute::string("flavor");
        let candidates = [
            Variant::new("A", factory.of([(flavor, "debug")])),
            Variant::new("B", factory.of([(flavor, "release")])),
        ];
        let requested = factory.of([(flavor, "debug")]);

        let matches =
            matcher.match_multiple_candidates(&candidates, &requested, &mut NoopExplanationBuilder);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name(), "A");
    }

    #[test]
    fn test_empty_sets_always_match() {
        let matcher = flavor_matcher();
        let factory = AttributesFactory::new();
        let flavor = Attribute::string("flavor");
        let debug = factory.of([(flavor, "debug")]);
        let empty = ImmutableAttributes::empty();
        assert!(matcher.is_matching_candidate(&empty, &debug));
        assert!(matcher.is_matching_candidate(&debug, &empty));
        assert!(!matcher.is_matching_candidate(&factory.of([(flavor, "release")]), &debug));
        // Missing on the candidate is compatible
        assert!(matcher.is_matching_candidate(
            &factory.of([(Attribute::string("usage"), "api")]),
            &debug
        ));
    }

    #[test]
    fn test_mutual_compatibility_accepts_either_direction() {
        let mut schema = DefaultAttributeSelectionSchema::new();
        let usage = Attribute::string("usage");
        schema
            .attribute_strategy(usage)
            .unwrap()
            .compatible([("java-api".into(), "java-runtime".into())]);
        let matcher = DefaultAttributeMatcher::new(Arc::new(schema));
        let factory = AttributesFactory::new();
        let api = factory.of([(usage, "java-api")]);
        let runtime = factory.of([(usage, "java-runtime")]);

        assert!(!matcher.is_matching_candidate(&api, &runtime));
        assert!(matcher.are_mutually_compatible(&api, &runtime));
        assert!(matcher.are_mutually_compatible(&runtime, &api));
    }

    #[test]
    fn test_zero_and_one_candidate() {
        let matcher = flavor_matcher();
        let factory = AttributesFactory::new();
        let flavor = Attribute::string("flavor");
        let requested = factory.of([(flavor, "debug")]);

        let mut explanation = RecordingExplanationBuilder::new();
        assert!(matcher.match_candidate_indices(&[], &requested, &mut explanation).is_empty());
        assert_eq!(explanation.events(), &[MatchingEvent::NoCandidates]);

        let mut explanation = RecordingExplanationBuilder::new();
        let release = [factory.of([(flavor, "release")])];
        assert!(matcher.match_candidate_indices(&release, &requested, &mut explanation).is_empty());
        assert_eq!(explanation.events(), &[MatchingEvent::DoesNotMatch { candidate: 0 }]);

        let debug = [factory.of([(flavor, "debug")])];
        assert_eq!(
            matcher.match_candidate_indices(&debug, &requested, &mut NoopExplanationBuilder),
            vec![0]
        );
    }

    #[test]
    fn test_cache_is_keyed_by_content() {
        let matcher = flavor_matcher();
        let flavor = Attribute::string("flavor");
        // Separate factories, so no set is shared between the two queries
        let first = AttributesFactory::new();
        let second = AttributesFactory::new();
        let first_candidates = [first.of([(flavor, "debug")]), first.of([(flavor, "release")])];
        let second_candidates = [second.of([(flavor, "debug")]), second.of([(flavor, "release")])];
        assert!(!first_candidates[0].ptr_eq(&second_candidates[0]));

        let a = matcher.match_candidate_indices(
            &first_candidates,
            &first.of([(flavor, "release")]),
            &mut NoopExplanationBuilder,
        );
        let b = matcher.match_candidate_indices(
            &second_candidates,
            &second.of([(flavor, "release")]),
            &mut NoopExplanationBuilder,
        );
        assert_eq!(a, vec![1]);
        assert_eq!(a, b);
        assert_eq!(matcher.cache_misses(), 1);
    }

    #[test]
    fn test_explanations_bypass_cache() {
        let matcher = flavor_matcher();
        let factory = AttributesFactory::new();
        let flavor = Attribute::string("flavor");
        let candidates = [factory.of([(flavor, "debug")]), factory.of([(flavor, "release")])];
        let requested = factory.of([(flavor, "debug")]);

        matcher.match_candidate_indices(&candidates, &requested, &mut NoopExplanationBuilder);
        for _ in 0..2 {
            let mut explanation = RecordingExplanationBuilder::new();
            let matches =
                matcher.match_candidate_indices(&candidates, &requested, &mut explanation);
            assert_eq!(matches, vec![0]);
            assert!(explanation.events().iter().any(|event| matches!(
                event,
                MatchingEvent::AttributeMismatch { candidate: 1, .. }
            )));
        }
        assert_eq!(matcher.cache_misses(), 1);
    }

    #[test]
    fn test_concurrent_queries_compute_once() {
        let matcher = Arc::new(flavor_matcher());
        let factory = AttributesFactory::new();
        let flavor = Attribute::string("flavor");
        let candidates: Arc<[ImmutableAttributes]> =
            vec![factory.of([(flavor, "debug")]), factory.of([(flavor, "release")])].into();
        let requested = factory.of([(flavor, "debug")]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let matcher = Arc::clone(&matcher);
                let candidates = Arc::clone(&candidates);
                let requested = requested.clone();
                std::thread::spawn(move || {
                    matcher.match_candidate_indices(
                        &candidates,
                        &requested,
                        &mut NoopExplanationBuilder,
                    )
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![0]);
        }
        assert_eq!(matcher.cache_misses(), 1);
    }

    #[test]
    fn test_describe_matching() {
        let schema = fixtures::jvm_schema();
        let matcher = DefaultAttributeMatcher::new(Arc::new(CachingAttributeSelectionSchema::new(
            Arc::new(schema),
        )));
        let factory = AttributesFactory::new();
        let requested = factory.of([
            (fixtures::usage(), AttributeValue::from("java-api")),
            (fixtures::jvm_version(), AttributeValue::Int(11)),
            (Attribute::string("docs"), AttributeValue::from("javadoc")),
        ]);
        let candidate = factory.of([
            (Attribute::string("usage"), "java-runtime"),
            (Attribute::string("jvm.version"), "17"),
        ]);

        let descriptions = matcher.describe_matching(&candidate, &requested);
        assert_eq!(descriptions.len(), 3);
        assert!(descriptions[0].matches);
        assert_eq!(descriptions[1].found, Some(AttributeValue::Int(17)));
        assert!(!descriptions[1].matches);
        assert_eq!(descriptions[2].found, None);
        assert_eq!(descriptions[2].to_string(), "docs: requested javadoc, not declared");
    }

    #[test]
    fn test_jvm_ecosystem_selection() {
        let matcher = DefaultAttributeMatcher::new(Arc::new(fixtures::jvm_schema()));
        let factory = AttributesFactory::new();
        let candidates = fixtures::jvm_variants(&factory);
        let compile = factory.of([
            (fixtures::usage(), AttributeValue::from("java-api")),
            (fixtures::jvm_version(), AttributeValue::Int(17)),
        ]);

        let selected =
            matcher.match_multiple_candidates(&candidates, &compile, &mut NoopExplanationBuilder);
        let names: Vec<&str> = selected.iter().map(|variant| variant.name()).collect();
        assert_eq!(names, vec!["apiElements17"]);

        let legacy = factory.of([
            (fixtures::usage(), AttributeValue::from("java-runtime")),
            (fixtures::jvm_version(), AttributeValue::Int(11)),
        ]);
        let selected =
            matcher.match_multiple_candidates(&candidates, &legacy, &mut NoopExplanationBuilder);
        let names: Vec<&str> = selected.iter().map(|variant| variant.name()).collect();
        assert_eq!(names, vec!["runtimeElements11"]);
    }
}
