//! Attribute selection schemas.
//!
//! An [`AttributeSelectionSchema`] is the per-attribute policy the matcher
//! consults: value compatibility, disambiguation of tied candidates,
//! precedence between attributes, and rehydration of weakly typed attributes.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::attributes::container::ImmutableAttributes;
use crate::attributes::errors::AttributeError;
use crate::attributes::rules::{
    AttributeCompatibilityRule, AttributeDisambiguationRule, ClosestOrderedRule,
    CompatibilityCheckDetails, CompatibilityRuleChain, CompatiblePairsRule,
    DisambiguationRuleChain, MultipleCandidatesDetails, OrderedCompatibilityRule,
    PreferredValueRule,
};
use crate::attributes::value::{Attribute, AttributeValue};
use crate::util::interning::InternedString;

/// Attribute positions split by whether the schema ranks them.
///
/// `sorted` holds indices into the input in precedence order. `unsorted`
/// holds the remaining indices in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrecedenceResult {
    pub sorted: Vec<usize>,
    pub unsorted: Vec<usize>,
}

impl PrecedenceResult {
    /// Every index unsorted, in input order.
    pub fn unsorted(len: usize) -> Self {
        PrecedenceResult {
            sorted: Vec::new(),
            unsorted: (0..len).collect(),
        }
    }
}

pub trait AttributeSelectionSchema: Send + Sync {
    /// The schema's attribute named `name`, if declared.
    fn attribute(&self, name: &str) -> Option<Attribute>;

    fn has_attribute(&self, attribute: &Attribute) -> bool {
        self.attribute(attribute.name().as_str()) == Some(*attribute)
    }

    /// The strongly typed form of `attribute`, or `attribute` itself when the
    /// schema does not know it.
    fn rehydrate(&self, attribute: &Attribute) -> Attribute {
        self.attribute(attribute.name().as_str())
            .unwrap_or(*attribute)
    }

    /// Whether `candidate` is acceptable where `requested` was asked for.
    fn match_value(
        &self,
        attribute: &Attribute,
        requested: &AttributeValue,
        candidate: &AttributeValue,
    ) -> bool;

    /// The best of `candidates`, or `None` when the set cannot be narrowed.
    fn disambiguate(
        &self,
        attribute: &Attribute,
        requested: Option<&AttributeValue>,
        candidates: &BTreeSet<AttributeValue>,
    ) -> Option<BTreeSet<AttributeValue>>;

    /// Attributes carried by candidates but not requested, rehydrated.
    fn collect_extra_attributes(
        &self,
        candidates: &[ImmutableAttributes],
        requested: &ImmutableAttributes,
    ) -> Vec<Attribute> {
        let mut extra: Vec<Attribute> = Vec::new();
        for candidate in candidates {
            for attribute in candidate.keys() {
                if requested.contains(attribute.name().as_str())
                    || extra.iter().any(|seen| seen.name() == attribute.name())
                {
                    continue;
                }
                extra.push(self.rehydrate(&attribute));
            }
        }
        extra
    }

    /// Order `attributes` for disambiguation.
    fn order_by_precedence(&self, attributes: &[Attribute]) -> PrecedenceResult;
}

/// The rules configured for one attribute.
#[derive(Clone)]
pub struct AttributeMatchingStrategy {
    attribute: Attribute,
    compatibility: CompatibilityRuleChain,
    disambiguation: DisambiguationRuleChain,
}

impl AttributeMatchingStrategy {
    fn new(attribute: Attribute) -> Self {
        AttributeMatchingStrategy {
            attribute,
            compatibility: CompatibilityRuleChain::default(),
            disambiguation: DisambiguationRuleChain::default(),
        }
    }

    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    pub fn compatibility_rules(&self) -> &CompatibilityRuleChain {
        &self.compatibility
    }

    pub fn disambiguation_rules(&self) -> &DisambiguationRuleChain {
        &self.disambiguation
    }

    pub fn add_compatibility_rule(
        &mut self,
        rule: Arc<dyn AttributeCompatibilityRule>,
    ) -> &mut Self {
        self.compatibility.add(rule);
        self
    }

    pub fn add_disambiguation_rule(
        &mut self,
        rule: Arc<dyn AttributeDisambiguationRule>,
    ) -> &mut Self {
        self.disambiguation.add(rule);
        self
    }

    /// Accept `candidate` where `requested` was asked for.
    pub fn compatible(
        &mut self,
        pairs: impl IntoIterator<Item = (AttributeValue, AttributeValue)>,
    ) -> &mut Self {
        self.add_compatibility_rule(Arc::new(CompatiblePairsRule::new(pairs)))
    }

    /// Values in ascending order: lower candidates satisfy higher requests,
    /// and the closest one wins a tie.
    pub fn ordered(&mut self, order: Vec<AttributeValue>) -> &mut Self {
        self.add_compatibility_rule(Arc::new(OrderedCompatibilityRule::new(order.clone())));
        self.add_disambiguation_rule(Arc::new(ClosestOrderedRule::new(order)))
    }

    /// Prefer these values, first listed first, when candidates tie.
    pub fn prefer(&mut self, preferred: Vec<AttributeValue>) -> &mut Self {
        self.add_disambiguation_rule(Arc::new(PreferredValueRule::new(preferred)))
    }
}

/// A schema backed by rule chains per attribute.
#[derive(Clone, Default)]
pub struct DefaultAttributeSelectionSchema {
    strategies: IndexMap<InternedString, AttributeMatchingStrategy>,
    precedence: IndexMap<InternedString, usize>,
}

impl DefaultAttributeSelectionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `attribute`, returning its strategy for rule configuration.
    pub fn attribute_strategy(
        &mut self,
        attribute: Attribute,
    ) -> Result<&mut AttributeMatchingStrategy, AttributeError> {
        if let Some(existing) = self.strategies.get(&attribute.name()) {
            if existing.attribute.ty() != attribute.ty() {
                return Err(AttributeError::ConflictingType {
                    name: attribute.name().to_string(),
                    existing: existing.attribute.ty(),
                    requested: attribute.ty(),
                });
            }
        }
        Ok(self
            .strategies
            .entry(attribute.name())
            .or_insert_with(|| AttributeMatchingStrategy::new(attribute)))
    }

    /// Rank attributes by name, highest precedence first. Names may refer to
    /// attributes the schema does not declare.
    pub fn set_precedence<I, S>(&mut self, names: I) -> Result<(), AttributeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<InternedString>,
    {
        let mut precedence: IndexMap<InternedString, usize> = IndexMap::new();
        for name in names {
            let name: InternedString = name.into();
            let rank = precedence.len();
            if precedence.insert(name, rank).is_some() {
                return Err(AttributeError::DuplicatePrecedence {
                    name: name.to_string(),
                });
            }
        }
        self.precedence = precedence;
        Ok(())
    }

    pub fn strategies(&self) -> impl Iterator<Item = &AttributeMatchingStrategy> {
        self.strategies.values()
    }

    pub fn precedence(&self) -> impl Iterator<Item = InternedString> + '_ {
        self.precedence.keys().copied()
    }

    fn strategy(&self, attribute: &Attribute) -> Option<&AttributeMatchingStrategy> {
        self.strategies.get(&attribute.name())
    }
}

impl AttributeSelectionSchema for DefaultAttributeSelectionSchema {
    fn attribute(&self, name: &str) -> Option<Attribute> {
        self.strategies.get(name).map(|strategy| strategy.attribute)
    }

    fn match_value(
        &self,
        attribute: &Attribute,
        requested: &AttributeValue,
        candidate: &AttributeValue,
    ) -> bool {
        if requested == candidate {
            return true;
        }
        let Some(strategy) = self.strategy(attribute) else {
            return false;
        };
        let mut details = CompatibilityCheckDetails::new(requested, candidate);
        strategy.compatibility.execute(&mut details);
        details.has_result() && details.is_compatible()
    }

    fn disambiguate(
        &self,
        attribute: &Attribute,
        requested: Option<&AttributeValue>,
        candidates: &BTreeSet<AttributeValue>,
    ) -> Option<BTreeSet<AttributeValue>> {
        if let Some(strategy) = self.strategy(attribute) {
            if strategy.disambiguation.does_something() {
                let mut details = MultipleCandidatesDetails::new(requested, candidates);
                strategy.disambiguation.execute(&mut details);
                if details.has_result() {
                    return Some(details.into_matches());
                }
            }
        }
        match requested {
            Some(requested) if candidates.contains(requested) => Some(BTreeSet::from([*requested])),
            _ => None,
        }
    }

    fn order_by_precedence(&self, attributes: &[Attribute]) -> PrecedenceResult {
        if self.precedence.is_empty() {
            return PrecedenceResult::unsorted(attributes.len());
        }
        let mut ranked: Vec<(usize, usize)> = Vec::new();
        let mut unsorted = Vec::new();
        for (index, attribute) in attributes.iter().enumerate() {
            match self.precedence.get(&attribute.name()) {
                Some(rank) => ranked.push((*rank, index)),
                None => unsorted.push(index),
            }
        }
        ranked.sort_unstable();
        PrecedenceResult {
            sorted: ranked.into_iter().map(|(_, index)| index).collect(),
            unsorted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::container::AttributesFactory;

    fn schema() -> DefaultAttributeSelectionSchema {
        let mut schema = DefaultAttributeSelectionSchema::new();
        schema
            .attribute_strategy(Attribute::string("usage"))
            .unwrap()
            .compatible([("java-api".into(), "java-runtime".into())])
            .prefer(vec!["java-api".into()]);
        schema
            .attribute_strategy(Attribute::int("jvm.version"))
            .unwrap()
            .ordered(vec![
                AttributeValue::Int(8),
                AttributeValue::Int(11),
                AttributeValue::Int(17),
            ]);
        schema.attribute_strategy(Attribute::string("flavor")).unwrap();
        schema
    }

    #[test]
    fn test_match_value_equality_then_rules() {
        let schema = schema();
        let usage = Attribute::string("usage");
        assert!(schema.match_value(&usage, &"java-api".into(), &"java-api".into()));
        assert!(schema.match_value(&usage, &"java-api".into(), &"java-runtime".into()));
        assert!(!schema.match_value(&usage, &"java-runtime".into(), &"java-api".into()));

        // No rule means not compatible
        let flavor = Attribute::string("flavor");
        assert!(!schema.match_value(&flavor, &"debug".into(), &"release".into()));
        let unknown = Attribute::string("unknown");
        assert!(schema.match_value(&unknown, &"x".into(), &"x".into()));
        assert!(!schema.match_value(&unknown, &"x".into(), &"y".into()));
    }

    #[test]
    fn test_disambiguate_falls_back_to_requested_value() {
        let schema = schema();
        let flavor = Attribute::string("flavor");
        let candidates =
            BTreeSet::from([AttributeValue::from("debug"), AttributeValue::from("release")]);

        assert_eq!(
            schema.disambiguate(&flavor, Some(&"debug".into()), &candidates),
            Some(BTreeSet::from([AttributeValue::from("debug")]))
        );
        assert_eq!(schema.disambiguate(&flavor, Some(&"other".into()), &candidates), None);
        assert_eq!(schema.disambiguate(&flavor, None, &candidates), None);
    }

    #[test]
    fn test_disambiguate_with_rules() {
        let schema = schema();
        let version = Attribute::int("jvm.version");
        let candidates = BTreeSet::from([AttributeValue::Int(8), AttributeValue::Int(11)]);
        assert_eq!(
            schema.disambiguate(&version, Some(&AttributeValue::Int(17)), &candidates),
            Some(BTreeSet::from([AttributeValue::Int(11)]))
        );
    }

    #[test]
    fn test_order_by_precedence() {
        let mut schema = schema();
        let attributes = [
            Attribute::string("flavor"),
            Attribute::int("jvm.version"),
            Attribute::string("other"),
            Attribute::string("usage"),
        ];
        assert_eq!(schema.order_by_precedence(&attributes), PrecedenceResult::unsorted(4));

        schema.set_precedence(["usage", "jvm.version"]).unwrap();
        let result = schema.order_by_precedence(&attributes);
        assert_eq!(result.sorted, vec![3, 1]);
        assert_eq!(result.unsorted, vec![0, 2]);
    }

    #[test]
    fn test_duplicate_precedence_rejected() {
        let mut schema = schema();
        let err = schema.set_precedence(["usage", "usage"]).unwrap_err();
        assert!(matches!(err, AttributeError::DuplicatePrecedence { .. }));
    }

    #[test]
    fn test_conflicting_attribute_type_rejected() {
        let mut schema = schema();
        assert!(schema.attribute_strategy(Attribute::string("usage")).is_ok());
        assert!(matches!(
            schema.attribute_strategy(Attribute::bool("usage")),
            Err(AttributeError::ConflictingType { .. })
        ));
    }

    #[test]
    fn test_extra_attributes_are_rehydrated() {
        let schema = schema();
        let factory = AttributesFactory::new();
        let requested = factory.of([(Attribute::string("usage"), "java-api")]);
        let candidates = [
            factory.of([
                (Attribute::string("usage"), "java-api"),
                (Attribute::string("jvm.version"), "11"),
            ]),
            factory.of([
                (Attribute::string("jvm.version"), "8"),
                (Attribute::string("flavor"), "debug"),
            ]),
        ];
        assert_eq!(
            schema.collect_extra_attributes(&candidates, &requested),
            vec![Attribute::int("jvm.version"), Attribute::string("flavor")]
        );
    }
}
