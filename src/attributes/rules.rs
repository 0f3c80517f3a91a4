//! Compatibility and disambiguation rules.
//!
//! A compatibility rule decides whether a candidate value is acceptable for a
//! requested value. A disambiguation rule picks the best values out of a set
//! of candidate values. Rules for one attribute form a chain, and the chain
//! stops at the first rule that reaches a decision.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::attributes::value::AttributeValue;

/// The question a compatibility rule answers.
pub struct CompatibilityCheckDetails<'a> {
    requested: &'a AttributeValue,
    candidate: &'a AttributeValue,
    result: Option<bool>,
}

impl<'a> CompatibilityCheckDetails<'a> {
    pub fn new(requested: &'a AttributeValue, candidate: &'a AttributeValue) -> Self {
        CompatibilityCheckDetails {
            requested,
            candidate,
            result: None,
        }
    }

    pub fn requested_value(&self) -> &AttributeValue {
        self.requested
    }

    pub fn candidate_value(&self) -> &AttributeValue {
        self.candidate
    }

    pub fn compatible(&mut self) {
        self.result = Some(true);
    }

    pub fn incompatible(&mut self) {
        self.result = Some(false);
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_compatible(&self) -> bool {
        self.result == Some(true)
    }
}

/// The question a disambiguation rule answers.
pub struct MultipleCandidatesDetails<'a> {
    requested: Option<&'a AttributeValue>,
    candidates: &'a BTreeSet<AttributeValue>,
    matches: BTreeSet<AttributeValue>,
    decided: bool,
}

impl<'a> MultipleCandidatesDetails<'a> {
    pub fn new(
        requested: Option<&'a AttributeValue>,
        candidates: &'a BTreeSet<AttributeValue>,
    ) -> Self {
        MultipleCandidatesDetails {
            requested,
            candidates,
            matches: BTreeSet::new(),
            decided: false,
        }
    }

    /// The requested value, `None` when disambiguating an extra attribute.
    pub fn requested_value(&self) -> Option<&AttributeValue> {
        self.requested
    }

    pub fn candidate_values(&self) -> &BTreeSet<AttributeValue> {
        self.candidates
    }

    /// Keep `value` among the best matches.
    pub fn closest_match(&mut self, value: AttributeValue) {
        self.decided = true;
        self.matches.insert(value);
    }

    pub fn has_result(&self) -> bool {
        self.decided
    }

    pub fn into_matches(self) -> BTreeSet<AttributeValue> {
        self.matches
    }
}

pub trait AttributeCompatibilityRule: Send + Sync {
    fn execute(&self, details: &mut CompatibilityCheckDetails<'_>);

    fn describe(&self) -> String;
}

pub trait AttributeDisambiguationRule: Send + Sync {
    fn execute(&self, details: &mut MultipleCandidatesDetails<'_>);

    fn describe(&self) -> String;
}

/// Explicitly listed `(requested, candidate)` pairs are compatible.
pub struct CompatiblePairsRule {
    pairs: HashSet<(AttributeValue, AttributeValue)>,
}

impl CompatiblePairsRule {
    pub fn new(pairs: impl IntoIterator<Item = (AttributeValue, AttributeValue)>) -> Self {
        CompatiblePairsRule {
            pairs: pairs.into_iter().collect(),
        }
    }
}

impl AttributeCompatibilityRule for CompatiblePairsRule {
    fn execute(&self, details: &mut CompatibilityCheckDetails<'_>) {
        if self
            .pairs
            .contains(&(*details.requested_value(), *details.candidate_value()))
        {
            details.compatible();
        }
    }

    fn describe(&self) -> String {
        let mut pairs: Vec<String> = self
            .pairs
            .iter()
            .map(|(requested, candidate)| format!("{} accepts {}", requested, candidate))
            .collect();
        pairs.sort();
        format!("compatible: {}", pairs.join(", "))
    }
}

/// Values in a known order; a candidate is compatible when it does not come
/// after the requested value. Values outside the order are left undecided.
pub struct OrderedCompatibilityRule {
    order: Vec<AttributeValue>,
}

impl OrderedCompatibilityRule {
    pub fn new(order: Vec<AttributeValue>) -> Self {
        OrderedCompatibilityRule { order }
    }
}

fn ordinal(order: &[AttributeValue], value: &AttributeValue) -> Option<usize> {
    order.iter().position(|v| v == value)
}

fn describe_order(order: &[AttributeValue]) -> String {
    order
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" < ")
}

impl AttributeCompatibilityRule for OrderedCompatibilityRule {
    fn execute(&self, details: &mut CompatibilityCheckDetails<'_>) {
        let requested = ordinal(&self.order, details.requested_value());
        let candidate = ordinal(&self.order, details.candidate_value());
        if let (Some(requested), Some(candidate)) = (requested, candidate) {
            if candidate <= requested {
                details.compatible();
            } else {
                details.incompatible();
            }
        }
    }

    fn describe(&self) -> String {
        format!("ordered: {}", describe_order(&self.order))
    }
}

/// Prefers the first listed value present among the candidates.
pub struct PreferredValueRule {
    preferred: Vec<AttributeValue>,
}

impl PreferredValueRule {
    pub fn new(preferred: Vec<AttributeValue>) -> Self {
        PreferredValueRule { preferred }
    }
}

impl AttributeDisambiguationRule for PreferredValueRule {
    fn execute(&self, details: &mut MultipleCandidatesDetails<'_>) {
        let found = self
            .preferred
            .iter()
            .find(|value| details.candidate_values().contains(value))
            .copied();
        if let Some(value) = found {
            details.closest_match(value);
        }
    }

    fn describe(&self) -> String {
        let preferred: Vec<String> = self.preferred.iter().map(ToString::to_string).collect();
        format!("prefer: {}", preferred.join(", "))
    }
}

/// Picks the highest ordered candidate value that does not come after the
/// requested value, or the highest overall when nothing was requested.
pub struct ClosestOrderedRule {
    order: Vec<AttributeValue>,
}

impl ClosestOrderedRule {
    pub fn new(order: Vec<AttributeValue>) -> Self {
        ClosestOrderedRule { order }
    }
}

impl AttributeDisambiguationRule for ClosestOrderedRule {
    fn execute(&self, details: &mut MultipleCandidatesDetails<'_>) {
        let limit = match details.requested_value() {
            Some(requested) => match ordinal(&self.order, requested) {
                Some(limit) => limit,
                None => return,
            },
            None => usize::MAX,
        };
        let closest = details
            .candidate_values()
            .iter()
            .filter_map(|value| ordinal(&self.order, value).map(|ordinal| (ordinal, *value)))
            .filter(|(ordinal, _)| *ordinal <= limit)
            .max_by_key(|(ordinal, _)| *ordinal);
        if let Some((_, value)) = closest {
            details.closest_match(value);
        }
    }

    fn describe(&self) -> String {
        format!("closest of: {}", describe_order(&self.order))
    }
}

impl<F> AttributeCompatibilityRule for F
where
    F: Fn(&mut CompatibilityCheckDetails<'_>) + Send + Sync,
{
    fn execute(&self, details: &mut CompatibilityCheckDetails<'_>) {
        self(details)
    }

    fn describe(&self) -> String {
        "custom compatibility rule".to_string()
    }
}

/// Compatibility rules for one attribute, tried in order.
#[derive(Clone, Default)]
pub struct CompatibilityRuleChain {
    rules: Vec<Arc<dyn AttributeCompatibilityRule>>,
}

impl CompatibilityRuleChain {
    pub fn add(&mut self, rule: Arc<dyn AttributeCompatibilityRule>) {
        self.rules.push(rule);
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn execute(&self, details: &mut CompatibilityCheckDetails<'_>) {
        for rule in &self.rules {
            rule.execute(details);
            if details.has_result() {
                return;
            }
        }
    }

    pub fn describe(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.describe()).collect()
    }
}

/// Disambiguation rules for one attribute, tried in order.
#[derive(Clone, Default)]
pub struct DisambiguationRuleChain {
    rules: Vec<Arc<dyn AttributeDisambiguationRule>>,
}

impl DisambiguationRuleChain {
    pub fn add(&mut self, rule: Arc<dyn AttributeDisambiguationRule>) {
        self.rules.push(rule);
    }

    /// Whether running the chain can change anything.
    pub fn does_something(&self) -> bool {
        !self.rules.is_empty()
    }

    pub fn execute(&self, details: &mut MultipleCandidatesDetails<'_>) {
        for rule in &self.rules {
            rule.execute(details);
            if details.has_result() {
                return;
            }
        }
    }

    pub fn describe(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.describe()).collect()
    }
}

impl fmt::Debug for CompatibilityRuleChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}

impl fmt::Debug for DisambiguationRuleChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64) -> AttributeValue {
        AttributeValue::Int(value)
    }

    fn versions() -> Vec<AttributeValue> {
        vec![int(8), int(11), int(17)]
    }

    fn check(
        rule: &dyn AttributeCompatibilityRule,
        requested: AttributeValue,
        candidate: AttributeValue,
    ) -> Option<bool> {
        let mut details = CompatibilityCheckDetails::new(&requested, &candidate);
        rule.execute(&mut details);
        details.has_result().then(|| details.is_compatible())
    }

    fn pick(
        rule: &dyn AttributeDisambiguationRule,
        requested: Option<AttributeValue>,
        candidates: &[AttributeValue],
    ) -> Option<Vec<AttributeValue>> {
        let candidates: BTreeSet<AttributeValue> = candidates.iter().copied().collect();
        let mut details = MultipleCandidatesDetails::new(requested.as_ref(), &candidates);
        rule.execute(&mut details);
        details
            .has_result()
            .then(|| details.into_matches().into_iter().collect())
    }

    #[test]
    fn test_compatible_pairs_are_directional() {
        let rule = CompatiblePairsRule::new([("java-api".into(), "java-runtime".into())]);
        assert_eq!(check(&rule, "java-api".into(), "java-runtime".into()), Some(true));
        assert_eq!(check(&rule, "java-runtime".into(), "java-api".into()), None);
    }

    #[test]
    fn test_ordered_compatibility() {
        let rule = OrderedCompatibilityRule::new(versions());
        assert_eq!(check(&rule, int(11), int(8)), Some(true));
        assert_eq!(check(&rule, int(11), int(17)), Some(false));
        assert_eq!(check(&rule, int(11), int(21)), None);
    }

    #[test]
    fn test_preferred_value_follows_preference_order() {
        let rule = PreferredValueRule::new(vec!["b".into(), "a".into()]);
        assert_eq!(pick(&rule, None, &["a".into(), "b".into()]), Some(vec!["b".into()]));
        assert_eq!(pick(&rule, None, &["c".into(), "d".into()]), None);
    }

    #[test]
    fn test_closest_ordered() {
        let rule = ClosestOrderedRule::new(versions());
        assert_eq!(pick(&rule, Some(int(17)), &[int(8), int(11)]), Some(vec![int(11)]));
        assert_eq!(pick(&rule, None, &[int(8), int(17)]), Some(vec![int(17)]));
        assert_eq!(pick(&rule, Some(int(99)), &[int(8), int(17)]), None);
    }

    #[test]
    fn test_chain_stops_at_first_decision() {
        let mut chain = CompatibilityRuleChain::default();
        chain.add(Arc::new(|details: &mut CompatibilityCheckDetails<'_>| details.incompatible()));
        chain.add(Arc::new(|details: &mut CompatibilityCheckDetails<'_>| details.compatible()));

        let (requested, candidate) = ("a".into(), "b".into());
        let mut details = CompatibilityCheckDetails::new(&requested, &candidate);
        chain.execute(&mut details);
        assert!(details.has_result());
        assert!(!details.is_compatible());
    }
}
