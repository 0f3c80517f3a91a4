//! Selection among several candidates.
//!
//! Candidates are first filtered for compatibility with the request. When
//! more than one survives, ties are broken attribute by attribute using the
//! schema's disambiguation, first on the requested attributes and then on
//! attributes only the candidates carry.

use std::collections::BTreeSet;

use crate::attributes::container::ImmutableAttributes;
use crate::attributes::explanation::AttributeMatchingExplanationBuilder;
use crate::attributes::schema::AttributeSelectionSchema;
use crate::attributes::value::{Attribute, AttributeValue};

/// A set of candidate indices.
#[derive(Clone)]
struct CandidateSet {
    members: Vec<bool>,
    len: usize,
}

impl CandidateSet {
    fn full(size: usize) -> Self {
        CandidateSet {
            members: vec![true; size],
            len: size,
        }
    }

    fn empty(size: usize) -> Self {
        CandidateSet {
            members: vec![false; size],
            len: 0,
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn insert(&mut self, index: usize) {
        if !self.members[index] {
            self.members[index] = true;
            self.len += 1;
        }
    }

    fn remove(&mut self, index: usize) {
        if self.members[index] {
            self.members[index] = false;
            self.len -= 1;
        }
    }

    fn remove_all(&mut self, other: &CandidateSet) {
        for index in other.iter() {
            self.remove(index);
        }
    }

    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter_map(|(index, member)| member.then_some(index))
    }

    fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

enum MatchResult {
    Match,
    Missing,
    NoMatch,
}

/// One multi-candidate query. Consumed by [`MultipleCandidateMatcher::matches`].
pub(crate) struct MultipleCandidateMatcher<'a, 'e> {
    schema: &'a dyn AttributeSelectionSchema,
    requested: &'a ImmutableAttributes,
    candidates: &'a [ImmutableAttributes],
    explanation: &'a mut (dyn AttributeMatchingExplanationBuilder + 'e),
    requested_attributes: Vec<Attribute>,
    requested_values: Vec<AttributeValue>,
    /// Coerced candidate values, `candidates.len()` rows of one slot per
    /// requested attribute.
    candidate_values: Vec<Option<AttributeValue>>,
    compatible: CandidateSet,
    remaining: CandidateSet,
    candidate_with_longest_match: usize,
    length_of_longest_match: usize,
}

impl<'a, 'e> MultipleCandidateMatcher<'a, 'e> {
    pub(crate) fn new(
        schema: &'a dyn AttributeSelectionSchema,
        candidates: &'a [ImmutableAttributes],
        requested: &'a ImmutableAttributes,
        explanation: &'a mut (dyn AttributeMatchingExplanationBuilder + 'e),
    ) -> Self {
        let (requested_attributes, requested_values): (Vec<_>, Vec<_>) = requested.iter().unzip();
        let slots = candidates.len() * requested_attributes.len();
        MultipleCandidateMatcher {
            schema,
            requested,
            candidates,
            explanation,
            requested_attributes,
            requested_values,
            candidate_values: vec![None; slots],
            compatible: CandidateSet::full(candidates.len()),
            remaining: CandidateSet::empty(candidates.len()),
            candidate_with_longest_match: 0,
            length_of_longest_match: 0,
        }
    }

    /// Indices of the selected candidates, ascending.
    pub(crate) fn matches(mut self) -> Vec<usize> {
        self.find_compatible_candidates();
        if self.compatible.len() <= 1 {
            return self.compatible.to_vec();
        }
        if self.longest_match_is_superset_of_all_others() {
            let winner = self.candidate_with_longest_match;
            self.explanation.candidate_is_superset_of_all_others(winner);
            return vec![winner];
        }
        self.disambiguate_compatible_candidates()
    }

    fn value_index(&self, candidate: usize, attribute: usize) -> usize {
        candidate * self.requested_attributes.len() + attribute
    }

    fn candidate_value(&self, candidate: usize, attribute: usize) -> Option<AttributeValue> {
        self.candidate_values[self.value_index(candidate, attribute)]
    }

    fn extra_value(&self, candidate: usize, attribute: &Attribute) -> Option<AttributeValue> {
        self.candidates[candidate]
            .find_entry(attribute.name().as_str())
            .map(|(_, value)| value.coerce(attribute.ty()))
    }

    fn find_compatible_candidates(&mut self) {
        // Everything is compatible with an empty request
        if self.requested.is_empty() {
            return;
        }
        for candidate in 0..self.candidates.len() {
            self.match_candidate(candidate);
        }
    }

    fn match_candidate(&mut self, candidate: usize) {
        let mut match_length = 0;
        for attribute in 0..self.requested_attributes.len() {
            match self.record_and_match_candidate_value(candidate, attribute) {
                MatchResult::NoMatch => {
                    self.compatible.remove(candidate);
                    return;
                }
                MatchResult::Match => match_length += 1,
                MatchResult::Missing => {}
            }
        }
        if match_length > self.length_of_longest_match {
            self.length_of_longest_match = match_length;
            self.candidate_with_longest_match = candidate;
        }
    }

    fn record_and_match_candidate_value(&mut self, candidate: usize, index: usize) -> MatchResult {
        let attribute = self.requested_attributes[index];
        let requested = self.requested_values[index];
        let slot = self.value_index(candidate, index);

        let Some((_, found)) = self.candidates[candidate].find_entry(attribute.name().as_str())
        else {
            self.candidate_values[slot] = None;
            self.explanation
                .candidate_attribute_missing(candidate, &attribute, &requested);
            return MatchResult::Missing;
        };

        let coerced = found.coerce(attribute.ty());
        self.candidate_values[slot] = Some(coerced);
        if self.schema.match_value(&attribute, &requested, &coerced) {
            tracing::trace!(
                candidate,
                %attribute,
                %requested,
                found = %coerced,
                "attribute matches"
            );
            return MatchResult::Match;
        }
        tracing::trace!(
            candidate,
            %attribute,
            %requested,
            found = %coerced,
            "attribute does not match"
        );
        self.explanation
            .candidate_attribute_does_not_match(candidate, &attribute, &requested, &found);
        MatchResult::NoMatch
    }

    /// Whether the candidate with the most matched attributes matched every
    /// attribute any other compatible candidate matched, and more.
    fn longest_match_is_superset_of_all_others(&self) -> bool {
        let longest = self.candidate_with_longest_match;
        for candidate in self.compatible.iter() {
            if candidate == longest {
                continue;
            }
            let mut length_of_other_match = 0;
            for attribute in 0..self.requested_attributes.len() {
                if self.candidate_value(candidate, attribute).is_none() {
                    continue;
                }
                length_of_other_match += 1;
                if self.candidate_value(longest, attribute).is_none() {
                    return false;
                }
            }
            if length_of_other_match == self.length_of_longest_match {
                return false;
            }
        }
        true
    }

    fn disambiguate_compatible_candidates(&mut self) -> Vec<usize> {
        self.remaining = self.compatible.clone();

        self.disambiguate_with_requested_attribute_values();
        match self.remaining.len() {
            0 => return self.compatible.to_vec(),
            1 => return self.remaining.to_vec(),
            _ => {}
        }

        let extra_attributes = self
            .schema
            .collect_extra_attributes(self.candidates, self.requested);
        if self.remaining.len() > 1 {
            self.disambiguate_with_extra_attributes(&extra_attributes);
        }
        if self.remaining.len() > 1 {
            self.disambiguate_with_requested_attribute_keys(&extra_attributes);
        }

        if self.remaining.len() == 0 {
            self.compatible.to_vec()
        } else {
            self.remaining.to_vec()
        }
    }

    fn disambiguate_with_requested_attribute_values(&mut self) {
        let precedence = self.schema.order_by_precedence(&self.requested_attributes);

        for attribute in precedence.sorted {
            self.disambiguate_requested_attribute(attribute);
            if self.remaining.len() <= 1 {
                return;
            }
        }
        for attribute in precedence.unsorted {
            self.disambiguate_requested_attribute(attribute);
            if self.remaining.len() == 0 {
                return;
            }
        }
    }

    fn disambiguate_requested_attribute(&mut self, index: usize) {
        let values =
            distinct_values(&self.compatible, |candidate| self.candidate_value(candidate, index));
        if values.len() <= 1 {
            return;
        }

        let attribute = self.requested_attributes[index];
        let requested = self.requested_values[index];
        let Some(matches) = self.schema.disambiguate(&attribute, Some(&requested), &values) else {
            return;
        };
        if matches.len() < values.len() {
            let losers: Vec<usize> = self
                .remaining
                .iter()
                .filter(|&candidate| {
                    !self
                        .candidate_value(candidate, index)
                        .is_some_and(|value| matches.contains(&value))
                })
                .collect();
            for candidate in losers {
                self.remaining.remove(candidate);
            }
        }
    }

    fn disambiguate_with_extra_attributes(&mut self, extra_attributes: &[Attribute]) {
        let precedence = self.schema.order_by_precedence(extra_attributes);

        for index in precedence.sorted {
            let from = self.remaining.clone();
            self.disambiguate_extra_attribute(&extra_attributes[index], &from);
            if self.remaining.len() <= 1 {
                return;
            }
        }

        // Unsorted attributes are all judged against the same candidates
        let snapshot = self.remaining.clone();
        for index in precedence.unsorted {
            self.disambiguate_extra_attribute(&extra_attributes[index], &snapshot);
            if self.remaining.len() == 0 {
                return;
            }
        }
    }

    fn disambiguate_extra_attribute(&mut self, attribute: &Attribute, from: &CandidateSet) {
        let values = distinct_values(from, |candidate| self.extra_value(candidate, attribute));
        if values.is_empty() {
            return;
        }

        let Some(matches) = self.schema.disambiguate(attribute, None, &values) else {
            return;
        };
        let losers: Vec<usize> = self
            .remaining
            .iter()
            .filter(|&candidate| {
                !self
                    .extra_value(candidate, attribute)
                    .is_some_and(|value| matches.contains(&value))
            })
            .collect();
        for candidate in losers {
            self.remaining.remove(candidate);
        }
    }

    /// Prefer candidates that do not carry an extra attribute which only some
    /// of the candidates carry.
    fn disambiguate_with_requested_attribute_keys(&mut self, extra_attributes: &[Attribute]) {
        if self.requested_attributes.is_empty() {
            return;
        }
        let count = self.candidates.len();
        for attribute in extra_attributes {
            let mut carriers = CandidateSet::empty(count);
            for (index, candidate) in self.candidates.iter().enumerate() {
                if candidate.contains(attribute.name().as_str()) {
                    carriers.insert(index);
                }
            }
            if carriers.len() > 0 && carriers.len() != count {
                self.remaining.remove_all(&carriers);
                if self.remaining.len() == 0 {
                    break;
                }
            }
        }
    }
}

/// The distinct non-missing values of the candidates in `set`.
fn distinct_values(
    set: &CandidateSet,
    value_of: impl Fn(usize) -> Option<AttributeValue>,
) -> BTreeSet<AttributeValue> {
    set.iter().filter_map(value_of).collect()
}
