//! Explanations of matching decisions.
//!
//! The matcher reports what it does to an [`AttributeMatchingExplanationBuilder`].
//! Candidates are identified by their index in the list being matched.

use std::fmt;

use serde::Serialize;

use crate::attributes::container::ImmutableAttributes;
use crate::attributes::value::{Attribute, AttributeValue};

/// Receives matching events. Every method defaults to doing nothing.
pub trait AttributeMatchingExplanationBuilder {
    /// Whether nothing is recorded, so cached results can be used.
    fn can_skip_explanation(&self) -> bool {
        false
    }

    fn no_candidates(&mut self, _requested: &ImmutableAttributes) {}

    fn candidate_does_not_match_attributes(
        &mut self,
        _candidate: usize,
        _requested: &ImmutableAttributes,
    ) {
    }

    fn candidate_attribute_missing(
        &mut self,
        _candidate: usize,
        _attribute: &Attribute,
        _requested: &AttributeValue,
    ) {
    }

    fn candidate_attribute_does_not_match(
        &mut self,
        _candidate: usize,
        _attribute: &Attribute,
        _requested: &AttributeValue,
        _found: &AttributeValue,
    ) {
    }

    fn candidate_is_superset_of_all_others(&mut self, _candidate: usize) {}
}

/// Records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExplanationBuilder;

impl AttributeMatchingExplanationBuilder for NoopExplanationBuilder {
    fn can_skip_explanation(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MatchingEvent {
    NoCandidates,
    DoesNotMatch {
        candidate: usize,
    },
    AttributeMissing {
        candidate: usize,
        attribute: String,
        requested: AttributeValue,
    },
    AttributeMismatch {
        candidate: usize,
        attribute: String,
        requested: AttributeValue,
        found: AttributeValue,
    },
    Superset {
        candidate: usize,
    },
}

impl MatchingEvent {
    /// The candidate the event is about, if any.
    pub fn candidate(&self) -> Option<usize> {
        match self {
            MatchingEvent::NoCandidates => None,
            MatchingEvent::DoesNotMatch { candidate }
            | MatchingEvent::AttributeMissing { candidate, .. }
            | MatchingEvent::AttributeMismatch { candidate, .. }
            | MatchingEvent::Superset { candidate } => Some(*candidate),
        }
    }
}

impl MatchingEvent {
    /// Render the event, naming candidates with `name_of`.
    pub fn describe(&self, name_of: impl Fn(usize) -> String) -> String {
        match self {
            MatchingEvent::NoCandidates => "no candidates to match".to_string(),
            MatchingEvent::DoesNotMatch { candidate } => {
                format!("{} does not match the request", name_of(*candidate))
            }
            MatchingEvent::AttributeMissing {
                candidate,
                attribute,
                requested,
            } => format!(
                "{} does not declare `{}` (requested {})",
                name_of(*candidate),
                attribute,
                requested
            ),
            MatchingEvent::AttributeMismatch {
                candidate,
                attribute,
                requested,
                found,
            } => format!(
                "{} has `{}` = {}, incompatible with requested {}",
                name_of(*candidate),
                attribute,
                found,
                requested
            ),
            MatchingEvent::Superset { candidate } => format!(
                "{} matches a superset of the attributes of every other candidate",
                name_of(*candidate)
            ),
        }
    }
}

impl fmt::Display for MatchingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(|candidate| format!("candidate #{}", candidate)))
    }
}

/// Keeps every event in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingExplanationBuilder {
    events: Vec<MatchingEvent>,
}

impl RecordingExplanationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[MatchingEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<MatchingEvent> {
        self.events
    }
}

impl AttributeMatchingExplanationBuilder for RecordingExplanationBuilder {
    fn no_candidates(&mut self, _requested: &ImmutableAttributes) {
        self.events.push(MatchingEvent::NoCandidates);
    }

    fn candidate_does_not_match_attributes(
        &mut self,
        candidate: usize,
        _requested: &ImmutableAttributes,
    ) {
        self.events.push(MatchingEvent::DoesNotMatch { candidate });
    }

    fn candidate_attribute_missing(
        &mut self,
        candidate: usize,
        attribute: &Attribute,
        requested: &AttributeValue,
    ) {
        self.events.push(MatchingEvent::AttributeMissing {
            candidate,
            attribute: attribute.to_string(),
            requested: *requested,
        });
    }

    fn candidate_attribute_does_not_match(
        &mut self,
        candidate: usize,
        attribute: &Attribute,
        requested: &AttributeValue,
        found: &AttributeValue,
    ) {
        self.events.push(MatchingEvent::AttributeMismatch {
            candidate,
            attribute: attribute.to_string(),
            requested: *requested,
            found: *found,
        });
    }

    fn candidate_is_superset_of_all_others(&mut self, candidate: usize) {
        self.events.push(MatchingEvent::Superset { candidate });
    }
}
