//! Triple-Query Engine: the entity and relationship questions asked of an
//! interaction log.
//!
//! Conventions over a table of `(node1, node2, label)` rows:
//!
//! - **Role**: an entity has role `R` (`Robot`, `Human`, `Action`) iff some row
//!   has `node1 == entity` and `node2 == R`, whatever the label.
//! - **Attributes**: `(entity, type, value)` and `(entity, label, value)` rows.
//! - **Interactions**: `Action` entities linked to an actor by `performedBy`;
//!   the wider scope takes any node linked by `performedBy` or `objectOfAction`.
//! - **Causal chain**: `stateNode --causedBy--> interaction` plus
//!   `stateNode --hasEmotionalState--> value` and `stateNode --date--> value`.
//!
//! Every lookup that matches several rows takes the first one in table order.
//! Misses are empty collections or `None` fields, never errors.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::graph::index::TripleIndex;
use crate::table::{Triple, TripleTable};

/// Edge labels the queries understand.
pub mod labels {
    pub const TYPE: &str = "type";
    pub const LABEL: &str = "label";
    pub const PERFORMED_BY: &str = "performedBy";
    pub const OBJECT_OF_ACTION: &str = "objectOfAction";
    pub const CAUSED_BY: &str = "causedBy";
    pub const HAS_EMOTIONAL_STATE: &str = "hasEmotionalState";
    pub const DATE: &str = "date";
}

/// The closed set of role discriminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Robot,
    Human,
    Action,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Robot, Role::Human, Role::Action];

    /// The literal `node2` value that marks this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Robot => "Robot",
            Role::Human => "Human",
            Role::Action => "Action",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QueryError::UnknownRole { role: s.to_string() })
    }
}

/// Which edges count as an entity taking part in an interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvolvementScope {
    /// Only `(interaction, performedBy, entity)`.
    #[default]
    PerformedBy,
    /// `performedBy` or `(interaction, objectOfAction, entity)`.
    PerformedOrObject,
}

/// The `type` and `label` attributes of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub type_value: Option<String>,
    pub label_value: Option<String>,
}

/// One row of an attribute summary. Only entities with a `type` appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAttributes {
    pub entity_id: String,
    pub type_value: String,
    pub label_value: Option<String>,
}

/// Emotional state attributed to an interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionalState {
    pub state: Option<String>,
    pub date: Option<String>,
}

impl EmotionalState {
    /// Whether the causal chain resolved.
    pub fn is_resolved(&self) -> bool {
        self.state.is_some()
    }
}

/// One interaction with its date and resulting emotional state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRow {
    pub interaction_id: String,
    pub date: Option<String>,
    pub emotional_state: Option<String>,
    pub emotional_state_date: Option<String>,
}

/// Read-only query engine over one triple table.
///
/// The index is built once at construction; every query is a pure function
/// of the table, so repeated calls return identical results.
#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    index: TripleIndex,
    /// `Action` entity → position in first-seen role order.
    action_rank: HashMap<String, usize>,
}

impl QueryEngine {
    /// Index `table` and wrap it for querying.
    pub fn new(table: TripleTable) -> Self {
        let index = TripleIndex::new(table);
        let mut action_rank = HashMap::new();
        for id in index.holders_of(Role::Action.as_str()) {
            let next = action_rank.len();
            action_rank.entry(id.to_string()).or_insert(next);
        }
        Self { index, action_rank }
    }

    fn members(&self, role: Role) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.index
            .holders_of(role.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Distinct entities holding `role`, first-seen table order.
    pub fn entities_of_role(&self, role: Role) -> Vec<String> {
        self.members(role).into_iter().map(String::from).collect()
    }

    /// First `type` and first `label` value of `entity`.
    pub fn attributes_of(&self, entity: &str) -> Attributes {
        Attributes {
            type_value: self.index.first_object(entity, labels::TYPE).map(String::from),
            label_value: self.index.first_object(entity, labels::LABEL).map(String::from),
        }
    }

    /// Attributes of every entity of `role`, skipping entities with no `type`.
    pub fn attribute_summary(&self, role: Role) -> Vec<EntityAttributes> {
        self.members(role)
            .into_iter()
            .filter_map(|id| {
                let attrs = self.attributes_of(id);
                Some(EntityAttributes {
                    entity_id: id.to_string(),
                    type_value: attrs.type_value?,
                    label_value: attrs.label_value,
                })
            })
            .collect()
    }

    /// Interactions linked to `entity` under `scope`.
    ///
    /// `PerformedBy` keeps only `Action` entities, in the order of
    /// [`entities_of_role`](Self::entities_of_role)`(Action)`.
    /// `PerformedOrObject` takes every distinct `node1` of a `performedBy` or
    /// `objectOfAction` row pointing at `entity`, in table order, whatever its role.
    pub fn interactions_for(&self, entity: &str, scope: InvolvementScope) -> Vec<String> {
        let mut seen = HashSet::new();
        match scope {
            InvolvementScope::PerformedBy => {
                let mut ranked: Vec<(usize, &str)> = self
                    .index
                    .subjects(labels::PERFORMED_BY, entity)
                    .filter(|id| seen.insert(*id))
                    .filter_map(|id| Some((*self.action_rank.get(id)?, id)))
                    .collect();
                ranked.sort_unstable_by_key(|(rank, _)| *rank);
                ranked.into_iter().map(|(_, id)| id.to_string()).collect()
            }
            InvolvementScope::PerformedOrObject => self
                .index
                .rows_to(entity)
                .filter(|t| t.label == labels::PERFORMED_BY || t.label == labels::OBJECT_OF_ACTION)
                .map(|t| t.node1.as_str())
                .filter(|id| seen.insert(*id))
                .map(String::from)
                .collect(),
        }
    }

    /// Interactions performed by `actor`.
    pub fn interactions_performed_by(&self, actor: &str) -> Vec<String> {
        self.interactions_for(actor, InvolvementScope::PerformedBy)
    }

    /// Interactions `entity` performed or was the object of.
    pub fn interactions_involving(&self, entity: &str) -> Vec<String> {
        self.interactions_for(entity, InvolvementScope::PerformedOrObject)
    }

    /// Follow `causedBy` one hop back from `interaction`, then read the state
    /// node's `hasEmotionalState` and `date`.
    ///
    /// Yields `(None, None)` when either the `causedBy` or the
    /// `hasEmotionalState` link is missing.
    pub fn emotional_state_for_interaction(&self, interaction: &str) -> EmotionalState {
        let Some(state_node) = self.index.first_subject(labels::CAUSED_BY, interaction) else {
            return EmotionalState::default();
        };
        let Some(state) = self.index.first_object(state_node, labels::HAS_EMOTIONAL_STATE) else {
            return EmotionalState::default();
        };
        EmotionalState {
            state: Some(state.to_string()),
            date: self.index.first_object(state_node, labels::DATE).map(String::from),
        }
    }

    /// Summary row for a single interaction.
    pub fn interaction_row(&self, interaction: &str) -> InteractionRow {
        let emotion = self.emotional_state_for_interaction(interaction);
        InteractionRow {
            interaction_id: interaction.to_string(),
            date: self.index.first_object(interaction, labels::DATE).map(String::from),
            emotional_state: emotion.state,
            emotional_state_date: emotion.date,
        }
    }

    /// One row per interaction performed by `actor`; unresolved fields are
    /// `None`, rows are never dropped.
    pub fn interaction_summary(&self, actor: &str) -> Vec<InteractionRow> {
        self.interaction_summary_for(actor, InvolvementScope::PerformedBy)
    }

    /// [`interaction_summary`](Self::interaction_summary) under an explicit scope.
    pub fn interaction_summary_for(&self, entity: &str, scope: InvolvementScope) -> Vec<InteractionRow> {
        self.interactions_for(entity, scope)
            .iter()
            .map(|id| self.interaction_row(id))
            .collect()
    }

    /// Every `hasEmotionalState` value recorded directly on `entity`.
    pub fn emotional_states_of(&self, entity: &str) -> Vec<String> {
        self.index
            .objects(entity, labels::HAS_EMOTIONAL_STATE)
            .map(String::from)
            .collect()
    }

    /// Every row of every node that points at `interaction` by any label, in
    /// table order: the state nodes it caused, with all their attributes.
    pub fn interaction_context(&self, interaction: &str) -> Vec<Triple> {
        let linked: HashSet<&str> = self.index.holders_of(interaction).collect();
        if linked.is_empty() {
            return Vec::new();
        }
        self.index
            .triples()
            .iter()
            .filter(|t| linked.contains(t.node1.as_str()))
            .cloned()
            .collect()
    }
}

impl From<TripleTable> for QueryEngine {
    fn from(table: TripleTable) -> Self {
        Self::new(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(rows: &[(&str, &str, &str)]) -> QueryEngine {
        rows.iter()
            .map(|(a, b, l)| Triple::new(*a, *b, *l))
            .collect::<TripleTable>()
            .into()
    }

    fn interaction_log() -> QueryEngine {
        engine(&[
            ("R1", "Robot", "type"),
            ("R1", "Pepper", "label"),
            ("R2", "Robot", "type"),
            ("H1", "Human", "type"),
            ("H1", "Alice", "label"),
            ("I1", "Action", "type"),
            ("I1", "R1", "performedBy"),
            ("I1", "H1", "objectOfAction"),
            ("I1", "^2024-05-01T10:00:00Z", "date"),
            ("I2", "Action", "type"),
            ("I2", "H1", "performedBy"),
            ("I2", "R1", "objectOfAction"),
            ("I3", "Action", "type"),
            ("I3", "R1", "performedBy"),
            ("E1", "I1", "causedBy"),
            ("E1", "Happy", "hasEmotionalState"),
            ("E1", "^2024-05-01T10:05:00Z", "date"),
            ("H1", "Calm", "hasEmotionalState"),
            ("H1", "Happy", "hasEmotionalState"),
        ])
    }

    #[test]
    fn role_parsing() {
        assert_eq!("Robot".parse::<Role>().unwrap(), Role::Robot);
        assert_eq!(" human ".parse::<Role>().unwrap(), Role::Human);
        assert!(matches!(
            "Dog".parse::<Role>(),
            Err(QueryError::UnknownRole { .. })
        ));
        assert_eq!(Role::Action.to_string(), "Action");
    }

    #[test]
    fn scenario_attributes() {
        let q = engine(&[("R1", "Robot", "type"), ("R1", "Walk", "label")]);
        assert_eq!(
            q.attributes_of("R1"),
            Attributes {
                type_value: Some("Robot".into()),
                label_value: Some("Walk".into()),
            }
        );
    }

    #[test]
    fn scenario_interactions_performed_by() {
        let q = engine(&[("I1", "Action", "type"), ("I1", "R1", "performedBy")]);
        assert_eq!(q.interactions_performed_by("R1"), vec!["I1"]);
    }

    #[test]
    fn scenario_emotion_without_date() {
        let q = engine(&[
            ("I1", "Action", "type"),
            ("I1", "R1", "performedBy"),
            ("E1", "I1", "causedBy"),
            ("E1", "Happy", "hasEmotionalState"),
        ]);
        assert_eq!(
            q.emotional_state_for_interaction("I1"),
            EmotionalState {
                state: Some("Happy".into()),
                date: None,
            }
        );
    }

    #[test]
    fn scenario_empty_table() {
        let q = QueryEngine::default();
        for role in Role::ALL {
            assert!(q.entities_of_role(role).is_empty());
            assert!(q.attribute_summary(role).is_empty());
        }
        assert_eq!(q.attributes_of("R1"), Attributes::default());
        assert!(q.interactions_performed_by("R1").is_empty());
        assert_eq!(q.emotional_state_for_interaction("I1"), EmotionalState::default());
        assert!(q.interaction_summary("R1").is_empty());
        assert!(q.emotional_states_of("H1").is_empty());
    }

    #[test]
    fn entities_of_role_is_distinct_and_label_agnostic() {
        let q = engine(&[
            ("R1", "Robot", "type"),
            ("R2", "Robot", "isA"),
            ("R1", "Robot", "type"),
        ]);
        assert_eq!(q.entities_of_role(Role::Robot), vec!["R1", "R2"]);
        assert!(q.entities_of_role(Role::Human).is_empty());
    }

    #[test]
    fn first_match_wins_for_attributes() {
        let q = engine(&[
            ("R1", "Robot", "type"),
            ("R1", "Pepper", "label"),
            ("R1", "Machine", "type"),
            ("R1", "Nao", "label"),
        ]);
        let attrs = q.attributes_of("R1");
        assert_eq!(attrs.type_value.as_deref(), Some("Robot"));
        assert_eq!(attrs.label_value.as_deref(), Some("Pepper"));
    }

    #[test]
    fn attribute_summary_requires_type() {
        let q = engine(&[
            ("R1", "Robot", "type"),
            ("R2", "Robot", "isA"),
            ("R2", "Nao", "label"),
            ("R3", "Robot", "type"),
            ("R3", "Walker", "label"),
        ]);
        let summary = q.attribute_summary(Role::Robot);
        assert_eq!(
            summary,
            vec![
                EntityAttributes {
                    entity_id: "R1".into(),
                    type_value: "Robot".into(),
                    label_value: None,
                },
                EntityAttributes {
                    entity_id: "R3".into(),
                    type_value: "Robot".into(),
                    label_value: Some("Walker".into()),
                },
            ]
        );
    }

    #[test]
    fn performed_by_requires_action_role() {
        let q = engine(&[("I9", "R1", "performedBy")]);
        assert!(q.interactions_performed_by("R1").is_empty());
    }

    #[test]
    fn involvement_scope_widens_to_objects() {
        let q = interaction_log();
        assert_eq!(q.interactions_performed_by("R1"), vec!["I1", "I3"]);
        assert_eq!(q.interactions_involving("R1"), vec!["I1", "I2", "I3"]);
        assert_eq!(q.interactions_performed_by("H1"), vec!["I2"]);
        assert_eq!(q.interactions_involving("H1"), vec!["I1", "I2"]);
    }

    #[test]
    fn emotional_chain_with_date() {
        let q = interaction_log();
        assert_eq!(
            q.emotional_state_for_interaction("I1"),
            EmotionalState {
                state: Some("Happy".into()),
                date: Some("^2024-05-01T10:05:00Z".into()),
            }
        );
        assert!(!q.emotional_state_for_interaction("I3").is_resolved());
        assert_eq!(q.emotional_state_for_interaction("nope"), EmotionalState::default());
    }

    #[test]
    fn broken_chain_yields_nothing_even_with_date() {
        let q = engine(&[("E1", "I1", "causedBy"), ("E1", "2024-01-01T00:00:00Z", "date")]);
        assert_eq!(q.emotional_state_for_interaction("I1"), EmotionalState::default());
    }

    #[test]
    fn only_one_hop_is_followed() {
        let q = engine(&[
            ("E1", "I1", "causedBy"),
            ("E2", "E1", "causedBy"),
            ("E2", "Sad", "hasEmotionalState"),
        ]);
        assert_eq!(q.emotional_state_for_interaction("I1"), EmotionalState::default());
    }

    #[test]
    fn summary_keeps_unresolved_rows() {
        let q = interaction_log();
        let rows = q.interaction_summary("R1");
        assert_eq!(
            rows,
            vec![
                InteractionRow {
                    interaction_id: "I1".into(),
                    date: Some("^2024-05-01T10:00:00Z".into()),
                    emotional_state: Some("Happy".into()),
                    emotional_state_date: Some("^2024-05-01T10:05:00Z".into()),
                },
                InteractionRow {
                    interaction_id: "I3".into(),
                    date: None,
                    emotional_state: None,
                    emotional_state_date: None,
                },
            ]
        );
    }

    #[test]
    fn direct_emotional_states_in_table_order() {
        let q = interaction_log();
        assert_eq!(q.emotional_states_of("H1"), vec!["Calm", "Happy"]);
        assert!(q.emotional_states_of("R1").is_empty());
    }

    #[test]
    fn queries_are_repeatable() {
        let q = interaction_log();
        assert_eq!(q.interaction_summary("R1"), q.interaction_summary("R1"));
        assert_eq!(q.entities_of_role(Role::Action), q.entities_of_role(Role::Action));
    }

    #[test]
    fn involving_does_not_require_action_role() {
        let q = engine(&[
            ("R1", "Robot", "type"),
            ("I1", "R1", "objectOfAction"),
            ("E1", "I1", "causedBy"),
            ("E1", "Happy", "hasEmotionalState"),
        ]);
        assert!(q.interactions_performed_by("R1").is_empty());
        assert_eq!(q.interactions_involving("R1"), vec!["I1"]);
        let rows = q.interaction_summary_for("R1", InvolvementScope::PerformedOrObject);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].emotional_state.as_deref(), Some("Happy"));
    }

    #[test]
    fn involving_is_distinct_in_table_order() {
        let q = engine(&[
            ("I2", "R1", "objectOfAction"),
            ("I1", "R1", "performedBy"),
            ("I2", "R1", "performedBy"),
        ]);
        assert_eq!(q.interactions_involving("R1"), vec!["I2", "I1"]);
    }

    #[test]
    fn performed_by_follows_action_order() {
        let q = engine(&[
            ("I1", "Action", "type"),
            ("I2", "Action", "type"),
            ("I2", "R1", "performedBy"),
            ("I1", "R1", "performedBy"),
            ("I2", "R1", "performedBy"),
        ]);
        assert_eq!(q.interactions_performed_by("R1"), vec!["I1", "I2"]);
    }

    #[test]
    fn context_lists_rows_of_linked_nodes() {
        let q = interaction_log();
        assert_eq!(
            q.interaction_context("I1"),
            vec![
                Triple::new("E1", "I1", "causedBy"),
                Triple::new("E1", "Happy", "hasEmotionalState"),
                Triple::new("E1", "^2024-05-01T10:05:00Z", "date"),
            ]
        );
        assert!(q.interaction_context("I3").is_empty());
    }
}
