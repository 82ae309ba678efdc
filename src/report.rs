//! Dashboard aggregates built on top of the query engine.
//!
//! All functions operate on a [`QueryEngine`] reference (or on rows it
//! produced) and return structured results in a deterministic order.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::{InteractionRow, InvolvementScope, QueryEngine, Role};

/// Timestamp layout of `date` values, after leading `^` markers are stripped.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// ---------------------------------------------------------------------------
// Role census
// ---------------------------------------------------------------------------

/// Distinct entity counts per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCensus {
    pub robots: usize,
    pub humans: usize,
    pub actions: usize,
}

/// Count the distinct entities of each role.
pub fn role_census(q: &QueryEngine) -> RoleCensus {
    RoleCensus {
        robots: q.entities_of_role(Role::Robot).len(),
        humans: q.entities_of_role(Role::Human).len(),
        actions: q.entities_of_role(Role::Action).len(),
    }
}

// ---------------------------------------------------------------------------
// Per-role interaction report
// ---------------------------------------------------------------------------

/// An interaction summary row tagged with the entity it was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorInteractionRow {
    pub actor: String,
    #[serde(flatten)]
    pub row: InteractionRow,
}

/// Interaction rows for every entity of `role`, entity by entity.
pub fn role_interaction_report(
    q: &QueryEngine,
    role: Role,
    scope: InvolvementScope,
) -> Vec<ActorInteractionRow> {
    let rows: Vec<ActorInteractionRow> = q
        .entities_of_role(role)
        .into_iter()
        .flat_map(|actor| {
            q.interaction_summary_for(&actor, scope)
                .into_iter()
                .map(move |row| ActorInteractionRow {
                    actor: actor.clone(),
                    row,
                })
                .collect::<Vec<_>>()
        })
        .collect();
    tracing::debug!(%role, ?scope, rows = rows.len(), "built role interaction report");
    rows
}

// ---------------------------------------------------------------------------
// Emotion counts
// ---------------------------------------------------------------------------

/// How often an emotional state occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionCount {
    pub state: String,
    pub count: usize,
}

/// Count resolved emotional states. Sorted by count desc, then state asc.
pub fn emotion_counts(rows: &[ActorInteractionRow]) -> Vec<EmotionCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for state in rows.iter().filter_map(|r| r.row.emotional_state.as_deref()) {
        *counts.entry(state).or_default() += 1;
    }
    let mut results: Vec<EmotionCount> = counts
        .into_iter()
        .map(|(state, count)| EmotionCount {
            state: state.to_string(),
            count,
        })
        .collect();
    results.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.state.cmp(&b.state)));
    results
}

// ---------------------------------------------------------------------------
// Emotional timeline
// ---------------------------------------------------------------------------

/// One emotional state placed on the time axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub time: DateTime<Utc>,
    pub actor: String,
    pub interaction_id: String,
    pub state: String,
}

/// Parse a `date` value such as `^2024-05-01T10:00:00Z`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim_start_matches('^'), DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Resolved states with a parseable state date, sorted by time then actor.
pub fn emotional_timeline(rows: &[ActorInteractionRow]) -> Vec<TimelinePoint> {
    let mut points: Vec<TimelinePoint> = rows
        .iter()
        .filter_map(|r| {
            let state = r.row.emotional_state.as_ref()?;
            let raw = r.row.emotional_state_date.as_deref()?;
            let Some(time) = parse_date(raw) else {
                tracing::debug!(
                    interaction = %r.row.interaction_id,
                    date = raw,
                    "skipping unparseable emotional state date"
                );
                return None;
            };
            Some(TimelinePoint {
                time,
                actor: r.actor.clone(),
                interaction_id: r.row.interaction_id.clone(),
                state: state.clone(),
            })
        })
        .collect();
    points.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.actor.cmp(&b.actor)));
    points
}
