//! Roster planning for the membership invariant engine
//!
//! Given a team's current members and the requested roster, compute the
//! minimal set of patient-row mutations that reaches the requested roster
//! without ever leaving a patient claimed by two teams. Patients already on
//! a different team are conflicts, reported in full and applied not at all.

use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use carebase_common::Error;

use crate::domain::entities::Patient;
use crate::domain::state::{MembershipEvent, MembershipState, StateError};

/// A requested patient that already belongs to another team
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterConflict {
    pub patient_id: Uuid,
    pub team_id: Uuid,
}

/// Errors surfaced by roster resolution and planning
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("Team with id {0} not found")]
    TeamNotFound(Uuid),

    #[error("Group with id {0} not found")]
    GroupNotFound(Uuid),

    #[error("Patients not found: {}", join_ids(.0))]
    MissingPatients(Vec<Uuid>),

    #[error("{}; a patient can only belong to one team at a time", join_conflicts(.0))]
    Conflicts(Vec<RosterConflict>),
}

impl From<RosterError> for Error {
    fn from(err: RosterError) -> Self {
        match &err {
            RosterError::TeamNotFound(_)
            | RosterError::GroupNotFound(_)
            | RosterError::MissingPatients(_) => Error::NotFound(err.to_string()),
            RosterError::Conflicts(_) => Error::Conflict(err.to_string()),
        }
    }
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_conflicts(conflicts: &[RosterConflict]) -> String {
    conflicts
        .iter()
        .map(|c| {
            format!(
                "patient {} already belongs to team {}",
                c.patient_id, c.team_id
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// The minimal mutations needed to reach a requested roster.
///
/// `assign` and `release` always touch disjoint patient rows: assigns come
/// from the requested set and are currently unassigned, releases come from
/// the current members and are absent from the requested set. They may
/// therefore be applied in any order without breaking the single-team
/// invariant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RosterPlan {
    /// Patients to claim for this team (currently unassigned)
    pub assign: Vec<Uuid>,
    /// Current members to let go (absent from the requested roster)
    pub release: Vec<Uuid>,
}

impl RosterPlan {
    pub fn is_noop(&self) -> bool {
        self.assign.is_empty() && self.release.is_empty()
    }
}

/// Collapse duplicate ids, preserving first-seen order
pub fn dedupe_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Compute the roster plan for `team_id`.
///
/// `current` are the ids of the team's members at read time; `requested` are
/// the resolved patient rows of the requested roster. Fails with
/// [`RosterError::Conflicts`] naming every patient on a foreign team; on
/// conflict nothing may be applied.
pub fn plan_roster(
    team_id: Uuid,
    current: &[Uuid],
    requested: &[Patient],
) -> Result<RosterPlan, RosterError> {
    let mut assign = Vec::new();
    let mut conflicts = Vec::new();

    for patient in requested {
        let state = patient.membership_state();
        match state.transition(MembershipEvent::Assign(team_id)) {
            Ok(next) => {
                if next != state {
                    assign.push(patient.id);
                }
            }
            Err(StateError::ForeignAssignment { current_team, .. }) => {
                conflicts.push(RosterConflict {
                    patient_id: patient.id,
                    team_id: current_team,
                });
            }
        }
    }

    if !conflicts.is_empty() {
        return Err(RosterError::Conflicts(conflicts));
    }

    let requested_ids: HashSet<Uuid> = requested.iter().map(|p| p.id).collect();
    let release = current
        .iter()
        .copied()
        .filter(|id| !requested_ids.contains(id))
        .collect();

    Ok(RosterPlan { assign, release })
}
