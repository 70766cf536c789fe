//! Membership state machine for patients
//!
//! A patient is either unassigned or assigned to exactly one team. The only
//! transitions are:
//! - `Unassigned --Assign(t)--> Assigned(t)`
//! - `Assigned(t) --Assign(t)--> Assigned(t)` (no-op re-assign)
//! - `Assigned(t) --Release--> Unassigned`
//! - `Unassigned --Release--> Unassigned` (release is idempotent)
//!
//! `Assigned(t1) --Assign(t2)-->` with `t1 != t2` is rejected: moving a
//! patient between teams must pass through `Unassigned` via an explicit
//! release, never happen silently as a side effect of another team's request.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during membership transitions
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("cannot assign to team {requested_team}: patient already belongs to team {current_team}")]
    ForeignAssignment {
        current_team: Uuid,
        requested_team: Uuid,
    },
}

/// Membership states. Derived from the patient's nullable team reference,
/// not stored directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipState {
    Unassigned,
    Assigned(Uuid),
}

/// Events that trigger membership transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipEvent {
    /// A team claims the patient for its roster
    Assign(Uuid),
    /// The owning team lets the patient go
    Release,
}

impl MembershipState {
    /// Derive the state from a patient's team reference
    pub fn of(team_id: Option<Uuid>) -> Self {
        match team_id {
            Some(id) => Self::Assigned(id),
            None => Self::Unassigned,
        }
    }

    /// The team currently holding the patient, if any
    pub fn team(&self) -> Option<Uuid> {
        match self {
            Self::Assigned(id) => Some(*id),
            Self::Unassigned => None,
        }
    }

    /// Attempt a transition, returning the next state
    pub fn transition(self, event: MembershipEvent) -> Result<MembershipState, StateError> {
        match (self, event) {
            (Self::Unassigned, MembershipEvent::Assign(team)) => Ok(Self::Assigned(team)),
            (Self::Assigned(current), MembershipEvent::Assign(requested)) => {
                if current == requested {
                    Ok(Self::Assigned(current))
                } else {
                    Err(StateError::ForeignAssignment {
                        current_team: current,
                        requested_team: requested,
                    })
                }
            }
            (_, MembershipEvent::Release) => Ok(Self::Unassigned),
        }
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(self, event: MembershipEvent) -> bool {
        self.transition(event).is_ok()
    }
}

impl std::fmt::Display for MembershipState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unassigned => write!(f, "unassigned"),
            Self::Assigned(team) => write!(f, "assigned to {}", team),
        }
    }
}
