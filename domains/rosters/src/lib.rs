//! Rosters domain: groups, teams, patients, staff, and the membership
//! invariant engine that keeps a patient on at most one team at a time.

pub mod domain;
pub mod repository;
pub mod service;

// Re-export domain types at the crate root for convenience
pub use domain::entities::*;
pub use domain::roster::{plan_roster, RosterConflict, RosterError, RosterPlan};
pub use domain::state::{MembershipEvent, MembershipState, StateError};

// Re-export repository types
pub use repository::{InMemoryRosterStore, PgRosterStore, RosterStore};

// Re-export the service surface
pub use service::assignment::AssignmentEngine;
pub use service::groups::{GroupService, NewGroup, UpdateGroup};
pub use service::lifecycle::{NewTeam, TeamService, UpdateTeam};
pub use service::patients::{NewPatient, PatientService, UpdatePatient};
pub use service::query::RosterQuery;
