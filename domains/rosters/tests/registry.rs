//! Group and patient registry tests
//!
//! The registries feed the roster engine: groups must exist before a team
//! can reference them, patients must exist before a roster can claim them,
//! and neither may disappear out from under a live reference.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use carebase_common::{Error, Pagination};
use carebase_rosters::{
    Gender, GroupService, InMemoryRosterStore, NewGroup, NewPatient, NewTeam, PatientService,
    TeamService, UpdateGroup, UpdatePatient,
};

fn services() -> (
    Arc<InMemoryRosterStore>,
    GroupService<InMemoryRosterStore>,
    PatientService<InMemoryRosterStore>,
    TeamService<InMemoryRosterStore>,
) {
    let store = Arc::new(InMemoryRosterStore::new());
    (
        Arc::clone(&store),
        GroupService::new(Arc::clone(&store)),
        PatientService::new(Arc::clone(&store)),
        TeamService::new(store),
    )
}

fn new_patient(document: &str) -> NewPatient {
    NewPatient {
        document: document.to_string(),
        name: "Ana".to_string(),
        last_name: "Suarez".to_string(),
        gender: Gender::Female,
        birthday: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
        zone: "north".to_string(),
    }
}

#[tokio::test]
async fn test_group_crud_happy_path() {
    let (_, groups, _, _) = services();

    let group = groups
        .create(NewGroup {
            group_name: "Zone North".to_string(),
        })
        .await
        .unwrap();

    let fetched = groups.get(group.id).await.unwrap();
    assert_eq!(fetched.group_name, "Zone North");

    let updated = groups
        .update(
            group.id,
            UpdateGroup {
                group_name: Some("Zone North-East".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.group_name, "Zone North-East");

    let (listed, total) = groups.list(Pagination::default()).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(listed[0].group_name, "Zone North-East");

    groups.remove(group.id).await.unwrap();
    assert!(matches!(
        groups.get(group.id).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn test_group_update_with_empty_payload_rejected() {
    let (_, groups, _, _) = services();
    let group = groups
        .create(NewGroup {
            group_name: "Zone North".to_string(),
        })
        .await
        .unwrap();

    let err = groups
        .update(group.id, UpdateGroup::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_group_duplicate_name_surfaces_opaquely() {
    let (_, groups, _, _) = services();
    groups
        .create(NewGroup {
            group_name: "Zone North".to_string(),
        })
        .await
        .unwrap();

    // Unique-constraint violations are storage internals: Internal, not 4xx
    let err = groups
        .create(NewGroup {
            group_name: "Zone North".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Internal(_)));
}

#[tokio::test]
async fn test_group_removal_rejected_while_teams_reference_it() {
    let (_, groups, _, teams) = services();
    let group = groups
        .create(NewGroup {
            group_name: "Zone North".to_string(),
        })
        .await
        .unwrap();
    teams
        .create(NewTeam {
            team_name: "Team A".to_string(),
            group_id: group.id,
            patient_ids: vec![],
        })
        .await
        .unwrap();

    let err = groups.remove(group.id).await.unwrap_err();
    match err {
        Error::Conflict(msg) => assert!(msg.contains(&group.id.to_string())),
        other => panic!("expected Conflict, got {:?}", other),
    }
    assert!(groups.get(group.id).await.is_ok());
}

#[tokio::test]
async fn test_group_unknown_id_fails() {
    let (_, groups, _, _) = services();
    let missing = Uuid::new_v4();
    assert!(matches!(
        groups.get(missing).await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        groups.remove(missing).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn test_patient_registration_and_lookup() {
    let (_, _, patients, _) = services();

    let patient = patients.register(new_patient("CC-1001")).await.unwrap();
    assert!(patient.team_id.is_none());
    assert!(patient.is_active);

    let fetched = patients.get(patient.id).await.unwrap();
    assert_eq!(fetched.document, "CC-1001");

    let (listed, total) = patients.list(Pagination::default()).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(listed[0].id, patient.id);
}

#[tokio::test]
async fn test_patient_invalid_document_rejected() {
    let (_, _, patients, _) = services();
    let err = patients.register(new_patient("ab")).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_patient_duplicate_document_surfaces_opaquely() {
    let (_, _, patients, _) = services();
    patients.register(new_patient("CC-1001")).await.unwrap();
    let err = patients.register(new_patient("CC-1001")).await.unwrap_err();
    assert!(matches!(err, Error::Internal(_)));
}

#[tokio::test]
async fn test_patient_update_changes_demographics_only() {
    let (_, groups, patients, teams) = services();
    let group = groups
        .create(NewGroup {
            group_name: "Zone North".to_string(),
        })
        .await
        .unwrap();
    let patient = patients.register(new_patient("CC-1001")).await.unwrap();
    let team = teams
        .create(NewTeam {
            team_name: "Team A".to_string(),
            group_id: group.id,
            patient_ids: vec![patient.id],
        })
        .await
        .unwrap();

    let updated = patients
        .update(
            patient.id,
            UpdatePatient {
                zone: Some("south".to_string()),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.zone, "south");
    assert!(!updated.is_active);
    // The demographic update did not move the team reference
    let fetched = patients.get(patient.id).await.unwrap();
    assert_eq!(fetched.team_id, Some(team.id));
}

#[tokio::test]
async fn test_patient_update_with_empty_payload_rejected() {
    let (_, _, patients, _) = services();
    let patient = patients.register(new_patient("CC-1001")).await.unwrap();

    let err = patients
        .update(patient.id, UpdatePatient::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_patient_update_validates_fields() {
    let (_, _, patients, _) = services();
    let patient = patients.register(new_patient("CC-1001")).await.unwrap();

    let err = patients
        .update(
            patient.id,
            UpdatePatient {
                name: Some("".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = patients
        .update(
            patient.id,
            UpdatePatient {
                document: Some("!!".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_patient_removal_rejected_while_assigned() {
    let (_, groups, patients, teams) = services();
    let group = groups
        .create(NewGroup {
            group_name: "Zone North".to_string(),
        })
        .await
        .unwrap();
    let patient = patients.register(new_patient("CC-1001")).await.unwrap();
    let team = teams
        .create(NewTeam {
            team_name: "Team A".to_string(),
            group_id: group.id,
            patient_ids: vec![patient.id],
        })
        .await
        .unwrap();

    let err = patients.remove(patient.id).await.unwrap_err();
    match err {
        Error::Conflict(msg) => {
            assert!(msg.contains(&patient.id.to_string()));
            assert!(msg.contains(&team.id.to_string()));
        }
        other => panic!("expected Conflict, got {:?}", other),
    }

    // After the team releases it, removal goes through
    teams.remove(team.id).await.unwrap();
    patients.remove(patient.id).await.unwrap();
    assert!(matches!(
        patients.get(patient.id).await.unwrap_err(),
        Error::NotFound(_)
    ));
}
