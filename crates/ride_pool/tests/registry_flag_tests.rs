mod support;

use model::ride_group::RideGroup;
use ride_pool::{registry::WriteMode, GroupError};
use support::*;
use utility::id::Id;

fn ghost_group() -> RideGroup {
    let mut group = RideGroup::new(extent_of(&kiel_route(1)), false);
    group.id = Some(Id::new(4711));
    group
}

#[tokio::test]
async fn missing_group_counts_as_closed_and_not_assignable() {
    let (_, registry) = registry(4);
    let mut group = ghost_group();
    assert!(registry.is_closed(&mut group).await.unwrap());
    assert!(!registry.get_is_assignable(&mut group).await.unwrap());
    assert!(group.closed);
    assert!(!group.is_assignable);
}

#[tokio::test]
async fn unpersisted_group_answers_from_memory() {
    let (_, registry) = registry(4);
    let mut group = RideGroup::new(extent_of(&kiel_route(1)), false);
    assert!(!registry.is_closed(&mut group).await.unwrap());
    assert!(registry.get_is_assignable(&mut group).await.unwrap());
    assert!(matches!(
        registry
            .has_closed(&mut group, true, WriteMode::Persisted)
            .await,
        Err(GroupError::IdMissing)
    ));
    assert!(!group.closed);
}

#[tokio::test]
async fn closing_a_group_stops_new_riders_but_not_the_driver() {
    let (_, registry) = registry(4);
    let group_id = group_with_riders(&registry, 2).await;
    let mut group = registry.load_group(&group_id).await.unwrap();

    assert!(registry
        .has_closed(&mut group, true, WriteMode::Persisted)
        .await
        .unwrap());
    assert!(group.closed);

    let result = registry
        .add_ride(&group_id, &Id::new(3), &kiel_route(3), false)
        .await;
    assert!(matches!(result, Err(GroupError::Closed)));
    let stored = registry.load_group(&group_id).await.unwrap();
    assert_eq!(stored.num_of_riders, 2);
    assert!(stored.closed);

    assert!(registry.get_is_assignable(&mut group).await.unwrap());
    assert!(registry.assign_driver(&mut group, &Id::new(9)).await.unwrap());
    assert_eq!(group.driver_id, Some(Id::new(9)));
    assert_eq!(
        registry.load_group(&group_id).await.unwrap().driver_id,
        Some(Id::new(9))
    );
}

#[tokio::test]
async fn closed_group_keeps_its_members() {
    let (_, registry) = registry(4);
    let group_id = group_with_riders(&registry, 2).await;
    let mut group = registry.load_group(&group_id).await.unwrap();
    registry
        .has_closed(&mut group, true, WriteMode::Persisted)
        .await
        .unwrap();
    let member = *group.route_ids.last().unwrap();
    assert!(matches!(
        registry
            .remove_ride(&mut group, ride_pool::registry::MemberRef::Route(member))
            .await,
        Err(GroupError::Closed)
    ));
    assert_eq!(group.number_of_rides(), 2);
}

#[tokio::test]
async fn closed_group_can_not_be_reopened() {
    let (_, registry) = registry(4);
    let group_id = group_with_riders(&registry, 1).await;
    let mut group = registry.load_group(&group_id).await.unwrap();
    registry
        .has_closed(&mut group, true, WriteMode::Persisted)
        .await
        .unwrap();
    assert!(matches!(
        registry
            .has_closed(&mut group, false, WriteMode::Persisted)
            .await,
        Err(GroupError::Closed)
    ));
    assert!(group.closed);
    assert!(registry.is_closed(&mut group).await.unwrap());
}

#[tokio::test]
async fn internal_writes_only_touch_the_in_memory_group() {
    let (_, registry) = registry(4);
    let group_id = group_with_riders(&registry, 1).await;
    let mut group = registry.load_group(&group_id).await.unwrap();

    assert!(registry
        .has_closed(&mut group, true, WriteMode::Internal)
        .await
        .unwrap());
    assert!(registry
        .set_is_assignable(&mut group, false, WriteMode::Internal)
        .await
        .unwrap());
    assert!(group.closed);
    assert!(!group.is_assignable);

    let stored = registry.load_group(&group_id).await.unwrap();
    assert!(!stored.closed);
    assert!(stored.is_assignable);

    // Reading back refreshes the view from the store.
    assert!(!registry.is_closed(&mut group).await.unwrap());
    assert!(registry.get_is_assignable(&mut group).await.unwrap());
    assert!(!group.closed);
    assert!(group.is_assignable);
}

#[tokio::test]
async fn assignable_flag_is_persisted() {
    let (_, registry) = registry(4);
    let group_id = group_with_riders(&registry, 1).await;
    let mut group = registry.load_group(&group_id).await.unwrap();

    assert!(registry
        .set_is_assignable(&mut group, false, WriteMode::Persisted)
        .await
        .unwrap());
    let mut other_view = registry.load_group(&group_id).await.unwrap();
    assert!(!other_view.is_assignable);
    assert!(!registry.get_is_assignable(&mut other_view).await.unwrap());
}

#[tokio::test]
async fn failed_flag_write_keeps_the_in_memory_value() {
    let (database, registry) = registry(4);
    let group_id = group_with_riders(&registry, 1).await;
    let mut group = registry.load_group(&group_id).await.unwrap();

    database.fail_writes(true);
    assert!(matches!(
        registry
            .has_closed(&mut group, true, WriteMode::Persisted)
            .await,
        Err(GroupError::StoreFailure(_))
    ));
    assert!(matches!(
        registry
            .set_is_assignable(&mut group, false, WriteMode::Persisted)
            .await,
        Err(GroupError::StoreFailure(_))
    ));
    database.fail_writes(false);

    assert!(!group.closed);
    assert!(group.is_assignable);
    assert!(!registry.is_closed(&mut group).await.unwrap());
}

#[tokio::test]
async fn failed_flag_read_is_reported() {
    let (database, registry) = registry(4);
    let group_id = group_with_riders(&registry, 1).await;
    let mut group = registry.load_group(&group_id).await.unwrap();

    database.fail_reads(true);
    assert!(matches!(
        registry.is_closed(&mut group).await,
        Err(GroupError::StoreFailure(_))
    ));
    assert!(matches!(
        registry.get_is_assignable(&mut group).await,
        Err(GroupError::StoreFailure(_))
    ));
    database.fail_reads(false);
    assert!(!group.closed);
    assert!(group.is_assignable);
}

#[tokio::test]
async fn driver_is_only_assigned_to_stored_groups() {
    let (_, registry) = registry(4);
    let mut unsaved = RideGroup::new(extent_of(&kiel_route(1)), false);
    assert!(!registry.assign_driver(&mut unsaved, &Id::new(1)).await.unwrap());
    assert!(unsaved.driver_id.is_none());

    let mut ghost = ghost_group();
    assert!(!registry.assign_driver(&mut ghost, &Id::new(1)).await.unwrap());
    assert!(!ghost.has_driver());
}

#[tokio::test]
async fn completing_a_group_closes_it_once() {
    let (_, registry) = registry(4);
    let group_id = group_with_riders(&registry, 2).await;
    let mut group = registry.load_group(&group_id).await.unwrap();

    assert!(registry.complete_group(&mut group).await.unwrap());
    assert!(group.completed);
    assert!(group.closed);
    assert!(group.date_completed.is_some());

    let stored = registry.load_group(&group_id).await.unwrap();
    assert!(stored.completed);
    assert!(stored.closed);
    assert_eq!(stored.date_completed, group.date_completed);

    assert!(!registry.complete_group(&mut group).await.unwrap());
    assert!(matches!(
        registry
            .add_ride(&group_id, &Id::new(3), &kiel_route(3), false)
            .await,
        Err(GroupError::Closed)
    ));
}
