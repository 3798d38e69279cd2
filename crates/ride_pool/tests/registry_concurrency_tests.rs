mod support;

use std::time::Duration;

use futures::future::join_all;
use ride_pool::{registry::MemberRef, GroupError};
use support::*;
use utility::id::Id;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_never_overfill_a_group() {
    let (_, registry) = slow_registry(4, Duration::from_millis(2), Duration::from_secs(10));
    let group_id = group_with_riders(&registry, 1).await;

    let joins = (2..=9).map(|rider| {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry
                .add_ride(&group_id, &Id::new(rider), &kiel_route(rider), false)
                .await
        })
    });
    let results = join_all(joins)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect::<Vec<_>>();

    let admitted = results.iter().filter(|result| result.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|result| matches!(result, Err(GroupError::CapacityExceeded { capacity: 4 })))
        .count();
    assert_eq!(admitted, 3);
    assert_eq!(rejected, 5);

    let group = registry.load_group(&group_id).await.unwrap();
    assert_eq!(group.num_of_riders, 4);
    assert_consistent(&group);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn groups_fill_independently() {
    let (_, registry) = slow_registry(2, Duration::from_millis(1), Duration::from_secs(10));
    let first = group_with_riders(&registry, 0).await;
    let second = group_with_riders(&registry, 0).await;

    let joins = (1..=6).map(|rider| {
        let registry = registry.clone();
        let group_id = if rider % 2 == 0 { first } else { second };
        tokio::spawn(async move {
            registry
                .add_ride(&group_id, &Id::new(rider), &kiel_route(rider), false)
                .await
        })
    });
    let admitted = join_all(joins)
        .await
        .into_iter()
        .filter(|joined| matches!(joined, Ok(Ok(_))))
        .count();
    assert_eq!(admitted, 4);

    for group_id in [first, second] {
        let group = registry.load_group(&group_id).await.unwrap();
        assert_eq!(group.num_of_riders, 2);
        assert_consistent(&group);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn joins_and_leaves_keep_the_counter_in_sync() {
    let (_, registry) = slow_registry(4, Duration::from_millis(1), Duration::from_secs(10));
    let group_id = group_with_riders(&registry, 3).await;
    let group = registry.load_group(&group_id).await.unwrap();
    let leaving = group.route_ids.iter().skip(1).copied().collect::<Vec<_>>();

    let leaves = leaving.into_iter().map(|route_id| {
        let registry = registry.clone();
        tokio::spawn(async move {
            let mut group = registry.load_group(&group_id).await?;
            registry
                .remove_ride(&mut group, MemberRef::Route(route_id))
                .await
        })
    });
    let joins = (10..=12).map(|rider| {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry
                .add_ride(&group_id, &Id::new(rider), &kiel_route(rider), false)
                .await
                .map(|_| true)
        })
    });
    for joined in join_all(leaves.chain(joins)).await {
        match joined.unwrap() {
            Ok(_) | Err(GroupError::CapacityExceeded { .. }) => {}
            Err(why) => panic!("unexpected error: {}", why),
        }
    }

    let group = registry.load_group(&group_id).await.unwrap();
    assert_consistent(&group);
    assert!(group.num_of_riders >= 1 && group.num_of_riders <= 4);
}

#[tokio::test]
async fn contended_group_reports_busy() {
    let (_, registry) = slow_registry(4, Duration::ZERO, Duration::from_millis(10));
    let group_id = group_with_riders(&registry, 1).await;
    registry.database().set_latency(Duration::from_millis(30));

    let holder = {
        let registry = registry.clone();
        tokio::spawn(async move {
            registry
                .add_ride(&group_id, &Id::new(2), &kiel_route(2), false)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;

    let result = registry
        .add_ride(&group_id, &Id::new(3), &kiel_route(3), false)
        .await;
    assert!(matches!(result, Err(GroupError::Busy)));
    holder.await.unwrap().unwrap();

    registry.database().set_latency(Duration::ZERO);
    let group = registry.load_group(&group_id).await.unwrap();
    assert_eq!(group.num_of_riders, 2);
}
