//! Integration tests for the in-memory toilet store.
//!
//! This suite validates:
//! - Geometry stays consistent with coordinates across inserts and updates
//! - Nearest-neighbor search (radius, ordering, cap, distances)
//! - Viewport containment
//! - Deterministic fetch: country inference, zoom branching, reproducibility
//! - CRUD, pagination, and country listing

use radar_core::{
    BoundingBox, CountryCode, CountryInference, CreateToiletRequest, FetchStrategy, GeoPoint,
    ToiletStore, UpdateToiletRequest,
};
use radar_index::MemoryToiletStore;
use uuid::Uuid;

const LAUSANNE: (f64, f64) = (46.5197, 6.6323);

fn point(lat: f64, lng: f64) -> GeoPoint {
    GeoPoint { lat, lng }
}

fn located(lat: f64, lng: f64, country: CountryCode) -> CreateToiletRequest {
    CreateToiletRequest::at(lat, lng).with_country(country)
}

/// Five records around Geneva: three Swiss, two French across the border.
async fn geneva_border_store() -> MemoryToiletStore {
    let store = MemoryToiletStore::new();
    store
        .insert_bulk(vec![
            located(46.2044, 6.1432, CountryCode::CH).with_name("Cornavin"),
            located(46.2010, 6.1460, CountryCode::CH).with_name("Bel-Air"),
            located(46.2100, 6.1500, CountryCode::CH).with_name("Paquis"),
            located(46.1950, 6.1300, CountryCode::FR).with_name("Frontiere"),
            located(46.1900, 6.1250, CountryCode::FR).with_name("Saint-Julien"),
        ])
        .await
        .expect("Failed to seed store");
    store
}

// ============================================================================
// GEOMETRY SYNC
// ============================================================================

#[tokio::test]
async fn test_geometry_present_iff_both_coordinates() {
    let store = MemoryToiletStore::new();

    let both = store
        .insert(CreateToiletRequest::at(LAUSANNE.0, LAUSANNE.1))
        .await
        .unwrap();
    assert_eq!(both.geom, Some(point(LAUSANNE.0, LAUSANNE.1)));

    let lat_only = store
        .insert(CreateToiletRequest {
            lat: Some(46.0),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(lat_only.geom.is_none());

    let none = store.insert(CreateToiletRequest::default()).await.unwrap();
    assert!(none.geom.is_none());

    // Completing the pair derives geometry.
    let completed = store
        .update(
            lat_only.id,
            UpdateToiletRequest {
                lng: Some(Some(7.0)),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.geom, Some(point(46.0, 7.0)));

    // Nulling one side clears it.
    let cleared = store
        .update(
            both.id,
            UpdateToiletRequest {
                lat: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(cleared.geom.is_none());

    for record in store.list(100, 0).await.unwrap() {
        assert_eq!(
            record.geom.is_some(),
            record.lat.is_some() && record.lng.is_some(),
            "geometry out of sync for {}",
            record.id
        );
    }
}

#[tokio::test]
async fn test_non_coordinate_update_keeps_geometry() {
    let store = MemoryToiletStore::new();
    let t = store
        .insert(CreateToiletRequest::at(LAUSANNE.0, LAUSANNE.1).with_name("Flon"))
        .await
        .unwrap();

    let updated = store
        .update(
            t.id,
            UpdateToiletRequest {
                name: Some(Some("Flon (renovated)".to_string())),
                is_free: Some(Some(true)),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.geom, t.geom);
    assert_eq!(updated.created_at, t.created_at);
    assert_eq!(updated.name.as_deref(), Some("Flon (renovated)"));
    assert_eq!(updated.is_free, Some(true));
}

#[tokio::test]
async fn test_moved_record_found_at_new_location() {
    let store = MemoryToiletStore::new();
    let t = store
        .insert(CreateToiletRequest::at(LAUSANNE.0, LAUSANNE.1))
        .await
        .unwrap();
    store
        .update(
            t.id,
            UpdateToiletRequest {
                lat: Some(Some(47.3769)),
                lng: Some(Some(8.5417)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let at_old = store
        .nearest_within(point(LAUSANNE.0, LAUSANNE.1), 1_000.0, 3)
        .await
        .unwrap();
    assert!(at_old.is_empty());

    let at_new = store
        .nearest_within(point(47.3769, 8.5417), 1_000.0, 3)
        .await
        .unwrap();
    assert_eq!(at_new.len(), 1);
    assert_eq!(at_new[0].id, t.id);
}

// ============================================================================
// NEAREST NEIGHBOR
// ============================================================================

#[tokio::test]
async fn test_lausanne_nearest() {
    let store = MemoryToiletStore::new();
    let a = store
        .insert(located(LAUSANNE.0, LAUSANNE.1, CountryCode::CH))
        .await
        .unwrap();

    let results = store
        .nearest_within(point(46.52, 6.63), 5_000.0, 3)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, a.id);
    let distance = results[0].distance.expect("distance should be set");
    assert!(distance < 500.0, "distance was {}", distance);
}

#[tokio::test]
async fn test_exact_point_has_zero_distance() {
    let store = MemoryToiletStore::new();
    let t = store
        .insert(CreateToiletRequest::at(48.8566, 2.3522))
        .await
        .unwrap();

    for radius in [0.0, 1.0, 20_000.0] {
        let results = store
            .nearest_within(point(48.8566, 2.3522), radius, 3)
            .await
            .unwrap();
        assert_eq!(results.len(), 1, "radius {}", radius);
        assert_eq!(results[0].id, t.id);
        assert!(results[0].distance.unwrap() < 1e-6);
    }
}

#[tokio::test]
async fn test_nearest_ordered_and_capped() {
    let store = geneva_border_store().await;
    let center = point(46.2044, 6.1432);

    let results = store.nearest_within(center, 20_000.0, 3).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].name.as_deref(), Some("Cornavin"));
    for pair in results.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }

    let all = store.nearest_within(center, 20_000.0, 10).await.unwrap();
    assert_eq!(all.len(), 5);

    let none = store.nearest_within(center, 20_000.0, 0).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_nearest_excludes_outside_radius() {
    let store = geneva_border_store().await;
    store
        .insert(located(LAUSANNE.0, LAUSANNE.1, CountryCode::CH))
        .await
        .unwrap();

    let results = store
        .nearest_within(point(46.2044, 6.1432), 20_000.0, 10)
        .await
        .unwrap();
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.distance.unwrap() <= 20_000.0));
}

// ============================================================================
// VIEWPORT
// ============================================================================

#[tokio::test]
async fn test_bulk_three_in_view() {
    let store = MemoryToiletStore::new();
    store
        .insert_bulk(vec![
            CreateToiletRequest::at(46.5197, 6.6323),
            CreateToiletRequest::at(46.2044, 6.1432),
            CreateToiletRequest::at(47.3769, 8.5417),
        ])
        .await
        .unwrap();

    let everything = BoundingBox::new(-90.0, -180.0, 90.0, 180.0).unwrap();
    let results = store.within_bounds(everything, 4_000).await.unwrap();
    assert_eq!(results.len(), 3);
}

#[tokio::test]
async fn test_view_never_returns_outside_box() {
    let store = geneva_border_store().await;
    store
        .insert(located(LAUSANNE.0, LAUSANNE.1, CountryCode::CH))
        .await
        .unwrap();

    let bounds = BoundingBox::new(46.198, 6.14, 46.215, 6.16).unwrap();
    let results = store.within_bounds(bounds, 4_000).await.unwrap();

    assert_eq!(results.len(), 3);
    for r in &results {
        let p = point(r.lat.unwrap(), r.lng.unwrap());
        assert!(bounds.contains(&p), "{:?} outside {:?}", p, bounds);
    }

    let capped = store.within_bounds(bounds, 2).await.unwrap();
    assert_eq!(capped.len(), 2);
}

#[tokio::test]
async fn test_view_skips_unlocated_records() {
    let store = MemoryToiletStore::new();
    store
        .insert(CreateToiletRequest::default().with_name("Nowhere"))
        .await
        .unwrap();
    let everything = BoundingBox::new(-90.0, -180.0, 90.0, 180.0).unwrap();
    assert!(store.within_bounds(everything, 10).await.unwrap().is_empty());
}

// ============================================================================
// DETERMINISTIC FETCH
// ============================================================================

#[tokio::test]
async fn test_deterministic_infers_majority_country() {
    let store = geneva_border_store().await;

    let fetch = store
        .fetch_deterministic(point(46.2044, 6.1432), true, 1_000)
        .await
        .unwrap();

    assert_eq!(fetch.plan.inference, CountryInference::Inferred(CountryCode::CH));
    assert_eq!(fetch.plan.strategy, FetchStrategy::ByDistance);
    assert_eq!(fetch.toilets.len(), 3);
    assert_eq!(fetch.toilets[0].name.as_deref(), Some("Cornavin"));
}

#[tokio::test]
async fn test_deterministic_zoomed_in_orders_by_distance() {
    let store = geneva_border_store().await;
    let center = point(46.2044, 6.1432);

    let fetch = store.fetch_deterministic(center, true, 1_000).await.unwrap();
    let distances: Vec<f64> = fetch
        .toilets
        .iter()
        .map(|t| center.distance_m(&point(t.lat.unwrap(), t.lng.unwrap())))
        .collect();
    for pair in distances.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

#[tokio::test]
async fn test_deterministic_zoomed_out_orders_by_id_and_repeats() {
    let store = geneva_border_store().await;
    let center = point(46.2044, 6.1432);

    let first = store.fetch_deterministic(center, false, 1_000).await.unwrap();
    assert_eq!(first.plan.strategy, FetchStrategy::ById);

    let ids: Vec<Uuid> = first.toilets.iter().map(|t| t.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    for _ in 0..3 {
        let again = store.fetch_deterministic(center, false, 1_000).await.unwrap();
        assert_eq!(again.toilets, first.toilets);
    }
}

#[tokio::test]
async fn test_deterministic_zoomed_out_ignores_mutable_fields() {
    let store = geneva_border_store().await;
    let center = point(46.2044, 6.1432);
    let before = store.fetch_deterministic(center, false, 2).await.unwrap();

    store
        .update(
            before.toilets[0].id,
            UpdateToiletRequest {
                name: Some(Some("Renamed".to_string())),
                rating: Some(Some(5)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let after = store.fetch_deterministic(center, false, 2).await.unwrap();
    let before_ids: Vec<Uuid> = before.toilets.iter().map(|t| t.id).collect();
    let after_ids: Vec<Uuid> = after.toilets.iter().map(|t| t.id).collect();
    assert_eq!(before_ids, after_ids);
}

#[tokio::test]
async fn test_deterministic_scoped_to_inferred_country() {
    let store = geneva_border_store().await;

    // Center on the French side: the five nearest are still 3 CH / 2 FR.
    let fetch = store
        .fetch_deterministic(point(46.1900, 6.1250), false, 1_000)
        .await
        .unwrap();
    assert_eq!(fetch.plan.country(), CountryCode::CH);
    assert_eq!(fetch.toilets.len(), 3);
    assert!(fetch
        .toilets
        .iter()
        .all(|t| t.name.as_deref() != Some("Frontiere")));
}

#[tokio::test]
async fn test_deterministic_uses_only_five_nearest() {
    let store = MemoryToiletStore::new();
    // Five Italian records close to Milan, many German ones far away.
    for i in 0..5 {
        store
            .insert(located(45.4642 + i as f64 * 0.001, 9.19, CountryCode::IT))
            .await
            .unwrap();
    }
    for i in 0..8 {
        store
            .insert(located(48.1351 + i as f64 * 0.001, 11.582, CountryCode::DE))
            .await
            .unwrap();
    }

    let fetch = store
        .fetch_deterministic(point(45.4642, 9.19), true, 1_000)
        .await
        .unwrap();
    assert_eq!(fetch.plan.country(), CountryCode::IT);
    assert_eq!(fetch.toilets.len(), 5);
}

#[tokio::test]
async fn test_deterministic_falls_back_without_countries() {
    let store = MemoryToiletStore::new();
    store
        .insert(CreateToiletRequest::at(LAUSANNE.0, LAUSANNE.1))
        .await
        .unwrap();

    let fetch = store
        .fetch_deterministic(point(LAUSANNE.0, LAUSANNE.1), true, 1_000)
        .await
        .unwrap();
    assert_eq!(fetch.plan.inference, CountryInference::Fallback);
    assert_eq!(fetch.plan.country(), CountryCode::CH);
    // Fallback scopes to CH, and the only record has no country.
    assert!(fetch.toilets.is_empty());
}

#[tokio::test]
async fn test_deterministic_empty_store() {
    let store = MemoryToiletStore::new();
    let fetch = store
        .fetch_deterministic(point(0.0, 0.0), false, 1_000)
        .await
        .unwrap();
    assert!(fetch.plan.inference.is_fallback());
    assert!(fetch.toilets.is_empty());
}

#[tokio::test]
async fn test_deterministic_respects_cap() {
    let store = geneva_border_store().await;
    let center = point(46.2044, 6.1432);
    assert_eq!(
        store.fetch_deterministic(center, true, 2).await.unwrap().toilets.len(),
        2
    );
    assert_eq!(
        store.fetch_deterministic(center, false, 2).await.unwrap().toilets.len(),
        2
    );
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn test_crud_lifecycle() {
    let store = MemoryToiletStore::new();
    let id = Uuid::new_v4();

    let created = store
        .insert(
            located(LAUSANNE.0, LAUSANNE.1, CountryCode::CH)
                .with_id(id)
                .with_name("Ouchy"),
        )
        .await
        .unwrap();
    assert_eq!(created.id, id);

    let fetched = store.get(id).await.unwrap();
    assert_eq!(fetched, Some(created));

    let duplicate = store.insert(CreateToiletRequest::default().with_id(id)).await;
    assert!(duplicate.unwrap_err().is_invalid_input());

    assert!(store.delete(id).await.unwrap());
    assert!(!store.delete(id).await.unwrap());
    assert_eq!(store.get(id).await.unwrap(), None);
    assert!(store
        .update(id, UpdateToiletRequest::default())
        .await
        .unwrap()
        .is_none());

    let nearby = store
        .nearest_within(point(LAUSANNE.0, LAUSANNE.1), 1_000.0, 3)
        .await
        .unwrap();
    assert!(nearby.is_empty());
}

#[tokio::test]
async fn test_list_paginates_by_id() {
    let store = geneva_border_store().await;
    assert_eq!(store.count().await.unwrap(), 5);

    let first = store.list(3, 0).await.unwrap();
    let rest = store.list(3, 3).await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(rest.len(), 2);

    let ids: Vec<Uuid> = first.iter().chain(rest.iter()).map(|t| t.id).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[tokio::test]
async fn test_list_by_country() {
    let store = geneva_border_store().await;
    let french = store.list_by_country(CountryCode::FR, 1_000).await.unwrap();
    assert_eq!(french.len(), 2);
    assert!(french
        .iter()
        .all(|t| t.country_code == Some(CountryCode::FR)));
    assert!(store
        .list_by_country(CountryCode::AT, 1_000)
        .await
        .unwrap()
        .is_empty());
}
