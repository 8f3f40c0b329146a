//! Country inference and zoom-aware ordering for deterministic map fetches.
//!
//! A deterministic fetch runs in two phases against one consistent snapshot:
//!
//! 1. The store returns the country codes of the [`COUNTRY_INFERENCE_K`]
//!    located records nearest the map center (index traversal order).
//! 2. [`plan_fetch`] turns those codes and the zoom flag into a [`FetchPlan`],
//!    which the store executes within the inferred country.
//!
//! Zoomed in, results are ranked by distance to the center. Zoomed out, they
//! are ordered by id so repeated fetches return the same sample and map tiles
//! do not flicker.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::country::CountryCode;
use crate::geo::GeoPoint;

pub use crate::defaults::COUNTRY_INFERENCE_K;

/// Ordering applied to candidates within the inferred country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Ascending distance to the map center.
    ByDistance,
    /// Ascending id; independent of every mutable field.
    ById,
}

impl FetchStrategy {
    pub fn for_zoom(is_zoomed_in: bool) -> Self {
        if is_zoomed_in {
            FetchStrategy::ByDistance
        } else {
            FetchStrategy::ById
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStrategy::ByDistance => "by_distance",
            FetchStrategy::ById => "by_id",
        }
    }
}

/// Outcome of country inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "country", rename_all = "snake_case")]
pub enum CountryInference {
    /// Mode of the nearest records' country codes.
    Inferred(CountryCode),
    /// No located record with a country code was found.
    Fallback,
}

impl CountryInference {
    pub fn country(&self) -> CountryCode {
        match self {
            CountryInference::Inferred(code) => *code,
            CountryInference::Fallback => CountryCode::FALLBACK,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CountryInference::Fallback)
    }
}

/// Statistical mode of `codes`.
///
/// Equally frequent codes resolve to the one declared first in
/// [`CountryCode`], so the result does not depend on input order.
pub fn infer_country(codes: &[CountryCode]) -> CountryInference {
    let mut counts: BTreeMap<CountryCode, usize> = BTreeMap::new();
    for code in codes {
        *counts.entry(*code).or_default() += 1;
    }

    let mut best: Option<(CountryCode, usize)> = None;
    for (code, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((code, count));
        }
    }

    match best {
        Some((code, _)) => CountryInference::Inferred(code),
        None => CountryInference::Fallback,
    }
}

/// Everything a store needs to execute phase two of a deterministic fetch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FetchPlan {
    pub center: GeoPoint,
    pub inference: CountryInference,
    pub strategy: FetchStrategy,
    pub limit: i64,
}

impl FetchPlan {
    pub fn country(&self) -> CountryCode {
        self.inference.country()
    }
}

/// Plan phase two from the nearest records' country codes.
pub fn plan_fetch(
    nearest_codes: &[CountryCode],
    center: GeoPoint,
    is_zoomed_in: bool,
    limit: i64,
) -> FetchPlan {
    FetchPlan {
        center,
        inference: infer_country(nearest_codes),
        strategy: FetchStrategy::for_zoom(is_zoomed_in),
        limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CountryCode::*;

    const ZURICH: GeoPoint = GeoPoint {
        lat: 47.3769,
        lng: 8.5417,
    };

    #[test]
    fn test_mode_majority_wins() {
        assert_eq!(
            infer_country(&[CH, CH, CH, FR, FR]),
            CountryInference::Inferred(CH)
        );
        assert_eq!(
            infer_country(&[FR, DE, FR, IT, FR]),
            CountryInference::Inferred(FR)
        );
    }

    #[test]
    fn test_mode_tie_prefers_declaration_order() {
        assert_eq!(infer_country(&[AT, FR, AT, FR]), CountryInference::Inferred(FR));
        assert_eq!(infer_country(&[IT, DE]), CountryInference::Inferred(DE));
    }

    #[test]
    fn test_mode_ignores_input_order() {
        let a = infer_country(&[DE, IT, IT, DE, AT]);
        let b = infer_country(&[AT, DE, DE, IT, IT]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_falls_back_to_switzerland() {
        let inference = infer_country(&[]);
        assert_eq!(inference, CountryInference::Fallback);
        assert!(inference.is_fallback());
        assert_eq!(inference.country(), CH);
    }

    #[test]
    fn test_inferred_is_not_fallback() {
        let inference = infer_country(&[CH]);
        assert!(!inference.is_fallback());
        assert_eq!(inference.country(), CH);
    }

    #[test]
    fn test_strategy_for_zoom() {
        assert_eq!(FetchStrategy::for_zoom(true), FetchStrategy::ByDistance);
        assert_eq!(FetchStrategy::for_zoom(false), FetchStrategy::ById);
    }

    #[test]
    fn test_plan_fetch() {
        let plan = plan_fetch(&[IT, IT, CH], ZURICH, false, 250);
        assert_eq!(plan.country(), IT);
        assert_eq!(plan.strategy, FetchStrategy::ById);
        assert_eq!(plan.limit, 250);
        assert_eq!(plan.center, ZURICH);
    }

    #[test]
    fn test_inference_serializes_source() {
        let json = serde_json::to_value(CountryInference::Inferred(FR)).unwrap();
        assert_eq!(json, serde_json::json!({"source": "inferred", "country": "FR"}));
        let json = serde_json::to_value(CountryInference::Fallback).unwrap();
        assert_eq!(json, serde_json::json!({"source": "fallback"}));
    }
}
