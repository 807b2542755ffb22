//! Simulated heatmap and GeoJSON export.
//!
//! The points generated here are fabricated around a configured sensor
//! coordinate from aggregate counts; they carry no real geolocation
//! semantics and exist only to feed a dashboard map or a GIS import.

use anyhow::{anyhow, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::counting::CountTable;

/// One fabricated heatmap sample.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HeatPoint {
    pub lat: f64,
    pub lon: f64,
    pub intensity: f64,
}

/// Scatter one point per counted vehicle around the sensor location, plus
/// `ghost_points` extra so the map is never empty before the first count.
pub fn simulate_heatmap<R: Rng>(
    counts: &CountTable,
    center: (f64, f64),
    spread: f64,
    ghost_points: usize,
    rng: &mut R,
) -> Result<Vec<HeatPoint>> {
    let lat = Normal::new(center.0, spread).map_err(|e| anyhow!("bad scatter spread: {e}"))?;
    let lon = Normal::new(center.1, spread).map_err(|e| anyhow!("bad scatter spread: {e}"))?;

    let total = counts.total() as usize + ghost_points;
    let points = (0..total)
        .map(|_| HeatPoint {
            lat: lat.sample(rng),
            lon: lon.sample(rng),
            intensity: 1.0,
        })
        .collect();
    Ok(points)
}

#[derive(Debug, Serialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: &'static str,
    /// GeoJSON order: [longitude, latitude].
    coordinates: [f64; 2],
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    geometry: Geometry,
    properties: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<Feature>,
}

/// Build a GeoJSON document: one sensor-node feature carrying the full count
/// table, then one point feature per heatmap sample.
pub fn to_geojson(
    counts: &CountTable,
    points: &[HeatPoint],
    center: (f64, f64),
) -> Result<String> {
    let mut features = Vec::with_capacity(points.len() + 1);

    features.push(Feature {
        kind: "Feature",
        geometry: Geometry {
            kind: "Point",
            coordinates: [center.1, center.0],
        },
        properties: serde_json::json!({
            "name": "Sensor Node A",
            "total": counts.total(),
            "counts": counts,
        }),
    });

    for point in points {
        features.push(Feature {
            kind: "Feature",
            geometry: Geometry {
                kind: "Point",
                coordinates: [point.lon, point.lat],
            },
            properties: serde_json::json!({ "intensity": point.intensity }),
        });
    }

    let collection = FeatureCollection {
        kind: "FeatureCollection",
        features,
    };
    Ok(serde_json::to_string_pretty(&collection)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::{register, VehicleClass};
    use crate::crossing::Direction;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    const KOCHI: (f64, f64) = (9.9312, 76.2673);

    fn counts_with(n: u32) -> CountTable {
        let mut counts = CountTable::new();
        let mut counted = HashSet::new();
        for id in 0..n {
            register(
                id,
                VehicleClass::Car,
                Direction::Incoming,
                &mut counted,
                &mut counts,
            );
        }
        counts
    }

    #[test]
    fn heatmap_has_one_point_per_count_plus_ghosts() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = simulate_heatmap(&counts_with(12), KOCHI, 0.0006, 5, &mut rng).unwrap();
        assert_eq!(points.len(), 17);
    }

    #[test]
    fn ghost_points_keep_an_empty_session_visible() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = simulate_heatmap(&CountTable::new(), KOCHI, 0.0006, 5, &mut rng).unwrap();
        assert_eq!(points.len(), 5);
    }

    #[test]
    fn scatter_stays_near_the_sensor() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = simulate_heatmap(&counts_with(50), KOCHI, 0.0006, 5, &mut rng).unwrap();
        for p in &points {
            assert!((p.lat - KOCHI.0).abs() < 0.01);
            assert!((p.lon - KOCHI.1).abs() < 0.01);
        }
    }

    #[test]
    fn geojson_round_trips_and_carries_all_count_keys() {
        let mut rng = StdRng::seed_from_u64(7);
        let counts = counts_with(3);
        let points = simulate_heatmap(&counts, KOCHI, 0.0006, 5, &mut rng).unwrap();
        let doc = to_geojson(&counts, &points, KOCHI).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(parsed["type"], "FeatureCollection");
        let features = parsed["features"].as_array().unwrap();
        assert_eq!(features.len(), 9);

        let sensor = &features[0];
        assert_eq!(sensor["properties"]["total"], 3);
        let table = sensor["properties"]["counts"].as_object().unwrap();
        assert_eq!(table.len(), 8);
        assert_eq!(table["Incoming_Car"], 3);
        // GeoJSON coordinate order is [lon, lat].
        assert_eq!(sensor["geometry"]["coordinates"][0], KOCHI.1);
    }
}
