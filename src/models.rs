use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns this coordinate shifted by the given deltas (degrees).
    pub fn offset(&self, d_lat: f64, d_lng: f64) -> Self {
        Self::new(self.lat + d_lat, self.lng + d_lng)
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// A single detected fire point, as served by the aggregation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub id: u64,
    pub lat: f64,
    pub lng: f64,
    pub confidence: u8,
    /// Fire radiative power in megawatts.
    pub frp: f64,
    pub detection_time: DateTime<Utc>,
}

impl Hotspot {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    /// Whole minutes elapsed since detection, never negative.
    pub fn minutes_since_detection(&self, now: DateTime<Utc>) -> i64 {
        (now - self.detection_time).num_minutes().max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    /// Degrees Celsius.
    pub temp: f64,
    /// Relative humidity, percent.
    pub humidity: u8,
    /// km/h
    pub wind_speed: f64,
}

/// Body of `GET /nearby-hotspots`. Every field may be missing.
#[derive(Debug, Default, Deserialize)]
pub struct NearbyResponse {
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    #[serde(default)]
    pub hotspots: Option<Vec<Hotspot>>,
    #[serde(default)]
    pub top5: Option<Vec<Hotspot>>,
}

/// One element of the geocoder's JSON array. Coordinates arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeCandidate {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Hotspots and weather for one queried coordinate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HotspotBundle {
    pub hotspots: Vec<Hotspot>,
    /// Server-provided ranking, if the backend sent one.
    pub top_ranked: Option<Vec<Hotspot>>,
    pub weather: Option<WeatherSnapshot>,
}

impl From<NearbyResponse> for HotspotBundle {
    fn from(res: NearbyResponse) -> Self {
        Self {
            hotspots: res.hotspots.unwrap_or_default(),
            top_ranked: res.top5,
            weather: res.weather,
        }
    }
}

// (lat offset, lng offset, confidence, frp)
const MOCK_HOTSPOTS: [(f64, f64, u8, f64); 5] = [
    (0.10, 0.10, 95, 45.2),
    (-0.15, 0.20, 78, 32.1),
    (0.20, -0.10, 62, 18.5),
    (-0.08, -0.15, 45, 12.3),
    (0.25, 0.05, 88, 38.7),
];

impl HotspotBundle {
    /// Synthetic bundle served when the backend cannot be reached.
    ///
    /// Always five hotspots at fixed offsets from `center`, stamped with `now`,
    /// plus a fixed hot/dry/windy weather snapshot. The result is identical for
    /// identical inputs.
    pub fn mock(center: Coordinate, now: DateTime<Utc>) -> Self {
        let hotspots = MOCK_HOTSPOTS
            .iter()
            .zip(1u64..)
            .map(|(&(d_lat, d_lng, confidence, frp), id)| {
                let at = center.offset(d_lat, d_lng);
                Hotspot {
                    id,
                    lat: at.lat,
                    lng: at.lng,
                    confidence,
                    frp,
                    detection_time: now,
                }
            })
            .collect();

        Self {
            hotspots,
            top_ranked: None,
            weather: Some(WeatherSnapshot {
                temp: 32.0,
                humidity: 15,
                wind_speed: 25.0,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_bundle_is_fixed() {
        let center = Coordinate::new(34.0522, -118.2437);
        let now = Utc::now();
        let bundle = HotspotBundle::mock(center, now);

        let confidences: Vec<u8> = bundle.hotspots.iter().map(|h| h.confidence).collect();
        let frps: Vec<f64> = bundle.hotspots.iter().map(|h| h.frp).collect();
        assert_eq!(confidences, vec![95, 78, 62, 45, 88]);
        assert_eq!(frps, vec![45.2, 32.1, 18.5, 12.3, 38.7]);

        let deltas = [(0.10, 0.10), (-0.15, 0.20), (0.20, -0.10), (-0.08, -0.15), (0.25, 0.05)];
        for (h, (d_lat, d_lng)) in bundle.hotspots.iter().zip(deltas) {
            assert!((h.lat - (center.lat + d_lat)).abs() < 1e-9);
            assert!((h.lng - (center.lng + d_lng)).abs() < 1e-9);
            assert_eq!(h.detection_time, now);
        }

        assert_eq!(
            bundle.weather,
            Some(WeatherSnapshot { temp: 32.0, humidity: 15, wind_speed: 25.0 })
        );
        assert_eq!(bundle, HotspotBundle::mock(center, now));
    }

    #[test]
    fn test_nearby_response_missing_fields() {
        let res: NearbyResponse = serde_json::from_str("{}").unwrap();
        let bundle = HotspotBundle::from(res);
        assert!(bundle.hotspots.is_empty());
        assert!(bundle.top_ranked.is_none());
        assert!(bundle.weather.is_none());
    }

    #[test]
    fn test_nearby_response_parses_camel_case() {
        let body = r#"{
            "weather": {"temp": 28.5, "humidity": 22, "windSpeed": 14.0},
            "hotspots": [
                {"id": 7, "lat": 34.1, "lng": -118.2, "confidence": 91, "frp": 40.5,
                 "detectionTime": "2024-08-01T12:30:00Z"}
            ],
            "top5": []
        }"#;
        let bundle = HotspotBundle::from(serde_json::from_str::<NearbyResponse>(body).unwrap());
        assert_eq!(bundle.hotspots.len(), 1);
        assert_eq!(bundle.hotspots[0].id, 7);
        assert_eq!(bundle.hotspots[0].confidence, 91);
        assert_eq!(bundle.top_ranked, Some(vec![]));
        assert_eq!(bundle.weather.map(|w| w.humidity), Some(22));
    }

    #[test]
    fn test_distance_km() {
        let la = Coordinate::new(34.0522, -118.2437);
        let nyc = Coordinate::new(40.7128, -74.0060);
        let d = la.distance_km(&nyc);
        assert!((d - 3936.0).abs() < 10.0, "got {d}");
        assert!(la.distance_km(&la) < 1e-9);
    }
}
