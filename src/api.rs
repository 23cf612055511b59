use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::models::{Coordinate, GeocodeCandidate, HotspotBundle, NearbyResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const USER_AGENT: &str = concat!("ember-tui/", env!("CARGO_PKG_VERSION"));

/// Network collaborator: the hotspot aggregation backend plus a geocoder.
#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    /// Hotspots and weather around `at`.
    async fn fetch_nearby(&self, at: Coordinate) -> Result<HotspotBundle, FetchError>;

    /// Best match for a free-text place name, `None` when nothing matched.
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, FetchError>;
}

pub struct HotspotProvider {
    client: Client,
    backend_url: String,
    geocoder_url: String,
}

impl HotspotProvider {
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout(config))
            .build()?;

        Ok(Self {
            client,
            backend_url: config.backend_url.trim_end_matches('/').to_string(),
            geocoder_url: config.geocoder_url.trim_end_matches('/').to_string(),
        })
    }

    fn nearby_url(&self, at: Coordinate) -> String {
        format!("{}/nearby-hotspots?lat={}&lng={}", self.backend_url, at.lat, at.lng)
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?format=json&q={}",
            self.geocoder_url,
            urlencoding::encode(query)
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!(url, "Fetching");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status()));
        }

        // Decode through serde_json so a bad body is reported as a parse error.
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl RemoteDataSource for HotspotProvider {
    #[instrument(skip(self))]
    async fn fetch_nearby(&self, at: Coordinate) -> Result<HotspotBundle, FetchError> {
        let url = self.nearby_url(at);
        let res: NearbyResponse = self.get_json(&url).await?;
        let bundle = HotspotBundle::from(res);

        debug!(count = bundle.hotspots.len(), "Fetched hotspots");
        Ok(bundle)
    }

    #[instrument(skip(self))]
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, FetchError> {
        let url = self.search_url(query);
        let candidates: Vec<GeocodeCandidate> = self.get_json(&url).await?;
        debug!(count = candidates.len(), query, "Geocode complete");

        first_candidate(&candidates)
    }
}

/// A zero timeout would fail every request, so it is raised to one second.
fn request_timeout(config: &ApiConfig) -> Duration {
    if config.request_timeout_seconds == 0 {
        warn!("api.request_timeout_seconds is 0; using 1 second");
    }
    Duration::from_secs(config.request_timeout_seconds.max(1))
}

/// Coordinate of the first geocoder candidate.
pub fn first_candidate(candidates: &[GeocodeCandidate]) -> Result<Option<Coordinate>, FetchError> {
    let Some(first) = candidates.first() else {
        return Ok(None);
    };

    let lat = first
        .lat
        .parse::<f64>()
        .map_err(|_| FetchError::InvalidCoordinate(first.lat.clone()))?;
    let lng = first
        .lon
        .parse::<f64>()
        .map_err(|_| FetchError::InvalidCoordinate(first.lon.clone()))?;

    if let Some(name) = &first.display_name {
        debug!(name = %name, lat, lng, "Using first geocoder match");
    }
    Ok(Some(Coordinate::new(lat, lng)))
}
