//! Host position lookup for the Ember hotspot dashboard.
//!
//! The dashboard only needs "where is this machine, roughly" to pick the first
//! area to query. [`GeolocationProvider`] is the seam the controller talks to;
//! [`IpGeolocator`] is the production implementation backed by IP
//! geolocation. Hosts where no provider is configured simply have none, and the
//! controller falls back to its default coordinate.

use crate::config::LocationConfig;
use crate::error::LocationError;
use crate::models::Coordinate;
use async_trait::async_trait;
use ipgeolocate::{Locator, Service};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Source of the host's current position.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinate, LocationError>;
}

/// Resolves the host's approximate location via the [IpApi](https://ip-api.com/)
/// service.
pub struct IpGeolocator {
    lookup_ip: String,
}

impl IpGeolocator {
    /// `lookup_ip` is the address to geolocate. An empty string asks the
    /// service about the caller's own public address.
    pub fn new(lookup_ip: impl Into<String>) -> Self {
        Self {
            lookup_ip: lookup_ip.into(),
        }
    }
}

#[async_trait]
impl GeolocationProvider for IpGeolocator {
    #[instrument(skip(self))]
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        match Locator::get(&self.lookup_ip, Service::IpApi).await {
            Ok(loc) => {
                let coordinate = parse_coordinate(&loc.latitude, &loc.longitude)?;
                info!("Geolocation successful - ({})", coordinate);
                Ok(coordinate)
            }
            Err(e) => {
                error!("Error using geolocation service: {}", e);
                Err(LocationError::Lookup(e.to_string()))
            }
        }
    }
}

/// Builds the provider described by the config, or `None` when automatic
/// geolocation is switched off.
pub fn provider_from_config(config: &LocationConfig) -> Option<Arc<dyn GeolocationProvider>> {
    config
        .auto_geolocate
        .then(|| Arc::new(IpGeolocator::new(config.lookup_ip.clone())) as Arc<dyn GeolocationProvider>)
}

fn parse_coordinate(lat: &str, lon: &str) -> Result<Coordinate, LocationError> {
    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|_| LocationError::InvalidCoordinate(lat.to_string()))?;
    let lon = lon
        .trim()
        .parse::<f64>()
        .map_err(|_| LocationError::InvalidCoordinate(lon.to_string()))?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(LocationError::InvalidCoordinate(format!("{lat}, {lon}")));
    }
    Ok(Coordinate::new(lat, lon))
}
