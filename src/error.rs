use thiserror::Error;

/// Failures talking to the aggregation backend or the geocoder.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid coordinate in geocoder response: {0}")]
    InvalidCoordinate(String),

    #[error("Lookup task ended before completing")]
    Abandoned,
}

/// Failures of the host geolocation capability.
#[derive(Error, Debug)]
pub enum LocationError {
    #[error("Geolocation is disabled")]
    Disabled,

    #[error("Geolocation lookup failed: {0}")]
    Lookup(String),

    #[error("Invalid coordinate from geolocation service: {0}")]
    InvalidCoordinate(String),
}

/// What the dashboard tells the user went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Never shown; the default coordinate is used instead.
    GeolocationUnavailable,
    /// Advisory; sample data is displayed.
    BackendUnavailable,
    LocationNotFound,
    SearchFailed,
}

impl ErrorKind {
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ErrorKind::GeolocationUnavailable)
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::GeolocationUnavailable => "Location unavailable, using default area",
            ErrorKind::BackendUnavailable => "Backend unavailable - showing sample data",
            ErrorKind::LocationNotFound => "Location not found",
            ErrorKind::SearchFailed => "Search failed - check your connection",
        }
    }
}

impl From<&LocationError> for ErrorKind {
    fn from(_: &LocationError) -> Self {
        ErrorKind::GeolocationUnavailable
    }
}
