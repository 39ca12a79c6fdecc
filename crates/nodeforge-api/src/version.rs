//! Microversion negotiation.
//!
//! Clients pick an API version with `OpenStack-API-Version: container-infra 1.7`
//! (or `latest`). A missing header means the latest version. Every response
//! echoes the negotiated version in the same header.

use std::fmt;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

pub const VERSION_HEADER: HeaderName = HeaderName::from_static("openstack-api-version");
pub const SERVICE_TYPE: &str = "container-infra";

pub const MIN_VERSION: ApiVersion = ApiVersion::new(1, 1);
pub const MAX_VERSION: ApiVersion = ApiVersion::new(1, 10);
/// First version that exposes the resize action.
pub const RESIZE_VERSION: ApiVersion = ApiVersion::new(1, 7);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl ApiVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("latest") {
            return Some(MAX_VERSION);
        }
        let (major, minor) = s.split_once('.')?;
        Some(Self::new(major.parse().ok()?, minor.parse().ok()?))
    }

    /// Header value announcing this version.
    pub fn header_value(self) -> HeaderValue {
        HeaderValue::from_str(&format!("{SERVICE_TYPE} {self}"))
            .unwrap_or_else(|_| HeaderValue::from_static(SERVICE_TYPE))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The header could not be parsed.
    Malformed(String),
    /// Parsed, but outside what this server (or this action) supports.
    Unsupported(ApiVersion),
}

impl VersionError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::Unsupported(_) => StatusCode::NOT_ACCEPTABLE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "InvalidVersion",
            Self::Unsupported(_) => "VersionNotSupported",
        }
    }
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(raw) => write!(f, "invalid API version header: {raw:?}"),
            Self::Unsupported(v) => write!(
                f,
                "API version {v} is not supported here (min {MIN_VERSION}, max {MAX_VERSION})"
            ),
        }
    }
}

/// Negotiate the version of a request. `minimum` is the lowest version the
/// endpoint accepts.
pub fn negotiate(headers: &HeaderMap, minimum: ApiVersion) -> Result<ApiVersion, VersionError> {
    let requested = match headers.get(&VERSION_HEADER) {
        None => MAX_VERSION,
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| VersionError::Malformed(format!("{value:?}")))?;
            parse_header(raw)?
        }
    };

    if requested < minimum.max(MIN_VERSION) || requested > MAX_VERSION {
        return Err(VersionError::Unsupported(requested));
    }
    Ok(requested)
}

/// Pick our service's entry out of a possibly comma-separated header.
fn parse_header(raw: &str) -> Result<ApiVersion, VersionError> {
    for entry in raw.split(',') {
        let mut parts = entry.split_whitespace();
        if let (Some(service), Some(version), None) = (parts.next(), parts.next(), parts.next())
            && service.eq_ignore_ascii_case(SERVICE_TYPE)
        {
            return ApiVersion::parse(version).ok_or_else(|| VersionError::Malformed(raw.into()));
        }
    }
    // Header present but not addressed to us.
    if raw.split(',').all(|e| !e.trim().to_ascii_lowercase().starts_with(SERVICE_TYPE)) {
        return Ok(MAX_VERSION);
    }
    Err(VersionError::Malformed(raw.to_string()))
}
