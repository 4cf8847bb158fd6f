//! Route request/response shapes for `GET /api/route/`.
//!
//! Routes are computed by the backend; this crate only forwards them to
//! map consumers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::domain::foundation::ValidationError;

/// Request for directions between two location ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub from: String,
    pub to: String,
}

impl RouteRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Result<Self, ValidationError> {
        let from = from.into();
        let to = to.into();
        if from.trim().is_empty() {
            return Err(ValidationError::empty_field("from"));
        }
        if to.trim().is_empty() {
            return Err(ValidationError::empty_field("to"));
        }
        Ok(Self { from, to })
    }
}

/// GeoJSON-like feature collection returned by the route endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteResult {
    #[serde(default)]
    pub features: Vec<RouteFeature>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteFeature {
    pub geometry: RouteGeometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<JsonValue>,
}

/// Polyline of `[x, y, z]` points (2D points are accepted too).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteGeometry {
    #[serde(default)]
    pub coordinates: Vec<Vec<f64>>,
}

impl RouteResult {
    /// Returns true when there is at least one point to draw.
    pub fn is_drawable(&self) -> bool {
        self.features
            .first()
            .map(|f| !f.geometry.coordinates.is_empty())
            .unwrap_or(false)
    }

    /// Number of points in the first feature.
    pub fn point_count(&self) -> usize {
        self.features
            .first()
            .map(|f| f.geometry.coordinates.len())
            .unwrap_or(0)
    }
}
