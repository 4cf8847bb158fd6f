//! RouteService - Fetches directions and hands them to map consumers.
//!
//! Routes are request/response only; nothing is cached. Failures never
//! reach the caller beyond a `false`, matching how the kiosk degrades when
//! the API is unreachable.

use std::sync::Arc;

use crate::domain::route::{RouteRequest, RouteResult};
use crate::ports::{BusEvent, EventPublisher, KioskApi, Topic};

/// Route lookups from the kiosk's fixed location.
#[derive(Clone)]
pub struct RouteService {
    api: Arc<dyn KioskApi>,
    publisher: Arc<dyn EventPublisher>,
    from_location: String,
}

impl RouteService {
    pub fn new(
        api: Arc<dyn KioskApi>,
        publisher: Arc<dyn EventPublisher>,
        from_location: impl Into<String>,
    ) -> Self {
        Self {
            api,
            publisher,
            from_location: from_location.into(),
        }
    }

    pub fn from_location(&self) -> &str {
        &self.from_location
    }

    /// Fetches a route to `to` and publishes it on `visualize-route`.
    ///
    /// Returns the route when one was published. Empty collections and
    /// failures are logged and yield `None`.
    pub async fn request_route(&self, to: &str) -> Option<RouteResult> {
        let request = match RouteRequest::new(self.from_location.as_str(), to) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Route request rejected");
                return None;
            }
        };

        let route = match self.api.route(&request).await {
            Ok(route) => route,
            Err(e) => {
                tracing::warn!(from = %request.from, to = %request.to, error = %e, "Route lookup failed");
                return None;
            }
        };

        if !route.is_drawable() {
            tracing::info!(from = %request.from, to = %request.to, "No route data returned");
            return None;
        }

        match BusEvent::with_payload(Topic::VisualizeRoute, &route) {
            Ok(event) => {
                self.publisher.publish(event).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot encode route");
                return None;
            }
        }

        tracing::debug!(to = %request.to, points = route.point_count(), "Route published");
        Some(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryEventBus, MockKioskApi};
    use crate::ports::ApiError;
    use serde_json::json;

    fn service(api: &MockKioskApi) -> (RouteService, Arc<InMemoryEventBus>) {
        let bus = Arc::new(InMemoryEventBus::new());
        (RouteService::new(Arc::new(api.clone()), bus.clone(), "kiosk-1"), bus)
    }

    fn line(points: usize) -> RouteResult {
        let coordinates: Vec<Vec<f64>> = (0..points).map(|i| vec![i as f64, 0.0, 0.0]).collect();
        serde_json::from_value(json!({
            "features": [{"geometry": {"coordinates": coordinates}}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn publishes_drawable_route() {
        let api = MockKioskApi::new().with_route(Ok(line(3)));
        let (routes, bus) = service(&api);

        let route = routes.request_route("340").await.unwrap();

        assert_eq!(route.point_count(), 3);
        assert_eq!(api.route_calls(), vec![RouteRequest::new("kiosk-1", "340").unwrap()]);
        let published: RouteResult = bus.events_of_topic(Topic::VisualizeRoute)[0]
            .payload_as()
            .unwrap();
        assert_eq!(published, route);
    }

    #[tokio::test]
    async fn empty_route_is_not_published() {
        let api = MockKioskApi::new().with_route(Ok(RouteResult::default()));
        let (routes, bus) = service(&api);

        assert!(routes.request_route("340").await.is_none());
        assert!(!bus.has_event(Topic::VisualizeRoute));
    }

    #[tokio::test]
    async fn api_failure_is_swallowed() {
        let api = MockKioskApi::new().with_route(Err(ApiError::Network("down".into())));
        let (routes, bus) = service(&api);

        assert!(routes.request_route("340").await.is_none());
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn blank_target_never_hits_api() {
        let api = MockKioskApi::new();
        let (routes, _bus) = service(&api);

        assert!(routes.request_route("  ").await.is_none());
        assert!(api.route_calls().is_empty());
    }
}
