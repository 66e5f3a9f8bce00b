//! Map lookup tool
//!
//! Accepts either coordinates (`lat`/`lon`, reverse-geocoded through the
//! backend) or a free-text `query`. The result renders as a single search hit
//! linking to the map.

use async_trait::async_trait;
use lia_core::{SearchHit, ToolCall, VisualPayload};
use lia_gateway::AssistantBackend;
use once_cell::sync::Lazy;
use serde_json::json;
use std::sync::Arc;
use url::Url;

use crate::tool::{optional_str, Tool, ToolError, ToolOutput};

static MAP_BASE: Lazy<Url> =
    Lazy::new(|| Url::parse("https://www.openstreetmap.org/").expect("valid map base URL"));

/// Link to a map centered on the coordinates
pub fn coordinates_url(latitude: f64, longitude: f64) -> String {
    let mut url = MAP_BASE.clone();
    url.query_pairs_mut()
        .append_pair("mlat", &format!("{:.5}", latitude))
        .append_pair("mlon", &format!("{:.5}", longitude));
    url.set_fragment(Some(&format!("map=15/{:.5}/{:.5}", latitude, longitude)));
    url.into()
}

/// Link to a map search
pub fn query_url(query: &str) -> String {
    let mut url = MAP_BASE.clone();
    url.set_path("search");
    url.query_pairs_mut().append_pair("query", query);
    url.into()
}

/// Look up a place on the map
pub struct MapLookupTool {
    backend: Arc<dyn AssistantBackend>,
}

impl MapLookupTool {
    pub fn new(backend: Arc<dyn AssistantBackend>) -> Self {
        Self { backend }
    }

    async fn by_coordinates(&self, latitude: f64, longitude: f64) -> Result<ToolOutput, ToolError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ToolError::invalid_params("coordinates out of range"));
        }

        let place = self
            .backend
            .reverse_geocode(latitude, longitude)
            .await
            .ok_or_else(|| ToolError::backend("reverse geocoding failed"))?;
        let description = place.describe();

        Ok(ToolOutput::visual(
            VisualPayload::Search {
                query: format!("{:.5}, {:.5}", latitude, longitude),
                results: vec![SearchHit {
                    title: description.clone(),
                    url: coordinates_url(latitude, longitude),
                    snippet: String::new(),
                }],
                summary: None,
            },
            json!({ "success": true, "place": description }),
        ))
    }
}

#[async_trait]
impl Tool for MapLookupTool {
    fn name(&self) -> &str {
        "map_lookup"
    }

    fn description(&self) -> &str {
        "Show a place on the map by name or coordinates"
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolOutput, ToolError> {
        if let (Some(lat), Some(lon)) = (call.f64_arg("lat"), call.f64_arg("lon")) {
            return self.by_coordinates(lat, lon).await;
        }

        let query = optional_str(call, "query")
            .ok_or_else(|| ToolError::invalid_params("query or lat/lon is required"))?;

        Ok(ToolOutput::visual(
            VisualPayload::Search {
                query: query.clone(),
                results: vec![SearchHit {
                    title: query.clone(),
                    url: query_url(&query),
                    snippet: String::new(),
                }],
                summary: None,
            },
            json!({ "success": true, "query": query }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lia_gateway::Place;

    struct GeoBackend;

    #[async_trait]
    impl AssistantBackend for GeoBackend {
        async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Option<Place> {
            Some(Place {
                name: "Praça do Comércio".to_string(),
                city: Some("Lisbon".to_string()),
                country: None,
                latitude,
                longitude,
            })
        }
    }

    #[tokio::test]
    async fn test_lookup_by_query() {
        let tool = MapLookupTool::new(Arc::new(GeoBackend));
        let output = tool
            .execute(&ToolCall::new("map_lookup", json!({"query": "Belem Tower"})))
            .await
            .unwrap();

        match output.visual {
            Some(VisualPayload::Search { results, .. }) => {
                assert_eq!(
                    results[0].url,
                    "https://www.openstreetmap.org/search?query=Belem+Tower"
                );
            },
            other => panic!("expected search payload, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_by_coordinates() {
        let tool = MapLookupTool::new(Arc::new(GeoBackend));
        let output = tool
            .execute(&ToolCall::new("map_lookup", json!({"lat": "38.7075", "lon": -9.1365})))
            .await
            .unwrap();

        assert_eq!(output.response["place"], json!("Praça do Comércio, Lisbon"));
    }

    #[test]
    fn test_query_url_escapes_reserved_characters() {
        assert_eq!(
            query_url("Rua & Co?"),
            "https://www.openstreetmap.org/search?query=Rua+%26+Co%3F"
        );
    }

    #[test]
    fn test_coordinates_url() {
        assert_eq!(
            coordinates_url(38.7075, -9.1365),
            "https://www.openstreetmap.org/?mlat=38.70750&mlon=-9.13650#map=15/38.70750/-9.13650"
        );
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let tool = MapLookupTool::new(Arc::new(GeoBackend));
        assert!(tool
            .execute(&ToolCall::new("map_lookup", json!({})))
            .await
            .is_err());
        assert!(tool
            .execute(&ToolCall::new("map_lookup", json!({"lat": 120.0, "lon": 0.0})))
            .await
            .is_err());
    }
}
