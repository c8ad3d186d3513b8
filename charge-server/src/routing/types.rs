//! OSRM route response types.

use serde::Deserialize;

use crate::domain::{Coordinate, RouteResult};

use super::error::RouteError;

/// Top-level OSRM `route` response.
#[derive(Debug, Deserialize)]
pub struct OsrmResponse {
    /// "Ok" on success, otherwise an error code such as "NoRoute".
    pub code: String,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

/// One candidate route.
#[derive(Debug, Deserialize)]
pub struct OsrmRoute {
    /// Total distance in meters.
    pub distance: f64,

    pub geometry: GeoJsonLine,
}

/// GeoJSON LineString geometry; positions are `[lon, lat]`.
#[derive(Debug, Deserialize)]
pub struct GeoJsonLine {
    pub coordinates: Vec<[f64; 2]>,
}

/// Convert an OSRM response into a route, flipping GeoJSON `[lon, lat]`
/// positions into coordinates.
pub fn route_from_response(response: OsrmResponse) -> Result<RouteResult, RouteError> {
    if response.code != "Ok" {
        return match response.code.as_str() {
            "NoRoute" | "NoSegment" => Err(RouteError::NoRoute),
            code => Err(RouteError::Api {
                status: 200,
                message: response.message.unwrap_or_else(|| code.to_string()),
            }),
        };
    }

    let route = response.routes.into_iter().next().ok_or(RouteError::NoRoute)?;

    let path = route
        .geometry
        .coordinates
        .iter()
        .map(|[lon, lat]| Coordinate::new(*lat, *lon))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RouteResult {
        path,
        distance_m: route.distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<RouteResult, RouteError> {
        route_from_response(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn flips_lon_lat_pairs() {
        let route = parse(
            r#"{
                "code": "Ok",
                "routes": [{
                    "distance": 1234.5,
                    "duration": 300.0,
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[-0.09, 51.5], [-0.1, 51.51]]
                    }
                }],
                "waypoints": []
            }"#,
        )
        .unwrap();

        assert_eq!(route.distance_m, 1234.5);
        assert_eq!(route.path.len(), 2);
        assert_eq!(route.path[0].latitude(), 51.5);
        assert_eq!(route.path[0].longitude(), -0.09);
        assert_eq!(route.path_pairs()[1], [51.51, -0.1]);
    }

    #[test]
    fn empty_routes_is_no_route() {
        let err = parse(r#"{"code": "Ok", "routes": []}"#).unwrap_err();
        assert!(err.is_no_route());
    }

    #[test]
    fn no_route_code() {
        let err = parse(r#"{"code": "NoRoute", "message": "Impossible route"}"#).unwrap_err();
        assert!(err.is_no_route());
    }

    #[test]
    fn other_codes_are_api_errors() {
        let err = parse(r#"{"code": "InvalidQuery", "message": "bad coords"}"#).unwrap_err();
        assert!(matches!(err, RouteError::Api { .. }));
        assert!(err.to_string().contains("bad coords"));
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let err = parse(
            r#"{"code": "Ok", "routes": [{"distance": 1.0, "geometry": {"coordinates": [[0.0, 95.0]]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RouteError::InvalidGeometry(_)));
    }
}
