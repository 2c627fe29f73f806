//! Polymorphic decoding of query and edit response envelopes.
//!
//! Geometry variants are chosen from context: the result's declared kind
//! and the caller's return-geometry flag. A feature's own payload shape is
//! never probed to pick a variant.

use serde::Deserialize;

use fsrv_core::{
    extract_service_error, Error, Feature, FieldDescriptor, Geometry, GeometryKind, Result,
};

use crate::{LayerEditResults, QueryResults};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResults {
    #[serde(default)]
    object_id_field_name: String,
    #[serde(default)]
    global_id_field_name: String,
    #[serde(default)]
    geometry_type: GeometryKind,
    #[serde(default)]
    fields: Vec<FieldDescriptor>,
    #[serde(default)]
    features: Vec<WireFeature>,
}

#[derive(Deserialize)]
struct WireFeature {
    #[serde(default)]
    attributes: serde_json::Value,
    #[serde(default)]
    geometry: serde_json::Value,
}

#[derive(Deserialize)]
struct WirePoint {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct WireMultiPoint {
    points: Vec<[f64; 2]>,
}

/// Decode a query response body.
///
/// When the caller did not request geometry, every feature is forced to the
/// none variant even if the body carries a geometry payload. When geometry
/// was requested, the result-level declared kind picks the variant for
/// every feature uniformly; a kind outside the known set is fatal.
pub fn decode_query_results(body: &[u8], return_geometry: bool) -> Result<QueryResults> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    extract_service_error(&value)?;
    let wire: WireResults = serde_json::from_value(value)?;

    let mut features = Vec::with_capacity(wire.features.len());
    for feature in wire.features {
        let geometry = if !return_geometry {
            Geometry::None
        } else {
            match &wire.geometry_type {
                GeometryKind::Point => {
                    let p: WirePoint = serde_json::from_value(feature.geometry)?;
                    Geometry::Point { x: p.x, y: p.y }
                }
                GeometryKind::MultiPoint => {
                    let mp: WireMultiPoint = serde_json::from_value(feature.geometry)?;
                    Geometry::MultiPoint { points: mp.points }
                }
                other => {
                    return Err(Error::UnhandledVariant {
                        what: "geometry type",
                        value: other.to_string(),
                    })
                }
            }
        };
        features.push(Feature {
            attributes: feature.attributes,
            geometry,
        });
    }

    Ok(QueryResults {
        object_id_field_name: wire.object_id_field_name,
        global_id_field_name: wire.global_id_field_name,
        geometry_type: wire.geometry_type,
        fields: wire.fields,
        features,
    })
}

/// Decode an applyEdits response body. Success is a top-level array, but an
/// object-shaped body may still carry an embedded error envelope.
pub fn decode_edit_results(body: &[u8]) -> Result<Vec<LayerEditResults>> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    if value.is_object() {
        extract_service_error(&value)?;
    }
    Ok(serde_json::from_value(value)?)
}
