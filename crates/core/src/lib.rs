//! Core wire types and the unified error taxonomy for feature services.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

mod date;
mod error;

pub use date::Date;
pub use error::{extract_service_error, Error, ErrorEnvelope, Result};

/// Identifier of a layer or table within one feature service.
pub type LayerId = u8;

/// Primitive kind a schema field declares for its attribute values.
///
/// Servers outside the known set still decode (into `Other`), but validation
/// rejects them instead of guessing a representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "esriFieldTypeOID")]
    ObjectId,
    #[serde(rename = "esriFieldTypeSmallInteger")]
    SmallInt,
    #[serde(rename = "esriFieldTypeInteger")]
    Int,
    #[serde(rename = "esriFieldTypeFloat")]
    Float,
    #[serde(rename = "esriFieldTypeDouble")]
    Double,
    #[serde(rename = "esriFieldTypeString")]
    String,
    #[serde(rename = "esriFieldTypeDate")]
    Date,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::ObjectId => "esriFieldTypeOID",
            FieldType::SmallInt => "esriFieldTypeSmallInteger",
            FieldType::Int => "esriFieldTypeInteger",
            FieldType::Float => "esriFieldTypeFloat",
            FieldType::Double => "esriFieldTypeDouble",
            FieldType::String => "esriFieldTypeString",
            FieldType::Date => "esriFieldTypeDate",
            FieldType::Other(s) => s.as_str(),
        };
        f.write_str(s)
    }
}

/// Server-declared descriptor for one attribute field. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Display label only; never used for matching.
    #[serde(default)]
    pub alias: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i32>,
}

/// Geometry kind a layer declares for its features. Tables carry `None`
/// (the empty wire string).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometryKind {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "esriGeometryPoint")]
    Point,
    #[serde(rename = "esriGeometryMultipoint")]
    MultiPoint,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GeometryKind::None => "",
            GeometryKind::Point => "esriGeometryPoint",
            GeometryKind::MultiPoint => "esriGeometryMultipoint",
            GeometryKind::Other(s) => s.as_str(),
        };
        f.write_str(s)
    }
}

/// Geometry value carried by one feature.
///
/// The variant is resolved from layer metadata and the caller's
/// return-geometry flag, never from the payload's own shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Geometry {
    #[default]
    None,
    Point { x: f64, y: f64 },
    MultiPoint { points: Vec<[f64; 2]> },
}

/// One record within a layer: raw attributes plus resolved geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub attributes: serde_json::Value,
    #[serde(default)]
    pub geometry: Geometry,
}

pub mod prelude {
    pub use super::{
        Date, Error, ErrorEnvelope, Feature, FieldDescriptor, FieldType, Geometry, GeometryKind,
        LayerId, Result,
    };
}
