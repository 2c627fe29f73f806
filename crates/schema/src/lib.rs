//! Layer schema model, metadata decoding, and record-shape validation.
//!
//! A feature service describes each layer at runtime: field names, primitive
//! kinds, nullability, geometry kind. This crate decodes that metadata and
//! proves a caller-declared record shape structurally compatible with it
//! before any request is issued.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

use fsrv_core::{
    extract_service_error, Error, FieldDescriptor, FieldType, GeometryKind, LayerId, Result,
};

// ---------------- Layer metadata ----------------

/// Wire discriminator values for the metadata `"type"` key.
pub const LAYER_TYPE_FEATURE_LAYER: &str = "Feature Layer";
pub const LAYER_TYPE_TABLE: &str = "Table";

/// Metadata for a layer whose features carry geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureLayerInfo {
    pub id: LayerId,
    pub current_version: f32,
    pub name: String,
    #[serde(default)]
    pub geometry_type: GeometryKind,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

/// Metadata for a geometry-less layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub id: LayerId,
    pub current_version: f32,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

/// Layer-vs-table metadata, discriminated by the wire `"type"` key.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerInfo {
    FeatureLayer(FeatureLayerInfo),
    Table(TableInfo),
}

impl LayerInfo {
    pub fn id(&self) -> LayerId {
        match self {
            LayerInfo::FeatureLayer(info) => info.id,
            LayerInfo::Table(info) => info.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LayerInfo::FeatureLayer(info) => &info.name,
            LayerInfo::Table(info) => &info.name,
        }
    }

    pub fn current_version(&self) -> f32 {
        match self {
            LayerInfo::FeatureLayer(info) => info.current_version,
            LayerInfo::Table(info) => info.current_version,
        }
    }

    /// Ordered field descriptors as declared by the server.
    pub fn fields(&self) -> &[FieldDescriptor] {
        match self {
            LayerInfo::FeatureLayer(info) => &info.fields,
            LayerInfo::Table(info) => &info.fields,
        }
    }

    /// Geometry kind this layer's features carry. Tables never have one.
    pub fn geometry_kind(&self) -> GeometryKind {
        match self {
            LayerInfo::FeatureLayer(info) => info.geometry_type.clone(),
            LayerInfo::Table(_) => GeometryKind::None,
        }
    }

    /// Look up a field descriptor by wire key.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().iter().find(|f| f.name == name)
    }
}

/// Decode a metadata response body into [`LayerInfo`].
///
/// The body is inspected as a generic object first: an embedded error
/// envelope wins over everything, then the reserved `"type"` key selects
/// the variant. An unknown discriminator is fatal, never skipped.
pub fn decode_layer_info(body: &[u8]) -> Result<LayerInfo> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    extract_service_error(&value)?;
    let layer_type = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| Error::Structural("missing layer type in response".into()))?
        .to_string();
    match layer_type.as_str() {
        LAYER_TYPE_FEATURE_LAYER => Ok(LayerInfo::FeatureLayer(serde_json::from_value(value)?)),
        LAYER_TYPE_TABLE => Ok(LayerInfo::Table(serde_json::from_value(value)?)),
        _ => Err(Error::UnhandledVariant {
            what: "layer type",
            value: layer_type,
        }),
    }
}

// ---------------- Type mapping ----------------

/// Base in-memory scalar a representation is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    Int16,
    Int32,
    Float32,
    Float64,
    Text,
    Date,
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scalar::Int16 => "i16",
            Scalar::Int32 => "i32",
            Scalar::Float32 => "f32",
            Scalar::Float64 => "f64",
            Scalar::Text => "String",
            Scalar::Date => "Date",
        };
        f.write_str(s)
    }
}

/// In-memory representation a declared member must use for a schema field:
/// a base scalar, optionally wrapped for nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Representation {
    pub scalar: Scalar,
    pub nullable: bool,
}

impl Representation {
    pub fn required(scalar: Scalar) -> Self {
        Self { scalar, nullable: false }
    }

    pub fn nullable(scalar: Scalar) -> Self {
        Self { scalar, nullable: true }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "Option<{}>", self.scalar)
        } else {
            self.scalar.fmt(f)
        }
    }
}

/// The fixed mapping from a declared field type to the representation a
/// declared member must use. Total over the known set; unknown declared
/// types are a hard failure, never silently ignored.
pub fn expected_representation(field_type: &FieldType, nullable: bool) -> Result<Representation> {
    let scalar = match field_type {
        FieldType::ObjectId => Scalar::Int32,
        FieldType::SmallInt => Scalar::Int16,
        FieldType::Int => Scalar::Int32,
        FieldType::Float => Scalar::Float32,
        FieldType::Double => Scalar::Float64,
        FieldType::String => Scalar::Text,
        FieldType::Date => Scalar::Date,
        FieldType::Other(value) => {
            return Err(Error::UnhandledVariant {
                what: "field type",
                value: value.clone(),
            })
        }
    };
    Ok(Representation { scalar, nullable })
}

// ---------------- Record shapes ----------------

/// Reserved wire keys for the two containers of a record type.
const ATTRIBUTES_KEY: &str = "attributes";
const GEOMETRY_KEY: &str = "geometry";

/// Declared shape of one attribute member inside the attributes container.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeShape {
    /// Declaration-side member name, used in diagnostics.
    pub name: String,
    pub wire_key: String,
    pub repr: Representation,
}

impl AttributeShape {
    pub fn new(
        name: impl Into<String>,
        wire_key: impl Into<String>,
        repr: Representation,
    ) -> Self {
        Self {
            name: name.into(),
            wire_key: wire_key.into(),
            repr,
        }
    }

    /// A non-nullable attribute whose member name is its wire key.
    pub fn required(wire_key: impl Into<String>, scalar: Scalar) -> Self {
        let wire_key = wire_key.into();
        Self::new(wire_key.clone(), wire_key, Representation::required(scalar))
    }

    /// A nullable attribute whose member name is its wire key.
    pub fn nullable(wire_key: impl Into<String>, scalar: Scalar) -> Self {
        let wire_key = wire_key.into();
        Self::new(wire_key.clone(), wire_key, Representation::nullable(scalar))
    }
}

/// Declared shape of one top-level member of a record type.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberShape {
    /// A record-like container of attribute members.
    Fields(Vec<AttributeShape>),
    /// A geometry struct of one concrete variant.
    Geometry(GeometryKind),
    /// Any non-record member.
    Scalar(Representation),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordMember {
    pub name: String,
    pub wire_key: String,
    pub shape: MemberShape,
}

/// Declarative description of a caller record type: its top-level members,
/// their wire keys, and the in-memory representation of each attribute.
///
/// Built once per record type, checked against live layer metadata with
/// [`validate_record`], then discarded. Nothing is cached.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordShape {
    members: Vec<RecordMember>,
}

impl RecordShape {
    pub fn builder() -> RecordShapeBuilder {
        RecordShapeBuilder::default()
    }

    pub fn members(&self) -> &[RecordMember] {
        &self.members
    }

    fn member_by_key(&self, key: &str) -> Option<&RecordMember> {
        self.members.iter().find(|m| m.wire_key == key)
    }
}

/// Builder for [`RecordShape`]. The `attributes`/`geometry` helpers cover
/// well-formed record types; `member` is the escape hatch for arbitrary
/// layouts.
#[derive(Debug, Default)]
pub struct RecordShapeBuilder {
    members: Vec<RecordMember>,
}

impl RecordShapeBuilder {
    /// Declare the attributes container under its reserved wire key.
    pub fn attributes(self, fields: impl IntoIterator<Item = AttributeShape>) -> Self {
        self.member(
            ATTRIBUTES_KEY,
            ATTRIBUTES_KEY,
            MemberShape::Fields(fields.into_iter().collect()),
        )
    }

    /// Declare the geometry container under its reserved wire key.
    pub fn geometry(self, variant: GeometryKind) -> Self {
        self.member(GEOMETRY_KEY, GEOMETRY_KEY, MemberShape::Geometry(variant))
    }

    /// Declare an arbitrary top-level member.
    pub fn member(
        mut self,
        name: impl Into<String>,
        wire_key: impl Into<String>,
        shape: MemberShape,
    ) -> Self {
        self.members.push(RecordMember {
            name: name.into(),
            wire_key: wire_key.into(),
            shape,
        });
        self
    }

    pub fn build(self) -> RecordShape {
        RecordShape {
            members: self.members,
        }
    }
}

/// Implemented by record types that can describe their own wire shape.
///
/// This is the introspection seam: the validator only ever sees a
/// [`RecordShape`], so how a type produces one (hand-written builder today,
/// derive macro later) stays out of the validation logic.
pub trait DescribeRecord {
    fn record_shape() -> RecordShape;
}

// ---------------- Validation ----------------

/// Prove a record shape structurally compatible with live layer metadata,
/// or report the first violation. Pure; intended to run once per record
/// type, before any request is issued.
///
/// Attributes may declare any subset of the schema's fields (partial
/// projections are fine, e.g. update payloads omitting read-only fields),
/// and attributes the schema does not know about are not flagged.
pub fn validate_record(shape: &RecordShape, info: &LayerInfo) -> Result<()> {
    for member in shape.members() {
        if member.wire_key.is_empty() {
            return Err(Error::Structural(format!(
                "missing wire key for '{}'",
                member.name
            )));
        }
    }

    let attributes = shape
        .member_by_key(ATTRIBUTES_KEY)
        .ok_or_else(|| Error::Structural("missing attributes member".into()))?;
    let geometry = shape
        .member_by_key(GEOMETRY_KEY)
        .ok_or_else(|| Error::Structural("missing geometry member".into()))?;

    // Tables never carry geometry; unknown declared kinds also expect the
    // none variant.
    let expected_variant = match info.geometry_kind() {
        GeometryKind::Point => GeometryKind::Point,
        GeometryKind::MultiPoint => GeometryKind::MultiPoint,
        _ => GeometryKind::None,
    };

    match &geometry.shape {
        MemberShape::Geometry(declared) if *declared == expected_variant => {}
        MemberShape::Geometry(declared) => {
            return Err(Error::Mismatch {
                name: geometry.name.clone(),
                expected: variant_name(&expected_variant).into(),
                actual: variant_name(declared).into(),
            })
        }
        _ => {
            return Err(Error::Structural(format!(
                "geometry member '{}' must be a geometry record",
                geometry.name
            )))
        }
    }

    let fields = match &attributes.shape {
        MemberShape::Fields(fields) => fields,
        _ => {
            return Err(Error::Structural(format!(
                "attributes member '{}' must be a record of fields",
                attributes.name
            )))
        }
    };

    for field in fields {
        if field.wire_key.is_empty() {
            return Err(Error::Structural(format!(
                "missing wire key for '{}'",
                field.name
            )));
        }
    }

    for descriptor in info.fields() {
        // Schema fields the caller did not declare are skipped: callers may
        // validate a projection of the schema.
        let Some(declared) = fields.iter().find(|f| f.wire_key == descriptor.name) else {
            continue;
        };
        let expected = expected_representation(&descriptor.field_type, descriptor.nullable)?;
        if declared.repr != expected {
            return Err(Error::Mismatch {
                name: descriptor.name.clone(),
                expected: expected.to_string(),
                actual: declared.repr.to_string(),
            });
        }
    }

    Ok(())
}

fn variant_name(kind: &GeometryKind) -> &'static str {
    match kind {
        GeometryKind::None => "none",
        GeometryKind::Point => "point",
        GeometryKind::MultiPoint => "multipoint",
        GeometryKind::Other(_) => "unknown",
    }
}
