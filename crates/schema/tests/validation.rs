#![forbid(unsafe_code)]

use fsrv_core::{Error, FieldDescriptor, FieldType, GeometryKind};
use fsrv_schema::{
    validate_record, AttributeShape, DescribeRecord, FeatureLayerInfo, LayerInfo, MemberShape,
    RecordShape, Representation, Scalar, TableInfo,
};

fn field(name: &str, field_type: FieldType, nullable: bool) -> FieldDescriptor {
    FieldDescriptor {
        name: name.into(),
        alias: name.to_uppercase(),
        field_type,
        nullable,
        length: None,
    }
}

fn point_layer() -> LayerInfo {
    LayerInfo::FeatureLayer(FeatureLayerInfo {
        id: 0,
        current_version: 10.91,
        name: "Wildfire Response Points".into(),
        geometry_type: GeometryKind::Point,
        fields: vec![
            field("objectid", FieldType::ObjectId, false),
            field("rotation", FieldType::SmallInt, true),
            field("description", FieldType::String, true),
            field("eventdate", FieldType::Date, true),
        ],
    })
}

#[test]
fn well_formed_point_record_passes() {
    let shape = RecordShape::builder()
        .attributes([
            AttributeShape::required("objectid", Scalar::Int32),
            AttributeShape::nullable("rotation", Scalar::Int16),
        ])
        .geometry(GeometryKind::Point)
        .build();
    validate_record(&shape, &point_layer()).unwrap();
}

#[test]
fn nullable_field_declared_required_fails() {
    let shape = RecordShape::builder()
        .attributes([
            AttributeShape::required("objectid", Scalar::Int32),
            AttributeShape::required("rotation", Scalar::Int16),
        ])
        .geometry(GeometryKind::Point)
        .build();
    match validate_record(&shape, &point_layer()) {
        Err(Error::Mismatch {
            name,
            expected,
            actual,
        }) => {
            assert_eq!(name, "rotation");
            assert_eq!(expected, "Option<i16>");
            assert_eq!(actual, "i16");
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
}

#[test]
fn required_field_declared_nullable_fails() {
    let shape = RecordShape::builder()
        .attributes([AttributeShape::nullable("objectid", Scalar::Int32)])
        .geometry(GeometryKind::Point)
        .build();
    match validate_record(&shape, &point_layer()) {
        Err(Error::Mismatch { name, expected, actual }) => {
            assert_eq!(name, "objectid");
            assert_eq!(expected, "i32");
            assert_eq!(actual, "Option<i32>");
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
}

#[test]
fn geometry_variant_must_match_exactly() {
    let shape = RecordShape::builder()
        .attributes([AttributeShape::required("objectid", Scalar::Int32)])
        .geometry(GeometryKind::MultiPoint)
        .build();
    match validate_record(&shape, &point_layer()) {
        Err(Error::Mismatch { name, expected, actual }) => {
            assert_eq!(name, "geometry");
            assert_eq!(expected, "point");
            assert_eq!(actual, "multipoint");
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
}

#[test]
fn partial_attribute_selection_is_allowed() {
    // Only a strict subset of schema fields is declared.
    let shape = RecordShape::builder()
        .attributes([AttributeShape::nullable("rotation", Scalar::Int16)])
        .geometry(GeometryKind::Point)
        .build();
    validate_record(&shape, &point_layer()).unwrap();
}

#[test]
fn extra_caller_side_attributes_are_ignored() {
    // The schema is the source of truth for required shape, not an
    // exhaustiveness fence.
    let shape = RecordShape::builder()
        .attributes([
            AttributeShape::required("objectid", Scalar::Int32),
            AttributeShape::required("not_in_schema", Scalar::Text),
        ])
        .geometry(GeometryKind::Point)
        .build();
    validate_record(&shape, &point_layer()).unwrap();
}

#[test]
fn tables_expect_no_geometry() {
    let info = LayerInfo::Table(TableInfo {
        id: 3,
        current_version: 10.91,
        name: "Incident Log".into(),
        fields: vec![field("objectid", FieldType::ObjectId, false)],
    });
    let shape = RecordShape::builder()
        .attributes([AttributeShape::required("objectid", Scalar::Int32)])
        .geometry(GeometryKind::None)
        .build();
    validate_record(&shape, &info).unwrap();

    let shape = RecordShape::builder()
        .attributes([AttributeShape::required("objectid", Scalar::Int32)])
        .geometry(GeometryKind::Point)
        .build();
    match validate_record(&shape, &info) {
        Err(Error::Mismatch { expected, actual, .. }) => {
            assert_eq!(expected, "none");
            assert_eq!(actual, "point");
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
}

#[test]
fn unknown_declared_geometry_kind_expects_none() {
    let info = LayerInfo::FeatureLayer(FeatureLayerInfo {
        id: 0,
        current_version: 10.91,
        name: "Polygons".into(),
        geometry_type: GeometryKind::Other("esriGeometryPolygon".into()),
        fields: vec![],
    });
    let shape = RecordShape::builder()
        .attributes(Vec::new())
        .geometry(GeometryKind::None)
        .build();
    validate_record(&shape, &info).unwrap();
}

#[test]
fn missing_attributes_member_is_structural() {
    let shape = RecordShape::builder().geometry(GeometryKind::Point).build();
    match validate_record(&shape, &point_layer()) {
        Err(Error::Structural(msg)) => assert!(msg.contains("attributes")),
        other => panic!("expected structural error, got {other:?}"),
    }
}

#[test]
fn missing_geometry_member_is_structural() {
    let shape = RecordShape::builder()
        .attributes([AttributeShape::required("objectid", Scalar::Int32)])
        .build();
    match validate_record(&shape, &point_layer()) {
        Err(Error::Structural(msg)) => assert!(msg.contains("geometry")),
        other => panic!("expected structural error, got {other:?}"),
    }
}

#[test]
fn empty_wire_key_is_structural_and_names_the_member() {
    let shape = RecordShape::builder()
        .member("Extra", "", MemberShape::Scalar(Representation::required(Scalar::Text)))
        .attributes([AttributeShape::required("objectid", Scalar::Int32)])
        .geometry(GeometryKind::Point)
        .build();
    match validate_record(&shape, &point_layer()) {
        Err(Error::Structural(msg)) => assert!(msg.contains("Extra")),
        other => panic!("expected structural error, got {other:?}"),
    }
}

#[test]
fn empty_attribute_wire_key_is_structural() {
    let shape = RecordShape::builder()
        .attributes([AttributeShape::new(
            "ObjectId",
            "",
            Representation::required(Scalar::Int32),
        )])
        .geometry(GeometryKind::Point)
        .build();
    match validate_record(&shape, &point_layer()) {
        Err(Error::Structural(msg)) => assert!(msg.contains("ObjectId")),
        other => panic!("expected structural error, got {other:?}"),
    }
}

#[test]
fn non_record_geometry_member_is_structural() {
    let shape = RecordShape::builder()
        .attributes([AttributeShape::required("objectid", Scalar::Int32)])
        .member(
            "geometry",
            "geometry",
            MemberShape::Scalar(Representation::required(Scalar::Text)),
        )
        .build();
    match validate_record(&shape, &point_layer()) {
        Err(Error::Structural(msg)) => assert!(msg.contains("geometry")),
        other => panic!("expected structural error, got {other:?}"),
    }
}

#[test]
fn record_types_can_describe_their_own_shape() {
    // The wire layout of this record type, as the caller would declare it
    // next to the serde derives.
    struct UpdatePayload;

    impl DescribeRecord for UpdatePayload {
        fn record_shape() -> RecordShape {
            RecordShape::builder()
                .attributes([
                    AttributeShape::required("objectid", Scalar::Int32),
                    AttributeShape::nullable("description", Scalar::Text),
                ])
                .geometry(GeometryKind::Point)
                .build()
        }
    }

    validate_record(&UpdatePayload::record_shape(), &point_layer()).unwrap();
}

#[test]
fn schema_with_unknown_field_type_fails_when_declared() {
    let info = LayerInfo::FeatureLayer(FeatureLayerInfo {
        id: 0,
        current_version: 10.91,
        name: "Blobs".into(),
        geometry_type: GeometryKind::Point,
        fields: vec![field("payload", FieldType::Other("esriFieldTypeBlob".into()), true)],
    });
    let shape = RecordShape::builder()
        .attributes([AttributeShape::nullable("payload", Scalar::Text)])
        .geometry(GeometryKind::Point)
        .build();
    match validate_record(&shape, &info) {
        Err(Error::UnhandledVariant { what, value }) => {
            assert_eq!(what, "field type");
            assert_eq!(value, "esriFieldTypeBlob");
        }
        other => panic!("expected unhandled variant, got {other:?}"),
    }
}
