use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use indexmap::IndexMap;
use serde_core::Deserialize;
use serde_core::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::info::Shape;
use crate::read::{ReadContext, ValueReader};
use crate::write::{Emit, ValueWriter, WriteContext};
use crate::{Bind, BindError, Bindable, Binder, BoxedValue, DynamicValue};

const RESERVED: [&str; 4] = ["type", "coordinates", "geometries", "bbox"];

/// A point as longitude, latitude and an optional altitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPosition {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: Option<f64>,
}

impl GeoPosition {
    #[inline]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            altitude: None,
        }
    }

    #[inline]
    pub const fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }
}

impl Serialize for GeoPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 2 + usize::from(self.altitude.is_some());
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.longitude)?;
        seq.serialize_element(&self.latitude)?;
        if let Some(altitude) = self.altitude {
            seq.serialize_element(&altitude)?;
        }
        seq.end()
    }
}

/// The `bbox` member of a GeoJSON object.
///
/// Written as `[west, south, east, north]`, or as
/// `[west, south, min_altitude, east, north, max_altitude]` when both
/// altitudes are known.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub min_altitude: Option<f64>,
    pub max_altitude: Option<f64>,
}

impl GeoBoundingBox {
    #[inline]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
            min_altitude: None,
            max_altitude: None,
        }
    }

    #[inline]
    pub const fn with_altitudes(mut self, min: f64, max: f64) -> Self {
        self.min_altitude = Some(min);
        self.max_altitude = Some(max);
        self
    }
}

impl Serialize for GeoBoundingBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (self.min_altitude, self.max_altitude) {
            (Some(min), Some(max)) => {
                [self.west, self.south, min, self.east, self.north, max].serialize(serializer)
            }
            _ => [self.west, self.south, self.east, self.north].serialize(serializer),
        }
    }
}

/// The seven GeoJSON geometry types.
#[derive(Clone, Debug, PartialEq)]
pub enum GeoGeometry {
    Point(GeoPosition),
    LineString(Vec<GeoPosition>),
    /// Linear rings, the first one being the exterior.
    Polygon(Vec<Vec<GeoPosition>>),
    MultiPoint(Vec<GeoPosition>),
    MultiLineString(Vec<Vec<GeoPosition>>),
    MultiPolygon(Vec<Vec<Vec<GeoPosition>>>),
    GeometryCollection(Vec<GeoObject>),
}

impl GeoGeometry {
    /// The GeoJSON `type` member.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::LineString(_) => "LineString",
            Self::Polygon(_) => "Polygon",
            Self::MultiPoint(_) => "MultiPoint",
            Self::MultiLineString(_) => "MultiLineString",
            Self::MultiPolygon(_) => "MultiPolygon",
            Self::GeometryCollection(_) => "GeometryCollection",
        }
    }
}

/// A GeoJSON geometry object with its optional bounding box and any
/// non-standard members.
///
/// Custom members are written after the standard ones, in insertion order.
///
/// ```
/// use vc_bind::Binder;
/// use vc_bind::codec::{GeoGeometry, GeoObject, GeoPosition};
///
/// let point = GeoObject::new(GeoGeometry::Point(GeoPosition::new(-122.1, 47.6)))
///     .with_custom_property("name", "Redmond");
/// let binder = Binder::new();
/// let text = binder.write_val(&point).unwrap();
/// assert_eq!(text, r#"{"type":"Point","coordinates":[-122.1,47.6],"name":"Redmond"}"#);
/// assert_eq!(binder.read_val::<GeoObject>(&text).unwrap().unwrap(), point);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct GeoObject {
    pub geometry: GeoGeometry,
    pub bbox: Option<GeoBoundingBox>,
    pub custom_properties: IndexMap<String, DynamicValue>,
}

impl GeoObject {
    #[inline]
    pub fn new(geometry: GeoGeometry) -> Self {
        Self {
            geometry,
            bbox: None,
            custom_properties: IndexMap::new(),
        }
    }

    #[inline]
    pub fn with_bbox(mut self, bbox: GeoBoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_custom_property(mut self, key: impl Into<String>, value: impl Into<DynamicValue>) -> Self {
        self.custom_properties.insert(key.into(), value.into());
        self
    }
}

impl Serialize for GeoObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.geometry.kind())?;
        match &self.geometry {
            GeoGeometry::Point(position) => map.serialize_entry("coordinates", position)?,
            GeoGeometry::LineString(line) | GeoGeometry::MultiPoint(line) => {
                map.serialize_entry("coordinates", line)?;
            }
            GeoGeometry::Polygon(rings) | GeoGeometry::MultiLineString(rings) => {
                map.serialize_entry("coordinates", rings)?;
            }
            GeoGeometry::MultiPolygon(polygons) => map.serialize_entry("coordinates", polygons)?,
            GeoGeometry::GeometryCollection(geometries) => map.serialize_entry("geometries", geometries)?,
        }
        if let Some(bbox) = &self.bbox {
            map.serialize_entry("bbox", bbox)?;
        }
        for (key, value) in &self.custom_properties {
            if RESERVED.contains(&key.as_str()) {
                log::debug!("GeoJSON custom property `{key}` shadows a standard member, skipped");
                continue;
            }
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Bind for GeoObject {
    #[inline]
    fn shape() -> Shape {
        Shape::Opaque
    }

    #[inline]
    fn type_name() -> &'static str {
        "GeoObject"
    }
}

// -----------------------------------------------------------------------------
// Decoding

fn invalid(expected: &'static str, found: &DynamicValue) -> BindError {
    BindError::mismatch(GeoObject::type_name(), expected, found.kind())
}

fn decode_object(value: DynamicValue) -> Result<GeoObject, BindError> {
    let mut members = match value {
        DynamicValue::Object(members) => members,
        other => return Err(invalid("a GeoJSON object", &other)),
    };
    let kind = match members.shift_remove("type") {
        Some(DynamicValue::String(kind)) => kind,
        Some(other) => return Err(invalid("a `type` string", &other)),
        None => return Err(invalid("a `type` member", &DynamicValue::Null)),
    };

    let geometry = if kind == "GeometryCollection" {
        let items = match members.shift_remove("geometries") {
            Some(DynamicValue::Array(items)) => items,
            other => return Err(invalid("a `geometries` array", &other.unwrap_or_default())),
        };
        GeoGeometry::GeometryCollection(items.into_iter().map(decode_object).collect::<Result<_, _>>()?)
    } else {
        let coordinates = members.shift_remove("coordinates").unwrap_or_default();
        match kind.as_str() {
            "Point" => GeoGeometry::Point(position(&coordinates)?),
            "LineString" => GeoGeometry::LineString(positions(&coordinates)?),
            "Polygon" => GeoGeometry::Polygon(nested(&coordinates, positions)?),
            "MultiPoint" => GeoGeometry::MultiPoint(positions(&coordinates)?),
            "MultiLineString" => GeoGeometry::MultiLineString(nested(&coordinates, positions)?),
            "MultiPolygon" => GeoGeometry::MultiPolygon(nested(&coordinates, |rings| nested(rings, positions))?),
            _ => {
                return Err(BindError::mismatch(
                    GeoObject::type_name(),
                    "a GeoJSON geometry type",
                    kind,
                ));
            }
        }
    };

    let bbox = match members.shift_remove("bbox") {
        None | Some(DynamicValue::Null) => None,
        Some(bbox) => Some(bounding_box(&bbox)?),
    };
    Ok(GeoObject {
        geometry,
        bbox,
        custom_properties: members,
    })
}

fn numbers(value: &DynamicValue) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(DynamicValue::as_f64).collect()
}

fn position(value: &DynamicValue) -> Result<GeoPosition, BindError> {
    match numbers(value).as_deref() {
        Some(&[longitude, latitude]) => Ok(GeoPosition::new(longitude, latitude)),
        Some(&[longitude, latitude, altitude]) => Ok(GeoPosition::new(longitude, latitude).with_altitude(altitude)),
        _ => Err(invalid("a position of 2 or 3 numbers", value)),
    }
}

fn positions(value: &DynamicValue) -> Result<Vec<GeoPosition>, BindError> {
    nested(value, position)
}

fn nested<T>(
    value: &DynamicValue,
    item: impl Fn(&DynamicValue) -> Result<T, BindError>,
) -> Result<Vec<T>, BindError> {
    let items = value.as_array().ok_or_else(|| invalid("a coordinate array", value))?;
    items.iter().map(item).collect()
}

fn bounding_box(value: &DynamicValue) -> Result<GeoBoundingBox, BindError> {
    match numbers(value).as_deref() {
        Some(&[west, south, east, north]) => Ok(GeoBoundingBox::new(west, south, east, north)),
        Some(&[west, south, min, east, north, max]) => {
            Ok(GeoBoundingBox::new(west, south, east, north).with_altitudes(min, max))
        }
        _ => Err(invalid("a bbox of 4 or 6 numbers", value)),
    }
}

// -----------------------------------------------------------------------------
// Codec

pub(super) fn install(binder: &Binder) {
    binder.register_serializer::<GeoObject>(GeoCodec);
    binder.register_deserializer::<GeoObject>(GeoCodec);
}

struct GeoCodec;

impl ValueWriter for GeoCodec {
    fn write(&self, value: &dyn Bindable, _ctx: &WriteContext<'_>, out: &mut dyn Emit) -> Result<(), BindError> {
        let value = value
            .downcast_ref::<GeoObject>()
            .ok_or_else(|| BindError::Internal(format!("expected `{}`", GeoObject::type_name())))?;
        out.emit(value)
    }
}

impl ValueReader for GeoCodec {
    fn read<'de>(
        &self,
        ctx: &ReadContext<'_>,
        de: &mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<Option<BoxedValue>, erased_serde::Error> {
        match DynamicValue::deserialize(de)? {
            DynamicValue::Null => Ok(None),
            value => decode_object(value)
                .map(|object| Some(Box::new(object) as BoxedValue))
                .map_err(|err| ctx.fail(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GeoBoundingBox, GeoGeometry, GeoObject, GeoPosition};
    use crate::{Bind, BindError, Binder, DynamicValue};

    fn square() -> Vec<GeoPosition> {
        vec![
            GeoPosition::new(0.0, 0.0),
            GeoPosition::new(1.0, 0.0),
            GeoPosition::new(1.0, 1.0),
            GeoPosition::new(0.0, 0.0),
        ]
    }

    #[test]
    fn bbox_interleaves_altitudes() {
        let binder = Binder::new();
        let line = GeoObject::new(GeoGeometry::LineString(vec![
            GeoPosition::new(1.0, 2.0).with_altitude(3.0),
            GeoPosition::new(4.0, 5.0).with_altitude(6.0),
        ]))
        .with_bbox(GeoBoundingBox::new(1.0, 2.0, 4.0, 5.0).with_altitudes(3.0, 6.0));
        let text = binder.write_val(&line).unwrap();
        assert_eq!(
            text,
            r#"{"type":"LineString","coordinates":[[1.0,2.0,3.0],[4.0,5.0,6.0]],"bbox":[1.0,2.0,3.0,4.0,5.0,6.0]}"#
        );
        assert_eq!(binder.read_val::<GeoObject>(&text).unwrap().unwrap(), line);

        let flat = GeoObject::new(GeoGeometry::Point(GeoPosition::new(1.0, 2.0)))
            .with_bbox(GeoBoundingBox::new(1.0, 2.0, 1.0, 2.0));
        assert!(binder.write_val(&flat).unwrap().ends_with(r#""bbox":[1.0,2.0,1.0,2.0]}"#));
    }

    #[test]
    fn every_geometry_round_trips() {
        let binder = Binder::new();
        let geometries = [
            GeoGeometry::Point(GeoPosition::new(1.5, 2.5)),
            GeoGeometry::MultiPoint(square()),
            GeoGeometry::Polygon(vec![square()]),
            GeoGeometry::MultiLineString(vec![square(), square()]),
            GeoGeometry::MultiPolygon(vec![vec![square()], vec![square()]]),
            GeoGeometry::GeometryCollection(vec![
                GeoObject::new(GeoGeometry::Point(GeoPosition::new(0.0, 1.0))),
                GeoObject::new(GeoGeometry::LineString(square())),
            ]),
        ];
        for geometry in geometries {
            let kind = geometry.kind();
            let object = GeoObject::new(geometry).with_custom_property("id", 7);
            let text = binder.write_val(&object).unwrap();
            assert!(text.starts_with(&format!(r#"{{"type":"{kind}""#)), "{text}");
            assert!(text.ends_with(r#""id":7}"#), "{text}");
            assert_eq!(binder.read_val::<GeoObject>(&text).unwrap().unwrap(), object);
        }
    }

    #[derive(Bind, Default)]
    #[bind(default)]
    struct Place {
        location: Option<GeoObject>,
        note: Option<DynamicValue>,
    }

    #[test]
    fn nested_in_beans_and_rejected_when_malformed() {
        let binder = Binder::new();
        let place: Place = binder
            .read_val(r#"{"location":{"type":"Point","coordinates":[3,4],"source":{"gps":true}}}"#)
            .unwrap()
            .unwrap();
        let location = place.location.unwrap();
        assert_eq!(location.geometry, GeoGeometry::Point(GeoPosition::new(3.0, 4.0)));
        assert!(location.custom_properties.contains_key("source"));
        assert!(place.note.is_none());

        for text in [
            r#"{"type":"Circle","coordinates":[1,2]}"#,
            r#"{"type":"Point","coordinates":[1]}"#,
            r#"{"coordinates":[1,2]}"#,
            r#"{"type":"Point","coordinates":[1,2],"bbox":[1,2,3]}"#,
        ] {
            let err = binder.read_val::<GeoObject>(text).unwrap_err();
            assert!(matches!(err, BindError::Mismatch { ty: "GeoObject", .. }), "{text}: {err}");
        }
    }
}
