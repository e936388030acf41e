use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::{Deserialize, Deserializer, Error, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::array::NdArray;
use crate::index::IndexMode;
use crate::layout::{Layout, Order};

/// Visitor for values which are serialized as their string form.
struct FromStrVisitor<T> {
    expecting: &'static str,
    marker: PhantomData<T>,
}

impl<T> FromStrVisitor<T> {
    fn new(expecting: &'static str) -> Self {
        FromStrVisitor {
            expecting,
            marker: PhantomData,
        }
    }
}

impl<T> Visitor<'_> for FromStrVisitor<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.expecting)
    }

    fn visit_str<E: Error>(self, value: &str) -> Result<T, E> {
        value.parse().map_err(E::custom)
    }
}

impl Serialize for Order {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Order {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Order, D::Error> {
        deserializer.deserialize_str(FromStrVisitor::new("\"row-major\" or \"column-major\""))
    }
}

impl Serialize for IndexMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IndexMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<IndexMode, D::Error> {
        deserializer.deserialize_str(FromStrVisitor::new("\"throw\", \"wrap\" or \"clamp\""))
    }
}

/// Read the value for a map key into `slot`, failing if the key has already
/// been seen.
fn next_field<'de, A, V>(
    map: &mut A,
    slot: &mut Option<V>,
    name: &'static str,
) -> Result<(), A::Error>
where
    A: MapAccess<'de>,
    V: Deserialize<'de>,
{
    if slot.is_some() {
        return Err(A::Error::duplicate_field(name));
    }
    *slot = Some(map.next_value()?);
    Ok(())
}

const LAYOUT_FIELDS: &[&str] = &["shape", "strides", "offset", "order"];

impl Serialize for Layout {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut layout = serializer.serialize_struct("Layout", 4)?;
        layout.serialize_field("shape", self.shape())?;
        layout.serialize_field("strides", self.strides())?;
        layout.serialize_field("offset", &self.offset())?;
        layout.serialize_field("order", &self.order())?;
        layout.end()
    }
}

struct LayoutVisitor;

impl<'de> Visitor<'de> for LayoutVisitor {
    type Value = Layout;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a layout with \"shape\" and \"strides\" fields")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Layout, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut shape: Option<Vec<usize>> = None;
        let mut strides: Option<Vec<isize>> = None;
        let mut offset: Option<usize> = None;
        let mut order: Option<Order> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "shape" => next_field(&mut map, &mut shape, "shape")?,
                "strides" => next_field(&mut map, &mut strides, "strides")?,
                "offset" => next_field(&mut map, &mut offset, "offset")?,
                "order" => next_field(&mut map, &mut order, "order")?,
                _ => return Err(A::Error::unknown_field(&key, LAYOUT_FIELDS)),
            }
        }

        let Some(shape) = shape else {
            return Err(A::Error::missing_field("shape"));
        };
        let Some(strides) = strides else {
            return Err(A::Error::missing_field("strides"));
        };

        Layout::from_parts(
            &shape,
            &strides,
            offset.unwrap_or(0),
            order.unwrap_or_default(),
        )
        .map_err(A::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Layout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Layout, D::Error> {
        deserializer.deserialize_struct("Layout", LAYOUT_FIELDS, LayoutVisitor)
    }
}

const ARRAY_FIELDS: &[&str] = &["dtype", "shape", "data"];

/// Arrays are serialized with their elements in logical row-major order,
/// regardless of their layout.
impl<T: Copy + Serialize> Serialize for NdArray<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut array = serializer.serialize_struct("NdArray", 3)?;
        array.serialize_field("dtype", self.dtype())?;
        array.serialize_field("shape", self.shape())?;
        array.serialize_field("data", &self.to_vec())?;
        array.end()
    }
}

struct ArrayVisitor<T> {
    marker: PhantomData<T>,
}

impl<'de, T: Copy + Deserialize<'de>> Visitor<'de> for ArrayVisitor<T> {
    type Value = NdArray<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(
            formatter,
            "an array with \"dtype\", \"shape\" and \"data\" fields"
        )
    }

    fn visit_map<A>(self, mut map: A) -> Result<NdArray<T>, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut dtype: Option<String> = None;
        let mut shape: Option<Vec<usize>> = None;
        let mut data: Option<Vec<T>> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "dtype" => next_field(&mut map, &mut dtype, "dtype")?,
                "shape" => next_field(&mut map, &mut shape, "shape")?,
                "data" => next_field(&mut map, &mut data, "data")?,
                _ => return Err(A::Error::unknown_field(&key, ARRAY_FIELDS)),
            }
        }

        let Some(dtype) = dtype else {
            return Err(A::Error::missing_field("dtype"));
        };
        let Some(shape) = shape else {
            return Err(A::Error::missing_field("shape"));
        };
        let Some(data) = data else {
            return Err(A::Error::missing_field("data"));
        };

        NdArray::from_vec(&dtype, data, &shape, Order::RowMajor)
            .map_err(A::Error::custom)
    }
}

impl<'de, T: Copy + Deserialize<'de>> Deserialize<'de> for NdArray<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<NdArray<T>, D::Error> {
        deserializer.deserialize_struct(
            "NdArray",
            ARRAY_FIELDS,
            ArrayVisitor {
                marker: PhantomData,
            },
        )
    }
}
