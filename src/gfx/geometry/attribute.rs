//! Typed vertex attribute storage
//!
//! A [`BufferAttribute`] is a flat numeric array plus the metadata needed to
//! interpret it (`size` components per element, stride, offset). Any mutation
//! marks the attribute dirty so the renderer knows to re-upload it.

use serde::{Deserialize, Serialize};

use super::GeometryError;

/// Component type of an attribute, serialized as the matching GL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DataType {
    Float,
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    Byte,
    Short,
    Int,
}

impl DataType {
    pub const fn gl_enum(self) -> u32 {
        match self {
            DataType::Byte => 0x1400,
            DataType::UnsignedByte => 0x1401,
            DataType::Short => 0x1402,
            DataType::UnsignedShort => 0x1403,
            DataType::Int => 0x1404,
            DataType::UnsignedInt => 0x1405,
            DataType::Float => 0x1406,
        }
    }
}

impl TryFrom<u32> for DataType {
    type Error = GeometryError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x1400 => Ok(DataType::Byte),
            0x1401 => Ok(DataType::UnsignedByte),
            0x1402 => Ok(DataType::Short),
            0x1403 => Ok(DataType::UnsignedShort),
            0x1404 => Ok(DataType::Int),
            0x1405 => Ok(DataType::UnsignedInt),
            0x1406 => Ok(DataType::Float),
            other => Err(GeometryError::UnsupportedDataType(other)),
        }
    }
}

impl From<DataType> for u32 {
    fn from(value: DataType) -> Self {
        value.gl_enum()
    }
}

/// Typed backing store of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    Float32(Vec<f32>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
}

macro_rules! for_each_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            AttributeData::Float32($v) => $body,
            AttributeData::Uint8($v) => $body,
            AttributeData::Uint16($v) => $body,
            AttributeData::Uint32($v) => $body,
            AttributeData::Int8($v) => $body,
            AttributeData::Int16($v) => $body,
            AttributeData::Int32($v) => $body,
        }
    };
}

impl AttributeData {
    pub fn dtype(&self) -> DataType {
        match self {
            AttributeData::Float32(_) => DataType::Float,
            AttributeData::Uint8(_) => DataType::UnsignedByte,
            AttributeData::Uint16(_) => DataType::UnsignedShort,
            AttributeData::Uint32(_) => DataType::UnsignedInt,
            AttributeData::Int8(_) => DataType::Byte,
            AttributeData::Int16(_) => DataType::Short,
            AttributeData::Int32(_) => DataType::Int,
        }
    }

    pub fn len(&self) -> usize {
        for_each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads one component as `f32`.
    pub fn get_f32(&self, index: usize) -> Option<f32> {
        for_each_variant!(self, v => v.get(index).map(|x| *x as f32))
    }

    /// Writes one component, converting with `as` semantics (saturating for integers).
    pub fn set_f32(&mut self, index: usize, value: f32) -> bool {
        match self {
            AttributeData::Float32(v) => write_at(v, index, value),
            AttributeData::Uint8(v) => write_at(v, index, value as u8),
            AttributeData::Uint16(v) => write_at(v, index, value as u16),
            AttributeData::Uint32(v) => write_at(v, index, value as u32),
            AttributeData::Int8(v) => write_at(v, index, value as i8),
            AttributeData::Int16(v) => write_at(v, index, value as i16),
            AttributeData::Int32(v) => write_at(v, index, value as i32),
        }
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        for_each_variant!(self, v => v.iter().map(|x| *x as f32).collect())
    }

    /// Integer view of the data, as used for index buffers.
    pub fn to_u32_vec(&self) -> Vec<u32> {
        match self {
            AttributeData::Float32(v) => v.iter().map(|x| *x as u32).collect(),
            AttributeData::Uint8(v) => v.iter().map(|x| *x as u32).collect(),
            AttributeData::Uint16(v) => v.iter().map(|x| *x as u32).collect(),
            AttributeData::Uint32(v) => v.clone(),
            AttributeData::Int8(v) => v.iter().map(|x| *x as u32).collect(),
            AttributeData::Int16(v) => v.iter().map(|x| *x as u32).collect(),
            AttributeData::Int32(v) => v.iter().map(|x| *x as u32).collect(),
        }
    }

    /// Rebuilds typed storage from plain JSON numbers.
    pub fn from_numbers(dtype: DataType, numbers: &[f64]) -> Self {
        match dtype {
            DataType::Float => AttributeData::Float32(numbers.iter().map(|x| *x as f32).collect()),
            DataType::UnsignedByte => AttributeData::Uint8(numbers.iter().map(|x| *x as u8).collect()),
            DataType::UnsignedShort => {
                AttributeData::Uint16(numbers.iter().map(|x| *x as u16).collect())
            }
            DataType::UnsignedInt => AttributeData::Uint32(numbers.iter().map(|x| *x as u32).collect()),
            DataType::Byte => AttributeData::Int8(numbers.iter().map(|x| *x as i8).collect()),
            DataType::Short => AttributeData::Int16(numbers.iter().map(|x| *x as i16).collect()),
            DataType::Int => AttributeData::Int32(numbers.iter().map(|x| *x as i32).collect()),
        }
    }

    fn to_numbers(&self) -> Vec<f64> {
        for_each_variant!(self, v => v.iter().map(|x| *x as f64).collect())
    }
}

fn write_at<T>(values: &mut [T], index: usize, value: T) -> bool {
    match values.get_mut(index) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

impl From<Vec<f32>> for AttributeData {
    fn from(v: Vec<f32>) -> Self {
        AttributeData::Float32(v)
    }
}

impl From<Vec<u16>> for AttributeData {
    fn from(v: Vec<u16>) -> Self {
        AttributeData::Uint16(v)
    }
}

impl From<Vec<u32>> for AttributeData {
    fn from(v: Vec<u32>) -> Self {
        AttributeData::Uint32(v)
    }
}

impl From<Vec<u8>> for AttributeData {
    fn from(v: Vec<u8>) -> Self {
        AttributeData::Uint8(v)
    }
}

/// A vertex attribute: flat data interpreted as `size`-component elements.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferAttribute {
    data: AttributeData,
    size: usize,
    normalize: bool,
    stride: usize,
    offset: usize,
    dirty: bool,
}

impl BufferAttribute {
    /// Creates an attribute with `size` components per element.
    ///
    /// New attributes start dirty.
    pub fn new(data: impl Into<AttributeData>, size: usize) -> Self {
        Self {
            data: data.into(),
            size: size.max(1),
            normalize: false,
            stride: 0,
            offset: 0,
            dirty: true,
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn data(&self) -> &AttributeData {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_data(&mut self, data: impl Into<AttributeData>) {
        self.data = data.into();
        self.dirty = true;
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size.max(1);
        self.dirty = true;
    }

    pub fn set_normalize(&mut self, normalize: bool) {
        self.normalize = normalize;
        self.dirty = true;
    }

    pub fn set_stride(&mut self, stride: usize) {
        self.stride = stride;
        self.dirty = true;
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
        self.dirty = true;
    }

    /// Marks the attribute as uploaded.
    pub fn consume(&mut self) {
        self.dirty = false;
    }

    /// Number of elements (`len / size`).
    pub fn count(&self) -> usize {
        self.data.len() / self.size
    }

    /// Number of scalar components.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads element `index`, `None` when any component is out of range.
    pub fn get(&self, index: usize) -> Option<Vec<f32>> {
        self.get_sized(index, self.size)
    }

    /// Reads `size` components starting at element `index`.
    pub fn get_sized(&self, index: usize, size: usize) -> Option<Vec<f32>> {
        let start = index * self.size + self.offset;
        (start..start + size).map(|i| self.data.get_f32(i)).collect()
    }

    /// Writes `values` starting at element `index`.
    ///
    /// Components past the end of the buffer are dropped with a warning.
    pub fn set(&mut self, index: usize, values: &[f32]) {
        self.dirty = true;
        let start = index * self.size + self.offset;
        for (i, value) in values.iter().enumerate() {
            if !self.data.set_f32(start + i, *value) {
                log::warn!(
                    "BufferAttribute write at {} is out of range (len {})",
                    start + i,
                    self.data.len()
                );
                break;
            }
        }
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.data.to_f32_vec()
    }

    pub fn to_u32_vec(&self) -> Vec<u32> {
        self.data.to_u32_vec()
    }

    pub fn to_record(&self) -> BufferAttributeRecord {
        BufferAttributeRecord {
            data: self.data.to_numbers(),
            size: self.size,
            dtype: self.dtype(),
            normalize: self.normalize,
            stride: self.stride,
            offset: self.offset,
            is_dirty: self.dirty,
        }
    }

    /// Rebuilds an attribute from its record. The result is always dirty.
    pub fn from_record(record: &BufferAttributeRecord) -> Self {
        BufferAttribute::new(
            AttributeData::from_numbers(record.dtype, &record.data),
            record.size,
        )
        .with_normalize(record.normalize)
        .with_stride(record.stride)
        .with_offset(record.offset)
    }
}

/// Serialized form of a [`BufferAttribute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferAttributeRecord {
    pub data: Vec<f64>,
    pub size: usize,
    pub dtype: DataType,
    #[serde(default)]
    pub normalize: bool,
    #[serde(default)]
    pub stride: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub is_dirty: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_attribute_is_dirty_and_consume_clears() {
        let mut attr = BufferAttribute::new(vec![0.0f32; 6], 3);
        assert!(attr.is_dirty());
        attr.consume();
        assert!(!attr.is_dirty());

        attr.set_normalize(true);
        assert!(attr.is_dirty());
    }

    #[test]
    fn test_count_and_get_set() {
        let mut attr = BufferAttribute::new(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], 3);
        attr.consume();
        assert_eq!(attr.count(), 2);
        assert_eq!(attr.len(), 6);
        assert_eq!(attr.get(1), Some(vec![4.0, 5.0, 6.0]));

        attr.set(0, &[7.0, 8.0, 9.0]);
        assert!(attr.is_dirty());
        assert_eq!(attr.get(0), Some(vec![7.0, 8.0, 9.0]));
        assert_eq!(attr.get(2), None);
    }

    #[test]
    fn test_set_past_end_is_truncated() {
        let mut attr = BufferAttribute::new(vec![0.0f32; 3], 3);
        attr.set(0, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(attr.to_f32_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_dtype_tracks_storage() {
        assert_eq!(BufferAttribute::new(vec![0u16; 3], 1).dtype(), DataType::UnsignedShort);
        assert_eq!(BufferAttribute::new(vec![0.0f32; 3], 3).dtype(), DataType::Float);
    }

    #[test]
    fn test_record_keeps_gl_enum_and_type() {
        let attr = BufferAttribute::new(vec![0u16, 1, 2], 1);
        let json = serde_json::to_value(attr.to_record()).unwrap();
        assert_eq!(json["dtype"], 0x1403);
        assert_eq!(json["isDirty"], true);

        let record: BufferAttributeRecord = serde_json::from_value(json).unwrap();
        let back = BufferAttribute::from_record(&record);
        assert_eq!(back.data(), &AttributeData::Uint16(vec![0, 1, 2]));
    }

    #[test]
    fn test_unknown_dtype_is_rejected() {
        let json = r#"{"data":[1],"size":1,"dtype":1234}"#;
        assert!(serde_json::from_str::<BufferAttributeRecord>(json).is_err());
    }
}
