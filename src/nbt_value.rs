use crate::error::{Result, SchematicError};
use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Owned, ordered mirror of an NBT tag.
///
/// Compounds are kept in a `BTreeMap` so that a tile entity's extra tags
/// always serialise in the same order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NbtValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<i8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    List(Vec<NbtValue>),
    Compound(BTreeMap<String, NbtValue>),
}

pub type NbtMap = BTreeMap<String, NbtValue>;

impl NbtValue {
    pub fn from_tag(tag: &NbtTag) -> NbtValue {
        match tag {
            NbtTag::Byte(b) => NbtValue::Byte(*b),
            NbtTag::Short(s) => NbtValue::Short(*s),
            NbtTag::Int(i) => NbtValue::Int(*i),
            NbtTag::Long(l) => NbtValue::Long(*l),
            NbtTag::Float(f) => NbtValue::Float(*f),
            NbtTag::Double(d) => NbtValue::Double(*d),
            NbtTag::String(s) => NbtValue::String(s.clone()),
            NbtTag::ByteArray(arr) => NbtValue::ByteArray(arr.clone()),
            NbtTag::IntArray(arr) => NbtValue::IntArray(arr.clone()),
            NbtTag::LongArray(arr) => NbtValue::LongArray(arr.clone()),
            NbtTag::List(list) => NbtValue::List(list.iter().map(NbtValue::from_tag).collect()),
            NbtTag::Compound(compound) => NbtValue::Compound(compound_to_map(compound)),
        }
    }

    pub fn to_tag(&self) -> NbtTag {
        match self {
            NbtValue::Byte(b) => NbtTag::Byte(*b),
            NbtValue::Short(s) => NbtTag::Short(*s),
            NbtValue::Int(i) => NbtTag::Int(*i),
            NbtValue::Long(l) => NbtTag::Long(*l),
            NbtValue::Float(f) => NbtTag::Float(*f),
            NbtValue::Double(d) => NbtTag::Double(*d),
            NbtValue::String(s) => NbtTag::String(s.clone()),
            NbtValue::ByteArray(arr) => NbtTag::ByteArray(arr.clone()),
            NbtValue::IntArray(arr) => NbtTag::IntArray(arr.clone()),
            NbtValue::LongArray(arr) => NbtTag::LongArray(arr.clone()),
            NbtValue::List(values) => NbtTag::List(NbtList::from(
                values.iter().map(NbtValue::to_tag).collect::<Vec<NbtTag>>(),
            )),
            NbtValue::Compound(map) => NbtTag::Compound(map_to_compound(map)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NbtValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            NbtValue::Byte(b) => Some(*b as i32),
            NbtValue::Short(s) => Some(*s as i32),
            NbtValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

pub fn compound_to_map(compound: &NbtCompound) -> NbtMap {
    compound
        .inner()
        .iter()
        .map(|(key, tag)| (key.clone(), NbtValue::from_tag(tag)))
        .collect()
}

pub fn map_to_compound(map: &NbtMap) -> NbtCompound {
    let mut compound = NbtCompound::new();
    for (key, value) in map {
        compound.insert(key.clone(), value.to_tag());
    }
    compound
}

// Typed lookups that accept the tag shapes older writers used.

pub(crate) fn get_tag<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a NbtTag> {
    compound.inner().get(key)
}

pub(crate) fn get_int(compound: &NbtCompound, key: &str) -> Option<i32> {
    match get_tag(compound, key)? {
        NbtTag::Byte(b) => Some(*b as i32),
        NbtTag::Short(s) => Some(*s as i32),
        NbtTag::Int(i) => Some(*i),
        _ => None,
    }
}

/// Reads an int16 dimension the way Sponge and MCEdit intend it: unsigned.
pub(crate) fn get_dimension(compound: &NbtCompound, key: &str) -> Option<i32> {
    match get_tag(compound, key)? {
        NbtTag::Short(s) => Some(*s as u16 as i32),
        NbtTag::Int(i) => Some(*i),
        _ => None,
    }
}

/// Narrows a header dimension to the u16 range both formats store.
pub(crate) fn checked_dimension(value: i32, field: &str) -> Result<u16> {
    u16::try_from(value).map_err(|_| {
        SchematicError::CorruptDocument(format!("{} of {} is out of range", field, value))
    })
}

pub(crate) fn get_byte_array<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a [i8]> {
    match get_tag(compound, key)? {
        NbtTag::ByteArray(bytes) => Some(bytes.as_slice()),
        _ => None,
    }
}

pub(crate) fn get_compound<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a NbtCompound> {
    match get_tag(compound, key)? {
        NbtTag::Compound(inner) => Some(inner),
        _ => None,
    }
}

pub(crate) fn get_list<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a NbtList> {
    match get_tag(compound, key)? {
        NbtTag::List(list) => Some(list),
        _ => None,
    }
}

pub(crate) fn get_str<'a>(compound: &'a NbtCompound, key: &str) -> Option<&'a str> {
    match get_tag(compound, key)? {
        NbtTag::String(s) => Some(s.as_str()),
        _ => None,
    }
}

pub(crate) fn bytes_from_i8(bytes: &[i8]) -> Vec<u8> {
    bytes.iter().map(|&b| b as u8).collect()
}

pub(crate) fn bytes_to_i8(bytes: &[u8]) -> Vec<i8> {
    bytes.iter().map(|&b| b as i8).collect()
}
