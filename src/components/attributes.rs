// Custom per-object attributes owned by the object's behavior task

use bevy_ecs::prelude::Component;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Flag(bool),
    Integer(i64),
    Scalar(f64),
    Text(String),
}

#[derive(Debug, Clone, Component, Default, PartialEq)]
pub struct Attributes {
    pub values: FxHashMap<String, AttrValue>,
}

impl Attributes {
    pub fn set(&mut self, key: impl Into<String>, value: AttrValue) {
        self.values.insert(key.into(), value);
    }
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.values.get(key)
    }
    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.values.remove(key)
    }
    pub fn set_flag(&mut self, key: impl Into<String>) {
        self.values.insert(key.into(), AttrValue::Flag(true));
    }
    pub fn has_flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(AttrValue::Flag(true)))
    }
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(AttrValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }
    pub fn get_scalar(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some(AttrValue::Scalar(v)) => Some(*v),
            Some(AttrValue::Integer(v)) => Some(*v as f64),
            _ => None,
        }
    }
    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(AttrValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }
}
