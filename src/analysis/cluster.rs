use serde::ser::SerializeMap;
use serde::ser::SerializeSeq;
use serde::Serialize;
use serde::Serializer;
use std::collections::HashMap;

/// Groups cell addresses by a styling key, keeping keys in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct Cluster {
    /// Name of the key field in the serialized entries (`color`, `pattern`)
    label: &'static str,
    index: HashMap<String, usize>,
    entries: Vec<(String, Vec<String>)>,
}

impl Cluster {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, key: &str, address: &str) {
        match self.index.get(key) {
            Some(&position) => self.entries[position].1.push(address.to_owned()),
            None => {
                self.index.insert(key.to_owned(), self.entries.len());
                self.entries.push((key.to_owned(), vec![address.to_owned()]));
            }
        }
    }

    /// Addresses grouped under a key
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.index.get(key).map(|&position| self.entries[position].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(key, cells)| (key.as_str(), cells.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One serialized cluster entry: `{"<label>": key, "cells": [...]}`
struct ClusterEntry<'a> {
    label: &'static str,
    key: &'a str,
    cells: &'a [String],
}

impl Serialize for ClusterEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.label, self.key)?;
        map.serialize_entry("cells", self.cells)?;
        map.end()
    }
}

impl Serialize for Cluster {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for (key, cells) in &self.entries {
            seq.serialize_element(&ClusterEntry {
                label: self.label,
                key,
                cells,
            })?;
        }
        seq.end()
    }
}
