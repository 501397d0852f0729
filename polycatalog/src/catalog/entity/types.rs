// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared value types used by catalog entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Data model of a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataModel {
    Relational,
    Document,
    Graph,
}

impl Default for DataModel {
    fn default() -> Self {
        DataModel::Relational
    }
}

impl fmt::Display for DataModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataModel::Relational => "relational",
            DataModel::Document => "document",
            DataModel::Graph => "graph",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for DataModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relational" => Ok(DataModel::Relational),
            "document" => Ok(DataModel::Document),
            "graph" => Ok(DataModel::Graph),
            _ => Err(format!(
                "Unknown data model: {}. Valid options: relational, document, graph",
                s
            )),
        }
    }
}

/// Kind of logical entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Entity,
    Source,
    View,
    MaterializedView,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityType::Entity => "ENTITY",
            EntityType::Source => "SOURCE",
            EntityType::View => "VIEW",
            EntityType::MaterializedView => "MATERIALIZED_VIEW",
        };
        write!(f, "{}", s)
    }
}

/// Base types a column can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolyType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Real,
    Double,
    Date,
    Time,
    Timestamp,
    Char,
    VarChar,
    Text,
    Binary,
    VarBinary,
    Json,
    Array,
    Map,
    Document,
    Node,
    Edge,
    Graph,
    File,
    Image,
    Audio,
    Video,
}

impl PolyType {
    /// Whether a length / precision may be attached to the type
    pub fn allows_length(self) -> bool {
        matches!(
            self,
            PolyType::Decimal
                | PolyType::Char
                | PolyType::VarChar
                | PolyType::Binary
                | PolyType::VarBinary
                | PolyType::Time
                | PolyType::Timestamp
        )
    }

    pub fn is_collection(self) -> bool {
        matches!(self, PolyType::Array | PolyType::Map)
    }
}

impl fmt::Display for PolyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = format!("{:?}", self).to_uppercase();
        write!(f, "{}", s)
    }
}

/// Semantic type of a logical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    pub base: PolyType,
    /// Element type for collection typed columns
    pub collection: Option<PolyType>,
    pub length: Option<u32>,
    pub scale: Option<u32>,
    pub dimension: Option<u32>,
    pub cardinality: Option<u32>,
}

impl ColumnType {
    pub fn new(base: PolyType) -> Self {
        Self {
            base,
            collection: None,
            length: None,
            scale: None,
            dimension: None,
            cardinality: None,
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn array_of(element: PolyType, dimension: u32, cardinality: u32) -> Self {
        Self {
            base: PolyType::Array,
            collection: Some(element),
            length: None,
            scale: None,
            dimension: Some(dimension),
            cardinality: Some(cardinality),
        }
    }

    /// Checks the internal consistency of the type description
    pub fn validate(&self) -> Result<(), String> {
        if self.length.is_some() && !self.base.allows_length() {
            return Err(format!("{} does not take a length", self.base));
        }
        if let (Some(scale), Some(length)) = (self.scale, self.length) {
            if scale > length {
                return Err(format!(
                    "Scale {} can not be larger than length {}",
                    scale, length
                ));
            }
        }
        if self.scale.is_some() && self.length.is_none() {
            return Err("Scale requires a length".to_string());
        }
        if self.collection.is_some() && !self.base.is_collection() {
            return Err(format!("{} is not a collection type", self.base));
        }
        Ok(())
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.length, self.scale) {
            (Some(l), Some(s)) => write!(f, "{}({}, {})", self.base, l, s)?,
            (Some(l), None) => write!(f, "{}({})", self.base, l)?,
            _ => write!(f, "{}", self.base)?,
        }
        if let Some(element) = self.collection {
            write!(f, "<{}>", element)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collation {
    CaseSensitive,
    CaseInsensitive,
}

impl Default for Collation {
    fn default() -> Self {
        Collation::CaseInsensitive
    }
}

/// Default value of a column, kept as its literal text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultValue {
    pub poly_type: PolyType,
    pub value: String,
    pub function_name: Option<String>,
}
