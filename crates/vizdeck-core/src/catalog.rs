//! Visualization type catalog
//!
//! Read-only registry of the visualization types users can configure
//! (sports, financial, weather, ...). A type's `default_config` is what an
//! identity sees before it has saved its own setting.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::RepositoryError;
use crate::types::VisualizationTypeId;

// ----------------------------------------------------------------------------
// Data Source Kinds
// ----------------------------------------------------------------------------

/// Where a visualization type gets its data from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceKind {
    /// Polled HTTP API
    Api,
    /// Backing database table
    Database,
    /// Streaming WebSocket feed
    WebSocket,
}

impl core::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DataSourceKind::Api => write!(f, "API"),
            DataSourceKind::Database => write!(f, "Database"),
            DataSourceKind::WebSocket => write!(f, "WebSocket"),
        }
    }
}

// ----------------------------------------------------------------------------
// Visualization Type
// ----------------------------------------------------------------------------

/// A configurable visualization offered by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationType {
    pub id: VisualizationTypeId,
    pub name: String,
    pub description: String,
    pub data_source: DataSourceKind,
    /// Data source connection details, as a JSON document
    pub data_source_config: String,
    /// Configuration shown before the identity saves its own, as a JSON
    /// document
    pub default_config: String,
}

// ----------------------------------------------------------------------------
// Catalog Trait
// ----------------------------------------------------------------------------

/// External read-only catalog of visualization types
#[async_trait]
pub trait VisualizationCatalog: Send + Sync {
    /// List types, optionally filtered by a name substring (case-insensitive)
    async fn list(
        &self,
        name_contains: Option<&str>,
    ) -> Result<Vec<VisualizationType>, RepositoryError>;

    /// Get a type by id
    async fn get(
        &self,
        id: &VisualizationTypeId,
    ) -> Result<Option<VisualizationType>, RepositoryError>;
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_display() {
        assert_eq!(format!("{}", DataSourceKind::Api), "API");
        assert_eq!(format!("{}", DataSourceKind::WebSocket), "WebSocket");
    }
}
