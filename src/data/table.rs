//! Data Tables
//!
//! Row tables exported as `[{"Rows": {"RowName": {..}, ..}}]`. Only the first
//! record's `Rows` object is read. Rows keep document order, which matters
//! for fallbacks that take "the first row".

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::asset::source::{AssetSource, FsSource};

/// Directory holding row tables, relative to the content root.
pub const DATA_TABLES_DIR: &str = "DataTables";

const KEY_ROWS: &str = "Rows";

/// Table loading errors. A missing table is not an error.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// The table exists but could not be read.
    #[error("Failed to read table {table}: {source}")]
    Io {
        /// Table name
        table: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The table is not valid JSON.
    #[error("Malformed table {table}: {source}")]
    Malformed {
        /// Table name
        table: String,
        /// Parse error
        source: serde_json::Error,
    },
}

// ============================================================================
// DataTable
// ============================================================================

/// Named rows in document order.
#[derive(Clone, Debug, PartialEq)]
pub struct DataTable<T> {
    rows: Vec<(String, T)>,
    index: HashMap<String, usize>,
}

impl<T> Default for DataTable<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> DataTable<T> {
    /// Build from rows. A repeated name keeps its first position and last value.
    pub fn from_rows(rows: impl IntoIterator<Item = (String, T)>) -> Self {
        let mut table = Self::default();
        for (name, row) in rows {
            match table.index.get(&name) {
                Some(&position) => table.rows[position].1 = row,
                None => {
                    table.index.insert(name.clone(), table.rows.len());
                    table.rows.push((name, row));
                }
            }
        }
        table
    }

    /// Row by name.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&position| &self.rows[position].1)
    }

    /// Check if a row exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// First row in document order.
    pub fn first(&self) -> Option<(&str, &T)> {
        self.rows.first().map(|(name, row)| (name.as_str(), row))
    }

    /// Row names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(name, _)| name.as_str())
    }

    /// Rows in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.rows.iter().map(|(name, row)| (name.as_str(), row))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T: DeserializeOwned> DataTable<T> {
    /// Deserialize a `Rows` object. Fails if any row does not fit `T`.
    pub fn from_rows_value(rows: &Value) -> Result<Self, serde_json::Error> {
        let rows: serde_json::Map<String, Value> = serde_json::Map::deserialize(rows)?;
        let mut parsed = Vec::with_capacity(rows.len());
        for (name, row) in rows {
            let row = T::deserialize(row)?;
            parsed.push((name, row));
        }
        Ok(Self::from_rows(parsed))
    }
}

// ============================================================================
// Loader
// ============================================================================

type CacheKey = (String, TypeId);

/// Cached row table loader, keyed by table name and row type.
pub struct DataTableLoader {
    source: Arc<dyn AssetSource>,
    cache: Mutex<HashMap<CacheKey, Arc<dyn Any + Send + Sync>>>,
}

impl DataTableLoader {
    /// Create a loader over any document source.
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Create a loader over `<base>/<domain>` on disk.
    pub fn from_fs(base: impl AsRef<std::path::Path>, domain: impl AsRef<std::path::Path>) -> Self {
        Self::new(Arc::new(FsSource::new(base, domain)))
    }

    /// Load a table's rows as `T`.
    ///
    /// `Ok(None)` when the table is missing, has no `Rows`, or its rows do not
    /// fit `T`. Invalid JSON is an error.
    #[instrument(skip(self), fields(row_type = std::any::type_name::<T>()))]
    pub async fn load_table<T>(&self, table_name: &str) -> Result<Option<Arc<DataTable<T>>>, DataError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let key = (table_name.to_string(), TypeId::of::<T>());
        let cached = self.cache.lock().await.get(&key).cloned();
        if let Some(cached) = cached {
            if let Ok(table) = cached.downcast::<DataTable<T>>() {
                return Ok(Some(table));
            }
        }

        let relative = format!("{}/{}", DATA_TABLES_DIR, table_name);
        let text = match self.source.read(&relative).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!("DataTable file not found: {}", self.source.locate(&relative));
                return Ok(None);
            }
            Err(source) => {
                return Err(DataError::Io {
                    table: table_name.to_string(),
                    source,
                })
            }
        };

        info!("Loading DataTable: {}", table_name);
        let document: Value = serde_json::from_str(&text).map_err(|source| DataError::Malformed {
            table: table_name.to_string(),
            source,
        })?;

        let Some(rows) = document.get(0).and_then(|record| record.get(KEY_ROWS)) else {
            warn!("DataTable has no Rows: {}", table_name);
            return Ok(None);
        };

        let table = match DataTable::<T>::from_rows_value(rows) {
            Ok(table) => Arc::new(table),
            Err(e) => {
                error!("DataTable {} rows do not match {}: {}", table_name, std::any::type_name::<T>(), e);
                return Ok(None);
            }
        };

        info!("Loaded DataTable {} ({} rows)", table_name, table.len());
        self.cache.lock().await.insert(key, table.clone());
        Ok(Some(table))
    }

    /// Load a table's rows as raw JSON objects.
    pub async fn load_raw_table(
        &self,
        table_name: &str,
    ) -> Result<Option<Arc<DataTable<serde_json::Map<String, Value>>>>, DataError> {
        self.load_table(table_name).await
    }

    /// Drop every cached table.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
        info!("DataTable cache cleared");
    }

    /// Number of cached tables.
    pub async fn cached_count(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::source::MemorySource;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Row {
        #[serde(rename = "Value")]
        value: i32,
    }

    fn loader(docs: &[(&str, &str)]) -> (DataTableLoader, Arc<MemorySource>) {
        let source = Arc::new(MemorySource::default());
        for (name, text) in docs {
            source.insert(&format!("{}/{}", DATA_TABLES_DIR, name), text);
        }
        (DataTableLoader::new(source.clone()), source)
    }

    #[test]
    fn test_rows_keep_document_order() {
        let rows = serde_json::json!({"Zeta": {"Value": 1}, "Alpha": {"Value": 2}, "Mid": {}});
        let table = DataTable::<Row>::from_rows_value(&rows).unwrap();

        assert_eq!(table.names().collect::<Vec<_>>(), vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(table.first(), Some(("Zeta", &Row { value: 1 })));
        assert_eq!(table.get("Mid"), Some(&Row::default()));
        assert!(table.get("Nope").is_none());
    }

    #[test]
    fn test_from_rows_replaces_duplicates_in_place() {
        let table = DataTable::from_rows(vec![
            ("A".to_string(), 1),
            ("B".to_string(), 2),
            ("A".to_string(), 3),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("A"), Some(&3));
        assert_eq!(table.first(), Some(("A", &3)));
    }

    #[tokio::test]
    async fn test_load_and_cache_by_type() {
        let (loader, source) = loader(&[("Numbers_DT", r#"[{"Rows": {"One": {"Value": 1}}}]"#)]);

        let first = loader.load_table::<Row>("Numbers_DT").await.unwrap().unwrap();
        let second = loader.load_table::<Row>("Numbers_DT").await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.reads(), 1);

        // a different row type is a different cache entry
        let raw = loader.load_raw_table("Numbers_DT").await.unwrap().unwrap();
        assert!(raw.get("One").unwrap().contains_key("Value"));
        assert_eq!(source.reads(), 2);
        assert_eq!(loader.cached_count().await, 2);

        loader.clear_cache().await;
        assert_eq!(loader.cached_count().await, 0);
    }

    #[tokio::test]
    async fn test_absent_cases() {
        let (loader, _) = loader(&[
            ("NoRows_DT", r#"[{"Name": "NoRows_DT"}]"#),
            ("Empty_DT", "[]"),
            ("Mismatch_DT", r#"[{"Rows": {"One": {"Value": "not a number"}}}]"#),
        ]);

        assert!(loader.load_table::<Row>("Missing_DT").await.unwrap().is_none());
        assert!(loader.load_table::<Row>("NoRows_DT").await.unwrap().is_none());
        assert!(loader.load_table::<Row>("Empty_DT").await.unwrap().is_none());
        assert!(loader.load_table::<Row>("Mismatch_DT").await.unwrap().is_none());
        assert_eq!(loader.cached_count().await, 0);
    }

    #[tokio::test]
    async fn test_malformed_table_is_error() {
        let (loader, _) = loader(&[("Broken_DT", "[{\"Rows\": ")]);
        let result = loader.load_table::<Row>("Broken_DT").await;
        assert!(matches!(result, Err(DataError::Malformed { .. })));
    }
}
