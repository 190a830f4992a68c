//! Grid Streaming
//!
//! Large maps are split into a 10x10 grid of gameplay cells (`A0` to `J9`),
//! each exported as its own level next to the persistent level:
//!
//! ```text
//! Maps/MP/MAP01/MP_Map01_P          persistent level
//! Maps/MP/MAP01/GP/MP_Map01_E4_GP   cell E4
//! ```
//!
//! Each cell is loaded at most once. The outcome, including "not there", is
//! cached until the cell is unloaded.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, instrument, warn};

use crate::asset::level::LevelObject;
use crate::asset::parser::AssetParser;
use crate::core::vec3::Vec3;

// ============================================================================
// Cell ids
// ============================================================================

/// Grid cell identifier: row letter `A`-`J`, column digit `0`-`9`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridCellId {
    row: u8,
    column: u8,
}

/// Invalid cell identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid grid cell id: {0:?}")]
pub struct GridCellParseError(pub String);

impl GridCellId {
    /// Number of rows.
    pub const ROWS: u8 = 10;

    /// Number of columns.
    pub const COLUMNS: u8 = 10;

    /// Cells around the map centre, loaded before the first player joins.
    pub const CORE: [GridCellId; 4] = [
        GridCellId { row: 4, column: 4 },
        GridCellId { row: 4, column: 5 },
        GridCellId { row: 5, column: 4 },
        GridCellId { row: 5, column: 5 },
    ];

    /// Create from a row letter and column digit.
    pub fn new(row: char, column: u8) -> Option<Self> {
        let row = row.to_ascii_uppercase();
        if !('A'..='J').contains(&row) || column >= Self::COLUMNS {
            return None;
        }
        Some(Self {
            row: row as u8 - b'A',
            column,
        })
    }

    /// Row letter.
    pub fn row_letter(&self) -> char {
        (b'A' + self.row) as char
    }

    /// Column digit.
    pub fn column(&self) -> u8 {
        self.column
    }

    /// Adjacent cells, including diagonals, inside the grid.
    pub fn neighbours(&self) -> Vec<GridCellId> {
        let mut cells = Vec::with_capacity(8);
        for dr in -1i8..=1 {
            for dc in -1i8..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let row = self.row as i8 + dr;
                let column = self.column as i8 + dc;
                if (0..Self::ROWS as i8).contains(&row) && (0..Self::COLUMNS as i8).contains(&column) {
                    cells.push(GridCellId {
                        row: row as u8,
                        column: column as u8,
                    });
                }
            }
        }
        cells
    }

    /// Every cell, row-major.
    pub fn all() -> impl Iterator<Item = GridCellId> {
        (0..Self::ROWS).flat_map(|row| (0..Self::COLUMNS).map(move |column| GridCellId { row, column }))
    }
}

impl FromStr for GridCellId {
    type Err = GridCellParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let parsed = match (chars.next(), chars.next(), chars.next()) {
            (Some(row), Some(column), None) => column
                .to_digit(10)
                .and_then(|column| GridCellId::new(row, column as u8)),
            _ => None,
        };
        parsed.ok_or_else(|| GridCellParseError(s.to_string()))
    }
}

impl fmt::Display for GridCellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.column)
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Derives cell asset paths from the persistent level path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridLayout {
    level_dir: String,
    cell_prefix: String,
}

impl GridLayout {
    /// Layout for cells next to `level_path` (`Maps/MP/MAP01/MP_Map01_P`).
    pub fn from_level_path(level_path: &str) -> Self {
        let level_path = level_path.trim_end_matches('/');
        let (level_dir, level_base) = match level_path.rfind('/') {
            Some(slash) => (&level_path[..slash], &level_path[slash + 1..]),
            None => ("", level_path),
        };
        Self {
            level_dir: level_dir.to_string(),
            cell_prefix: level_base.strip_suffix("_P").unwrap_or(level_base).to_string(),
        }
    }

    /// Asset path of a cell.
    pub fn cell_path(&self, cell: GridCellId) -> String {
        if self.level_dir.is_empty() {
            format!("GP/{}_{}_GP", self.cell_prefix, cell)
        } else {
            format!("{}/GP/{}_{}_GP", self.level_dir, self.cell_prefix, cell)
        }
    }
}

// ============================================================================
// Streaming manager
// ============================================================================

type CellSlot = Arc<OnceCell<Option<Arc<LevelObject>>>>;

/// Loads and caches grid cells of one map.
pub struct GridStreamingManager {
    parser: Arc<AssetParser>,
    layout: GridLayout,
    /// Cells that are never evicted
    core_cells: Vec<GridCellId>,
    cells: Mutex<BTreeMap<GridCellId, CellSlot>>,
}

impl GridStreamingManager {
    /// Create a manager for the map whose persistent level is `level_path`.
    pub fn new(parser: Arc<AssetParser>, level_path: &str, core_cells: Vec<GridCellId>) -> Self {
        let layout = GridLayout::from_level_path(level_path);
        info!("Grid streaming initialized for {}", level_path);
        Self {
            parser,
            layout,
            core_cells,
            cells: Mutex::new(BTreeMap::new()),
        }
    }

    /// Path layout in use.
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Core cells.
    pub fn core_cells(&self) -> &[GridCellId] {
        &self.core_cells
    }

    /// Load a cell, or return the cached outcome of an earlier load.
    pub async fn load_cell(&self, cell: GridCellId) -> Option<Arc<LevelObject>> {
        let slot = {
            let mut cells = self.cells.lock().await;
            cells.entry(cell).or_default().clone()
        };

        slot.get_or_init(|| self.read_cell(cell)).await.clone()
    }

    /// Load a cell by its textual id (`"E4"`).
    pub async fn load_cell_named(&self, cell_id: &str) -> Option<Arc<LevelObject>> {
        match cell_id.parse::<GridCellId>() {
            Ok(cell) => self.load_cell(cell).await,
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    async fn read_cell(&self, cell: GridCellId) -> Option<Arc<LevelObject>> {
        let path = self.layout.cell_path(cell);
        info!("Loading grid cell {} from {}", cell, path);

        match self.parser.load_level(&path).await {
            Ok(Some(level)) => {
                info!("Loaded grid cell {} with {} actors", cell, level.actors().len());
                Some(level)
            }
            Ok(None) => {
                warn!("Grid cell {} not available", cell);
                None
            }
            Err(e) => {
                warn!("Failed to load grid cell {}: {}", cell, e);
                None
            }
        }
    }

    /// Load several cells concurrently. Returns how many are available.
    #[instrument(skip(self))]
    pub async fn preload(&self, cells: &[GridCellId]) -> usize {
        let loaded = join_all(cells.iter().map(|cell| self.load_cell(*cell))).await;
        let available = loaded.iter().filter(|level| level.is_some()).count();
        info!("Preloaded {}/{} grid cells", available, cells.len());
        available
    }

    /// Load the core cells.
    pub async fn preload_core(&self) -> usize {
        let core = self.core_cells.clone();
        self.preload(&core).await
    }

    /// Forget a cell so the next load reads it again.
    pub async fn unload_cell(&self, cell: GridCellId) -> bool {
        let removed = self.cells.lock().await.remove(&cell).is_some();
        if removed {
            self.parser.evict(&self.layout.cell_path(cell)).await;
            info!("Unloaded grid cell {}", cell);
        }
        removed
    }

    /// Cells currently loaded and available, in grid order.
    pub async fn loaded_cells(&self) -> Vec<GridCellId> {
        self.loaded_levels().await.into_iter().map(|(cell, _)| cell).collect()
    }

    /// Number of loaded, available cells.
    pub async fn loaded_count(&self) -> usize {
        self.loaded_levels().await.len()
    }

    /// Loaded cells with their levels, in grid order.
    pub async fn loaded_levels(&self) -> Vec<(GridCellId, Arc<LevelObject>)> {
        let cells = self.cells.lock().await;
        cells
            .iter()
            .filter_map(|(cell, slot)| slot.get().cloned().flatten().map(|level| (*cell, level)))
            .collect()
    }

    /// Unload non-core cells whose centre is farther than `radius` from every
    /// player. Cells without actors have no centre and are kept.
    pub async fn evict_distant(&self, players: &[Vec3], radius: f32) -> Vec<GridCellId> {
        let mut cells = self.cells.lock().await;

        let distant: Vec<GridCellId> = cells
            .iter()
            .filter(|(cell, _)| !self.core_cells.contains(cell))
            .filter_map(|(cell, slot)| {
                let center = slot.get()?.as_ref()?.bounds()?.center();
                players
                    .iter()
                    .all(|player| player.distance(center) > radius)
                    .then_some(*cell)
            })
            .collect();

        for cell in &distant {
            cells.remove(cell);
        }
        drop(cells);

        for cell in &distant {
            self.parser.evict(&self.layout.cell_path(*cell)).await;
            info!("Evicted grid cell {}", cell);
        }
        distant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::source::MemorySource;

    const LEVEL_PATH: &str = "Maps/MP/MAP01/MP_Map01_P";

    fn cell(id: &str) -> GridCellId {
        id.parse().unwrap()
    }

    fn cell_doc(x: f32) -> String {
        format!(
            r#"{{"Type": "Level", "Name": "Cell", "Actors": [
                {{"Name": "PS", "Class": "UScriptClass'PlayerStart'", "Transform": {{"Translation": {{"X": {x}}}}}}}
            ]}}"#
        )
    }

    fn manager(cells: &[(&str, f32)]) -> (GridStreamingManager, Arc<MemorySource>) {
        let source = Arc::new(MemorySource::default());
        let layout = GridLayout::from_level_path(LEVEL_PATH);
        for (id, x) in cells {
            source.insert(&layout.cell_path(cell(id)), &cell_doc(*x));
        }
        let parser = Arc::new(AssetParser::new(source.clone()));
        (
            GridStreamingManager::new(parser, LEVEL_PATH, GridCellId::CORE.to_vec()),
            source,
        )
    }

    #[test]
    fn test_cell_id_parsing() {
        assert_eq!(cell("E4").to_string(), "E4");
        assert_eq!(cell("j9").to_string(), "J9");
        assert_eq!(GridCellId::new('A', 0).unwrap().to_string(), "A0");
        assert!("K1".parse::<GridCellId>().is_err());
        assert!("E10".parse::<GridCellId>().is_err());
        assert!("".parse::<GridCellId>().is_err());
        assert_eq!(GridCellId::all().count(), 100);
        assert_eq!(
            GridCellId::CORE.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            vec!["E4", "E5", "F4", "F5"]
        );
    }

    #[test]
    fn test_neighbours() {
        assert_eq!(cell("E4").neighbours().len(), 8);
        assert_eq!(cell("A0").neighbours().len(), 3);
        assert_eq!(cell("J5").neighbours().len(), 5);
        assert!(cell("E4").neighbours().contains(&cell("F5")));
    }

    #[test]
    fn test_cell_path_layout() {
        let layout = GridLayout::from_level_path(LEVEL_PATH);
        assert_eq!(layout.cell_path(cell("E4")), "Maps/MP/MAP01/GP/MP_Map01_E4_GP");
        assert_eq!(
            GridLayout::from_level_path("Station").cell_path(cell("A1")),
            "GP/Station_A1_GP"
        );
    }

    #[tokio::test]
    async fn test_cell_cache_dedup() {
        let (manager, source) = manager(&[("E4", 0.0)]);

        let first = manager.load_cell_named("E4").await.unwrap();
        let second = manager.load_cell_named("E4").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn test_missing_cell_is_remembered() {
        let (manager, source) = manager(&[]);

        assert!(manager.load_cell(cell("B2")).await.is_none());
        assert!(manager.load_cell(cell("B2")).await.is_none());
        assert_eq!(source.reads(), 1);
        assert_eq!(manager.loaded_count().await, 0);
        assert!(manager.load_cell_named("Z9").await.is_none());
    }

    #[tokio::test]
    async fn test_preload_and_unload() {
        let (manager, source) = manager(&[("E4", 0.0), ("E5", 100.0), ("F4", 200.0)]);

        assert_eq!(manager.preload_core().await, 3);
        assert_eq!(manager.loaded_cells().await, vec![cell("E4"), cell("E5"), cell("F4")]);
        assert_eq!(source.reads(), 4);

        assert!(manager.unload_cell(cell("E5")).await);
        assert!(!manager.unload_cell(cell("E5")).await);
        assert_eq!(manager.loaded_count().await, 2);

        manager.load_cell(cell("E5")).await.unwrap();
        assert_eq!(source.reads(), 5);
    }

    #[tokio::test]
    async fn test_evict_distant_keeps_core() {
        let (manager, _) = manager(&[("E4", 0.0), ("A0", 50_000.0), ("B1", 1_000.0)]);
        manager.load_cell(cell("E4")).await;
        manager.load_cell(cell("A0")).await;
        manager.load_cell(cell("B1")).await;

        let evicted = manager.evict_distant(&[Vec3::ZERO], 5_000.0).await;
        assert_eq!(evicted, vec![cell("A0")]);
        assert_eq!(manager.loaded_cells().await, vec![cell("B1"), cell("E4")]);

        // with nobody around every non-core cell goes
        let evicted = manager.evict_distant(&[], 5_000.0).await;
        assert_eq!(evicted, vec![cell("B1")]);
        assert_eq!(manager.loaded_cells().await, vec![cell("E4")]);
    }
}
