//! Categorical heatmap aggregation.
//!
//! The dashboard renders a region × line grid where each cell shows the mean
//! occupancy of the points sharing that pair. The aggregator produces the
//! full grid skeleton (sorted axes) so the renderer can draw every cell, and
//! marks cells with contributing points as the only interactive ones.

use crate::data::point::GeoPoint;
use fxhash::FxHashMap;

/// One populated cell of the heatmap grid
#[derive(Debug, Clone, PartialEq)]
pub struct HeatCell {
    pub region: String,
    pub line: String,
    /// Mean of the numeric attribute over contributing points
    pub average: f64,
    /// Number of contributing points
    pub count: usize,
}

/// The aggregated grid: sorted axis labels plus the populated cells.
/// `(region, line)` pairs absent from `cells` render as disabled skeleton
/// cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HeatGrid {
    pub regions: Vec<String>,
    pub lines: Vec<String>,
    cells: FxHashMap<(String, String), HeatCell>,
}

impl HeatGrid {
    pub fn cell(&self, region: &str, line: &str) -> Option<&HeatCell> {
        self.cells.get(&(region.to_string(), line.to_string()))
    }

    /// Whether the cell has contributing points and is therefore interactive
    pub fn is_active(&self, region: &str, line: &str) -> bool {
        self.cell(region, line).is_some()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Populated cells in row-major (region, then line) order
    pub fn active_cells(&self) -> Vec<&HeatCell> {
        let mut out = Vec::with_capacity(self.cells.len());
        for region in &self.regions {
            for line in &self.lines {
                if let Some(cell) = self.cell(region, line) {
                    out.push(cell);
                }
            }
        }
        out
    }
}

/// Aggregates a numeric attribute of the point set by two categorical
/// dimensions. Deterministic given the same input set.
#[derive(Debug, Clone)]
pub struct HeatmapAggregator {
    row_attr: String,
    col_attr: String,
    value_attr: String,
}

impl HeatmapAggregator {
    pub fn new(
        row_attr: impl Into<String>,
        col_attr: impl Into<String>,
        value_attr: impl Into<String>,
    ) -> Self {
        Self {
            row_attr: row_attr.into(),
            col_attr: col_attr.into(),
            value_attr: value_attr.into(),
        }
    }

    /// The dashboard's default: occupancy percent by region × line
    pub fn occupancy_by_region_line() -> Self {
        Self::new("region", "line", "occupancy_percent")
    }

    pub fn aggregate(&self, points: &[GeoPoint]) -> HeatGrid {
        let mut sums: FxHashMap<(String, String), (f64, usize)> = FxHashMap::default();
        let mut regions: Vec<String> = Vec::new();
        let mut lines: Vec<String> = Vec::new();

        for point in points {
            let (region, line) = match (point.tag(&self.row_attr), point.tag(&self.col_attr)) {
                (Some(r), Some(l)) => (r.to_string(), l.to_string()),
                _ => continue,
            };

            if !regions.contains(&region) {
                regions.push(region.clone());
            }
            if !lines.contains(&line) {
                lines.push(line.clone());
            }

            // A point without the numeric attribute still spans the axes but
            // contributes to no cell
            let value = match point.metric(&self.value_attr) {
                Some(v) => v,
                None => continue,
            };

            let slot = sums.entry((region, line)).or_insert((0.0, 0));
            slot.0 += value;
            slot.1 += 1;
        }

        regions.sort();
        lines.sort();

        let cells = sums
            .into_iter()
            .map(|((region, line), (sum, count))| {
                let cell = HeatCell {
                    region: region.clone(),
                    line: line.clone(),
                    average: sum / count as f64,
                    count,
                };
                ((region, line), cell)
            })
            .collect();

        HeatGrid {
            regions,
            lines,
            cells,
        }
    }
}
