//! Binning and aggregation of records into the genre × time grid.
//!
//! Rows are the sorted distinct genres, columns are fixed-width year bins.
//! Each cell accumulates the impact of the records that fall into it and
//! remembers the single strongest record for labelling.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::error::PipelineError;
use crate::record::NormalizedRecord;

/// Bidirectional genre <-> row mapping, built once per dataset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenreIndex {
    names: Vec<String>,
    rows: HashMap<String, usize>,
}

impl GenreIndex {
    /// Sorted distinct genres of `records`.
    pub fn from_records(records: &[NormalizedRecord]) -> Self {
        let sorted: BTreeSet<&str> = records.iter().map(|r| r.genre.as_str()).collect();
        Self::from_sorted(sorted.into_iter().map(str::to_string).collect())
    }

    fn from_sorted(names: Vec<String>) -> Self {
        let rows = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, rows }
    }

    pub fn row_of(&self, genre: &str) -> Result<usize, PipelineError> {
        self.rows
            .get(genre)
            .copied()
            .ok_or_else(|| PipelineError::GenreNotIndexed(genre.to_string()))
    }

    pub fn genre_at(&self, row: usize) -> Option<&str> {
        self.names.get(row).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Upper bound on grid columns; wider year spans are rejected.
pub const MAX_TIME_BINS: usize = 1000;

/// Fixed-width year bins covering the dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TimeBins {
    /// First year of the first bin.
    pub start: i64,
    /// Years per bin.
    pub width: i64,
    /// Number of bins (grid columns), at least 1.
    pub count: usize,
}

impl TimeBins {
    /// Bins aligned to multiples of `width` that cover `[year_min, year_max]`.
    ///
    /// The upper boundary is the first multiple of `width` strictly above
    /// `year_max`, so a maximum year that sits exactly on a boundary still
    /// opens its own bin. Spans needing more than [`MAX_TIME_BINS`] columns
    /// fail with [`PipelineError::TimeSpanTooLarge`].
    pub fn covering(year_min: i32, year_max: i32, width: u32) -> Result<Self, PipelineError> {
        let width = i64::from(width.max(1));
        let start = i64::from(year_min).div_euclid(width) * width;
        let end = (i64::from(year_max).div_euclid(width) + 1) * width;
        let bins = ((end - start) / width).max(1);

        if bins > MAX_TIME_BINS as i64 {
            return Err(PipelineError::TimeSpanTooLarge {
                year_min,
                year_max,
                limit: MAX_TIME_BINS,
            });
        }
        Ok(Self {
            start,
            width,
            count: bins as usize,
        })
    }

    /// Column for a year, clamped into range.
    pub fn column_of(&self, year: i32) -> usize {
        let raw = (i64::from(year) - self.start).div_euclid(self.width);
        raw.clamp(0, self.count as i64 - 1) as usize
    }

    pub fn bin_start(&self, col: usize) -> i64 {
        self.start + col as i64 * self.width
    }

    /// Last year covered by a bin (inclusive).
    pub fn bin_end(&self, col: usize) -> i64 {
        self.bin_start(col) + self.width - 1
    }

    /// Bin boundaries, `count + 1` values from the first start to the last end.
    pub fn boundaries(&self) -> Vec<i64> {
        (0..=self.count).map(|c| self.bin_start(c)).collect()
    }

    /// Axis label such as `2010–2014`.
    pub fn label(&self, col: usize) -> String {
        format!("{}–{}", self.bin_start(col), self.bin_end(col))
    }

    pub fn labels(&self) -> Vec<String> {
        (0..self.count).map(|c| self.label(c)).collect()
    }
}

/// Accumulator for one genre × time-bin intersection.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Cell {
    pub sum: f64,
    pub count: usize,
    pub best: Option<NormalizedRecord>,
}

impl Cell {
    fn add(&mut self, record: &NormalizedRecord) {
        self.sum += record.impact;
        self.count += 1;
        let replace = match &self.best {
            Some(best) => record.impact > best.impact,
            None => true,
        };
        if replace {
            self.best = Some(record.clone());
        }
    }

    pub fn is_populated(&self) -> bool {
        self.count > 0
    }
}

/// Row-major `rows × cols` matrix of cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::default(); rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get_mut(row * self.cols + col)
        } else {
            None
        }
    }

    /// `(row, col, cell)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Cell)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i / cols, i % cols, cell))
    }

    /// Smallest and largest cell sum, empty cells included.
    pub fn sum_range(&self) -> Option<(f64, f64)> {
        self.cells.iter().map(|c| c.sum).fold(None, |acc, s| match acc {
            None => Some((s, s)),
            Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
        })
    }

    pub fn total_sum(&self) -> f64 {
        self.cells.iter().map(|c| c.sum).sum()
    }

    pub fn populated_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_populated()).count()
    }
}

/// Result of the aggregation pass. Read-only from here on.
#[derive(Clone, Debug)]
pub struct Aggregation {
    pub grid: Grid,
    pub genres: GenreIndex,
    pub bins: TimeBins,
}

/// Bucket `records` into the genre × time grid.
///
/// Records are visited in slice order, which decides ties for the best record.
pub fn aggregate(
    records: &[NormalizedRecord],
    bucket_years: u32,
) -> Result<Aggregation, PipelineError> {
    let (year_min, year_max) = records
        .iter()
        .map(|r| r.year)
        .fold(None, |acc, y| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })
        .ok_or(PipelineError::EmptyDataset { total: 0 })?;

    let bins = TimeBins::covering(year_min, year_max, bucket_years)?;
    let genres = GenreIndex::from_records(records);
    let mut grid = Grid::new(genres.len(), bins.count);

    for record in records {
        let row = genres.row_of(&record.genre)?;
        let col = bins.column_of(record.year);
        if let Some(cell) = grid.get_mut(row, col) {
            cell.add(record);
        }
    }

    log::debug!(
        "Aggregated {} records into {}x{} grid ({} populated cells, years {}..={})",
        records.len(),
        grid.rows(),
        grid.cols(),
        grid.populated_cells(),
        year_min,
        year_max
    );

    Ok(Aggregation { grid, genres, bins })
}
