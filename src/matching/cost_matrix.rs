use crate::matching::similarity::similarity;

/// Cost of a padding cell: as dissimilar as a real pair can be.
pub const NEUTRAL_COST: f64 = 1.0;

/// Similarity of every file sample against every candidate episode, before
/// any padding. Rows follow the caller's file order, columns the episode order.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityTable {
    pub scores: Vec<Vec<f64>>,
    /// Whether the episode in that column had a reference sample at all.
    pub has_reference: Vec<bool>,
}

impl SimilarityTable {
    pub fn compute(file_samples: &[&str], episode_samples: &[Option<&str>]) -> Self {
        let scores = file_samples
            .iter()
            .map(|file_sample| {
                episode_samples
                    .iter()
                    .map(|episode_sample| similarity(file_sample, episode_sample.unwrap_or("")))
                    .collect()
            })
            .collect();
        Self {
            scores,
            has_reference: episode_samples.iter().map(Option::is_some).collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.scores.len()
    }

    pub fn column_count(&self) -> usize {
        self.has_reference.len()
    }

    pub fn score(&self, row: usize, column: usize) -> f64 {
        self.scores[row][column]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    cells: Vec<Vec<f64>>,
    real_rows: usize,
    real_columns: usize,
}

impl CostMatrix {
    #[cfg(test)]
    pub fn build(file_samples: &[&str], episode_samples: &[Option<&str>]) -> Self {
        Self::from_table(&SimilarityTable::compute(file_samples, episode_samples))
    }

    /// Square matrix of `1 - similarity`, padded with [`NEUTRAL_COST`] up to
    /// `max(rows, columns)`.
    pub fn from_table(table: &SimilarityTable) -> Self {
        let real_rows = table.row_count();
        let real_columns = table.column_count();
        let size = real_rows.max(real_columns);

        let mut cells: Vec<Vec<f64>> = table
            .scores
            .iter()
            .map(|row| {
                let mut costs: Vec<f64> = row.iter().map(|score| 1.0 - score).collect();
                costs.resize(size, NEUTRAL_COST);
                costs
            })
            .collect();
        cells.resize_with(size, || vec![NEUTRAL_COST; size]);

        Self {
            cells,
            real_rows,
            real_columns,
        }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.cells
    }

    pub fn real_rows(&self) -> usize {
        self.real_rows
    }

    pub fn real_columns(&self) -> usize {
        self.real_columns
    }
}
