use crate::models::{Agent, ColumnSchema, Market, MarketError};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while pulling a market out of an input table
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("input table is missing column '{0}'")]
    MissingColumn(String),

    #[error("column '{column}' has {found} rows, expected {expected}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Market(#[from] MarketError),
}

/// A table of named numeric columns, row order defining the initial index.
///
/// This is the single shape every input source (synthetic generation, file
/// loading done by callers) funnels into before ingestion.
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    columns: HashMap<String, Vec<f64>>,
    rows: usize,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column; the first insertion fixes the row count
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        if self.columns.is_empty() {
            self.rows = values.len();
        }
        self.columns.insert(name.into(), values);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }
}

/// Build both populations from the table under a resolved schema.
///
/// Every referenced column must exist with one value per row. The returned
/// market is fully validated, so a success here means the matching engine
/// will accept it.
pub fn ingest(table: &DataTable, schema: &ColumnSchema) -> Result<Market, DatasetError> {
    let rows = table.rows();

    let a_chars = collect_columns(table, &schema.a_chars, rows)?;
    let a_mrs = collect_columns(table, &schema.a_mrs, rows)?;
    let b_chars = collect_columns(table, &schema.b_chars, rows)?;
    let b_mrs = collect_columns(table, &schema.b_mrs, rows)?;

    let a_bias = schema
        .a_bias_attribute
        .as_deref()
        .map(|name| require_column(table, name, rows))
        .transpose()?;
    let b_bias = schema
        .b_bias_weight
        .as_deref()
        .map(|name| require_column(table, name, rows))
        .transpose()?;

    let mut applicants = Vec::with_capacity(rows);
    let mut reviewers = Vec::with_capacity(rows);

    for row in 0..rows {
        let mut applicant = Agent::new(
            row,
            a_chars.iter().map(|col| col[row]).collect(),
            a_mrs.iter().map(|col| col[row]).collect(),
        );
        if let Some(bias) = &a_bias {
            applicant.bias_attribute = Some(bias[row]);
        }
        applicants.push(applicant);

        let mut reviewer = Agent::new(
            row,
            b_chars.iter().map(|col| col[row]).collect(),
            b_mrs.iter().map(|col| col[row]).collect(),
        );
        if let Some(bias) = &b_bias {
            reviewer.bias_weight = Some(bias[row]);
        }
        reviewers.push(reviewer);
    }

    let market = Market::new(applicants, reviewers);
    market.validate(schema.a_bias_attribute.is_some())?;
    Ok(market)
}

fn collect_columns<'t>(
    table: &'t DataTable,
    names: &[String],
    rows: usize,
) -> Result<Vec<&'t [f64]>, DatasetError> {
    names
        .iter()
        .map(|name| require_column(table, name, rows))
        .collect()
}

fn require_column<'t>(
    table: &'t DataTable,
    name: &str,
    rows: usize,
) -> Result<&'t [f64], DatasetError> {
    let column = table
        .column(name)
        .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;
    if column.len() != rows {
        return Err(DatasetError::RowCountMismatch {
            column: name.to_string(),
            expected: rows,
            found: column.len(),
        });
    }
    Ok(column)
}
