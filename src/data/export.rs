use crate::models::{MatchRecord, RoundRecord, RunSummary};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Errors raised while writing output files
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode run summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write the per-agent output table to `{spec_name}_data_output.csv`.
///
/// Column layout follows the record fields, every name prefixed with the
/// run's spec name. Unmatched assignments become empty cells. With `graphs`
/// set, the standardized columns chart rendering consumes are appended:
/// z-scores of the observed and assigned utilities plus the
/// observed-minus-assigned differences and their z-scores.
pub fn write_data_output(
    dir: &Path,
    spec_name: &str,
    records: &[MatchRecord],
    graphs: bool,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(format!("{}_data_output.csv", spec_name));
    let file = File::create(&path).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    let mut out = BufWriter::new(file);

    let has_bias = records.iter().any(|r| r.bias.is_some());
    let allocation_chars = allocation_widths(records);

    let mut header = vec![
        "initial_index".to_string(),
        format!("{}_dap_jobid", spec_name),
        format!("{}_A_obs_u", spec_name),
        format!("{}_B_obs_u", spec_name),
        format!("{}_A_dap_u", spec_name),
        format!("{}_B_dap_u", spec_name),
    ];
    if has_bias {
        header.push(format!("{}_bidap_jobid", spec_name));
        header.push(format!("{}_A_apparent_v", spec_name));
        header.push(format!("{}_A_bias_corrected_v", spec_name));
    }
    if let Some((a_width, b_width)) = allocation_chars {
        for k in 1..=a_width {
            header.push(format!("{}_A_match_char_{}", spec_name, k));
        }
        for k in 1..=b_width {
            header.push(format!("{}_B_match_char_{}", spec_name, k));
        }
    }
    if graphs {
        for name in [
            "A_obs_u_z",
            "B_obs_u_z",
            "A_dap_u_z",
            "B_dap_u_z",
            "diff_A",
            "diff_B",
            "diff_A_z",
            "diff_B_z",
        ] {
            header.push(format!("{}_{}", spec_name, name));
        }
    }
    write_row(&mut out, &path, &header)?;

    let graph_columns = graphs.then(|| GraphColumns::from_records(records));

    for (row, record) in records.iter().enumerate() {
        let mut cells = vec![
            record.initial_index.to_string(),
            opt_cell(record.dap_jobid),
            record.a_obs_u.to_string(),
            record.b_obs_u.to_string(),
            record.a_dap_u.to_string(),
            record.b_dap_u.to_string(),
        ];
        if has_bias {
            match &record.bias {
                Some(bias) => {
                    cells.push(opt_cell(bias.bidap_jobid));
                    cells.push(opt_cell(bias.a_apparent_v));
                    cells.push(opt_cell(bias.a_bias_corrected_v));
                }
                None => cells.extend([String::new(), String::new(), String::new()]),
            }
        }
        if let Some((a_width, b_width)) = allocation_chars {
            let allocation = record.allocation.as_ref();
            push_chars(
                &mut cells,
                allocation.and_then(|a| a.a_match_chars.as_deref()),
                a_width,
            );
            push_chars(
                &mut cells,
                allocation.and_then(|a| a.b_match_chars.as_deref()),
                b_width,
            );
        }
        if let Some(columns) = &graph_columns {
            columns.push_cells(&mut cells, row);
        }
        write_row(&mut out, &path, &cells)?;
    }

    out.flush().map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    info!("wrote {}", path.display());
    Ok(path)
}

/// Write the round log to `{spec_name}_log.csv`, one row per round
pub fn write_round_log(
    dir: &Path,
    spec_name: &str,
    rounds: &[RoundRecord],
) -> Result<PathBuf, ExportError> {
    let path = dir.join(format!("{}_log.csv", spec_name));
    let file = File::create(&path).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    let mut out = BufWriter::new(file);

    let header = [
        "iterat",
        "A_match_count",
        "A_unmatch_count",
        "B_match_count",
        "B_unmatch_count",
        "A_match_utility_mean",
        "B_match_utility_mean",
        "breakups_count",
        "q_reset_count",
        "rejections_count",
        "pass_matched_count",
    ]
    .map(String::from);
    write_row(&mut out, &path, &header)?;

    for record in rounds {
        let cells = [
            record.iterat.to_string(),
            record.a_match_count.to_string(),
            record.a_unmatch_count.to_string(),
            record.b_match_count.to_string(),
            record.b_unmatch_count.to_string(),
            record.a_match_utility_mean.to_string(),
            record.b_match_utility_mean.to_string(),
            record.breakups_count.to_string(),
            record.q_reset_count.to_string(),
            record.rejections_count.to_string(),
            record.pass_matched_count.to_string(),
        ];
        write_row(&mut out, &path, &cells)?;
    }

    out.flush().map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    info!("wrote {}", path.display());
    Ok(path)
}

/// Write the end-of-run summary to `{spec_name}_summary.json`
pub fn write_summary(dir: &Path, summary: &RunSummary) -> Result<PathBuf, ExportError> {
    let path = dir.join(format!("{}_summary.json", summary.spec_name));
    let encoded = serde_json::to_string_pretty(summary)?;
    std::fs::write(&path, encoded).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    info!("wrote {}", path.display());
    Ok(path)
}

/// Standardize a column to zero mean and unit sample variance.
/// A constant column standardizes to zeros rather than dividing by zero.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return vec![0.0; values.len()];
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values
        .iter()
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64;
    let std = variance.sqrt();
    if std == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / std).collect()
}

struct GraphColumns {
    a_obs_z: Vec<f64>,
    b_obs_z: Vec<f64>,
    a_dap_z: Vec<f64>,
    b_dap_z: Vec<f64>,
    diff_a: Vec<f64>,
    diff_b: Vec<f64>,
    diff_a_z: Vec<f64>,
    diff_b_z: Vec<f64>,
}

impl GraphColumns {
    fn from_records(records: &[MatchRecord]) -> Self {
        let a_obs: Vec<f64> = records.iter().map(|r| r.a_obs_u).collect();
        let b_obs: Vec<f64> = records.iter().map(|r| r.b_obs_u).collect();
        let a_dap: Vec<f64> = records.iter().map(|r| r.a_dap_u).collect();
        let b_dap: Vec<f64> = records.iter().map(|r| r.b_dap_u).collect();
        let diff_a: Vec<f64> = a_obs.iter().zip(&a_dap).map(|(o, d)| o - d).collect();
        let diff_b: Vec<f64> = b_obs.iter().zip(&b_dap).map(|(o, d)| o - d).collect();

        Self {
            a_obs_z: z_scores(&a_obs),
            b_obs_z: z_scores(&b_obs),
            a_dap_z: z_scores(&a_dap),
            b_dap_z: z_scores(&b_dap),
            diff_a_z: z_scores(&diff_a),
            diff_b_z: z_scores(&diff_b),
            diff_a,
            diff_b,
        }
    }

    fn push_cells(&self, cells: &mut Vec<String>, row: usize) {
        cells.push(self.a_obs_z[row].to_string());
        cells.push(self.b_obs_z[row].to_string());
        cells.push(self.a_dap_z[row].to_string());
        cells.push(self.b_dap_z[row].to_string());
        cells.push(self.diff_a[row].to_string());
        cells.push(self.diff_b[row].to_string());
        cells.push(self.diff_a_z[row].to_string());
        cells.push(self.diff_b_z[row].to_string());
    }
}

fn allocation_widths(records: &[MatchRecord]) -> Option<(usize, usize)> {
    records.iter().find_map(|r| r.allocation.as_ref())?;
    let first_width = |chars: fn(&crate::models::AllocationFields) -> Option<&Vec<f64>>| {
        records
            .iter()
            .filter_map(|r| chars(r.allocation.as_ref()?))
            .map(Vec::len)
            .next()
            .unwrap_or(0)
    };
    Some((
        first_width(|a| a.a_match_chars.as_ref()),
        first_width(|a| a.b_match_chars.as_ref()),
    ))
}

fn push_chars(cells: &mut Vec<String>, chars: Option<&[f64]>, width: usize) {
    match chars {
        Some(values) => {
            for value in values {
                cells.push(value.to_string());
            }
            for _ in values.len()..width {
                cells.push(String::new());
            }
        }
        None => {
            for _ in 0..width {
                cells.push(String::new());
            }
        }
    }
}

fn opt_cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_row(out: &mut BufWriter<File>, path: &Path, cells: &[String]) -> Result<(), ExportError> {
    writeln!(out, "{}", cells.join(",")).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
