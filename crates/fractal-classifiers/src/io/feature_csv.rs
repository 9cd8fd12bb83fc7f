//! Reader and writer for the tabular feature file.
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::path::Path;

use csv::StringRecord;
use ndarray::{Array1, Array2};

use crate::data_handling::{FeatureTable, FEATURE_COLUMNS, LABEL_COLUMN};
use crate::error::{BenchError, Result};

/// Column layout of a feature CSV.
#[derive(Debug, Clone)]
pub struct FeatureCsvConfig {
    pub label_column: String,
    /// Feature columns to load, in order. Other columns are ignored.
    pub feature_columns: Vec<String>,
    /// Columns that may hold text levels; they are label-encoded in sorted
    /// level order when any value is non-numeric.
    pub categorical_columns: Vec<String>,
    pub delimiter: u8,
}

impl Default for FeatureCsvConfig {
    fn default() -> Self {
        Self {
            label_column: LABEL_COLUMN.to_string(),
            feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            categorical_columns: vec!["gender".to_string()],
            delimiter: b',',
        }
    }
}

/// Read a feature CSV with the default schema.
pub fn read_feature_csv<P: AsRef<Path>>(path: P) -> Result<FeatureTable> {
    read_feature_csv_with_config(path, &FeatureCsvConfig::default())
}

/// Read a feature CSV using a custom column layout.
pub fn read_feature_csv_with_config<P: AsRef<Path>>(
    path: P,
    config: &FeatureCsvConfig,
) -> Result<FeatureTable> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(BenchError::MissingInput {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| BenchError::schema(format!("failed to open {}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| BenchError::schema(format!("failed to read header row: {}", e)))?
        .clone();

    let label_idx = find_column(&headers, &config.label_column)
        .ok_or_else(|| BenchError::schema(format!("missing label column '{}'", config.label_column)))?;
    let feature_idx = config
        .feature_columns
        .iter()
        .map(|name| {
            find_column(&headers, name)
                .ok_or_else(|| BenchError::schema(format!("missing feature column '{}'", name)))
        })
        .collect::<Result<Vec<usize>>>()?;

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); feature_idx.len()];
    let mut labels = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let row = row_idx + 1;
        let record =
            result.map_err(|e| BenchError::schema(format!("failed to read row {}: {}", row, e)))?;

        let raw_label = non_empty(&record, label_idx, &config.label_column, row)?;
        labels.push(parse_label(raw_label, row)?);

        for (col, &idx) in feature_idx.iter().enumerate() {
            let value = non_empty(&record, idx, &config.feature_columns[col], row)?;
            cells[col].push(value.to_string());
        }
    }

    let n_rows = labels.len();
    let mut x = Array2::<f64>::zeros((n_rows, feature_idx.len()));
    let mut levels_by_column = Vec::new();

    for (col, values) in cells.iter().enumerate() {
        let name = &config.feature_columns[col];
        let numeric: Option<Vec<f64>> = values.iter().map(|v| v.parse::<f64>().ok()).collect();
        let column = match numeric {
            Some(parsed) => parsed,
            None if config.categorical_columns.contains(name) => {
                let levels: Vec<String> = values
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                let codes: HashMap<&str, f64> = levels
                    .iter()
                    .enumerate()
                    .map(|(i, l)| (l.as_str(), i as f64))
                    .collect();
                let encoded = values.iter().map(|v| codes[v.as_str()]).collect();
                levels_by_column.push((name.clone(), levels));
                encoded
            }
            None => {
                let (row, value) = values
                    .iter()
                    .enumerate()
                    .find(|(_, v)| v.parse::<f64>().is_err())
                    .map(|(i, v)| (i + 1, v.as_str()))
                    .unwrap_or((0, ""));
                return Err(BenchError::schema(format!(
                    "non-numeric value '{}' in column '{}' at row {}",
                    value, name, row
                )));
            }
        };

        if let Some(row) = column.iter().position(|v| v.is_nan()) {
            return Err(BenchError::schema(format!(
                "null value in column '{}' at row {}",
                name,
                row + 1
            )));
        }
        x.column_mut(col).assign(&Array1::from_vec(column));
    }

    let mut table = FeatureTable::new(x, Array1::from_vec(labels), config.feature_columns.clone())?;
    for (column, levels) in levels_by_column {
        table = table.with_categorical_levels(&column, levels);
    }
    Ok(table)
}

/// Write `table` in the input schema, categorical columns as their codes.
pub fn write_feature_csv<P: AsRef<Path>>(table: &FeatureTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let io_err = |source: std::io::Error| BenchError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let mut writer = csv::Writer::from_writer(File::create(path).map_err(io_err)?);
    let mut header: Vec<&str> = table.feature_names().iter().map(|s| s.as_str()).collect();
    header.push(LABEL_COLUMN);
    writer.write_record(&header).map_err(|e| io_err(e.into()))?;

    for (row, label) in table.x().rows().into_iter().zip(table.y().iter()) {
        let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        record.push(label.to_string());
        writer.write_record(&record).map_err(|e| io_err(e.into()))?;
    }
    writer.flush().map_err(io_err)?;
    Ok(())
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn non_empty<'r>(record: &'r StringRecord, idx: usize, column: &str, row: usize) -> Result<&'r str> {
    match record.get(idx) {
        Some(v) if !v.is_empty() && !v.eq_ignore_ascii_case("nan") && !v.eq_ignore_ascii_case("na") => {
            Ok(v)
        }
        _ => Err(BenchError::schema(format!(
            "null value in column '{}' at row {}",
            column, row
        ))),
    }
}

fn parse_label(raw: &str, row: usize) -> Result<usize> {
    match raw.parse::<f64>() {
        Ok(v) if v == 0.0 => Ok(0),
        Ok(v) if v == 1.0 => Ok(1),
        _ => Err(BenchError::schema(format!(
            "label must be 0 or 1, found '{}' at row {}",
            raw, row
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_numeric_and_categorical_columns() {
        let file = write_tmp(
            "id,FD_right,FD_left,age,gender,label\n\
             a, 1.41,1.40,30,M,1\n\
             b,1.52,1.50,41,F,0\n\
             c,1.44,1.47,35,M,0\n",
        );
        let table = read_feature_csv(file.path()).unwrap();
        assert_eq!(table.nrows(), 3);
        assert_eq!(table.y().to_vec(), vec![1, 0, 0]);
        assert_eq!(table.x()[(0, 0)], 1.41);
        // F < M in sorted level order
        assert_eq!(table.x().column(3).to_vec(), vec![1.0, 0.0, 1.0]);
        assert_eq!(table.categorical_levels("gender").unwrap(), ["F", "M"]);
    }

    #[test]
    fn empty_cell_is_a_schema_error_naming_column_and_row() {
        let file = write_tmp("FD_right,FD_left,age,gender,label\n1.4,1.4,,1,0\n");
        let err = read_feature_csv(file.path()).unwrap_err();
        assert!(matches!(err, BenchError::Schema(_)));
        let msg = err.to_string();
        assert!(msg.contains("'age'") && msg.contains("row 1"), "{}", msg);
    }

    #[test]
    fn missing_file_and_missing_column() {
        let err = read_feature_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, BenchError::MissingInput { .. }));

        let file = write_tmp("FD_right,FD_left,age,label\n1.4,1.4,30,0\n");
        let err = read_feature_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("gender"));
    }

    #[test]
    fn non_binary_label_rejected() {
        let file = write_tmp("FD_right,FD_left,age,gender,label\n1.4,1.4,30,1,2\n");
        assert!(matches!(read_feature_csv(file.path()), Err(BenchError::Schema(_))));
    }

    #[test]
    fn written_table_reads_back() {
        let table = crate::data_handling::synthetic_table(10, 1).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("features.csv");
        write_feature_csv(&table, &path).unwrap();
        let back = read_feature_csv(&path).unwrap();
        assert_eq!(back.y(), table.y());
        assert_eq!(back.x(), table.x());
    }
}
