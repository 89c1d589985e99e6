//! Tabular frame construction from JSON records

use super::columns::{category_value, numeric_value, ColumnKind, FeatureColumn, Record, MISSING_CATEGORY};
use super::encoder::LabelEncoder;
use crate::error::{PredictiaError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

enum ColumnBuffer {
    Numerical(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnBuffer {
    fn with_capacity(kind: ColumnKind, n: usize) -> Self {
        match kind {
            ColumnKind::Numerical => ColumnBuffer::Numerical(Vec::with_capacity(n)),
            ColumnKind::Categorical => ColumnBuffer::Categorical(Vec::with_capacity(n)),
        }
    }

    fn into_column(self, name: &str) -> Column {
        match self {
            ColumnBuffer::Numerical(v) => Series::new(name.into(), v).into(),
            ColumnBuffer::Categorical(v) => Series::new(name.into(), v).into(),
        }
    }
}

fn assemble(columns: &[FeatureColumn], buffers: Vec<ColumnBuffer>) -> Result<DataFrame> {
    let cols: Vec<Column> = columns
        .iter()
        .zip(buffers)
        .map(|(col, buf)| buf.into_column(&col.name))
        .collect();
    Ok(DataFrame::new(cols)?)
}

/// Build the training frame, filling missing values.
///
/// Numerical gaps become `0.0` and categorical gaps become the
/// `__MISSING__` sentinel.
pub fn build_training_frame(records: &[Record], columns: &[FeatureColumn]) -> Result<DataFrame> {
    let mut buffers: Vec<ColumnBuffer> = columns
        .iter()
        .map(|c| ColumnBuffer::with_capacity(c.kind, records.len()))
        .collect();

    for record in records {
        for (col, buf) in columns.iter().zip(buffers.iter_mut()) {
            let value = record.get(&col.name).unwrap_or(&Value::Null);
            match buf {
                ColumnBuffer::Numerical(v) => v.push(numeric_value(value).unwrap_or(0.0)),
                ColumnBuffer::Categorical(v) => v.push(
                    category_value(value).unwrap_or_else(|| MISSING_CATEGORY.to_string()),
                ),
            }
        }
    }

    assemble(columns, buffers)
}

/// Build the prediction frame using exactly the stored columns.
///
/// Nothing is filled: an absent or null feature is an error, as is a value
/// that does not fit the column kind. Extra keys are ignored.
pub fn build_prediction_frame(records: &[Record], columns: &[FeatureColumn]) -> Result<DataFrame> {
    let mut buffers: Vec<ColumnBuffer> = columns
        .iter()
        .map(|c| ColumnBuffer::with_capacity(c.kind, records.len()))
        .collect();

    for (row, record) in records.iter().enumerate() {
        for (col, buf) in columns.iter().zip(buffers.iter_mut()) {
            let value = match record.get(&col.name) {
                None | Some(Value::Null) => {
                    return Err(PredictiaError::MissingFeature {
                        column: col.name.clone(),
                        row,
                    });
                }
                Some(v) => v,
            };

            if matches!(value, Value::Array(_) | Value::Object(_)) {
                return Err(PredictiaError::InvalidFeatureValue {
                    column: col.name.clone(),
                    row,
                    reason: "nested values are not supported".to_string(),
                });
            }

            match buf {
                ColumnBuffer::Numerical(v) => {
                    let x = numeric_value(value).ok_or_else(|| PredictiaError::InvalidFeatureValue {
                        column: col.name.clone(),
                        row,
                        reason: format!("expected a number, got {value}"),
                    })?;
                    v.push(x);
                }
                ColumnBuffer::Categorical(v) => {
                    // Scalars only at this point, so this always yields text
                    v.push(category_value(value).unwrap_or_default());
                }
            }
        }
    }

    assemble(columns, buffers)
}

/// Fit one label encoder per categorical column of the frame
pub fn fit_encoders(df: &DataFrame, columns: &[FeatureColumn]) -> Result<BTreeMap<String, LabelEncoder>> {
    let mut encoders = BTreeMap::new();
    for col in columns.iter().filter(|c| c.kind == ColumnKind::Categorical) {
        let series = df.column(&col.name)?.as_materialized_series();
        let mut encoder = LabelEncoder::new(col.name.clone());
        encoder.fit(series)?;
        encoders.insert(col.name.clone(), encoder);
    }
    Ok(encoders)
}

/// Convert the frame into a row-major feature matrix.
///
/// Categorical columns pass through their encoder; an encoder missing for a
/// categorical column is reported as a data error.
pub fn frame_to_matrix(
    df: &DataFrame,
    columns: &[FeatureColumn],
    encoders: &BTreeMap<String, LabelEncoder>,
) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = columns.len();

    let col_data: Vec<Vec<f64>> = columns
        .iter()
        .map(|col| {
            let series = df.column(&col.name)?.as_materialized_series();
            match col.kind {
                ColumnKind::Numerical => {
                    let cast = series.cast(&DataType::Float64)?;
                    Ok(cast.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect())
                }
                ColumnKind::Categorical => {
                    let encoder = encoders.get(&col.name).ok_or_else(|| {
                        PredictiaError::Data(format!("No encoder for column '{}'", col.name))
                    })?;
                    encoder.transform(series)
                }
            }
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn typed() -> Vec<FeatureColumn> {
        vec![
            FeatureColumn::new("age", ColumnKind::Numerical),
            FeatureColumn::new("genre", ColumnKind::Categorical),
        ]
    }

    #[test]
    fn test_training_frame_fills_missing() {
        let rows = records(json!([
            {"age": 30, "genre": "Music"},
            {"genre": null},
            {"age": true, "genre": 7}
        ]));
        let df = build_training_frame(&rows, &typed()).unwrap();

        let ages: Vec<Option<f64>> = df.column("age").unwrap().as_materialized_series().f64().unwrap().into_iter().collect();
        assert_eq!(ages, vec![Some(30.0), Some(0.0), Some(1.0)]);

        let genres: Vec<Option<&str>> = df.column("genre").unwrap().as_materialized_series().str().unwrap().into_iter().collect();
        assert_eq!(genres, vec![Some("Music"), Some(MISSING_CATEGORY), Some("7")]);
    }

    #[test]
    fn test_prediction_frame_missing_feature() {
        let rows = records(json!([
            {"age": 30, "genre": "Music"},
            {"genre": "News"}
        ]));

        match build_prediction_frame(&rows, &typed()) {
            Err(PredictiaError::MissingFeature { column, row }) => {
                assert_eq!(column, "age");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_prediction_frame_null_is_missing() {
        let rows = records(json!([{"age": 30, "genre": null}]));
        assert!(matches!(
            build_prediction_frame(&rows, &typed()),
            Err(PredictiaError::MissingFeature { .. })
        ));
    }

    #[test]
    fn test_prediction_frame_rejects_text_in_numeric_column() {
        let rows = records(json!([{"age": "thirty", "genre": "Music"}]));
        match build_prediction_frame(&rows, &typed()) {
            Err(PredictiaError::InvalidFeatureValue { column, row, .. }) => {
                assert_eq!(column, "age");
                assert_eq!(row, 0);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_matrix_uses_encoders_and_ignores_extra_keys() {
        let train = records(json!([
            {"age": 30, "genre": "Music"},
            {"age": 40, "genre": "News"}
        ]));
        let columns = typed();
        let train_df = build_training_frame(&train, &columns).unwrap();
        let encoders = fit_encoders(&train_df, &columns).unwrap();

        let input = records(json!([{"genre": "News", "age": 25, "extra": [1, 2]}]));
        let df = build_prediction_frame(&input, &columns).unwrap();
        let x = frame_to_matrix(&df, &columns, &encoders).unwrap();

        assert_eq!(x.shape(), &[1, 2]);
        assert_eq!(x[[0, 0]], 25.0);
        assert_eq!(x[[0, 1]], 1.0);
    }

    #[test]
    fn test_matrix_unknown_category() {
        let train = records(json!([{"age": 1, "genre": "Music"}]));
        let columns = typed();
        let train_df = build_training_frame(&train, &columns).unwrap();
        let encoders = fit_encoders(&train_df, &columns).unwrap();

        let input = records(json!([{"age": 2, "genre": "Sports"}]));
        let df = build_prediction_frame(&input, &columns).unwrap();

        assert!(matches!(
            frame_to_matrix(&df, &columns, &encoders),
            Err(PredictiaError::UnknownCategory { .. })
        ));
    }
}
