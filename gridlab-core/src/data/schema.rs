use super::normalize::TARGET_COLUMN;
use super::table::TIMESTAMP_COLUMN;
use polars::prelude::*;

/// Minimal contract a persisted table must satisfy to be validated.
pub struct TableSchema;

impl TableSchema {
    /// Required columns and their accepted dtypes.
    pub fn required() -> [(&'static str, fn(&DataType) -> bool); 2] {
        [
            (TIMESTAMP_COLUMN, is_text),
            (TARGET_COLUMN, is_numeric_or_unknown),
        ]
    }

    /// Validate a loaded DataFrame against the table contract.
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let leading = df
            .get_column_names()
            .first()
            .map(|n| n.to_string())
            .unwrap_or_default();
        if leading != TIMESTAMP_COLUMN {
            return Err(SchemaError::LeadingColumn(leading));
        }

        let actual = df.schema();
        for (name, accepts) in Self::required() {
            let dtype = actual
                .get(name)
                .ok_or_else(|| SchemaError::MissingColumn(name.to_string()))?;
            if !accepts(dtype) {
                return Err(SchemaError::TypeMismatch {
                    column: name.to_string(),
                    actual: dtype.clone(),
                });
            }
        }

        Ok(())
    }
}

fn is_text(dt: &DataType) -> bool {
    matches!(dt, DataType::String)
}

/// A column read back from text with no values at all carries no type.
fn is_numeric_or_unknown(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32 | DataType::Null
    )
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Leading column must be '{TIMESTAMP_COLUMN}', found '{0}'")]
    LeadingColumn(String),

    #[error("Type mismatch in column {column}: got {actual:?}")]
    TypeMismatch { column: String, actual: DataType },
}
