//! Ingestion 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 表头缺少必需列
    #[error("source is missing required column '{column}'")]
    MissingColumn {
        /// 列名
        column: String,
    },

    /// 行字段无法转换
    #[error("malformed record at row {row}, field '{field}': {message}")]
    MalformedRecord {
        /// 数据行序号（从 1 开始，不含表头）
        row: u64,
        /// 字段名
        field: String,
        /// 错误消息
        message: String,
    },

    /// CSV 读取失败
    #[error("failed to read source: {0}")]
    Csv(#[from] csv::Error),

    /// 文件打开失败
    #[error("failed to open source: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestionError {
    pub(crate) fn malformed(row: u64, field: &str, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            row,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::MissingColumn { column } => ContractError::MissingColumn { column },
            IngestionError::MalformedRecord {
                row,
                field,
                message,
            } => ContractError::MalformedRecord {
                row,
                field,
                message,
            },
            IngestionError::Io(e) => ContractError::Io(e),
            IngestionError::Csv(e) => ContractError::Other(format!("failed to read source: {e}")),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_record_errors() {
        let err: ContractError = IngestionError::malformed(3, "duration", "empty").into();
        assert!(matches!(
            err,
            ContractError::MalformedRecord { row: 3, ref field, .. } if field == "duration"
        ));

        let err: ContractError = IngestionError::MissingColumn {
            column: "title".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "source is missing required column 'title'");
    }
}
