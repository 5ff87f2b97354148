//! 配置校验模块
//!
//! 校验规则：
//! - topic 非空, chunk_size >= 1
//! - schema registry URL 合法
//! - security_protocol 为已知取值
//! - 列名非空 (row_index 除外)

use contracts::{ConnectionSettings, ContractError, PipelineSettings};
use ::validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

const SECURITY_PROTOCOLS: [&str; 4] = ["PLAINTEXT", "SSL", "SASL_PLAINTEXT", "SASL_SSL"];

/// 校验 PipelineSettings
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate_settings(settings: &PipelineSettings) -> Result<(), ContractError> {
    settings.validate().map_err(into_contract_error)?;
    validate_security_protocol(settings)?;
    Ok(())
}

/// 校验 ConnectionSettings
pub fn validate_connection(connection: &ConnectionSettings) -> Result<(), ContractError> {
    connection.validate().map_err(into_contract_error)
}

/// 校验 security_protocol 取值
fn validate_security_protocol(settings: &PipelineSettings) -> Result<(), ContractError> {
    let protocol = settings.security_protocol.to_uppercase();
    if !SECURITY_PROTOCOLS.contains(&protocol.as_str()) {
        return Err(ContractError::config_validation(
            "security_protocol",
            format!(
                "unknown protocol '{}', expected one of {:?}",
                settings.security_protocol, SECURITY_PROTOCOLS
            ),
        ));
    }
    Ok(())
}

fn into_contract_error(errors: ValidationErrors) -> ContractError {
    match first_violation(&errors, "") {
        Some((field, message)) => ContractError::config_validation(field, message),
        None => ContractError::config_validation("<unknown>", errors.to_string()),
    }
}

/// 按字段名排序后返回第一个违规项 (字段路径, 描述)
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in entries {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    return Some((path, describe(err)));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

fn describe(err: &ValidationError) -> String {
    match &err.message {
        Some(message) => message.to_string(),
        None => format!("failed '{}' check", err.code),
    }
}
