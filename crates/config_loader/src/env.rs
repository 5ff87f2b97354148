//! 环境变量加载模块
//!
//! 连接参数与凭据只从环境读取（可选 `.env` 文件）。

use contracts::{ContractError, ConnectionSettings};

/// Variables that must be present and non-empty
pub const REQUIRED_VARS: [&str; 6] = [
    "BOOTSTRAP_SERVER",
    "SCHEMA_REGISTRY_URL",
    "KAFKA_KEY",
    "KAFKA_SECRET",
    "SR_KEY",
    "SR_SECRET",
];

/// Build `ConnectionSettings` from a variable lookup
///
/// Every absent or empty variable is collected, so the error names all of
/// them at once, in declaration order.
pub fn connection_from_lookup<F>(lookup: F) -> Result<ConnectionSettings, ContractError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut values = Vec::with_capacity(REQUIRED_VARS.len());
    let mut missing = Vec::new();

    for name in REQUIRED_VARS {
        match lookup(name).filter(|v| !v.trim().is_empty()) {
            Some(value) => values.push(value),
            None => missing.push(name.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(ContractError::ConfigMissing { missing });
    }

    let mut values = values.into_iter();
    let mut next = || values.next().unwrap_or_default();
    Ok(ConnectionSettings {
        bootstrap_server: next(),
        schema_registry_url: next(),
        kafka_key: next(),
        kafka_secret: next(),
        sr_key: next(),
        sr_secret: next(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        REQUIRED_VARS
            .iter()
            .map(|name| (*name, format!("value-of-{name}")))
            .collect()
    }

    #[test]
    fn test_all_present() {
        let env = full_env();
        let conn = connection_from_lookup(|n| env.get(n).cloned()).unwrap();
        assert_eq!(conn.bootstrap_server, "value-of-BOOTSTRAP_SERVER");
        assert_eq!(conn.sr_secret, "value-of-SR_SECRET");
    }

    #[test]
    fn test_missing_two_secrets_listed_exactly() {
        let mut env = full_env();
        env.remove("KAFKA_SECRET");
        env.remove("SR_KEY");

        let err = connection_from_lookup(|n| env.get(n).cloned()).unwrap_err();
        match err {
            ContractError::ConfigMissing { missing } => {
                assert_eq!(missing, vec!["KAFKA_SECRET", "SR_KEY"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let mut env = full_env();
        env.insert("BOOTSTRAP_SERVER", "   ".to_string());

        let err = connection_from_lookup(|n| env.get(n).cloned()).unwrap_err();
        assert!(err.to_string().contains("BOOTSTRAP_SERVER"));
    }
}
