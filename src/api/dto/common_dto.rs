//! Shared helpers for parsing optional query-string values.

use crate::error::GatewayError;

/// Trimmed, non-empty value of an optional parameter.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parses an optional integer parameter, naming `field` on failure.
pub(crate) fn parse_opt_i64(field: &str, value: Option<&str>) -> Result<Option<i64>, GatewayError> {
    non_blank(value)
        .map(|v| {
            v.parse::<i64>().map_err(|_| {
                GatewayError::invalid_parameter(field, format!("`{v}` is not an integer"))
            })
        })
        .transpose()
}

/// Parses an optional boolean parameter (`true`/`false`/`1`/`0`).
pub(crate) fn parse_opt_bool(field: &str, value: Option<&str>) -> Result<Option<bool>, GatewayError> {
    non_blank(value)
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(GatewayError::invalid_parameter(
                field,
                format!("`{v}` is not a boolean"),
            )),
        })
        .transpose()
}
