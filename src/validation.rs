use std::collections::HashMap;

use axum::http::Method;

use crate::error::{AlertError, AlertResult};
use crate::symbols::SymbolSet;
use crate::types::AlertRequest;

pub const SYMBOLS_PARAM: &str = "tradingPairs";
pub const DEVIATION_PARAM: &str = "deviation";
pub const WILDCARD: &str = "all";

/// Checks method and query parameters, expanding the `all` wildcard against
/// `symbol_set`. Symbols come back in their canonical spelling.
pub fn validate(
    method: &Method,
    query: &HashMap<String, String>,
    symbol_set: &SymbolSet,
) -> AlertResult<AlertRequest> {
    if *method != Method::GET {
        return Err(invalid("Request method must be GET"));
    }

    let (Some(pairs), Some(deviation)) = (non_empty(query, SYMBOLS_PARAM), non_empty(query, DEVIATION_PARAM))
    else {
        return Err(invalid(format!(
            "Missing required query string params {SYMBOLS_PARAM} and {DEVIATION_PARAM}"
        )));
    };

    let deviation_threshold = match deviation.trim().parse::<f64>() {
        Ok(d) if d.is_finite() && d >= 0.0 => d,
        _ => {
            return Err(invalid(format!(
                "Value for {DEVIATION_PARAM} param must be a positive number, got {deviation}"
            )))
        }
    };

    let mut symbols = Vec::new();
    for entry in pairs.split(',') {
        if entry.eq_ignore_ascii_case(WILDCARD) {
            symbols.extend(symbol_set.iter().map(str::to_string));
            continue;
        }
        match symbol_set.resolve(entry) {
            Some(canonical) => symbols.push(canonical.to_string()),
            None => {
                return Err(invalid(format!(
                    "{entry:?} is not a valid entry for {SYMBOLS_PARAM}, expected 'ALL' or known symbols"
                )))
            }
        }
    }

    Ok(AlertRequest { symbols, deviation_threshold })
}

fn non_empty<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn invalid(message: impl Into<String>) -> AlertError {
    AlertError::InvalidRequest(message.into())
}
