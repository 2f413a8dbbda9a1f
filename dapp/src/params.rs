//! Parameter extraction and address resolution shared by the handlers

use agent_orchestrator_core::{
    is_native_token, ActionParams, Error, NetworkConfig, Result, NATIVE_TOKEN,
};
use serde_json::Value;

/// Required string parameter
pub fn string(params: &ActionParams, key: &str) -> Result<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::dispatch(format!("missing string parameter '{}'", key)))
}

/// Optional string parameter
pub fn opt_string(params: &ActionParams, key: &str) -> Option<String> {
    params.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Required numeric parameter
pub fn number(params: &ActionParams, key: &str) -> Result<f64> {
    params
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::dispatch(format!("missing numeric parameter '{}'", key)))
}

/// Optional numeric parameter
pub fn opt_number(params: &ActionParams, key: &str) -> Option<f64> {
    params.get(key).and_then(Value::as_f64)
}

/// Token address for a symbol, or the value itself when it is not a known symbol
///
/// Any casing of the native symbol resolves to [`NATIVE_TOKEN`].
pub fn token_address(network: &NetworkConfig, token: &str) -> String {
    if is_native_token(token) {
        return NATIVE_TOKEN.to_string();
    }
    network
        .token(token)
        .map(|info| info.address.clone())
        .unwrap_or_else(|| token.to_string())
}

/// Contract address named by `params[key]` (role or literal address), else the `default_role` contract
pub fn contract_address(
    network: &NetworkConfig,
    params: &ActionParams,
    key: &str,
    default_role: &str,
) -> Result<String> {
    if let Some(named) = opt_string(params, key) {
        return Ok(network
            .contract(&named)
            .map(str::to_string)
            .unwrap_or(named));
    }
    network
        .contract(default_role)
        .map(str::to_string)
        .ok_or_else(|| Error::dispatch(format!("no '{}' contract configured", default_role)))
}
