//! Risk scoring and parameter synthesis helpers
//!
//! Everything here is deterministic and cheap: the risk score blends the
//! variance of recent amounts, how concentrated recent activity is in a single
//! hour of the day, and the historical failure rate.

use agent_orchestrator_core::config::EngineSettings;
use agent_orchestrator_core::{AgentConfig, AgentMemory, ObservedState};
use chrono::Timelike;

/// Number of most recent action records considered
pub const RISK_WINDOW: usize = 20;

/// Largest share of the available balance a synthesized amount may use
pub const MAX_BALANCE_SHARE: f64 = 0.1;

const VARIANCE_WEIGHT: f64 = 0.3;
const CONCENTRATION_WEIGHT: f64 = 0.2;
const FAILURE_WEIGHT: f64 = 0.5;

/// Risk score of an agent in [0, 100]
pub fn risk_score(memory: &AgentMemory) -> f64 {
    let recent: Vec<_> = memory.actions.iter().rev().take(RISK_WINDOW).collect();

    let amounts: Vec<f64> = recent.iter().filter_map(|r| r.amount()).collect();
    let variance = amount_variation(&amounts) * 100.0;

    let hours: Vec<u32> = recent.iter().map(|r| r.timestamp.hour()).collect();
    let concentration = hour_concentration(&hours) * 100.0;

    let failure = (1.0 - memory.success_rate()) * 100.0;

    let score =
        VARIANCE_WEIGHT * variance + CONCENTRATION_WEIGHT * concentration + FAILURE_WEIGHT * failure;
    score.clamp(0.0, 100.0)
}

/// Coefficient of variation of the amounts, capped at 1
fn amount_variation(amounts: &[f64]) -> f64 {
    if amounts.len() < 2 {
        return 0.0;
    }
    let n = amounts.len() as f64;
    let mean = amounts.iter().sum::<f64>() / n;
    if mean.abs() < f64::EPSILON {
        return 0.0;
    }
    let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
    (variance.sqrt() / mean.abs()).min(1.0)
}

/// Share of the activity falling into the busiest hour of the day
fn hour_concentration(hours: &[u32]) -> f64 {
    if hours.len() < 2 {
        return 0.0;
    }
    let mut buckets = [0usize; 24];
    for hour in hours {
        buckets[(*hour as usize) % 24] += 1;
    }
    let busiest = buckets.iter().copied().max().unwrap_or(0);
    busiest as f64 / hours.len() as f64
}

/// Amount to use given the available balance and risk, capped by the per-tx limit
pub fn optimal_amount(available: f64, risk: f64, per_tx_limit: f64) -> f64 {
    let scale = 1.0 - (risk.clamp(0.0, 100.0) / 100.0);
    let amount = (available.max(0.0) * MAX_BALANCE_SHARE * scale).min(per_tx_limit.max(0.0));
    (amount * 1e6).floor() / 1e6
}

/// Token to act on: the first known token mentioned in the goal, then the
/// first preferred token held, then the largest holding, then the default
/// balance token
pub fn select_token(
    config: &AgentConfig,
    state: &ObservedState,
    settings: &EngineSettings,
) -> Option<String> {
    let goal = config.goal.to_lowercase();
    let mentioned = goal
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .find_map(|word| {
            config
                .preferred_tokens
                .iter()
                .chain(state.token_balances.keys())
                .find(|symbol| symbol.to_lowercase() == word)
        });
    if let Some(symbol) = mentioned {
        return Some(symbol.clone());
    }

    if let Some(symbol) = config
        .preferred_tokens
        .iter()
        .find(|symbol| state.token_balances.get(*symbol).is_some_and(|b| *b > 0.0))
    {
        return Some(symbol.clone());
    }

    state
        .token_balances
        .iter()
        .filter(|(_, balance)| **balance > 0.0)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(symbol, _)| symbol.clone())
        .or_else(|| settings.default_balance_token.clone())
}
