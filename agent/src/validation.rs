//! Local validation of decided actions
//!
//! Best-effort checks run before dispatch. Final enforcement of limits and
//! permissions happens on-chain; these checks only keep obviously bad actions
//! from being submitted.

use agent_orchestrator_core::{ActionKind, ActionParams, Error, Result};
use serde_json::Value;

use crate::context::EvaluationContext;

/// Parameters naming a counterparty checked against the white/blacklist
const COUNTERPARTY_FIELDS: [&str; 2] = ["to", "from"];

/// Token an action spends from, if named in its parameters
pub fn spend_token(action: ActionKind, params: &ActionParams) -> Option<&str> {
    let key = match action {
        ActionKind::Swap => "from_token",
        ActionKind::Buy => "pay_token",
        _ => "token",
    };
    params.get(key).and_then(Value::as_str)
}

/// Balance the action can spend: the named token, else the native balance
pub fn available_balance(action: ActionKind, params: &ActionParams, ctx: &EvaluationContext<'_>) -> f64 {
    match spend_token(action, params) {
        Some(token) => ctx.balance(Some(token)).unwrap_or(0.0),
        None => ctx.state.native_balance,
    }
}

/// Validate an action given by name
pub fn validate_named(action: &str, params: &ActionParams, ctx: &EvaluationContext<'_>) -> Result<()> {
    let kind: ActionKind = action
        .parse()
        .map_err(|_| Error::validation(format!("unknown action '{}'", action)))?;
    validate_action(kind, params, ctx)
}

/// Structural and sanity checks; `none` always passes
pub fn validate_action(action: ActionKind, params: &ActionParams, ctx: &EvaluationContext<'_>) -> Result<()> {
    if action == ActionKind::None {
        return Ok(());
    }

    if !ctx.state.active {
        return Err(Error::validation("agent is inactive on-chain"));
    }
    if !ctx.config.permits(action) {
        return Err(Error::validation(format!(
            "action '{}' is not permitted for this agent",
            action
        )));
    }
    if !ctx.state.permissions.is_empty()
        && !ctx.state.permissions.iter().any(|p| p == action.as_str())
    {
        return Err(Error::validation(format!(
            "action '{}' is not permitted on-chain",
            action
        )));
    }

    for field in action.required_fields() {
        match params.get(*field) {
            None | Some(Value::Null) => {
                return Err(Error::validation(format!("missing required field '{}'", field)))
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(Error::validation(format!("field '{}' is empty", field)))
            }
            _ => {}
        }
    }

    let amount = match params.get("amount") {
        None => None,
        Some(value) => {
            let amount = value
                .as_f64()
                .ok_or_else(|| Error::validation("field 'amount' must be numeric"))?;
            if !amount.is_finite() || amount <= 0.0 {
                return Err(Error::validation(format!(
                    "amount must be strictly positive, got {}",
                    amount
                )));
            }
            Some(amount)
        }
    };

    if let (true, Some(amount)) = (action.is_transfer_like(), amount) {
        check_spend(action, params, amount, ctx)?;
    }

    for field in COUNTERPARTY_FIELDS {
        if let Some(address) = params.get(field).and_then(Value::as_str) {
            if !ctx.config.allows_counterparty(address) {
                return Err(Error::validation(format!(
                    "counterparty '{}' is not allowed",
                    address
                )));
            }
        }
    }

    Ok(())
}

fn check_spend(
    action: ActionKind,
    params: &ActionParams,
    amount: f64,
    ctx: &EvaluationContext<'_>,
) -> Result<()> {
    let available = available_balance(action, params, ctx);
    if amount > available {
        return Err(Error::validation(format!(
            "amount {} exceeds available balance {} of {}",
            amount,
            available,
            spend_token(action, params).unwrap_or("native")
        )));
    }

    let limits = ctx.config.spending_limits;
    if amount > limits.per_tx {
        return Err(Error::validation(format!(
            "amount {} exceeds per-transaction limit {}",
            amount, limits.per_tx
        )));
    }

    let spent = ctx.spent_today();
    if spent + amount > limits.daily {
        return Err(Error::validation(format!(
            "amount {} would exceed daily limit {} ({} already spent today)",
            amount, limits.daily, spent
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context_parts, ContextParts};
    use proptest::prelude::*;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> ActionParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn generous() -> ContextParts {
        let mut parts = context_parts();
        parts.state.native_balance = 100.0;
        parts.config.spending_limits.per_tx = 1e12;
        parts.config.spending_limits.daily = 1e12;
        parts
    }

    macro_rules! ctx {
        ($parts:expr) => {
            EvaluationContext {
                agent_id: "agent-1",
                state: &$parts.state,
                memory: &$parts.memory,
                config: &$parts.config,
                settings: &$parts.settings,
            }
        };
    }

    fn reason(result: Result<()>) -> String {
        match result {
            Err(Error::ValidationFailed(reason)) => reason,
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_none_always_validates() {
        let mut parts = context_parts();
        parts.state.active = false;
        assert!(validate_action(ActionKind::None, &ActionParams::new(), &ctx!(parts)).is_ok());
    }

    #[test]
    fn test_missing_recipient_is_named() {
        let parts = generous();
        let r = reason(validate_action(
            ActionKind::Transfer,
            &params(&[("amount", json!(1.0))]),
            &ctx!(parts),
        ));
        assert!(r.contains("'to'"));
    }

    #[test]
    fn test_limits_and_lists() {
        let mut parts = generous();
        parts.config.spending_limits.per_tx = 5.0;
        parts.config.spending_limits.daily = 8.0;
        parts.config.blacklist = vec!["0xbad".to_string()];
        parts.state.daily_spent = Some(4.0);

        let transfer = |to: &str, amount: f64| params(&[("to", json!(to)), ("amount", json!(amount))]);

        assert!(validate_action(ActionKind::Transfer, &transfer("0xbob", 3.0), &ctx!(parts)).is_ok());
        assert!(reason(validate_action(ActionKind::Transfer, &transfer("0xbob", 6.0), &ctx!(parts)))
            .contains("per-transaction"));
        assert!(reason(validate_action(ActionKind::Transfer, &transfer("0xbob", 4.5), &ctx!(parts)))
            .contains("daily limit"));
        assert!(reason(validate_action(ActionKind::Transfer, &transfer("0xBAD", 1.0), &ctx!(parts)))
            .contains("not allowed"));
    }

    #[test]
    fn test_permission_list() {
        let mut parts = generous();
        parts.config.permissions = vec![ActionKind::Notify];
        assert!(validate_action(
            ActionKind::Notify,
            &params(&[("message", json!("hi"))]),
            &ctx!(parts)
        )
        .is_ok());
        assert!(reason(validate_action(ActionKind::Claim, &ActionParams::new(), &ctx!(parts)))
            .contains("not permitted"));
    }

    #[test]
    fn test_on_chain_permissions_apply() {
        let mut parts = generous();
        parts.state.permissions = vec!["notify".to_string()];
        assert!(reason(validate_action(ActionKind::Claim, &ActionParams::new(), &ctx!(parts)))
            .contains("on-chain"));
    }

    #[test]
    fn test_token_balance_checked_for_swap() {
        let mut parts = generous();
        parts.state.token_balances.insert("CELO".to_string(), 2.0);
        let swap = |amount: f64| {
            params(&[
                ("from_token", json!("CELO")),
                ("to_token", json!("cUSD")),
                ("amount", json!(amount)),
            ])
        };
        assert!(validate_action(ActionKind::Swap, &swap(2.0), &ctx!(parts)).is_ok());
        assert!(reason(validate_action(ActionKind::Swap, &swap(2.5), &ctx!(parts))).contains("CELO"));
    }

    #[test]
    fn test_spend_checked_against_what_dispatch_spends() {
        let mut parts = generous();
        parts.state.token_balances.insert("cUSD".to_string(), 5.0);

        let native = |amount: f64| {
            params(&[
                ("to", json!("0xbob")),
                ("amount", json!(amount)),
                ("token", json!("Native")),
            ])
        };
        assert!(validate_action(ActionKind::Transfer, &native(50.0), &ctx!(parts)).is_ok());
        assert!(reason(validate_action(ActionKind::Transfer, &native(150.0), &ctx!(parts)))
            .contains("available balance"));

        let buy_with_cusd = params(&[
            ("token", json!("CELO")),
            ("amount", json!(10.0)),
            ("pay_token", json!("cUSD")),
        ]);
        assert!(reason(validate_action(ActionKind::Buy, &buy_with_cusd, &ctx!(parts))).contains("cUSD"));

        let buy_with_native = params(&[("token", json!("CELO")), ("amount", json!(10.0))]);
        assert!(validate_action(ActionKind::Buy, &buy_with_native, &ctx!(parts)).is_ok());
    }

    #[test]
    fn test_unknown_name_fails_validation() {
        let parts = generous();
        assert!(reason(validate_named("teleport", &ActionParams::new(), &ctx!(parts)))
            .contains("unknown action"));
    }

    fn transfer_like() -> impl Strategy<Value = ActionKind> {
        prop_oneof![
            Just(ActionKind::Transfer),
            Just(ActionKind::Swap),
            Just(ActionKind::Stake),
            Just(ActionKind::Buy),
            Just(ActionKind::Sell),
        ]
    }

    fn complete_params(action: ActionKind, amount: f64) -> ActionParams {
        let mut p = params(&[("amount", json!(amount))]);
        for field in action.required_fields() {
            if *field != "amount" {
                p.insert(field.to_string(), json!("0xfield"));
            }
        }
        p.remove("from_token");
        p.remove("token");
        p.remove("pay_token");
        if action == ActionKind::Swap {
            p.insert("from_token".to_string(), json!("native"));
        }
        if action == ActionKind::Buy || action == ActionKind::Sell {
            p.insert("token".to_string(), json!("native"));
        }
        p
    }

    proptest! {
        #[test]
        fn prop_non_positive_amounts_rejected(
            action in transfer_like(),
            amount in -1e9f64..=0.0,
        ) {
            let parts = generous();
            let result = validate_action(action, &complete_params(action, amount), &ctx!(parts));
            prop_assert!(matches!(result, Err(Error::ValidationFailed(_))));
        }

        #[test]
        fn prop_amounts_above_balance_rejected(
            action in transfer_like(),
            excess in 1e-6f64..1e9,
        ) {
            let parts = generous();
            let amount = parts.state.native_balance + excess;
            let result = validate_action(action, &complete_params(action, amount), &ctx!(parts));
            prop_assert!(matches!(result, Err(Error::ValidationFailed(_))));
        }

        #[test]
        fn prop_amounts_within_balance_accepted(
            action in transfer_like(),
            amount in 1e-6f64..=100.0,
        ) {
            let parts = generous();
            let result = validate_action(action, &complete_params(action, amount), &ctx!(parts));
            prop_assert!(result.is_ok(), "{:?}", result);
        }
    }
}
