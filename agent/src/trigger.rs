//! Trigger definitions and evaluation
//!
//! A trigger is a condition checked once per cycle; only rules bound to a
//! trigger that fired are considered for the decision. Every trigger kind is a
//! variant of [`TriggerConfig`] and evaluation matches on it exhaustively.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::EvaluationContext;
use crate::error::{EvalError, EvalResult};
use crate::model::ScoringModel;

const EPSILON: f64 = 1e-9;

/// Kind of trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Metric compared against a value
    Threshold,
    /// Recurring interval
    Schedule,
    /// Contract event
    Event,
    /// Sequence of recent actions and events
    Pattern,
    /// Scoring model output
    MlPrediction,
}

impl TriggerKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Threshold => "threshold",
            TriggerKind::Schedule => "schedule",
            TriggerKind::Event => "event",
            TriggerKind::Pattern => "pattern",
            TriggerKind::MlPrediction => "ml_prediction",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market or wallet metric a threshold trigger reads
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Token or native balance
    Balance,
    /// Token price
    Price,
    /// Trading volume
    Volume,
    /// Yield
    Apy,
    /// Gas price
    GasPrice,
}

impl Metric {
    /// Metric name as resolved by the evaluation context
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Balance => "balance",
            Metric::Price => "price",
            Metric::Volume => "volume",
            Metric::Apy => "apy",
            Metric::GasPrice => "gas_price",
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// Greater than
    Gt,
    /// Less than
    Lt,
    /// Equal (within 1e-9)
    Eq,
    /// Greater than or equal
    Gte,
    /// Less than or equal
    Lte,
}

impl Comparison {
    /// Whether `actual <op> expected` holds
    pub fn holds(&self, actual: f64, expected: f64) -> bool {
        match self {
            Comparison::Gt => actual > expected,
            Comparison::Lt => actual < expected,
            Comparison::Eq => (actual - expected).abs() <= EPSILON,
            Comparison::Gte => actual >= expected,
            Comparison::Lte => actual <= expected,
        }
    }

    /// 1.0 when the comparison holds; for a failed inequality, closeness
    /// `1 - |actual - expected| / max(|expected|, eps)` clamped to [0, 1];
    /// 0.0 for a failed equality
    pub fn match_strength(&self, actual: f64, expected: f64) -> f64 {
        if self.holds(actual, expected) {
            return 1.0;
        }
        match self {
            Comparison::Eq => 0.0,
            _ => {
                let distance = (actual - expected).abs() / expected.abs().max(EPSILON);
                (1.0 - distance).clamp(0.0, 1.0)
            }
        }
    }
}

/// Interval class of a schedule trigger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleInterval {
    /// Every hour
    Hourly,
    /// Every day
    Daily,
    /// Every 7 days
    Weekly,
    /// Every 30 days
    Monthly,
}

impl ScheduleInterval {
    /// Length of the interval
    pub fn period(&self) -> Duration {
        match self {
            ScheduleInterval::Hourly => Duration::hours(1),
            ScheduleInterval::Daily => Duration::days(1),
            ScheduleInterval::Weekly => Duration::days(7),
            ScheduleInterval::Monthly => Duration::days(30),
        }
    }
}

/// Type-specific trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerConfig {
    /// Fires when `metric <operator> value`
    Threshold {
        /// Metric read from the observed state
        metric: Metric,
        /// Comparison operator
        operator: Comparison,
        /// Value compared against
        value: f64,
        /// Token scoping the metric
        #[serde(default)]
        token: Option<String>,
    },
    /// Fires once per interval, optionally within a time-of-day window
    Schedule {
        /// Interval class
        interval: ScheduleInterval,
        /// Time of day, `HH:MM` or `HH:MM:SS`
        #[serde(default)]
        time: Option<String>,
        /// `UTC` or a fixed offset such as `+02:00`
        #[serde(default)]
        timezone: Option<String>,
    },
    /// Fires on a matching contract event newer than the last fire
    Event {
        /// Emitting contract (empty or `*` for any)
        #[serde(default)]
        contract: String,
        /// Event name
        event: String,
        /// Required event field values
        #[serde(default)]
        filter: BTreeMap<String, Value>,
    },
    /// Fires when enough of a sequence of action/event names occurred recently
    Pattern {
        /// Names to look for
        sequence: Vec<String>,
        /// Look-back window in minutes
        timeframe_minutes: i64,
        /// Minimum share of the sequence that must be present
        confidence: f64,
        /// Require the names in order
        #[serde(default)]
        ordered: bool,
    },
    /// Fires when a scoring model's output crosses a threshold
    MlPrediction {
        /// Referenced model
        model_id: String,
        /// Feature names; defaults to the model's own features
        #[serde(default)]
        features: Vec<String>,
        /// Score at or above which the trigger fires; defaults to the model's
        #[serde(default)]
        threshold: Option<f64>,
    },
}

impl TriggerConfig {
    /// Kind of this configuration
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerConfig::Threshold { .. } => TriggerKind::Threshold,
            TriggerConfig::Schedule { .. } => TriggerKind::Schedule,
            TriggerConfig::Event { .. } => TriggerKind::Event,
            TriggerConfig::Pattern { .. } => TriggerKind::Pattern,
            TriggerConfig::MlPrediction { .. } => TriggerKind::MlPrediction,
        }
    }
}

/// A trigger in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trigger {
    /// Trigger identifier (generated when empty)
    #[serde(default)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Type-specific configuration
    pub config: TriggerConfig,
    /// Disabled triggers are never evaluated
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Higher priorities are evaluated first
    #[serde(default)]
    pub priority: i32,
}

fn default_enabled() -> bool {
    true
}

impl Trigger {
    /// Enabled trigger with priority 0
    pub fn new(id: impl Into<String>, name: impl Into<String>, config: TriggerConfig) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            config,
            enabled: true,
            priority: 0,
        }
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Kind of the trigger
    pub fn kind(&self) -> TriggerKind {
        self.config.kind()
    }

    /// Whether the trigger fires in this context
    ///
    /// `model` must be the referenced model for `ml_prediction` triggers.
    pub fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        model: Option<&ScoringModel>,
    ) -> EvalResult<bool> {
        match &self.config {
            TriggerConfig::Threshold {
                metric,
                operator,
                value,
                token,
            } => {
                let name = match token {
                    Some(token) => format!("{}:{}", metric.as_str(), token),
                    None => metric.as_str().to_string(),
                };
                let actual = ctx.metric(&name)?;
                Ok(operator.holds(actual, *value))
            }
            TriggerConfig::Schedule {
                interval,
                time,
                timezone,
            } => self.schedule_due(ctx, *interval, time.as_deref(), timezone.as_deref()),
            TriggerConfig::Event {
                contract,
                event,
                filter,
            } => Ok(self.event_seen(ctx, contract, event, filter)),
            TriggerConfig::Pattern {
                sequence,
                timeframe_minutes,
                confidence,
                ordered,
            } => {
                let matched = pattern_confidence(ctx, sequence, *timeframe_minutes, *ordered)?;
                Ok(matched + EPSILON >= *confidence)
            }
            TriggerConfig::MlPrediction {
                model_id,
                features,
                threshold,
            } => {
                let model = model.ok_or_else(|| EvalError::ModelNotFound(model_id.clone()))?;
                let threshold = threshold.or(model.threshold).ok_or_else(|| {
                    EvalError::malformed(format!("no threshold for model '{}'", model_id))
                })?;
                let prediction = if features.is_empty() {
                    model.evaluate(ctx)?
                } else {
                    model.predict(&crate::model::extract_features(features, ctx)?)?
                };
                Ok(prediction.score >= threshold)
            }
        }
    }

    fn schedule_due(
        &self,
        ctx: &EvaluationContext<'_>,
        interval: ScheduleInterval,
        time: Option<&str>,
        timezone: Option<&str>,
    ) -> EvalResult<bool> {
        let now = ctx.now();
        // A schedule that never fired is due
        let elapsed = ctx.memory.trigger_runs.get(&self.id).map(|last| now - *last);

        let Some(time) = time else {
            return Ok(elapsed.map_or(true, |e| e >= interval.period()));
        };

        let at = parse_time_of_day(time)?;
        let offset = parse_timezone(timezone.unwrap_or("UTC"))?;
        let window = Duration::try_minutes(ctx.settings.schedule_window_minutes.max(1))
            .ok_or_else(|| EvalError::malformed("schedule window out of range"))?;

        let local = now.with_timezone(&offset).time();
        let since_start = (seconds_of_day(local) - seconds_of_day(at)).rem_euclid(86_400);
        let in_window = since_start < window.num_seconds();

        Ok(in_window && elapsed.map_or(true, |e| e >= interval.period() - window))
    }

    fn event_seen(
        &self,
        ctx: &EvaluationContext<'_>,
        contract: &str,
        event: &str,
        filter: &BTreeMap<String, Value>,
    ) -> bool {
        let since = ctx.memory.trigger_runs.get(&self.id).copied();
        ctx.state.events.iter().any(|e| {
            e.name == event
                && (contract.is_empty() || contract == "*" || e.contract.eq_ignore_ascii_case(contract))
                && filter.iter().all(|(k, v)| e.fields.get(k) == Some(v))
                && since.map_or(true, |t| e.timestamp > t)
        })
    }
}

/// Share of `sequence` found among recent action and event names
fn pattern_confidence(
    ctx: &EvaluationContext<'_>,
    sequence: &[String],
    timeframe_minutes: i64,
    ordered: bool,
) -> EvalResult<f64> {
    if sequence.is_empty() {
        return Err(EvalError::malformed("pattern sequence is empty"));
    }
    if timeframe_minutes <= 0 {
        return Err(EvalError::malformed("pattern timeframe must be positive"));
    }

    let since = Duration::try_minutes(timeframe_minutes)
        .and_then(|window| ctx.now().checked_sub_signed(window))
        .ok_or_else(|| EvalError::malformed("pattern timeframe out of range"))?;
    let mut seen: Vec<(DateTime<Utc>, &str)> = Vec::new();
    seen.extend(
        ctx.memory
            .actions
            .iter()
            .filter(|a| a.timestamp >= since)
            .map(|a| (a.timestamp, a.action.as_str())),
    );
    for observation in ctx.memory.observations.iter().filter(|o| o.timestamp >= since) {
        seen.extend(
            observation
                .event_names
                .iter()
                .map(|name| (observation.timestamp, name.as_str())),
        );
    }
    seen.extend(
        ctx.state
            .events
            .iter()
            .filter(|e| e.timestamp >= since)
            .map(|e| (e.timestamp, e.name.as_str())),
    );
    seen.sort_by_key(|(timestamp, _)| *timestamp);

    let matched = if ordered {
        let mut wanted = sequence.iter().peekable();
        for (_, name) in &seen {
            if wanted.peek().is_some_and(|w| w.as_str() == *name) {
                wanted.next();
            }
        }
        sequence.len() - wanted.count()
    } else {
        let names: HashSet<&str> = seen.iter().map(|(_, name)| *name).collect();
        sequence.iter().filter(|s| names.contains(s.as_str())).count()
    };

    Ok(matched as f64 / sequence.len() as f64)
}

fn parse_time_of_day(value: &str) -> EvalResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| EvalError::malformed(format!("invalid time of day '{}'", value)))
}

/// Parse `UTC`, `Z` or a fixed offset `+HH:MM` / `-HH:MM`
fn parse_timezone(value: &str) -> EvalResult<FixedOffset> {
    let invalid = || EvalError::malformed(format!("unsupported timezone '{}'", value));
    if value.eq_ignore_ascii_case("utc") || value == "Z" {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn seconds_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;
    use crate::test_support::{context_parts, ContextParts};
    use agent_orchestrator_core::{ActionParams, ActionRecord, ChainEvent};
    use chrono::TimeZone;
    use serde_json::json;

    fn threshold(metric: Metric, operator: Comparison, value: f64) -> Trigger {
        Trigger::new(
            "t-1",
            "threshold",
            TriggerConfig::Threshold {
                metric,
                operator,
                value,
                token: None,
            },
        )
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

    #[test]
    fn test_low_balance_threshold_fires_below_value() {
        let trigger = threshold(Metric::Balance, Comparison::Lt, 1000.0);

        let mut parts = context_parts();
        parts.state.token_balances.insert("cUSD".to_string(), 500.0);
        assert!(trigger.evaluate(&ctx!(parts), None).unwrap());

        parts.state.token_balances.insert("cUSD".to_string(), 1500.0);
        assert!(!trigger.evaluate(&ctx!(parts), None).unwrap());
    }

    #[test]
    fn test_missing_metric_is_an_error() {
        let trigger = threshold(Metric::Apy, Comparison::Gt, 5.0);
        let parts = context_parts();
        assert!(matches!(
            trigger.evaluate(&ctx!(parts), None),
            Err(EvalError::MissingMetric(_))
        ));
    }

    #[test]
    fn test_match_strength_is_graded_for_inequalities() {
        assert_eq!(Comparison::Gt.match_strength(150.0, 100.0), 1.0);
        assert!((Comparison::Gt.match_strength(80.0, 100.0) - 0.8).abs() < 1e-12);
        assert_eq!(Comparison::Lt.match_strength(300.0, 100.0), 0.0);
        assert_eq!(Comparison::Eq.match_strength(99.0, 100.0), 0.0);
        assert_eq!(Comparison::Eq.match_strength(100.0, 100.0), 1.0);
    }

    #[test]
    fn test_schedule_tracks_each_trigger_separately() {
        let ContextParts {
            mut state,
            mut memory,
            config,
            settings,
        } = context_parts();
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        state.timestamp = now;
        memory
            .trigger_runs
            .insert("other".to_string(), now - Duration::minutes(10));

        let hourly = Trigger::new(
            "hourly",
            "hourly",
            TriggerConfig::Schedule {
                interval: ScheduleInterval::Hourly,
                time: None,
                timezone: None,
            },
        );
        memory
            .trigger_runs
            .insert("hourly".to_string(), now - Duration::minutes(61));
        let ctx = EvaluationContext {
            agent_id: "agent-1",
            state: &state,
            memory: &memory,
            config: &config,
            settings: &settings,
        };
        assert!(hourly.evaluate(&ctx, None).unwrap());

        let other = Trigger::new("other", "other", hourly.config.clone());
        assert!(!other.evaluate(&ctx, None).unwrap());
    }

    #[test]
    fn test_schedule_time_of_day_window() {
        let ContextParts {
            mut state,
            mut memory,
            config,
            settings,
        } = context_parts();
        memory.trigger_runs.insert(
            "daily".to_string(),
            Utc.with_ymd_and_hms(2024, 5, 1, 7, 5, 0).unwrap(),
        );
        let trigger = Trigger::new(
            "daily",
            "daily at 09:00 +02:00",
            TriggerConfig::Schedule {
                interval: ScheduleInterval::Daily,
                time: Some("09:00".to_string()),
                timezone: Some("+02:00".to_string()),
            },
        );

        state.timestamp = Utc.with_ymd_and_hms(2024, 5, 2, 7, 10, 0).unwrap();
        let ctx = EvaluationContext {
            agent_id: "agent-1",
            state: &state,
            memory: &memory,
            config: &config,
            settings: &settings,
        };
        assert!(trigger.evaluate(&ctx, None).unwrap());

        state.timestamp = Utc.with_ymd_and_hms(2024, 5, 2, 9, 10, 0).unwrap();
        let ctx = EvaluationContext {
            agent_id: "agent-1",
            state: &state,
            memory: &memory,
            config: &config,
            settings: &settings,
        };
        assert!(!trigger.evaluate(&ctx, None).unwrap());
    }

    #[test]
    fn test_schedule_never_fired_is_due() {
        let trigger = Trigger::new(
            "fresh",
            "fresh",
            TriggerConfig::Schedule {
                interval: ScheduleInterval::Weekly,
                time: None,
                timezone: None,
            },
        );
        let parts = context_parts();
        assert!(trigger.evaluate(&ctx!(parts), None).unwrap());
    }

    #[test]
    fn test_bad_timezone_is_malformed() {
        let trigger = Trigger::new(
            "daily",
            "daily",
            TriggerConfig::Schedule {
                interval: ScheduleInterval::Daily,
                time: Some("09:00".to_string()),
                timezone: Some("Mars/Olympus".to_string()),
            },
        );
        let parts = context_parts();
        assert!(matches!(
            trigger.evaluate(&ctx!(parts), None),
            Err(EvalError::Malformed(_))
        ));
    }

    #[test]
    fn test_out_of_range_offset_is_malformed() {
        let parts = context_parts();
        for timezone in ["+600000", "+24:00", "-05:60"] {
            let trigger = Trigger::new(
                "daily",
                "daily",
                TriggerConfig::Schedule {
                    interval: ScheduleInterval::Daily,
                    time: Some("09:00".to_string()),
                    timezone: Some(timezone.to_string()),
                },
            );
            assert!(
                matches!(trigger.evaluate(&ctx!(parts), None), Err(EvalError::Malformed(_))),
                "{}",
                timezone
            );
        }
    }

    #[test]
    fn test_huge_pattern_timeframe_is_malformed() {
        let trigger = Trigger::new(
            "p",
            "forever",
            TriggerConfig::Pattern {
                sequence: vec!["swap".to_string()],
                timeframe_minutes: 1_000_000_000_000,
                confidence: 1.0,
                ordered: false,
            },
        );
        let parts = context_parts();
        assert!(matches!(
            trigger.evaluate(&ctx!(parts), None),
            Err(EvalError::Malformed(_))
        ));
    }

    #[test]
    fn test_event_trigger_ignores_events_before_last_fire() {
        let mut parts = context_parts();
        let now = parts.state.timestamp;
        let mut fields = BTreeMap::new();
        fields.insert("to".to_string(), json!("0xagent"));
        parts.state.events.push(ChainEvent {
            contract: "0xCUSD".to_string(),
            name: "Transfer".to_string(),
            fields,
            timestamp: now - Duration::minutes(5),
        });

        let mut filter = BTreeMap::new();
        filter.insert("to".to_string(), json!("0xagent"));
        let trigger = Trigger::new(
            "incoming",
            "incoming transfer",
            TriggerConfig::Event {
                contract: "0xcusd".to_string(),
                event: "Transfer".to_string(),
                filter,
            },
        );
        assert!(trigger.evaluate(&ctx!(parts), None).unwrap());

        parts
            .memory
            .trigger_runs
            .insert("incoming".to_string(), now - Duration::minutes(1));
        assert!(!trigger.evaluate(&ctx!(parts), None).unwrap());
    }

    #[test]
    fn test_pattern_containment_and_order() {
        let mut parts = context_parts();
        let now = parts.state.timestamp;
        for (minutes_ago, action) in [(30, "sell"), (20, "swap")] {
            parts.memory.push_action(ActionRecord {
                timestamp: now - Duration::minutes(minutes_ago),
                action: action.to_string(),
                params: ActionParams::new(),
                result: "0xtx".to_string(),
                success: true,
            });
        }

        let pattern = |ordered: bool, confidence: f64| {
            Trigger::new(
                "p",
                "swap then sell",
                TriggerConfig::Pattern {
                    sequence: vec!["swap".to_string(), "sell".to_string()],
                    timeframe_minutes: 60,
                    confidence,
                    ordered,
                },
            )
        };

        assert!(pattern(false, 1.0).evaluate(&ctx!(parts), None).unwrap());
        assert!(!pattern(true, 1.0).evaluate(&ctx!(parts), None).unwrap());
        assert!(pattern(true, 0.5).evaluate(&ctx!(parts), None).unwrap());
    }

    #[test]
    fn test_ml_prediction_requires_model() {
        let trigger = Trigger::new(
            "ml",
            "ml",
            TriggerConfig::MlPrediction {
                model_id: "missing".to_string(),
                features: vec![],
                threshold: Some(0.5),
            },
        );
        let parts = context_parts();
        assert!(matches!(
            trigger.evaluate(&ctx!(parts), None),
            Err(EvalError::ModelNotFound(_))
        ));
    }

    #[test]
    fn test_ml_prediction_falls_back_to_model_threshold() {
        let model = ScoringModel {
            id: "native".to_string(),
            name: "native balance".to_string(),
            kind: ModelKind::Regression,
            features: vec!["native_balance".to_string()],
            weights: vec![1.0],
            bias: 0.0,
            threshold: Some(1.0),
            training_data: vec![],
            accuracy: 0.0,
        };
        let trigger = |threshold: Option<f64>| {
            Trigger::new(
                "ml",
                "ml",
                TriggerConfig::MlPrediction {
                    model_id: "native".to_string(),
                    features: vec![],
                    threshold,
                },
            )
        };

        let mut parts = context_parts();
        parts.state.native_balance = 2.0;
        assert!(trigger(None).evaluate(&ctx!(parts), Some(&model)).unwrap());
        assert!(!trigger(Some(3.0)).evaluate(&ctx!(parts), Some(&model)).unwrap());

        parts.state.native_balance = 0.5;
        assert!(!trigger(None).evaluate(&ctx!(parts), Some(&model)).unwrap());

        let unset = ScoringModel {
            threshold: None,
            ..model
        };
        assert!(matches!(
            trigger(None).evaluate(&ctx!(parts), Some(&unset)),
            Err(EvalError::Malformed(_))
        ));
    }

    #[test]
    fn test_trigger_yaml_shape() {
        let yaml = r#"
id: low-cusd
name: Low cUSD balance
priority: 10
config:
  type: threshold
  metric: balance
  operator: lt
  value: 1000
  token: cUSD
"#;
        let trigger: Trigger = serde_yaml::from_str(yaml).unwrap();
        assert!(trigger.enabled);
        assert_eq!(trigger.kind(), TriggerKind::Threshold);
        assert_eq!(trigger.priority, 10);
    }
}
