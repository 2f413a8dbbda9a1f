//! Scoring models consumed by `ml_prediction` triggers
//!
//! Models are stateless at evaluation time: a feature vector goes in, a score
//! (and for clustering, a label) comes out. Parameters are supplied by the
//! policy; no training happens here.

use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::error::{EvalError, EvalResult};

const EPSILON: f64 = 1e-9;

/// Kind of scoring model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Logistic score of a weighted sum, in (0, 1)
    Classification,
    /// Weighted sum plus bias
    Regression,
    /// Similarity to the nearest centroid, labelled by centroid index
    Clustering,
    /// Distance from the training centroid relative to the training spread
    AnomalyDetection,
}

/// A named scoring model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringModel {
    /// Model identifier (generated when empty)
    #[serde(default)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Model kind
    pub kind: ModelKind,
    /// Feature names, in vector order
    pub features: Vec<String>,
    /// One weight per feature (classification, regression)
    #[serde(default)]
    pub weights: Vec<f64>,
    /// Intercept (classification, regression)
    #[serde(default)]
    pub bias: f64,
    /// Default decision threshold
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Centroids (clustering) or normal samples (anomaly detection)
    #[serde(default)]
    pub training_data: Vec<Vec<f64>>,
    /// Reported accuracy, informational
    #[serde(default)]
    pub accuracy: f64,
}

/// Output of a model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Score compared against thresholds
    pub score: f64,
    /// Cluster index, for clustering models
    pub label: Option<usize>,
}

impl ScoringModel {
    /// Check that the parameters fit the model kind
    pub fn check(&self) -> EvalResult<()> {
        if self.features.is_empty() {
            return Err(EvalError::model(format!("model '{}' has no features", self.id)));
        }
        match self.kind {
            ModelKind::Classification | ModelKind::Regression => {
                if self.weights.len() != self.features.len() {
                    return Err(EvalError::model(format!(
                        "model '{}' has {} weights for {} features",
                        self.id,
                        self.weights.len(),
                        self.features.len()
                    )));
                }
            }
            ModelKind::Clustering | ModelKind::AnomalyDetection => {
                if self.training_data.is_empty() {
                    return Err(EvalError::model(format!(
                        "model '{}' has no training data",
                        self.id
                    )));
                }
                if let Some(row) = self
                    .training_data
                    .iter()
                    .find(|row| row.len() != self.features.len())
                {
                    return Err(EvalError::model(format!(
                        "model '{}' has a training row of width {} for {} features",
                        self.id,
                        row.len(),
                        self.features.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Score a feature vector
    pub fn predict(&self, input: &[f64]) -> EvalResult<Prediction> {
        self.check()?;
        if input.len() != self.features.len() {
            return Err(EvalError::model(format!(
                "model '{}' expects {} features, got {}",
                self.id,
                self.features.len(),
                input.len()
            )));
        }

        let prediction = match self.kind {
            ModelKind::Classification => Prediction {
                score: sigmoid(dot(&self.weights, input) + self.bias),
                label: None,
            },
            ModelKind::Regression => Prediction {
                score: dot(&self.weights, input) + self.bias,
                label: None,
            },
            ModelKind::Clustering => {
                let (index, distance) = self
                    .training_data
                    .iter()
                    .enumerate()
                    .map(|(i, centroid)| (i, euclidean(centroid, input)))
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .ok_or_else(|| EvalError::model("no centroids"))?;
                Prediction {
                    score: 1.0 / (1.0 + distance),
                    label: Some(index),
                }
            }
            ModelKind::AnomalyDetection => {
                let center = centroid(&self.training_data);
                let spread = self
                    .training_data
                    .iter()
                    .map(|row| euclidean(row, &center))
                    .sum::<f64>()
                    / self.training_data.len() as f64;
                Prediction {
                    score: euclidean(input, &center) / spread.max(EPSILON),
                    label: None,
                }
            }
        };
        Ok(prediction)
    }

    /// Extract the model's own features from the context and score them
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> EvalResult<Prediction> {
        let input = extract_features(&self.features, ctx)?;
        self.predict(&input)
    }
}

/// Resolve each named feature into a numeric vector
pub fn extract_features(names: &[String], ctx: &EvaluationContext<'_>) -> EvalResult<Vec<f64>> {
    names.iter().map(|name| ctx.metric(name)).collect()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn centroid(rows: &[Vec<f64>]) -> Vec<f64> {
    let width = rows.first().map_or(0, Vec::len);
    let mut center = vec![0.0; width];
    for row in rows {
        for (c, v) in center.iter_mut().zip(row) {
            *c += v;
        }
    }
    let n = rows.len().max(1) as f64;
    center.iter_mut().for_each(|c| *c /= n);
    center
}
