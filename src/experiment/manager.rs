//! Experiment registry and variant selection

use super::{
    AppliedVariant, ElasticityData, ExperimentError, PricingExperiment, VariantOutcome,
    VariantPrediction,
};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;

struct ExperimentRecord {
    experiment: PricingExperiment,
    outcomes: HashMap<String, VariantOutcome>,
}

/// Registry of pricing experiments
///
/// Live quoting only reads which variant applies; definitions and outcomes
/// are mutated through the bookkeeping methods.
#[derive(Default)]
pub struct ExperimentManager {
    experiments: RwLock<HashMap<Uuid, ExperimentRecord>>,
}

impl ExperimentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register an experiment, replacing one with the same id
    pub async fn register(&self, experiment: PricingExperiment) -> Result<Uuid, ExperimentError> {
        experiment.validate()?;
        let id = experiment.id;
        tracing::info!(
            experiment = %experiment.name,
            id = %id,
            variants = experiment.variants.len(),
            "Registered pricing experiment"
        );
        self.experiments.write().await.insert(
            id,
            ExperimentRecord {
                experiment,
                outcomes: HashMap::new(),
            },
        );
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Option<PricingExperiment> {
        self.experiments
            .read()
            .await
            .get(&id)
            .map(|r| r.experiment.clone())
    }

    /// All experiments ordered by start time
    pub async fn list(&self) -> Vec<PricingExperiment> {
        let mut all: Vec<_> = self
            .experiments
            .read()
            .await
            .values()
            .map(|r| r.experiment.clone())
            .collect();
        all.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));
        all
    }

    pub async fn remove(&self, id: Uuid) -> Result<PricingExperiment, ExperimentError> {
        self.experiments
            .write()
            .await
            .remove(&id)
            .map(|r| r.experiment)
            .ok_or(ExperimentError::NotFound(id))
    }

    /// Variant applying to a request, if any
    ///
    /// Only experiments running at `now` are considered, earliest start first.
    /// The same request key always lands in the same variant.
    pub async fn select_variant(
        &self,
        request_key: &str,
        segment: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<AppliedVariant> {
        let experiments = self.experiments.read().await;
        let mut active: Vec<_> = experiments
            .values()
            .map(|r| &r.experiment)
            .filter(|e| e.is_active(now))
            .collect();
        active.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));

        for experiment in active {
            let eligible: Vec<_> = experiment
                .variants
                .iter()
                .filter(|v| v.targets(segment))
                .collect();
            if eligible.is_empty() {
                continue;
            }
            let index = (bucket(experiment.id, request_key) % eligible.len() as u64) as usize;
            let variant = eligible[index];
            return Some(AppliedVariant {
                experiment_id: experiment.id,
                experiment_name: experiment.name.clone(),
                variant: variant.name.clone(),
                price_multiplier: variant.price_multiplier,
            });
        }
        None
    }

    /// Predicted conversion and revenue per variant
    pub async fn predict(
        &self,
        id: Uuid,
        elasticity: &ElasticityData,
    ) -> Result<Vec<VariantPrediction>, ExperimentError> {
        let experiments = self.experiments.read().await;
        let record = experiments.get(&id).ok_or(ExperimentError::NotFound(id))?;

        record
            .experiment
            .variants
            .iter()
            .map(|variant| {
                let conversion = predicted_conversion(
                    elasticity.base_conversion_rate,
                    variant.price_multiplier,
                    elasticity.elasticity,
                )?;
                let per_request = (conversion
                    * elasticity.average_order_value
                    * variant.price_multiplier)
                    .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
                Ok(VariantPrediction {
                    variant: variant.name.clone(),
                    price_multiplier: variant.price_multiplier,
                    expected_conversion_rate: conversion,
                    expected_revenue_per_request: per_request,
                    expected_revenue: (per_request * Decimal::from(elasticity.expected_requests))
                        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
                })
            })
            .collect()
    }

    /// Record one exposure and whether it converted
    pub async fn record_outcome(
        &self,
        id: Uuid,
        variant: &str,
        converted: bool,
        revenue: Decimal,
    ) -> Result<(), ExperimentError> {
        let mut experiments = self.experiments.write().await;
        let record = experiments.get_mut(&id).ok_or(ExperimentError::NotFound(id))?;
        if record.experiment.variant(variant).is_none() {
            return Err(ExperimentError::UnknownVariant {
                experiment_id: id,
                variant: variant.to_string(),
            });
        }

        let outcome = record.outcomes.entry(variant.to_string()).or_default();
        outcome.exposures += 1;
        if converted {
            outcome.conversions += 1;
            outcome.revenue += revenue;
        }
        Ok(())
    }

    /// Observed results keyed by variant name
    pub async fn observed(
        &self,
        id: Uuid,
    ) -> Result<HashMap<String, VariantOutcome>, ExperimentError> {
        let experiments = self.experiments.read().await;
        let record = experiments.get(&id).ok_or(ExperimentError::NotFound(id))?;
        Ok(record
            .experiment
            .variants
            .iter()
            .map(|v| {
                let outcome = record.outcomes.get(&v.name).cloned().unwrap_or_default();
                (v.name.clone(), outcome)
            })
            .collect())
    }

    /// Persist experiment definitions as JSON
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), ExperimentError> {
        let experiments = self.list().await;
        let json = serde_json::to_string_pretty(&experiments)
            .map_err(|e| ExperimentError::Persistence(e.to_string()))?;
        tokio::fs::write(path.as_ref(), json)
            .await
            .map_err(|e| ExperimentError::Persistence(e.to_string()))
    }

    /// Load experiment definitions saved by [`ExperimentManager::save`]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ExperimentError> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| ExperimentError::Persistence(e.to_string()))?;
        let experiments: Vec<PricingExperiment> = serde_json::from_str(&content)
            .map_err(|e| ExperimentError::Persistence(e.to_string()))?;

        let manager = Self::new();
        for experiment in experiments {
            manager.register(experiment).await?;
        }
        Ok(manager)
    }
}

/// Deterministic bucket for a request within an experiment
fn bucket(experiment_id: Uuid, request_key: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(experiment_id.as_bytes());
    hasher.update(request_key.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// `base × m^elasticity`, clamped to a valid rate
fn predicted_conversion(
    base: Decimal,
    multiplier: Decimal,
    elasticity: f64,
) -> Result<Decimal, ExperimentError> {
    let m = multiplier.to_f64().ok_or_else(|| ExperimentError::Invalid {
        field: "variants.price_multiplier".to_string(),
        reason: format!("{} not representable", multiplier),
    })?;
    let scale = Decimal::try_from(m.powf(elasticity)).map_err(|e| ExperimentError::Invalid {
        field: "elasticity".to_string(),
        reason: e.to_string(),
    })?;
    Ok((base * scale)
        .clamp(Decimal::ZERO, Decimal::ONE)
        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero))
}
