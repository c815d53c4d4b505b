//! Integration tests for surge-pricing

mod support;

mod cache_test;
mod competition_test;
mod degraded_test;
mod experiment_test;
mod forecast_test;
mod pricing_test;
