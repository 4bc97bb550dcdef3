//! Zentel core: service-ticket normalization, enrichment, SLA evaluation
//! and operator/manager KPI aggregation.

pub mod config;
pub mod enricher;
pub mod error;
pub mod kpi;
pub mod loader;
pub mod normalizer;
pub mod pipeline;
pub mod sla;
pub mod stage;
pub mod table;
pub mod timestamp;
pub mod types;
