//! HTTP administrative surface for the reconciliation/cascade core.

pub mod app;
