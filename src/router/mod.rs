// Router module - route model, venue selection and step execution
// This file wires the normalized route types, the selector that picks a
// venue for a request and the executor that submits route steps
//
// Numan Thabit 2025 Nov

pub mod execution;
pub mod routes;
pub mod selector;

pub use execution::{ExecutionStats, StepExecutor};
pub use routes::{FeeCategory, FeeItem, Route, RouteParts, RouteStep, TxTemplate, VenueKind};
pub use selector::RouteSelector;
