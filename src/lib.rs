// Library root module for xswap
// This file defines the public API and module structure of the cross-chain
// swap orchestration core: venue adapters, route selection, step execution,
// settlement tracking and the swap session state machine
//
// Numan Thabit 2025 Nov

pub mod amounts;
pub mod config;
pub mod control;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod router;
pub mod session;
pub mod settlement;
pub mod signers;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod venues;

pub use engine::SwapEngine;
pub use errors::{ErrorKind, SwapError};
pub use session::{SessionPhase, SwapSession};
pub use types::{Asset, ChainFamily, ChainId, SwapRequest};
