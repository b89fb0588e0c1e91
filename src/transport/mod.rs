// Transport layer
// HTTP helpers for venue APIs and the JSON-RPC client used by chain signers
//
// Numan Thabit 2025 Nov

pub mod http;
pub mod jsonrpc;
