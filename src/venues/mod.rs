// Venue adapter module
// This file defines the adapter traits every liquidity venue implements
// and the venue set shared by the route selector and the step executor
//
// Numan Thabit 2025 Nov

pub mod lifi;
pub mod swap_api;

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::SwapError;
use crate::router::routes::{Route, TxTemplate, VenueKind};
use crate::types::{ChainId, SwapRequest};

pub use lifi::LifiAdapter;
pub use swap_api::SwapApiAdapter;

/// Quote + template source for one venue.
///
/// Adapters classify their own failures into [`SwapError`] and never retry:
/// quotes are price-sensitive and retrying is the caller's decision.
#[async_trait]
pub trait RouteSource: Send + Sync {
    fn kind(&self) -> VenueKind;

    /// Fetch a normalized route for `req`.
    async fn quote(&self, req: &SwapRequest) -> Result<Route, SwapError>;

    /// Fetch a fresh unsigned transaction for step `index` of a route this
    /// adapter produced.
    async fn step_transaction(
        &self,
        route: &Route,
        index: usize,
        signer_address: &str,
    ) -> Result<TxTemplate, SwapError>;
}

#[async_trait]
impl<T: RouteSource + ?Sized> RouteSource for Arc<T> {
    fn kind(&self) -> VenueKind {
        (**self).kind()
    }

    async fn quote(&self, req: &SwapRequest) -> Result<Route, SwapError> {
        (**self).quote(req).await
    }

    async fn step_transaction(
        &self,
        route: &Route,
        index: usize,
        signer_address: &str,
    ) -> Result<TxTemplate, SwapError> {
        (**self).step_transaction(route, index, signer_address).await
    }
}

/// Input of the bridge status RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusQuery {
    pub tx_hash: String,
    /// Bridge tool tag of the tracked step
    pub tool: String,
    pub from_chain: ChainId,
    pub to_chain: ChainId,
}

/// Raw status document, before mapping to a settlement status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: String,
    pub substatus: Option<String>,
}

impl StatusReport {
    pub fn new(status: impl Into<String>, substatus: Option<&str>) -> Self {
        Self {
            status: status.into(),
            substatus: substatus.map(str::to_string),
        }
    }
}

/// Bridge status RPC.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn status(&self, query: &StatusQuery) -> Result<StatusReport, SwapError>;
}

/// The adapters available to one engine.
#[derive(Clone)]
pub struct VenueSet {
    single_chain: Option<Arc<dyn RouteSource>>,
    bridge: Arc<dyn RouteSource>,
}

impl VenueSet {
    pub fn new(single_chain: Option<Arc<dyn RouteSource>>, bridge: Arc<dyn RouteSource>) -> Self {
        Self {
            single_chain,
            bridge,
        }
    }

    pub fn single_chain(&self) -> Option<&Arc<dyn RouteSource>> {
        self.single_chain.as_ref()
    }

    pub fn bridge(&self) -> &Arc<dyn RouteSource> {
        &self.bridge
    }

    /// Adapter that produced routes tagged with `kind`.
    pub fn get(&self, kind: VenueKind) -> Option<&Arc<dyn RouteSource>> {
        match kind {
            VenueKind::SingleChain => self.single_chain.as_ref(),
            VenueKind::Bridge => Some(&self.bridge),
        }
    }
}
