// Route selector - chooses the venue for a swap request
// Same-chain requests go to the single-chain aggregator (or the bridge
// aggregator on bridge-first chains) with a one-shot fallback to the other
// venue; cross-chain requests go to the bridge aggregator only
//
// Numan Thabit 2025 Nov

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::SwapError;
use crate::router::routes::Route;
use crate::types::{ChainId, SwapRequest};
use crate::venues::{RouteSource, VenueSet};

/// Stateless composition of the venue adapters
#[derive(Clone)]
pub struct RouteSelector {
    venues: VenueSet,
    /// Chains where the bridge aggregator is canonical for same-chain swaps
    bridge_first: HashSet<ChainId>,
}

impl RouteSelector {
    pub fn new(venues: VenueSet, bridge_first: HashSet<ChainId>) -> Self {
        Self {
            venues,
            bridge_first,
        }
    }

    pub fn venues(&self) -> &VenueSet {
        &self.venues
    }

    /// Adapters to query for `req`, primary first.
    fn plan(&self, req: &SwapRequest) -> (Arc<dyn RouteSource>, Option<Arc<dyn RouteSource>>) {
        let bridge = self.venues.bridge().clone();
        if !req.is_same_chain() {
            return (bridge, None);
        }
        match self.venues.single_chain() {
            None => (bridge, None),
            Some(single) if self.bridge_first.contains(&req.source_chain()) => {
                (bridge, Some(single.clone()))
            }
            Some(single) => (single.clone(), Some(bridge)),
        }
    }

    /// Select a route for `req`.
    ///
    /// The fallback venue is queried only when the primary reports
    /// `NoLiquidity` or `InvalidPair`; its result (or error) is returned as is.
    #[tracing::instrument(skip_all, fields(from = %req.source_chain(), to = %req.destination_chain()))]
    pub async fn select(&self, req: &SwapRequest) -> Result<Route, SwapError> {
        let (primary, fallback) = self.plan(req);
        debug!(primary = %primary.kind(), has_fallback = fallback.is_some(), "selecting route");

        let err = match primary.quote(req).await {
            Ok(route) => {
                info!(venue = %route.venue(), route = %route.id(), "route selected");
                return Ok(route);
            }
            Err(err) => err,
        };

        match fallback {
            Some(fallback) if err.allows_fallback() => {
                info!(
                    primary = %primary.kind(),
                    fallback = %fallback.kind(),
                    error = %err,
                    "primary venue has no route, falling back"
                );
                let route = fallback.quote(req).await?;
                info!(venue = %route.venue(), route = %route.id(), "route selected");
                Ok(route)
            }
            _ => {
                debug!(venue = %primary.kind(), error = %err, "route selection failed");
                Err(err)
            }
        }
    }
}
