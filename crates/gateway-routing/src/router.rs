//! Per-request attempt planning.

use std::fmt;
use std::sync::Arc;

use gateway_core::{Channel, GatewayError, GatewayResult, Token};
use tracing::debug;

use crate::eligibility::eligible_channels;
use crate::selector::{weighted_order, RandomSource, ThreadRandom};

/// Turns a channel snapshot into the ordered list of channels to attempt
#[derive(Clone)]
pub struct ChannelRouter {
    random: Arc<dyn RandomSource>,
}

impl ChannelRouter {
    /// Router backed by the thread-local RNG
    #[must_use]
    pub fn new() -> Self {
        Self::with_random(Arc::new(ThreadRandom))
    }

    /// Router backed by a specific random source
    #[must_use]
    pub fn with_random(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Eligible channels in weighted attempt order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NoAvailableChannels`] when filtering leaves
    /// nothing to try.
    pub fn plan(
        &self,
        channels: &[Channel],
        token: Option<&Token>,
        model: Option<&str>,
    ) -> GatewayResult<Vec<Channel>> {
        let candidates = eligible_channels(channels, token, model);
        if candidates.is_empty() {
            debug!(
                snapshot = channels.len(),
                model = model.unwrap_or(""),
                "No eligible channels"
            );
            return Err(GatewayError::NoAvailableChannels);
        }

        let ordered = weighted_order(candidates, self.random.as_ref());
        debug!(
            order = ?ordered.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            "Planned channel order"
        );
        Ok(ordered)
    }
}

impl Default for ChannelRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChannelRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRouter").finish_non_exhaustive()
    }
}
