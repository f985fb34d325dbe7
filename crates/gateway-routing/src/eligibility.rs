//! Eligibility filtering.

use gateway_core::{Channel, Token};

/// Narrow a channel snapshot to the candidates for one request.
///
/// Keeps active channels the token may use. When a model is requested, keeps
/// channels that advertise it or advertise nothing at all; if that leaves
/// nothing, the whole allowed set is returned instead so stale model metadata
/// never turns into a spurious "no channel" failure.
#[must_use]
pub fn eligible_channels(
    channels: &[Channel],
    token: Option<&Token>,
    model: Option<&str>,
) -> Vec<Channel> {
    let allowed: Vec<&Channel> = channels
        .iter()
        .filter(|c| c.is_active())
        .filter(|c| token.map_or(true, |t| t.allows_channel(&c.id)))
        .collect();

    let Some(model) = model.filter(|m| !m.is_empty()) else {
        return allowed.into_iter().cloned().collect();
    };

    let matching: Vec<&Channel> = allowed
        .iter()
        .copied()
        .filter(|c| c.supported_models.is_empty() || c.supports_model(model))
        .collect();

    if matching.is_empty() {
        allowed.into_iter().cloned().collect()
    } else {
        matching.into_iter().cloned().collect()
    }
}
