//! Candidate ordering.

use crate::types::{GenerationRequest, ProviderId};

/// One provider to try, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub provider: ProviderId,
    /// Forward the caller's API key to this candidate
    pub caller_credentials: bool,
}

/// Order the providers for `request`.
///
/// 1. An explicit provider goes first regardless of health.
/// 2. Otherwise a caller API key routes to the custom-key provider first.
/// 3. The default chain follows: hosted then backup, or backup then hosted
///    while the hosted provider is degraded.
///
/// Duplicates are dropped. Only the leading, caller-chosen candidate receives
/// the caller's key; fallbacks use their own credentials.
pub fn candidate_order(request: &GenerationRequest, hosted_degraded: bool) -> Vec<Candidate> {
    let mut order: Vec<Candidate> = Vec::with_capacity(3);

    if let Some(provider) = &request.provider {
        order.push(Candidate {
            provider: provider.clone(),
            caller_credentials: request.has_api_key(),
        });
    } else if request.has_api_key() {
        order.push(Candidate {
            provider: ProviderId::CustomKey,
            caller_credentials: true,
        });
    }

    let default_chain = if hosted_degraded {
        [ProviderId::Backup, ProviderId::Hosted]
    } else {
        [ProviderId::Hosted, ProviderId::Backup]
    };
    for provider in default_chain {
        if !order.iter().any(|c| c.provider == provider) {
            order.push(Candidate {
                provider,
                caller_credentials: false,
            });
        }
    }
    order
}
