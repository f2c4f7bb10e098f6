//! Generation dispatcher
//!
//! The single entry point feature code uses to obtain structured output.
//! A call plans an ordered candidate list from the request and the health
//! monitor, then walks it: every candidate gets a fixed attempt budget, every
//! attempt after the first waits a fixed backoff, and every outcome is
//! reported to the monitor. Attempts are strictly sequential.

mod plan;
mod policy;

pub use plan::{Candidate, candidate_order};
pub use policy::{DEFAULT_ATTEMPTS_PER_CANDIDATE, DEFAULT_BACKOFF, DispatchPolicy};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::adapter::{CanonicalRequest, ProviderAdapter};
use crate::error::GenerationError;
use crate::extract::Extractor;
use crate::health::{HealthMonitor, ProviderReport};
use crate::types::{AttemptOutcome, GenerationRequest, ProviderId, RetryAttempt};

/// Routes structured-generation requests across provider adapters.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
    monitor: Arc<HealthMonitor>,
    policy: DispatchPolicy,
    extractor: Extractor,
}

static_assertions::assert_impl_all!(Dispatcher: Send, Sync);

#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
    monitor: Option<Arc<HealthMonitor>>,
    policy: DispatchPolicy,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own identity, replacing any previous one.
    pub fn adapter<A: ProviderAdapter + 'static>(self, adapter: A) -> Self {
        self.shared_adapter(Arc::new(adapter))
    }

    pub fn shared_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.id(), adapter);
        self
    }

    /// Share a monitor owned by the composition root. A fresh one is created
    /// when none is given.
    pub fn monitor(mut self, monitor: Arc<HealthMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<Dispatcher, GenerationError> {
        if self.adapters.is_empty() {
            return Err(GenerationError::ConfigurationError(
                "at least one provider adapter is required".to_string(),
            ));
        }
        Ok(Dispatcher {
            adapters: self.adapters,
            monitor: self.monitor.unwrap_or_default(),
            extractor: Extractor::with_max_depth(self.policy.max_extraction_depth),
            policy: self.policy,
        })
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub const fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    pub fn providers(&self) -> Vec<ProviderId> {
        let mut ids: Vec<ProviderId> = self.adapters.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Health snapshot for status endpoints.
    pub fn health_report(&self) -> Vec<ProviderReport> {
        self.monitor.report()
    }

    /// Candidates this dispatcher would try for `request`, in order.
    ///
    /// Providers without a registered adapter are skipped, except an explicit
    /// provider, which must be registered.
    pub fn plan(&self, request: &GenerationRequest) -> Result<Vec<Candidate>, GenerationError> {
        if let Some(explicit) = &request.provider {
            if !self.adapters.contains_key(explicit) {
                return Err(GenerationError::InvalidRequest(format!(
                    "no adapter registered for provider `{explicit}`"
                )));
            }
        }

        let hosted_degraded = self.monitor.is_degraded(&ProviderId::Hosted);
        let planned: Vec<Candidate> = candidate_order(request, hosted_degraded)
            .into_iter()
            .filter(|c| {
                let registered = self.adapters.contains_key(&c.provider);
                if !registered && c.caller_credentials {
                    tracing::warn!(
                        target: "mindscape_ai::dispatch",
                        provider = %c.provider,
                        "no adapter for caller-selected provider, skipping"
                    );
                }
                registered
            })
            .collect();

        if planned.is_empty() {
            return Err(GenerationError::ConfigurationError(
                "no registered adapter can serve this request".to_string(),
            ));
        }
        Ok(planned)
    }

    /// Produce the structured value for `request`.
    pub async fn generate_content(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        let span = tracing::info_span!(
            target: "mindscape_ai::dispatch",
            "generate_content",
            request_id = %Uuid::new_v4(),
            schema = request.target_schema.as_ref().map(|s| s.name()).unwrap_or("none"),
        );
        self.run(request).instrument(span).await
    }

    /// Produce the structured value and decode it into `T`.
    pub async fn generate_typed<T: DeserializeOwned>(&self, request: &GenerationRequest) -> Result<T, GenerationError> {
        let value = self.generate_content(request).await?;
        serde_json::from_value(value).map_err(|e| GenerationError::SchemaValidationFailed {
            schema: std::any::type_name::<T>().to_string(),
            violations: vec![e.to_string()],
        })
    }

    /// Like [`generate_content`](Self::generate_content), but substitutes
    /// `fallback` when every candidate is exhausted. Other errors still
    /// propagate.
    pub async fn generate_or(&self, request: &GenerationRequest, fallback: Value) -> Result<Value, GenerationError> {
        match self.generate_content(request).await {
            Err(GenerationError::AllCandidatesExhausted { attempts, last }) => {
                tracing::warn!(
                    target: "mindscape_ai::dispatch",
                    attempts,
                    last_error = %last,
                    "generation unavailable, using fallback value"
                );
                Ok(fallback)
            }
            other => other,
        }
    }

    async fn run(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        request.validate()?;
        let candidates = self.plan(request)?;
        let strict = request.is_strict();

        tracing::debug!(
            target: "mindscape_ai::dispatch",
            candidates = ?candidates.iter().map(|c| c.provider.as_str()).collect::<Vec<_>>(),
            strict,
            "planned candidates"
        );

        let with_key = CanonicalRequest::from_request(request, self.policy.json_enforcement);
        let without_key = CanonicalRequest {
            api_key: None,
            ..with_key.clone()
        };

        let mut index: u32 = 0;
        let mut last_error: Option<GenerationError> = None;

        for candidate in &candidates {
            let Some(adapter) = self.adapters.get(&candidate.provider) else {
                continue;
            };
            let canonical = if candidate.caller_credentials {
                &with_key
            } else {
                &without_key
            };

            for _ in 0..self.policy.attempts_per_candidate {
                if index > 0 {
                    tokio::time::sleep(self.policy.delay()).await;
                }
                let started = Instant::now();
                let result = self
                    .attempt(adapter.as_ref(), &candidate.provider, canonical, request, strict)
                    .await;
                let mut record = RetryAttempt {
                    index,
                    provider: candidate.provider.clone(),
                    elapsed: started.elapsed(),
                    outcome: AttemptOutcome::Success,
                };
                index += 1;

                let error = match result {
                    Ok(value) => {
                        self.monitor.record_success(&candidate.provider);
                        tracing::info!(
                            target: "mindscape_ai::dispatch",
                            provider = %candidate.provider,
                            attempt = record.index + 1,
                            elapsed_ms = record.elapsed.as_millis() as u64,
                            "generation succeeded"
                        );
                        return Ok(value);
                    }
                    Err(error) => error,
                };

                record.outcome = AttemptOutcome::from_error(&error);
                let retryable = error.is_retryable();

                if !retryable && candidate.caller_credentials {
                    if let GenerationError::ProviderUnavailable { source, .. } = &error {
                        tracing::warn!(target: "mindscape_ai::dispatch", "{record}; caller credentials rejected");
                        return Err(GenerationError::Unauthenticated {
                            provider: candidate.provider.clone(),
                            message: source.to_string(),
                        });
                    }
                }

                self.monitor.record_failure(&candidate.provider);
                tracing::warn!(target: "mindscape_ai::dispatch", error = %error, "{record}");
                last_error = Some(error);

                if !retryable {
                    // server credentials will not start working on a retry
                    break;
                }
            }
        }

        let last = last_error.unwrap_or_else(|| {
            GenerationError::ConfigurationError("no candidate was attempted".to_string())
        });
        tracing::error!(
            target: "mindscape_ai::dispatch",
            attempts = index,
            last_error = %last,
            "all candidates exhausted"
        );
        Err(GenerationError::AllCandidatesExhausted {
            attempts: index,
            last: Box::new(last),
        })
    }

    async fn attempt(
        &self,
        adapter: &dyn ProviderAdapter,
        provider: &ProviderId,
        canonical: &CanonicalRequest,
        request: &GenerationRequest,
        strict: bool,
    ) -> Result<Value, GenerationError> {
        let raw = adapter
            .invoke(canonical)
            .await
            .map_err(|source| GenerationError::ProviderUnavailable {
                provider: provider.clone(),
                source,
            })?;

        let schema = request.target_schema.as_ref();
        let value = self.extractor.extract(&raw, schema)?;

        if let Some(schema) = schema {
            let violations = schema.violations(&value);
            if !violations.is_empty() {
                if strict {
                    return Err(GenerationError::SchemaValidationFailed {
                        schema: schema.name().to_string(),
                        violations,
                    });
                }
                tracing::warn!(
                    target: "mindscape_ai::dispatch",
                    provider = %provider,
                    schema = schema.name(),
                    violations = %violations.join("; "),
                    "returning partially valid output"
                );
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::schema::catalog;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct Fixed {
        id: ProviderId,
        reply: Result<String, TransportError>,
        calls: AtomicU32,
    }

    impl Fixed {
        fn new(id: ProviderId, reply: Result<&str, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                id,
                reply: reply.map(str::to_string),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ProviderAdapter for Fixed {
        fn id(&self) -> ProviderId {
            self.id.clone()
        }

        async fn invoke(&self, _request: &CanonicalRequest) -> Result<String, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn fast() -> DispatchPolicy {
        DispatchPolicy::new().with_backoff(Duration::ZERO)
    }

    #[test]
    fn build_requires_an_adapter() {
        assert!(matches!(
            Dispatcher::builder().build(),
            Err(GenerationError::ConfigurationError(_))
        ));
    }

    #[test]
    fn unknown_explicit_provider_is_invalid() {
        let hosted = Fixed::new(ProviderId::Hosted, Ok("{}"));
        let dispatcher = Dispatcher::builder().shared_adapter(hosted).build().unwrap();
        let request = GenerationRequest::new("s", "u").with_provider(ProviderId::Backup);
        assert!(matches!(
            dispatcher.plan(&request),
            Err(GenerationError::InvalidRequest(_))
        ));
    }

    #[test]
    fn unregistered_fallbacks_are_skipped() {
        let hosted = Fixed::new(ProviderId::Hosted, Ok("{}"));
        let dispatcher = Dispatcher::builder().shared_adapter(hosted).build().unwrap();
        let plan = dispatcher.plan(&GenerationRequest::new("s", "u")).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].provider, ProviderId::Hosted);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_without_calls() {
        let hosted = Fixed::new(ProviderId::Hosted, Ok("{}"));
        let dispatcher = Dispatcher::builder()
            .shared_adapter(hosted.clone())
            .policy(fast())
            .build()
            .unwrap();
        let err = dispatcher
            .generate_content(&GenerationRequest::new("s", "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
        assert_eq!(hosted.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_strict_returns_partial_value() {
        let hosted = Fixed::new(ProviderId::Hosted, Ok(r#"{"topic": "Cats"}"#));
        let dispatcher = Dispatcher::builder()
            .shared_adapter(hosted.clone())
            .policy(fast())
            .build()
            .unwrap();
        let request = GenerationRequest::new("s", "u")
            .with_schema(catalog::mind_map())
            .with_strict(false);
        let value = dispatcher.generate_content(&request).await.unwrap();
        assert_eq!(value["topic"], "Cats");
        assert_eq!(hosted.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn strict_rejects_partial_value() {
        let hosted = Fixed::new(ProviderId::Hosted, Ok(r#"{"topic": "Cats"}"#));
        let dispatcher = Dispatcher::builder()
            .shared_adapter(hosted.clone())
            .policy(fast())
            .build()
            .unwrap();
        let request = GenerationRequest::new("s", "u").with_schema(catalog::mind_map());
        let err = dispatcher.generate_content(&request).await.unwrap_err();
        match err {
            GenerationError::AllCandidatesExhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, GenerationError::SchemaValidationFailed { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(hosted.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn server_key_rejection_skips_remaining_attempts() {
        let hosted = Fixed::new(
            ProviderId::Hosted,
            Err(TransportError::Unauthorized {
                status: 401,
                message: "bad server key".into(),
            }),
        );
        let backup = Fixed::new(ProviderId::Backup, Ok(r#"{"answer": "hi"}"#));
        let dispatcher = Dispatcher::builder()
            .shared_adapter(hosted.clone())
            .shared_adapter(backup.clone())
            .policy(fast())
            .build()
            .unwrap();
        let value = dispatcher
            .generate_content(&GenerationRequest::new("s", "u").with_schema(catalog::chat_answer()))
            .await
            .unwrap();
        assert_eq!(value["answer"], "hi");
        assert_eq!(hosted.calls.load(Ordering::SeqCst), 1);
        assert_eq!(backup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn typed_decode() {
        #[derive(serde::Deserialize)]
        struct Answer {
            answer: String,
        }
        let hosted = Fixed::new(ProviderId::Hosted, Ok("```json\n{\"answer\": \"42\"}\n```"));
        let dispatcher = Dispatcher::builder()
            .shared_adapter(hosted)
            .policy(fast())
            .build()
            .unwrap();
        let request = GenerationRequest::new("s", "u").with_schema(catalog::chat_answer());
        let answer: Answer = dispatcher.generate_typed(&request).await.unwrap();
        assert_eq!(answer.answer, "42");
    }
}
