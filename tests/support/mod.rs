//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mindscape_ai::prelude::*;

/// Adapter that replays a script of outcomes. The last entry repeats once the
/// script runs out.
#[derive(Debug)]
pub struct ScriptedAdapter {
    id: ProviderId,
    script: Mutex<VecDeque<Result<String, TransportError>>>,
    calls: AtomicU32,
    saw_caller_key: Mutex<Vec<bool>>,
}

impl ScriptedAdapter {
    pub fn new(id: ProviderId, script: Vec<Result<String, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            id,
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
            saw_caller_key: Mutex::new(Vec::new()),
        })
    }

    pub fn always(id: ProviderId, outcome: Result<String, TransportError>) -> Arc<Self> {
        Self::new(id, vec![outcome])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether each call carried the caller's API key.
    pub fn caller_keys(&self) -> Vec<bool> {
        self.saw_caller_key.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn invoke(&self, request: &CanonicalRequest) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.saw_caller_key
            .lock()
            .unwrap()
            .push(request.api_key.is_some());
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script
                .front()
                .cloned()
                .unwrap_or(Err(TransportError::EmptyResponse))
        }
    }
}

/// Dispatch policy without waiting between attempts.
pub fn fast_policy() -> DispatchPolicy {
    DispatchPolicy::new().with_backoff(Duration::ZERO)
}

pub fn dispatcher(
    adapters: &[Arc<ScriptedAdapter>],
    monitor: Arc<HealthMonitor>,
) -> Dispatcher {
    dispatcher_with_policy(adapters, monitor, fast_policy())
}

pub fn dispatcher_with_policy(
    adapters: &[Arc<ScriptedAdapter>],
    monitor: Arc<HealthMonitor>,
    policy: DispatchPolicy,
) -> Dispatcher {
    let mut builder = Dispatcher::builder().monitor(monitor).policy(policy);
    for adapter in adapters {
        builder = builder.shared_adapter(adapter.clone());
    }
    builder.build().unwrap()
}

pub fn server_error() -> Result<String, TransportError> {
    Err(TransportError::Server {
        status: 503,
        message: "overloaded".to_string(),
    })
}

pub fn unauthorized() -> Result<String, TransportError> {
    Err(TransportError::Unauthorized {
        status: 401,
        message: "API key not valid".to_string(),
    })
}

pub fn mind_map_json() -> Result<String, TransportError> {
    Ok(r#"{"topic":"Cats","shortTitle":"Cats","icon":"cat","subTopics":[]}"#.to_string())
}
