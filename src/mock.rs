use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use sonic_rs::to_vec;

use crate::adapter::{
    RestBytes, RestFuture, RestRequest, RestResponse, RestTransport, RestTransportState,
};
use crate::error::{RestError, RestErrorKind, RestResult};

/// What the mock does with the next request.
#[derive(Clone, Debug, Default)]
pub enum MockBehavior {
    #[default]
    Pass,
    Delay(Duration),
    Reject {
        status: u16,
        reason: String,
    },
    Fail {
        kind: RestErrorKind,
        status: Option<u16>,
        reason: String,
        retryable: bool,
    },
    Drop,
}

impl MockBehavior {
    pub fn delay(ms: u64) -> Self {
        Self::Delay(Duration::from_millis(ms))
    }

    pub fn reject(status: u16, reason: impl Into<String>) -> Self {
        Self::Reject {
            status,
            reason: reason.into(),
        }
    }

    fn fail(kind: RestErrorKind, reason: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::Fail {
            kind,
            status,
            reason: reason.into(),
            retryable,
        }
    }

    pub fn connect_error(reason: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::fail(RestErrorKind::Connect, reason, status, retryable)
    }

    pub fn send_error(reason: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::fail(RestErrorKind::Send, reason, status, retryable)
    }

    pub fn receive_error(reason: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::fail(RestErrorKind::Receive, reason, status, retryable)
    }

    pub fn timeout_error(reason: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::fail(RestErrorKind::Timeout, reason, status, retryable)
    }

    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self::fail(RestErrorKind::Internal, reason, None, false)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockBehaviorPlan {
    request: VecDeque<MockBehavior>,
}

impl MockBehaviorPlan {
    pub fn push(&mut self, behavior: MockBehavior) -> &mut Self {
        self.request.push_back(behavior);
        self
    }

    fn pop(&mut self) -> MockBehavior {
        self.request.pop_front().unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, RestBytes)>,
    pub body: RestBytes,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<RestBytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<RestBytes>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, body.into())
    }

    pub fn json<T: Serialize>(status: u16, payload: &T) -> RestResult<Self> {
        let body = to_vec(payload).map_err(RestError::from)?;
        Ok(Self::new(status, body).with_header("content-type", Bytes::from_static(b"application/json")))
    }
}

#[derive(Clone, Debug)]
pub struct MockRestStateSnapshot {
    pub state: RestTransportState,
    pub request_count: usize,
    pub last_url: Option<String>,
    pub last_status: Option<u16>,
    pub behavior_remaining: usize,
    pub response_queue_len: usize,
    pub elapsed_total: Duration,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct MockRestAdapterState {
    state: RestTransportState,
    request_count: usize,
    last_url: Option<String>,
    last_status: Option<u16>,
    behavior_plan: MockBehaviorPlan,
    default_response_queue: VecDeque<MockResponse>,
    route_response_queues: HashMap<(Method, String), VecDeque<MockResponse>>,
    outbound_log: Vec<RestRequest>,
    last_error: Option<String>,
    elapsed_total: Duration,
}

impl MockRestAdapterState {
    fn snapshot(&self) -> MockRestStateSnapshot {
        MockRestStateSnapshot {
            state: self.state,
            request_count: self.request_count,
            last_url: self.last_url.clone(),
            last_status: self.last_status,
            behavior_remaining: self.behavior_plan.request.len(),
            response_queue_len: self.default_response_queue.len()
                + self.route_response_queues.values().map(VecDeque::len).sum::<usize>(),
            elapsed_total: self.elapsed_total,
            last_error: self.last_error.clone(),
        }
    }

    fn next_response(&mut self, request: &RestRequest) -> Option<MockResponse> {
        let route_key = (request.method.clone(), request.url.clone());
        if let Some(response) = self
            .route_response_queues
            .get_mut(&route_key)
            .and_then(VecDeque::pop_front)
        {
            return Some(response);
        }
        self.default_response_queue.pop_front()
    }
}

impl Default for MockRestAdapterState {
    fn default() -> Self {
        Self {
            state: RestTransportState::Idle,
            request_count: 0,
            last_url: None,
            last_status: None,
            behavior_plan: MockBehaviorPlan::default(),
            default_response_queue: VecDeque::new(),
            route_response_queues: HashMap::new(),
            outbound_log: Vec::new(),
            last_error: None,
            elapsed_total: Duration::ZERO,
        }
    }
}

/// In-memory `RestTransport` for deterministic tests: scripted behaviors,
/// queued responses and a log of every request it was handed.
#[derive(Clone, Debug, Default)]
pub struct MockRestAdapter {
    state: Arc<Mutex<MockRestAdapterState>>,
}

impl MockRestAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior_plan(behavior_plan: MockBehaviorPlan) -> Self {
        let state = MockRestAdapterState {
            behavior_plan,
            ..MockRestAdapterState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    // A test that panicked mid-request poisons the lock; the state is still usable.
    fn lock(&self) -> MutexGuard<'_, MockRestAdapterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> MockRestStateSnapshot {
        self.lock().snapshot()
    }

    pub fn queue_response(&self, response: MockResponse) {
        self.lock().default_response_queue.push_back(response);
    }

    pub fn queue_response_for(&self, method: Method, url: impl Into<String>, response: MockResponse) {
        self.lock()
            .route_response_queues
            .entry((method, url.into()))
            .or_default()
            .push_back(response);
    }

    pub fn queue_post_response(&self, url: impl Into<String>, response: MockResponse) {
        self.queue_response_for(Method::POST, url, response);
    }

    pub fn outbound_requests(&self) -> Vec<RestRequest> {
        self.lock().outbound_log.clone()
    }

    pub fn last_request(&self) -> Option<RestRequest> {
        self.lock().outbound_log.last().cloned()
    }

    pub fn clear_logs(&self) {
        self.lock().outbound_log.clear();
    }

    fn record_error(&self, error: RestError) -> RestError {
        let mut state = self.lock();
        state.state = RestTransportState::Error;
        state.last_error = Some(error.message.clone());
        state.last_status = error.status;
        error
    }

    fn record_response(&self, response: &RestResponse) {
        let mut state = self.lock();
        state.last_status = Some(response.status);
        state.state = RestTransportState::Idle;
        state.elapsed_total += response.elapsed;
    }
}

impl RestTransport for MockRestAdapter {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>> {
        let adapter = self.clone();
        Box::pin(async move {
            let behavior = adapter.lock().behavior_plan.pop();
            if let MockBehavior::Delay(duration) = behavior {
                tokio::time::sleep(duration).await;
            }

            let start = Instant::now();
            {
                let mut state = adapter.lock();
                state.outbound_log.push(request.clone());
                state.request_count += 1;
                state.last_url = Some(request.url.clone());
                state.state = RestTransportState::Busy;
                state.last_error = None;
            }

            match behavior {
                MockBehavior::Drop => {
                    return Err(adapter.record_error(RestError::timeout(
                        "mock transport dropped response",
                        None,
                        false,
                    )));
                }
                MockBehavior::Fail {
                    kind,
                    status,
                    reason,
                    retryable,
                } => {
                    return Err(adapter.record_error(RestError::new(kind, status, reason, retryable)));
                }
                MockBehavior::Reject { status, reason } => {
                    return Err(adapter.record_error(RestError::rejected(status, reason)));
                }
                MockBehavior::Delay(_) | MockBehavior::Pass => {}
            }

            let queued = adapter.lock().next_response(&request);
            let response = match queued {
                Some(queued) => RestResponse {
                    status: queued.status,
                    headers: queued.headers,
                    body: queued.body,
                    elapsed: start.elapsed(),
                },
                None => RestResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: Bytes::new(),
                    elapsed: start.elapsed(),
                },
            };
            adapter.record_response(&response);
            Ok(response)
        })
    }
}
