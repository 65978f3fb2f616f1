use thiserror::Error;

pub type RestResult<T> = Result<T, RestError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestErrorKind {
    Connect,
    Send,
    Receive,
    Timeout,
    Rejected,
    Parse,
    Internal,
}

/// Failure of a single REST call.
///
/// `kind` groups into three families callers usually branch on: network
/// (`Connect`, `Send`, `Receive`, `Timeout`), http status (`Rejected`) and
/// decode (`Parse`).
#[derive(Clone, Debug, Error)]
#[error("rest error {kind:?} status={status:?} retryable={retryable} {message}")]
pub struct RestError {
    pub kind: RestErrorKind,
    pub status: Option<u16>,
    pub message: String,
    pub retryable: bool,
}

impl RestError {
    pub fn new(
        kind: RestErrorKind,
        status: Option<u16>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            retryable,
        }
    }

    pub fn connect(message: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Connect, status, message, retryable)
    }

    pub fn send(message: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Send, status, message, retryable)
    }

    pub fn receive(message: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Receive, status, message, retryable)
    }

    pub fn timeout(message: impl Into<String>, status: Option<u16>, retryable: bool) -> Self {
        Self::new(RestErrorKind::Timeout, status, message, retryable)
    }

    /// Non-2xx response. 429 and 5xx are flagged retryable.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        let retryable = status == 429 || status >= 500;
        Self::new(RestErrorKind::Rejected, Some(status), message, retryable)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(RestErrorKind::Parse, None, message, false)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RestErrorKind::Internal, None, message, false)
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let message = err.to_string();
        if err.is_timeout() {
            Self::timeout(message, status, true)
        } else if err.is_connect() {
            Self::connect(message, status, true)
        } else if err.is_body() || err.is_decode() {
            Self::receive(message, status, false)
        } else if err.is_builder() {
            Self::internal(message)
        } else {
            Self::send(message, status, err.is_request())
        }
    }

    pub fn kind(&self) -> RestErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn is_network(&self) -> bool {
        matches!(
            self.kind,
            RestErrorKind::Connect
                | RestErrorKind::Send
                | RestErrorKind::Receive
                | RestErrorKind::Timeout
        )
    }

    pub fn is_status(&self) -> bool {
        self.kind == RestErrorKind::Rejected
    }

    pub fn is_decode(&self) -> bool {
        self.kind == RestErrorKind::Parse
    }
}

impl From<sonic_rs::Error> for RestError {
    fn from(err: sonic_rs::Error) -> Self {
        Self::parse(err.to_string())
    }
}
