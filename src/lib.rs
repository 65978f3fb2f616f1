//! Create a user over a JSON REST endpoint, on top of a thin reqwest wrapper with
//! an in-memory mock transport for fully deterministic tests.

pub mod adapter;
pub mod config;
pub mod error;
pub mod mock;
pub mod users;

pub use reqwest::Method;

pub use adapter::{
    Client, JSON_CONTENT_TYPE, ReqwestTransport, RestBytes, RestFuture, RestRequest, RestResponse,
    RestTransport, RestTransportState,
};
pub use config::{CONFIG_ENV, CallerConfig, ConfigError};
pub use error::{RestError, RestErrorKind, RestResult};
pub use mock::{MockBehavior, MockBehaviorPlan, MockResponse, MockRestAdapter, MockRestStateSnapshot};
pub use users::{CreatedUser, NewUser, UserCreationCaller};
