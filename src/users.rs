//! The user-creation call: POST a `NewUser` as JSON and hand back whatever the
//! server answers with.

use std::io::Write;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sonic_rs::Value;

use crate::adapter::{Client, RestRequest, RestTransport};
use crate::config::CallerConfig;
use crate::error::{RestError, RestResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Shape the reference users endpoint replies with on `201 Created`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedUser {
    pub id: i64,
    pub name: String,
}

#[derive(Clone)]
pub struct UserCreationCaller {
    client: Client,
    config: CallerConfig,
}

impl UserCreationCaller {
    pub fn new(config: CallerConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_transport<T>(transport: T, config: CallerConfig) -> Self
    where
        T: RestTransport + 'static,
    {
        Self::with_client(Client::with_transport(transport), config)
    }

    pub fn with_client(client: Client, config: CallerConfig) -> Self {
        Self { client, config }
    }

    pub fn request_for(&self, user: &NewUser) -> RestResult<RestRequest> {
        let request = RestRequest::post(self.config.users_url()).with_json(user)?;
        Ok(match self.config.timeout() {
            Some(timeout) => request.with_timeout(timeout),
            None => request,
        })
    }

    /// Creates the configured user and returns the response body as opaque JSON.
    pub async fn create_user(&self) -> RestResult<Value> {
        self.create_user_named(self.config.name.clone()).await
    }

    pub async fn create_user_named(&self, name: impl Into<String>) -> RestResult<Value> {
        self.create(&NewUser::new(name)).await
    }

    pub async fn create<T>(&self, user: &NewUser) -> RestResult<T>
    where
        T: DeserializeOwned,
    {
        let request = self.request_for(user)?;
        let url = request.url.clone();
        tracing::info!(%url, name = %user.name, "creating user");

        let result = self.client.execute_json_checked::<T>(request).await;
        if let Err(err) = &result {
            tracing::warn!(%url, kind = ?err.kind(), status = ?err.status(), "user creation failed: {}", err.message);
        }
        result
    }

    /// Creates the configured user and writes the parsed response to `out` as one
    /// line of compact JSON. Nothing is written when the call fails.
    pub async fn run<W: Write>(&self, out: &mut W) -> RestResult<Value> {
        let created = self.create_user().await?;
        let line = sonic_rs::to_string(&created)
            .map_err(|err| RestError::internal(format!("response encode failed: {err}")))?;
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|err| RestError::internal(format!("output write failed: {err}")))?;
        Ok(created)
    }
}
