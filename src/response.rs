//! Response envelopes and the single place errors become replies.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::Environment;
use crate::errors::AppError;

pub const GENERIC_FAILURE: &str = "Something went very wrong";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
    Error,
}

impl Status {
    /// `fail` for client errors, `error` for server errors.
    #[must_use]
    pub const fn for_code(code: u16) -> Self {
        match code {
            500.. => Self::Error,
            400..=499 => Self::Fail,
            _ => Self::Success,
        }
    }
}

/// JSON body shared by every reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `Some(Value::Null)` renders as `"data": null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// `{status: "success", data: {<key>: <value>}}`
    #[must_use]
    pub fn success(key: &str, value: Value) -> Self {
        let mut data = Map::new();
        data.insert(key.to_string(), value);
        Self {
            status: Status::Success,
            results: None,
            message: None,
            error: None,
            data: Some(Value::Object(data)),
        }
    }

    #[must_use]
    pub fn deleted() -> Self {
        Self {
            status: Status::Success,
            results: None,
            message: None,
            error: None,
            data: Some(Value::Null),
        }
    }

    #[must_use]
    pub fn failure(status: Status, message: impl Into<String>) -> Self {
        Self { status, results: None, message: Some(message.into()), error: None, data: None }
    }

    #[must_use]
    pub fn with_results(mut self, n: usize) -> Self {
        self.results = Some(n);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Payload stored under `key` in `data`, if any.
    #[must_use]
    pub fn payload(&self, key: &str) -> Option<&Value> {
        self.data.as_ref()?.get(key)
    }
}

/// Status code plus envelope, handed to whatever transport emits it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub status_code: u16,
    pub envelope: Envelope,
}

impl Reply {
    #[must_use]
    pub fn new(status_code: u16, envelope: Envelope) -> Self {
        Self { status_code, envelope }
    }

    /// Body to emit; a 204 reply carries none.
    #[must_use]
    pub fn body(&self) -> Option<&Envelope> {
        (self.status_code != 204).then_some(&self.envelope)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// # Errors
    /// Returns an error if the envelope cannot be serialized.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        match self.body() {
            Some(body) => serde_json::to_string_pretty(body),
            None => Ok(String::new()),
        }
    }
}

/// Turns handler errors into replies. Development replies carry the raw error;
/// production replies only expose messages of operational errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator {
    environment: Environment,
}

impl ErrorTranslator {
    #[must_use]
    pub const fn new(environment: Environment) -> Self {
        Self { environment }
    }

    #[must_use]
    pub fn translate(&self, err: &AppError) -> Reply {
        let code = err.status_code();
        match self.environment {
            Environment::Development => {
                log::warn!("request failed ({code}): {err}");
                let mut envelope = Envelope::failure(Status::for_code(code), err.to_string());
                envelope.error = Some(format!("{err:?}"));
                Reply::new(code, envelope)
            }
            Environment::Production if err.is_operational() => {
                log::info!("request rejected ({code}): {err}");
                Reply::new(code, Envelope::failure(Status::for_code(code), err.client_message()))
            }
            Environment::Production => {
                log::error!("unexpected failure: {err}");
                Reply::new(500, Envelope::failure(Status::Error, GENERIC_FAILURE))
            }
        }
    }
}
