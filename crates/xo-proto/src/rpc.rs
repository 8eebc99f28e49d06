//! JSON-RPC 2.0 frames as spoken by the Xen Orchestra API.
//!
//! One request or response per websocket text frame. Requests always carry
//! an object as `params` and a numeric `id`; responses carry either a
//! `result` or an `error` object.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtoError;

/// Protocol version string carried in every frame.
pub const JSONRPC_VERSION: &str = "2.0";

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// Keeps an explicit `null` distinct from an absent field.
fn deserialize_some<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Named request parameters.
pub type Params = Map<String, Value>;

/// A JSON-RPC request frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Protocol version, always `"2.0"`.
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    /// Remote method name, e.g. `xo.getAllObjects`.
    pub method: String,
    /// Named parameters.
    #[serde(default)]
    pub params: Params,
    /// Correlation id.
    pub id: u64,
}

impl Request {
    /// Build a request from any value that serializes to a JSON object.
    ///
    /// `()` and `null` become an empty parameter object.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` cannot be serialized or is not an object.
    pub fn new(id: u64, method: impl Into<String>, params: impl Serialize) -> Result<Self, ProtoError> {
        let method = method.into();
        let params = match serde_json::to_value(params)
            .map_err(|e| ProtoError::Encoding(e.to_string()))?
        {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ProtoError::InvalidParams {
                    method,
                    found: json_type_name(&other),
                });
            }
        };

        Ok(Self {
            jsonrpc: default_version(),
            method,
            params,
            id,
        })
    }

    /// Serialize to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }
}

/// A JSON-RPC response frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Protocol version.
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    /// Success payload. `Some(Value::Null)` is a successful `null` result.
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    /// Error object, if the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    /// Correlation id. `None` when the server could not read the request id.
    pub id: Option<u64>,
}

impl Response {
    /// Create a success response.
    #[must_use]
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            result: Some(result),
            error: None,
            id: Some(id),
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn failure(id: u64, error: RpcError) -> Self {
        Self {
            jsonrpc: default_version(),
            result: None,
            error: Some(error),
            id: Some(id),
        }
    }

    /// Parse a response from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid response frame.
    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|e| ProtoError::Decoding(e.to_string()))
    }

    /// Serialize to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtoError> {
        serde_json::to_string(self).map_err(|e| ProtoError::Encoding(e.to_string()))
    }

    /// Split into the success payload or the remote error.
    ///
    /// A frame with neither `result` nor `error` is treated as a `null` result.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A JSON-RPC error object as returned by the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Structured detail, frequently a list of validation errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Create an error object without data.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jsonrpc2: code {} message: {}", self.code, self.message)?;
        match &self.data {
            None | Some(Value::Null) => Ok(()),
            Some(data) => write!(f, ": {data}"),
        }
    }
}

impl std::error::Error for RpcError {}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
