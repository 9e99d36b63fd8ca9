// Control-protocol envelope
//
// Requests are `{group, opt?, data?, opid?, point?}` plus the occasional
// top-level field some groups insist on (`venc`, `volume`, `url`, ...).
// Responses are `{status, rsp, data?}`; a few groups put their payload in a
// sibling key instead of `data`, so unknown top-level keys are retained.

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::session::Session;
use crate::status::{classify, StatusOutcome};

/// Device endpoint a request is posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Module {
    System,
    Video,
    Audio,
    Stream,
    Streamplay,
    Ptz,
}

/// Read (`getinfo`) or write (`setinfo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    pub fn option(self) -> &'static str {
        match self {
            Self::Read => "getinfo",
            Self::Write => "setinfo",
        }
    }
}

/// Positional argument for point-addressed operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x_percent: f64,
    pub y_percent: f64,
    pub d_pixel: i64,
}

// ── Request ──────────────────────────────────────────────────────────

/// One logical control-protocol operation.
#[derive(Debug, Clone)]
pub struct Request {
    module: Module,
    access: Access,
    group: String,
    opt: Option<String>,
    data: Option<Value>,
    opid: Option<i64>,
    point: Option<Point>,
    fields: Map<String, Value>,
    expects_restart: bool,
}

impl Request {
    /// A `getinfo` request against `module` for `group`.
    pub fn get(module: Module, group: impl Into<String>) -> Self {
        Self::new(module, Access::Read, group.into())
    }

    /// A `setinfo` request against `module` for `group`.
    pub fn set(module: Module, group: impl Into<String>) -> Self {
        Self::new(module, Access::Write, group.into())
    }

    fn new(module: Module, access: Access, group: String) -> Self {
        Self {
            module,
            access,
            group,
            opt: None,
            data: None,
            opid: None,
            point: None,
            fields: Map::new(),
            expects_restart: false,
        }
    }

    pub fn opt(mut self, opt: impl Into<String>) -> Self {
        self.opt = Some(opt.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn opid(mut self, opid: i64) -> Self {
        self.opid = Some(opid);
        self
    }

    pub fn point(mut self, point: Point) -> Self {
        self.point = Some(point);
        self
    }

    /// Add a top-level body field outside `data`.
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Mark a write that makes the device restart its media pipeline.
    ///
    /// A restart status on such a write is reported as success with
    /// [`Response::restarting`] set.
    pub fn expecting_restart(mut self) -> Self {
        self.expects_restart = true;
        self
    }

    pub fn module(&self) -> Module {
        self.module
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn operation(&self) -> Option<&str> {
        self.opt.as_deref()
    }

    pub fn expects_restart(&self) -> bool {
        self.expects_restart
    }

    /// Serialize to the wire body. Writes carry the session credentials.
    pub(crate) fn body(&self, session: &Session) -> Value {
        let mut body = Map::new();
        body.insert("group".into(), Value::String(self.group.clone()));
        if let Some(ref opt) = self.opt {
            body.insert("opt".into(), Value::String(opt.clone()));
        }
        if let Some(ref data) = self.data {
            body.insert("data".into(), data.clone());
        }
        if let Some(opid) = self.opid {
            body.insert("opid".into(), Value::from(opid));
        }
        if let Some(point) = self.point {
            body.insert(
                "point".into(),
                serde_json::json!({
                    "x_percent": point.x_percent,
                    "y_percent": point.y_percent,
                    "d_pixel": point.d_pixel,
                }),
            );
        }
        for (key, value) in &self.fields {
            body.insert(key.clone(), value.clone());
        }

        if self.access == Access::Write {
            let credentials = session.credentials();
            body.insert("user".into(), Value::String(credentials.username.clone()));
            body.insert(
                "psw".into(),
                Value::String(credentials.password.expose_secret().to_owned()),
            );
            if let Some(token) = session.token() {
                body.insert("token".into(), Value::String(token.to_owned()));
            }
        }

        Value::Object(body)
    }
}

// ── Response ─────────────────────────────────────────────────────────

/// Decoded response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default, deserialize_with = "status_code")]
    pub status: String,
    #[serde(default)]
    pub rsp: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    /// Sibling payload keys such as `venc`, `all`, or `publish`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Set when a restart status was accepted for a restart-inducing write.
    #[serde(skip)]
    pub restarting: bool,
}

impl Response {
    pub fn outcome(&self) -> StatusOutcome {
        classify(&self.status)
    }

    /// Human-readable `rsp` text.
    pub fn message(&self) -> &str {
        self.rsp.as_deref().unwrap_or("unknown error")
    }

    /// Decode `data` into a typed record. Absent `data` decodes as `{}`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let value = match self.data {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(ref value) => value.clone(),
        };
        decode_value(value)
    }

    /// A payload section: top-level key first, then the same key inside `data`.
    pub fn section(&self, key: &str) -> Option<&Value> {
        self.extra
            .get(key)
            .or_else(|| self.data.as_ref().and_then(|data| data.get(key)))
            .filter(|value| !value.is_null())
    }

    /// Decode a payload section, defaulting when it is absent.
    pub fn decode_section<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, Error> {
        self.section(key)
            .map_or_else(|| Ok(T::default()), |value| decode_value(value.clone()))
    }
}

pub(crate) fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    let body = value.to_string();
    serde_json::from_value(value).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

/// Status arrives as a zero-padded string on every firmware seen so far,
/// but a bare number is accepted too.
fn status_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}
