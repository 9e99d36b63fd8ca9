// Control-protocol HTTP client
//
// Wraps `reqwest::Client` with ZowieBox URL construction, envelope
// classification, one-shot re-authentication, and read retries. Endpoint
// groups (system, video, ...) are implemented as inherent methods in
// separate files to keep this module focused on transport mechanics.

use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::envelope::{Access, Module, Request, Response};
use crate::error::Error;
use crate::session::{Credentials, Session};
use crate::status::{FeatureDomain, StatusOutcome};
use crate::transport::{DEFAULT_RETRY_DELAYS, TransportConfig};

/// Stateful client for one device's control protocol.
///
/// Owns the device [`Session`]. `AuthRequired` is recovered locally exactly
/// once per call; every other status class reaches the caller.
pub struct ProtocolClient {
    http: reqwest::Client,
    base_url: Url,
    session: RwLock<Session>,
    retry_delays: Vec<Duration>,
}

impl ProtocolClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// A cookie jar is added if the config has none; some firmware ties the
    /// login to a cookie as well as the body credentials.
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url: with_trailing_slash(base_url),
            session: RwLock::new(Session::new(credentials)),
            retry_delays: config.retry_delays,
        })
    }

    /// Create a client with a pre-built `reqwest::Client` and the default
    /// retry schedule.
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: Credentials) -> Self {
        Self {
            http,
            base_url: with_trailing_slash(base_url),
            session: RwLock::new(Session::new(credentials)),
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
        }
    }

    /// Parse a user-supplied host (`192.168.1.5`, `box.local:8080`,
    /// `http://...`) into a base URL.
    pub fn parse_host(host: &str) -> Result<Url, Error> {
        let host = host.trim().trim_end_matches('/');
        let full = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_owned()
        } else {
            format!("http://{host}")
        };
        Ok(with_trailing_slash(Url::parse(&full)?))
    }

    /// The device base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// A copy of the current session state.
    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/{module}?option={getinfo|setinfo}&login_check_flag=1`
    pub(crate) fn module_url(&self, module: Module, access: Access) -> Result<Url, Error> {
        let mut url = self.base_url.join(module.as_ref())?;
        url.query_pairs_mut()
            .append_pair("option", access.option())
            .append_pair("login_check_flag", "1");
        Ok(url)
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Execute one logical operation.
    ///
    /// Reads retry transient failures on the configured schedule; writes are
    /// never retried automatically.
    pub async fn execute(&self, request: &Request) -> Result<Response, Error> {
        match request.access() {
            Access::Read => self.execute_with_retry(request).await,
            Access::Write => self.execute_authenticated(request).await,
        }
    }

    async fn execute_with_retry(&self, request: &Request) -> Result<Response, Error> {
        let mut delays = self.retry_delays.iter().enumerate();
        loop {
            match self.execute_authenticated(request).await {
                Err(e) if e.is_transient() => {
                    let Some((attempt, delay)) = delays.next() else {
                        return Err(e);
                    };
                    warn!(
                        group = request.group(),
                        attempt = attempt + 2,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "transient failure, retrying read"
                    );
                    tokio::time::sleep(*delay).await;
                }
                other => return other,
            }
        }
    }

    /// One exchange, plus a single re-login and replay on `AuthRequired`.
    async fn execute_authenticated(&self, request: &Request) -> Result<Response, Error> {
        match self.exchange(request).await {
            Err(Error::AuthRequired) => {
                debug!(group = request.group(), "session rejected, re-authenticating");
                self.login().await?;
                self.exchange(request).await
            }
            other => other,
        }
    }

    /// Authenticate with the stored credentials.
    ///
    /// `POST /system?option=setinfo` with `{"group": "user", "user", "psw"}`.
    pub async fn login(&self) -> Result<(), Error> {
        let credentials = self.session.read().await.credentials().clone();
        let request = Request::set(Module::System, "user");

        let response = match self.exchange(&request).await {
            Ok(response) => response,
            Err(
                Error::AuthRequired
                | Error::Feature {
                    domain: FeatureDomain::User,
                    ..
                },
            ) => {
                return Err(Error::AuthFailed {
                    message: format!("device rejected credentials for '{}'", credentials.username),
                });
            }
            Err(e) => return Err(e),
        };

        let token = response
            .data
            .as_ref()
            .and_then(|data| data.get("token"))
            .and_then(|token| token.as_str())
            .map(str::to_owned);

        self.session.write().await.record_login(token);
        debug!(user = %credentials.username, "authenticated");
        Ok(())
    }

    /// Single HTTP round trip, classified.
    async fn exchange(&self, request: &Request) -> Result<Response, Error> {
        let url = self.module_url(request.module(), request.access())?;
        let body = request.body(&*self.session.read().await);

        debug!(
            module = %request.module(),
            group = request.group(),
            opt = ?request.operation(),
            "POST {}",
            url.path()
        );

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::Transport)?
            .error_for_status()
            .map_err(Error::Transport)?;

        let text = resp.text().await.map_err(Error::Transport)?;
        let response: Response =
            serde_json::from_str(&text).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: text.clone(),
            })?;

        settle(request, response)
    }
}

/// Map a classified response onto `Ok` or the matching error.
fn settle(request: &Request, mut response: Response) -> Result<Response, Error> {
    let code = response.status.clone();
    let message = response.message().to_owned();

    match response.outcome() {
        StatusOutcome::Success => Ok(response),
        StatusOutcome::TransientBusy if request.expects_restart() => {
            debug!(group = request.group(), code = %code, "device restarting after write");
            response.restarting = true;
            Ok(response)
        }
        StatusOutcome::TransientBusy => Err(Error::TransientBusy { code, message }),
        StatusOutcome::ValidationError => Err(Error::Validation { code, message }),
        StatusOutcome::AuthRequired => Err(Error::AuthRequired),
        StatusOutcome::FeatureError(domain) => Err(Error::Feature {
            domain,
            code,
            message,
        }),
        StatusOutcome::Fatal => Err(Error::Device { code, message }),
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
