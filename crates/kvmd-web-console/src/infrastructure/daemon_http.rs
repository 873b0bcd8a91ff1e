//! HTTP access to the daemon's MSD API.
//!
//! [`DaemonClient`] wraps one `reqwest::Client` configured with the login
//! headers and resolves every endpoint against the configured base URL:
//!
//! | Call                  | Request                                  |
//! |-----------------------|------------------------------------------|
//! | [`msd_status`]        | `GET  kvmd/msd`                          |
//! | [`msd_connect`]       | `POST kvmd/msd/connect?to=<kvm|server>`  |
//! | [`msd_reset`]         | `POST kvmd/msd/reset`                    |
//! | [`upload_image`]      | `POST kvmd/msd/write` (multipart)        |
//!
//! Commands and uploads return a [`DaemonReply`] for any HTTP status: the
//! controller decides what a non-200 means.  Only transport failures are
//! errors.
//!
//! [`HttpMsdTransport`] adapts the client to the controller's
//! [`MsdTransport`] trait by running each request on its own Tokio task and
//! reporting the outcome as an [`MsdEvent`].
//!
//! [`msd_status`]: DaemonClient::msd_status
//! [`msd_connect`]: DaemonClient::msd_connect
//! [`msd_reset`]: DaemonClient::msd_reset
//! [`upload_image`]: DaemonClient::upload_image

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode, Url};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use kvmd_web_core::protocol::messages::ApiEnvelope;
use kvmd_web_core::{ImageFile, MsdCommand, MsdStatus, Target};

use crate::application::{MsdEvent, MsdTransport, UploadHandle, UploadId};
use crate::domain::{ConsoleConfig, Credentials};

/// Login headers (`X-KVMD-User`, `X-KVMD-Passwd`), lowercase as sent on the wire.
pub const USER_HEADER: &str = "x-kvmd-user";
pub const PASSWD_HEADER: &str = "x-kvmd-passwd";

/// Errors from talking to the daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("daemon request failed: status={status} body={body}")]
    BadStatus { status: u16, body: String },

    #[error("invalid daemon url: {0}")]
    InvalidUrl(String),

    #[error("cannot decode daemon response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0} contains characters not allowed in a header")]
    InvalidHeader(&'static str),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Status code and body text of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonReply {
    pub status: u16,
    pub body: String,
}

impl DaemonReply {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }
}

/// Client for the daemon's HTTP API.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    http: Client,
    base: Url,
    credentials: Option<Credentials>,
    timeout: Duration,
    chunk_size: usize,
}

impl DaemonClient {
    /// Builds a client from the console configuration.
    ///
    /// # Errors
    ///
    /// [`DaemonError::InvalidUrl`] if `daemon_url` is not an absolute
    /// `http`/`https` URL, [`DaemonError::InvalidHeader`] if the credentials
    /// cannot be sent as header values.
    pub fn new(config: &ConsoleConfig) -> Result<Self, DaemonError> {
        let base = normalize_base(&config.daemon_url)?;
        let credentials = config.credentials();

        let mut headers = HeaderMap::new();
        if let Some(creds) = &credentials {
            let user = HeaderValue::from_str(&creds.user)
                .map_err(|_| DaemonError::InvalidHeader(USER_HEADER))?;
            let mut passwd = HeaderValue::from_str(&creds.passwd)
                .map_err(|_| DaemonError::InvalidHeader(PASSWD_HEADER))?;
            passwd.set_sensitive(true);
            headers.insert(USER_HEADER, user);
            headers.insert(PASSWD_HEADER, passwd);
        }

        let http = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            http,
            base,
            credentials,
            timeout: config.http_timeout(),
            chunk_size: config.upload_chunk_size,
        })
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Resolves an API path such as `kvmd/msd` against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, DaemonError> {
        self.base
            .join(path)
            .map_err(|e| DaemonError::InvalidUrl(format!("{path}: {e}")))
    }

    /// The control WebSocket URL: `kvmd/ws` with `ws`/`wss` in place of
    /// `http`/`https`.
    pub fn ws_url(&self) -> Result<Url, DaemonError> {
        let mut url = self.endpoint("kvmd/ws")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| DaemonError::InvalidUrl(format!("cannot use {scheme} with {url}")))?;
        Ok(url)
    }

    /// Fetches the current MSD status snapshot.
    ///
    /// # Errors
    ///
    /// [`DaemonError::BadStatus`] for any status other than 200 or an
    /// envelope with `"ok": false`, [`DaemonError::Decode`] if the body is
    /// not an `{ok, result}` envelope around a status.
    pub async fn msd_status(&self) -> Result<MsdStatus, DaemonError> {
        let url = self.endpoint("kvmd/msd")?;
        debug!("GET {url}");
        let reply = reply_of(self.http.get(url).timeout(self.timeout).send().await?).await?;
        if !reply.is_ok() {
            return Err(DaemonError::BadStatus { status: reply.status, body: reply.body });
        }
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_str(&reply.body)?;
        if !envelope.ok {
            return Err(DaemonError::BadStatus { status: reply.status, body: reply.body });
        }
        Ok(serde_json::from_value(envelope.result)?)
    }

    pub async fn msd_connect(&self, target: Target) -> Result<DaemonReply, DaemonError> {
        let url = self.endpoint("kvmd/msd/connect")?;
        debug!("POST {url}?to={target}");
        let response = self
            .http
            .post(url)
            .query(&[("to", target.as_str())])
            .timeout(self.timeout)
            .send()
            .await?;
        reply_of(response).await
    }

    pub async fn msd_reset(&self) -> Result<DaemonReply, DaemonError> {
        let url = self.endpoint("kvmd/msd/reset")?;
        debug!("POST {url}");
        reply_of(self.http.post(url).timeout(self.timeout).send().await?).await
    }

    pub async fn send_command(&self, command: MsdCommand) -> Result<DaemonReply, DaemonError> {
        match command {
            MsdCommand::Connect(target) => self.msd_connect(target).await,
            MsdCommand::Reset => self.msd_reset().await,
        }
    }

    /// Streams `file` to the daemon as a multipart `image_name`/`image_data`
    /// form.
    ///
    /// The body is read from disk in `upload_chunk_size` pieces and
    /// `on_progress(loaded, total)` is called as each piece is handed to the
    /// HTTP body.  No timeout applies.
    ///
    /// # Errors
    ///
    /// [`DaemonError::Io`] if the file cannot be opened,
    /// [`DaemonError::Http`] if the transfer fails (including a read error
    /// midway, which aborts the request body).
    pub async fn upload_image<F>(
        &self,
        file: &ImageFile,
        on_progress: F,
    ) -> Result<DaemonReply, DaemonError>
    where
        F: FnMut(u64, u64) + Send + Sync + 'static,
    {
        let url = self.endpoint("kvmd/msd/write")?;
        let source = File::open(&file.path).await.map_err(|source| DaemonError::Io {
            path: file.path.clone(),
            source,
        })?;

        let reader = ChunkReader {
            file: source,
            chunk_size: self.chunk_size,
            loaded: 0,
            total: file.size,
            on_progress,
        };
        let body = Body::wrap_stream(stream::unfold(Some(reader), |state| async move {
            let mut reader = state?;
            match reader.next_chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(reader))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        }));

        let form = Form::new().text("image_name", file.name.clone()).part(
            "image_data",
            Part::stream_with_length(body, file.size).file_name(file.name.clone()),
        );

        info!(name = %file.name, size = file.size, "uploading image to {url}");
        reply_of(self.http.post(url).multipart(form).send().await?).await
    }
}

/// Parses the configured base URL and makes sure relative joins land below
/// its path.
fn normalize_base(raw: &str) -> Result<Url, DaemonError> {
    let mut url = Url::parse(raw).map_err(|e| DaemonError::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DaemonError::InvalidUrl(format!("{raw}: scheme must be http or https")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn reply_of(response: reqwest::Response) -> Result<DaemonReply, DaemonError> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(DaemonReply { status, body })
}

/// Reads an image file in fixed-size chunks, reporting progress per chunk.
struct ChunkReader<F> {
    file: File,
    chunk_size: usize,
    loaded: u64,
    total: u64,
    on_progress: F,
}

impl<F: FnMut(u64, u64)> ChunkReader<F> {
    async fn next_chunk(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        self.loaded += filled as u64;
        (self.on_progress)(self.loaded, self.total);
        Ok(Some(buf))
    }
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// [`MsdTransport`] over [`DaemonClient`].
///
/// Must be used from inside a Tokio runtime: every call spawns a task.
pub struct HttpMsdTransport {
    client: Arc<DaemonClient>,
    events: UnboundedSender<MsdEvent>,
}

impl HttpMsdTransport {
    pub fn new(client: Arc<DaemonClient>, events: UnboundedSender<MsdEvent>) -> Self {
        Self { client, events }
    }
}

/// Flattens a request result into the `(status, body)` pair the controller
/// reports; a transport failure becomes status 0 with the error text.
fn outcome(result: Result<DaemonReply, DaemonError>) -> (u16, String) {
    match result {
        Ok(reply) => (reply.status, reply.body),
        Err(e) => {
            warn!("daemon request failed: {e}");
            (0, e.to_string())
        }
    }
}

impl MsdTransport for HttpMsdTransport {
    fn start_upload(&self, id: UploadId, file: &ImageFile) -> UploadHandle {
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        let file = file.clone();

        let task = tokio::spawn(async move {
            let progress = events.clone();
            let result = client
                .upload_image(&file, move |loaded, total| {
                    let _ = progress.send(MsdEvent::UploadProgress { id, loaded, total: Some(total) });
                })
                .await;
            let (status, body) = outcome(result);
            if events.send(MsdEvent::UploadFinished { id, status, body }).is_err() {
                debug!(%id, "event loop gone before upload finished");
            }
        });

        let abort = task.abort_handle();
        UploadHandle::new(id, move || {
            debug!(%id, "cancelling upload task");
            abort.abort();
        })
    }

    fn send_command(&self, command: MsdCommand) {
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        tokio::spawn(async move {
            let (status, body) = outcome(client.send_command(command).await);
            if events.send(MsdEvent::CommandFinished { command, status, body }).is_err() {
                debug!(?command, "event loop gone before command finished");
            }
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
