//! Intercepts outbound HTTP calls and records or replays them.
//!
//! One [`Interceptor`] is bound to one cassette for the life of a test.
//! Each request is answered in one of three ways, decided by the record
//! mode, whether the cassette file existed when the interceptor was built,
//! and whether an unconsumed stored interaction matches:
//!
//! | mode           | match found | no match                         |
//! |----------------|-------------|----------------------------------|
//! | `none`         | replay      | `CassetteMiss`                   |
//! | `once` (file)  | replay      | `CassetteMiss`                   |
//! | `once` (new)   | record      | record                           |
//! | `new_episodes` | replay      | record, appended to the cassette |
//! | `all`          | record      | record                           |
//!
//! Loopback hosts (with `ignore_localhost`), hosts in `ignore_hosts`, and
//! every request while the configuration is disabled skip the cassette.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::Url;
use tracing::debug;

use crate::adapters::live::LiveTransport;
use crate::cassette::config::{RecordMode, VcrConfig};
use crate::cassette::encoding;
use crate::cassette::filter::FilterPolicy;
use crate::cassette::format::{Cassette, Interaction};
use crate::cassette::matcher::{MatchPolicy, RequestView};
use crate::cassette::name::CassetteName;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::store;
use crate::error::VcrError;
use crate::ports::http::{
    HttpRequest, HttpResponse, HttpTransport, TransportError, TransportFuture,
};

/// Per-session mutable state.
struct Session {
    recorder: CassetteRecorder,
    replayer: CassetteReplayer,
    played: usize,
    recorded: usize,
}

/// What to do with a request that reached the cassette.
enum Decision {
    Replay(HttpResponse),
    Record,
}

/// Record/replay interceptor wrapping a real transport.
pub struct Interceptor {
    config: VcrConfig,
    name: CassetteName,
    filter: FilterPolicy,
    policy: MatchPolicy,
    existed: bool,
    inner: Box<dyn HttpTransport>,
    session: Mutex<Session>,
}

impl Interceptor {
    /// Binds `inner` to the cassette `name`.
    ///
    /// The cassette file is read here, so a corrupt file fails before any
    /// request is attempted. Under `all` the stored interactions are
    /// discarded and the file is re-recorded from scratch. While the
    /// configuration is disabled the file is not read at all.
    ///
    /// # Errors
    ///
    /// Returns [`VcrError::CassetteCorrupt`] for a malformed cassette and
    /// [`VcrError::Io`] if it cannot be read.
    pub fn new(
        config: VcrConfig,
        name: CassetteName,
        inner: Box<dyn HttpTransport>,
    ) -> Result<Self, VcrError> {
        let path = config.cassette_path(&name);
        let loaded = if config.disabled { None } else { store::load(&path)? };
        let existed = loaded.is_some();

        let cassette = match (config.record_mode, loaded) {
            (RecordMode::All, _) | (_, None) => Cassette::default(),
            (_, Some(cassette)) => cassette,
        };
        let replayer =
            CassetteReplayer::new(&cassette).map_err(|reason| VcrError::corrupt(&path, reason))?;

        let filter = config.filter_policy();
        let recorder = CassetteRecorder::new(&path, cassette, filter.clone());

        debug!(
            cassette = %name,
            path = %path.display(),
            mode = %config.record_mode,
            existed,
            stored = replayer.len(),
            disabled = config.disabled,
            "cassette bound"
        );

        Ok(Self {
            policy: config.match_policy(),
            filter,
            existed,
            name,
            config,
            inner,
            session: Mutex::new(Session { recorder, replayer, played: 0, recorded: 0 }),
        })
    }

    /// Binds a [`LiveTransport`] configured from `config` to the cassette `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the cassette
    /// cannot be loaded.
    pub fn live(config: VcrConfig, name: CassetteName) -> Result<Self, VcrError> {
        let transport = LiveTransport::new(config.decode_compressed_response)
            .map_err(|e| VcrError::Transport(Box::new(e)))?;
        Self::new(config, name, Box::new(transport))
    }

    /// Answers `request` from the cassette or the network, per the record mode.
    ///
    /// # Errors
    ///
    /// - [`VcrError::CassetteMiss`] when nothing matches and the mode forbids
    ///   a live call.
    /// - [`VcrError::Transport`] when the live call fails; nothing is recorded.
    /// - [`VcrError::Io`] when the recorded cassette cannot be written.
    pub async fn intercept(&self, request: &HttpRequest) -> Result<HttpResponse, VcrError> {
        if self.config.disabled {
            debug!(cassette = %self.name, uri = %request.uri, "recording disabled, going live");
            return self.inner.send(request).await.map_err(VcrError::Transport);
        }
        if self.bypasses(&request.uri) {
            debug!(cassette = %self.name, uri = %request.uri, "ignored host, going live");
            return self.inner.send(request).await.map_err(VcrError::Transport);
        }

        match self.decide(request)? {
            Decision::Replay(response) => Ok(response),
            Decision::Record => {
                let mut response =
                    self.inner.send(request).await.map_err(VcrError::Transport)?;
                if self.config.decode_compressed_response {
                    response = encoding::decode_response(response);
                }
                self.commit(request, &response)?;
                Ok(response)
            }
        }
    }

    /// Runs [`intercept`](Self::intercept) to completion on a private
    /// current-thread runtime, for callers without one of their own.
    ///
    /// # Errors
    ///
    /// Same as [`intercept`](Self::intercept), plus [`VcrError::Config`]
    /// when called from inside an async runtime and [`VcrError::Io`] if the
    /// runtime cannot be started.
    pub fn intercept_blocking(&self, request: &HttpRequest) -> Result<HttpResponse, VcrError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(VcrError::Config(
                "intercept_blocking called inside an async runtime; use intercept".into(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| VcrError::io(self.cassette_path(), e))?;
        runtime.block_on(self.intercept(request))
    }

    fn decide(&self, request: &HttpRequest) -> Result<Decision, VcrError> {
        let mode = self.config.record_mode;
        let uri = self.filter.filter_uri(&request.uri);
        let view = RequestView { method: &request.method, uri: &uri, body: &request.body };

        let may_replay = match mode {
            RecordMode::All => false,
            RecordMode::Once => self.existed,
            RecordMode::NewEpisodes | RecordMode::None => true,
        };
        let may_record = match mode {
            RecordMode::None => false,
            RecordMode::Once => !self.existed,
            RecordMode::NewEpisodes | RecordMode::All => true,
        };

        let mut session = self.lock();
        if may_replay {
            if let Some(index) = session.replayer.take_match(&self.policy, &view) {
                let response = session.recorder.interactions()[index]
                    .to_response()
                    .map_err(|reason| VcrError::corrupt(session.recorder.path(), reason))?;
                session.played += 1;
                debug!(cassette = %self.name, index, request = %view.signature(), "replaying");
                return Ok(Decision::Replay(response));
            }
        }

        if may_record {
            debug!(cassette = %self.name, request = %view.signature(), "recording");
            return Ok(Decision::Record);
        }

        let cassette = if self.existed {
            self.name.to_string()
        } else {
            format!("{} (no cassette file at {})", self.name, session.recorder.path().display())
        };
        Err(VcrError::CassetteMiss { cassette, request: view.signature() })
    }

    fn commit(&self, request: &HttpRequest, response: &HttpResponse) -> Result<(), VcrError> {
        let mut session = self.lock();
        let Session { recorder, replayer, .. } = &mut *session;
        let interaction = recorder.capture(request, response);
        recorder.append(interaction.clone())?;
        replayer
            .push_recorded(&interaction)
            .map_err(|reason| VcrError::corrupt(recorder.path(), reason))?;
        session.recorded += 1;
        Ok(())
    }

    fn bypasses(&self, uri: &str) -> bool {
        let Some(host) = Url::parse(uri).ok().and_then(|u| u.host_str().map(str::to_string))
        else {
            return false;
        };
        (self.config.ignore_localhost && is_loopback_host(&host))
            || self.config.ignore_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host))
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cassette this interceptor is bound to.
    #[must_use]
    pub fn cassette_name(&self) -> &CassetteName {
        &self.name
    }

    /// The cassette file path.
    #[must_use]
    pub fn cassette_path(&self) -> PathBuf {
        self.config.cassette_path(&self.name)
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &VcrConfig {
        &self.config
    }

    /// Whether the cassette file existed when the interceptor was built.
    #[must_use]
    pub fn cassette_existed(&self) -> bool {
        self.existed
    }

    /// Snapshot of the interactions currently held for this cassette.
    #[must_use]
    pub fn interactions(&self) -> Vec<Interaction> {
        self.lock().recorder.interactions().to_vec()
    }

    /// Number of responses served from the cassette.
    #[must_use]
    pub fn play_count(&self) -> usize {
        self.lock().played
    }

    /// Number of live exchanges recorded.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.lock().recorded
    }

    /// Whether every stored interaction has been served or recorded this session.
    #[must_use]
    pub fn all_played(&self) -> bool {
        self.lock().replayer.all_consumed()
    }
}

impl HttpTransport for Interceptor {
    fn send(&self, request: &HttpRequest) -> TransportFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            self.intercept(&request).await.map_err(|e| Box::new(e) as TransportError)
        })
    }
}

/// `localhost`, `*.localhost`, loopback and unspecified IPs.
fn is_loopback_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }
    host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback() || ip.is_unspecified())
}
