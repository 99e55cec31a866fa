// ABOUTME: Session configuration: timeouts, keep-alive, request window and application callbacks
// ABOUTME: Built with SettingsBuilder and validated before a session is opened

use crate::error::{SmppError, SmppResult};
use crate::frame::Frame;
use crate::sequence::SequenceNumber;
use crate::session::State;
use crate::window::{DefaultStore, Request, RequestStore, Response};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Receives a PDU in default mode, along with whether it was already answered
pub type PduCallback = Arc<dyn Fn(Frame, bool) + Send + Sync>;

/// Handles a PDU the session does not answer by itself. Returns the
/// response to write, if any, and whether to close the bind.
pub type RequestCallback = Arc<dyn Fn(Frame) -> (Option<Frame>, bool) + Send + Sync>;

/// Receives a response matched with its windowed request
pub type ResponseCallback = Arc<dyn Fn(Response) + Send + Sync>;

/// Receives a single PDU with nothing to answer
pub type FrameCallback = Arc<dyn Fn(Frame) + Send + Sync>;

/// Receives a windowed request that expired. Returning `true` closes the bind.
pub type ExpiredRequestCallback = Arc<dyn Fn(Request) -> bool + Send + Sync>;

/// Receives a windowed request still pending when the session closes
pub type RequestLeftCallback = Arc<dyn Fn(Request) + Send + Sync>;

/// Reports a PDU that could not be submitted
pub type SubmitErrorCallback = Arc<dyn Fn(&Frame, &SmppError) + Send + Sync>;

pub type ErrorCallback = Arc<dyn Fn(&SmppError) + Send + Sync>;

pub type ClosedCallback = Arc<dyn Fn(State) + Send + Sync>;

pub type RebindCallback = Arc<dyn Fn() + Send + Sync>;

/// Request window tracking.
///
/// When configured, every windowable request written by the session is
/// recorded until its response arrives, it expires, or the session closes.
#[derive(Clone)]
pub struct WindowConfig {
    /// Where outstanding requests live (default: in-memory store)
    pub store: Option<Arc<dyn RequestStore>>,

    /// Maximum outstanding requests; submissions beyond it fail with
    /// [`SmppError::WindowFull`]
    pub max_window_size: usize,

    /// Age after which a request counts as expired (zero disables expiry)
    pub pdu_expire_timeout: Duration,

    /// How often the expiry sweep runs
    pub expire_check_timer: Duration,

    /// Upper bound on every store access
    pub store_access_timeout: Duration,
}

impl WindowConfig {
    pub fn new(max_window_size: usize) -> Self {
        Self {
            store: Some(Arc::new(DefaultStore::new())),
            max_window_size,
            pdu_expire_timeout: Duration::ZERO,
            expire_check_timer: Duration::ZERO,
            store_access_timeout: Duration::from_millis(100),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn RequestStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Expire requests older than `timeout`, checking every `check_every`
    pub fn with_expiry(mut self, timeout: Duration, check_every: Duration) -> Self {
        self.pdu_expire_timeout = timeout;
        self.expire_check_timer = check_every;
        self
    }

    pub fn with_store_access_timeout(mut self, timeout: Duration) -> Self {
        self.store_access_timeout = timeout;
        self
    }
}

impl fmt::Debug for WindowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowConfig")
            .field("store", &self.store.as_ref().map(|_| "RequestStore"))
            .field("max_window_size", &self.max_window_size)
            .field("pdu_expire_timeout", &self.pdu_expire_timeout)
            .field("expire_check_timer", &self.expire_check_timer)
            .field("store_access_timeout", &self.store_access_timeout)
            .finish()
    }
}

/// Configuration for a [`Session`](crate::session::Session).
///
/// Callbacks run on the session's tasks and must not block. To perform async
/// work from a callback, spawn a task.
#[derive(Clone)]
pub struct Settings {
    /// Deadline for each read. Must exceed `enquire_link`, otherwise an idle
    /// link times out before the keep-alive is answered.
    pub read_timeout: Duration,

    /// Deadline for each write (zero waits indefinitely)
    pub write_timeout: Duration,

    /// Interval between enquire_link PDUs (zero disables keep-alive)
    pub enquire_link: Duration,

    /// In window mode, answer enquire_link and unbind without asking
    /// `on_received_pdu_request`
    pub auto_respond: bool,

    pub window: Option<WindowConfig>,

    /// Source of sequence numbers for PDUs the session creates itself
    pub sequence: Arc<SequenceNumber>,

    pub on_pdu: Option<PduCallback>,
    pub on_all_pdu: Option<RequestCallback>,
    pub on_received_pdu_request: Option<RequestCallback>,
    pub on_expected_pdu_response: Option<ResponseCallback>,
    pub on_unexpected_pdu_response: Option<FrameCallback>,
    pub on_expired_pdu_request: Option<ExpiredRequestCallback>,
    pub on_close_pdu_request: Option<RequestLeftCallback>,
    pub on_submit_error: Option<SubmitErrorCallback>,
    pub on_receiving_error: Option<ErrorCallback>,
    pub on_rebinding_error: Option<ErrorCallback>,
    pub on_closed: Option<ClosedCallback>,
    pub on_rebind: Option<RebindCallback>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            enquire_link: Duration::from_secs(30),
            auto_respond: false,
            window: None,
            sequence: SequenceNumber::shared(),
            on_pdu: None,
            on_all_pdu: None,
            on_received_pdu_request: None,
            on_expected_pdu_response: None,
            on_unexpected_pdu_response: None,
            on_expired_pdu_request: None,
            on_close_pdu_request: None,
            on_submit_error: None,
            on_receiving_error: None,
            on_rebinding_error: None,
            on_closed: None,
            on_rebind: None,
        }
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Check the settings are usable before any connection is made
    pub fn validate(&self) -> SmppResult<()> {
        if self.read_timeout.is_zero() || self.read_timeout <= self.enquire_link {
            return Err(SmppError::InvalidSettings(
                "read_timeout must be greater than max(0, enquire_link)",
            ));
        }

        if let Some(window) = &self.window {
            if window.store.is_none() {
                return Err(SmppError::InvalidSettings(
                    "request window is configured without a store",
                ));
            }
            if window.max_window_size == 0 {
                return Err(SmppError::InvalidSettings("max_window_size must not be zero"));
            }
            if !window.pdu_expire_timeout.is_zero() && window.expire_check_timer.is_zero() {
                return Err(SmppError::InvalidSettings(
                    "expire_check_timer must be set when pdu_expire_timeout is set",
                ));
            }
            if window.store_access_timeout.is_zero() {
                return Err(SmppError::InvalidSettings(
                    "store_access_timeout must not be zero",
                ));
            }
        }

        Ok(())
    }

    /// Whether received responses are correlated through the window
    pub(crate) fn window_mode(&self) -> bool {
        self.window.is_some() && self.on_expected_pdu_response.is_some()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("enquire_link", &self.enquire_link)
            .field("auto_respond", &self.auto_respond)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

/// Consuming builder for [`Settings`]
///
/// ```rust
/// use smpp::session::{Settings, WindowConfig};
/// use std::time::Duration;
///
/// let settings = Settings::builder()
///     .read_timeout(Duration::from_secs(10))
///     .enquire_link(Duration::from_secs(5))
///     .window(WindowConfig::new(10).with_expiry(Duration::from_secs(30), Duration::from_secs(1)))
///     .on_expected_pdu_response(|response| println!("{:?}", response.frame))
///     .build()
///     .unwrap();
/// assert_eq!(settings.read_timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.settings.read_timeout = timeout;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.settings.write_timeout = timeout;
        self
    }

    pub fn enquire_link(mut self, interval: Duration) -> Self {
        self.settings.enquire_link = interval;
        self
    }

    pub fn auto_respond(mut self, enabled: bool) -> Self {
        self.settings.auto_respond = enabled;
        self
    }

    pub fn window(mut self, window: WindowConfig) -> Self {
        self.settings.window = Some(window);
        self
    }

    pub fn sequence(mut self, sequence: Arc<SequenceNumber>) -> Self {
        self.settings.sequence = sequence;
        self
    }

    pub fn on_pdu(mut self, callback: impl Fn(Frame, bool) + Send + Sync + 'static) -> Self {
        self.settings.on_pdu = Some(Arc::new(callback));
        self
    }

    pub fn on_all_pdu(
        mut self,
        callback: impl Fn(Frame) -> (Option<Frame>, bool) + Send + Sync + 'static,
    ) -> Self {
        self.settings.on_all_pdu = Some(Arc::new(callback));
        self
    }

    pub fn on_received_pdu_request(
        mut self,
        callback: impl Fn(Frame) -> (Option<Frame>, bool) + Send + Sync + 'static,
    ) -> Self {
        self.settings.on_received_pdu_request = Some(Arc::new(callback));
        self
    }

    pub fn on_expected_pdu_response(
        mut self,
        callback: impl Fn(Response) + Send + Sync + 'static,
    ) -> Self {
        self.settings.on_expected_pdu_response = Some(Arc::new(callback));
        self
    }

    pub fn on_unexpected_pdu_response(
        mut self,
        callback: impl Fn(Frame) + Send + Sync + 'static,
    ) -> Self {
        self.settings.on_unexpected_pdu_response = Some(Arc::new(callback));
        self
    }

    pub fn on_expired_pdu_request(
        mut self,
        callback: impl Fn(Request) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.settings.on_expired_pdu_request = Some(Arc::new(callback));
        self
    }

    pub fn on_close_pdu_request(mut self, callback: impl Fn(Request) + Send + Sync + 'static) -> Self {
        self.settings.on_close_pdu_request = Some(Arc::new(callback));
        self
    }

    pub fn on_submit_error(
        mut self,
        callback: impl Fn(&Frame, &SmppError) + Send + Sync + 'static,
    ) -> Self {
        self.settings.on_submit_error = Some(Arc::new(callback));
        self
    }

    pub fn on_receiving_error(
        mut self,
        callback: impl Fn(&SmppError) + Send + Sync + 'static,
    ) -> Self {
        self.settings.on_receiving_error = Some(Arc::new(callback));
        self
    }

    pub fn on_rebinding_error(
        mut self,
        callback: impl Fn(&SmppError) + Send + Sync + 'static,
    ) -> Self {
        self.settings.on_rebinding_error = Some(Arc::new(callback));
        self
    }

    pub fn on_closed(mut self, callback: impl Fn(State) + Send + Sync + 'static) -> Self {
        self.settings.on_closed = Some(Arc::new(callback));
        self
    }

    pub fn on_rebind(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.settings.on_rebind = Some(Arc::new(callback));
        self
    }

    /// Validate and return the settings
    pub fn build(self) -> SmppResult<Settings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
