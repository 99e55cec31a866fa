// ABOUTME: Long-lived SMPP session handle that owns the current bound transceiver
// ABOUTME: Rebinds automatically after an unexpected close and keeps the same handle for callers

use crate::datatypes::{BindingType, SystemId};
use crate::error::{SmppError, SmppResult};
use crate::frame::Frame;
use crate::sequence::SequenceNumber;
use crate::session::State;
use crate::session::connector::Connector;
use crate::session::settings::{ClosedCallback, Settings};
use crate::session::transceivable::Transceivable;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A bound SMPP session.
///
/// The session binds once when created. With a non-zero rebind interval,
/// any close other than [`Session::close`] triggers a background rebind:
/// the connector is retried every interval until it succeeds or the session
/// is closed. Submissions made while rebinding fail with
/// [`SmppError::Closing`].
///
/// ```rust,no_run
/// use smpp::datatypes::{Address, ShortMessage, SubmitSm};
/// use smpp::session::{Auth, Session, Settings, TcpConnector};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let auth = Auth::new("localhost:2775", "system_id".parse()?, "password".parse()?);
///     let settings = Settings::builder()
///         .on_pdu(|pdu, responded| println!("{pdu:?} (responded: {responded})"))
///         .build()?;
///
///     let session = Session::new(TcpConnector::transceiver(auth), settings, Duration::from_secs(5)).await?;
///
///     let submit = SubmitSm::new(
///         session.next_sequence_number(),
///         Address::international("447700900123")?,
///         Address::international("447700900456")?,
///         ShortMessage::new("Hello, World!")?,
///     );
///     session.submit(submit).await?;
///
///     session.close().await;
///     Ok(())
/// }
/// ```
pub struct Session {
    shared: Arc<SessionShared>,
}

struct SessionShared {
    connector: Box<dyn Connector>,
    settings: Arc<Settings>,
    rebind_interval: Duration,
    current: RwLock<Option<Arc<Transceivable>>>,
    alive: AtomicBool,
    rebinding: AtomicBool,
    cancel: CancellationToken,
}

impl Session {
    /// Validate `settings`, connect and bind.
    ///
    /// A zero `rebind_interval` disables automatic rebinding; the session
    /// then stays closed after any failure.
    pub async fn new(
        connector: impl Connector + 'static,
        settings: Settings,
        rebind_interval: Duration,
    ) -> SmppResult<Session> {
        settings.validate()?;

        let connection = connector.connect().await?;

        let shared = Arc::new_cyclic(|weak: &Weak<SessionShared>| {
            let mut settings = settings;
            if !rebind_interval.is_zero() {
                settings.on_closed = Some(rebind_on_close(weak.clone(), settings.on_closed.take()));
            }

            SessionShared {
                connector: Box::new(connector),
                settings: Arc::new(settings),
                rebind_interval,
                current: RwLock::new(None),
                alive: AtomicBool::new(true),
                rebinding: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }
        });

        let transceivable = Transceivable::start(connection, shared.settings.clone());
        shared.replace(Some(transceivable));
        debug!(
            binding_type = %shared.connector.binding_type(),
            "session bound"
        );

        Ok(Session { shared })
    }

    /// Submit a PDU through the current transceiver
    pub async fn submit(&self, frame: impl Into<Frame>) -> SmppResult<()> {
        let transceivable = self.shared.current().ok_or(SmppError::Closing)?;
        transceivable.submit(frame.into()).await
    }

    /// Next sequence number from the session's sequence source
    pub fn next_sequence_number(&self) -> u32 {
        self.shared.settings.sequence.next()
    }

    pub fn sequence(&self) -> &Arc<SequenceNumber> {
        &self.shared.settings.sequence
    }

    pub fn binding_type(&self) -> BindingType {
        self.shared.connector.binding_type()
    }

    /// system_id the SMSC returned in its bind response, or `None` while
    /// rebinding
    pub fn system_id(&self) -> Option<SystemId> {
        self.shared.current().map(|t| t.system_id())
    }

    /// Number of requests awaiting a response in the request window
    pub async fn window_size(&self) -> SmppResult<usize> {
        let transceivable = self.shared.current().ok_or(SmppError::Closing)?;
        transceivable.window_size().await
    }

    /// True while a bound transceiver is running, false while rebinding
    pub fn is_bound(&self) -> bool {
        self.shared.current().is_some_and(|t| t.is_alive())
    }

    pub fn is_closed(&self) -> bool {
        !self.shared.alive.load(Ordering::Acquire)
    }

    /// Close the session. Stops any rebind in progress, unbinds and releases
    /// the connection. Calling this more than once is harmless.
    pub async fn close(&self) {
        if self
            .shared
            .alive
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        debug!("closing session");

        self.shared.cancel.cancel();
        if let Some(transceivable) = self.shared.replace(None) {
            transceivable.close().await;
        }
    }
}

impl SessionShared {
    fn current(&self) -> Option<Arc<Transceivable>> {
        self.current.read().ok().and_then(|current| current.clone())
    }

    fn replace(&self, next: Option<Arc<Transceivable>>) -> Option<Arc<Transceivable>> {
        match self.current.write() {
            Ok(mut current) => std::mem::replace(&mut *current, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        }
    }

    /// Store a freshly bound transceiver unless the session closed meanwhile.
    /// Returns it back when it was not installed.
    fn install(&self, transceivable: Arc<Transceivable>) -> Option<Arc<Transceivable>> {
        let mut current = match self.current.write() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !self.alive.load(Ordering::Acquire) {
            return Some(transceivable);
        }
        *current = Some(transceivable);
        None
    }

    /// Start a rebind on its own task unless one is already running
    fn rebind(self: &Arc<Self>) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }
        if self
            .rebinding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let shared = self.clone();
        tokio::spawn(async move { shared.rebind_loop().await });
    }

    async fn rebind_loop(self: Arc<Self>) {
        if let Some(previous) = self.replace(None) {
            previous.close().await;
        }

        let mut attempt: u32 = 0;
        while self.alive.load(Ordering::Acquire) {
            attempt += 1;
            debug!(attempt, "rebinding");

            match self.connector.connect().await {
                Ok(connection) => {
                    let transceivable = Transceivable::start(connection, self.settings.clone());
                    if let Some(orphan) = self.install(transceivable) {
                        orphan.close().await;
                        break;
                    }
                    self.rebinding.store(false, Ordering::Release);
                    debug!(attempt, "rebind complete");
                    if let Some(on_rebind) = &self.settings.on_rebind {
                        on_rebind();
                    }
                    return;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "rebind failed");
                    if let Some(on_rebinding_error) = &self.settings.on_rebinding_error {
                        on_rebinding_error(&e);
                    }
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.rebind_interval) => {}
                    }
                }
            }
        }

        self.rebinding.store(false, Ordering::Release);
    }
}

/// Wraps the application's close callback: explicit closes are swallowed,
/// everything else is reported and then triggers a rebind
fn rebind_on_close(
    session: Weak<SessionShared>,
    original: Option<ClosedCallback>,
) -> ClosedCallback {
    Arc::new(move |state: State| {
        if state == State::ExplicitClosing {
            return;
        }
        if let Some(on_closed) = &original {
            on_closed(state);
        }
        if let Some(session) = session.upgrade() {
            session.rebind();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::datatypes::{BindRequest, BindResponse, EnquireLink, Unbind};
    use crate::session::connector::bind;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::io::duplex;
    use tokio::sync::mpsc;

    const TIMEOUT: Duration = Duration::from_secs(1);

    /// Binds over in-memory pipes and hands the SMSC side to the test.
    /// `plan` decides attempt by attempt whether connecting succeeds.
    struct FakeConnector {
        attempts: Arc<AtomicUsize>,
        plan: StdMutex<VecDeque<bool>>,
        smscs: mpsc::UnboundedSender<Connection>,
    }

    impl FakeConnector {
        fn new(plan: &[bool]) -> (Self, Arc<AtomicUsize>, mpsc::UnboundedReceiver<Connection>) {
            let attempts = Arc::new(AtomicUsize::new(0));
            let (smscs, rx) = mpsc::unbounded_channel();
            let connector = FakeConnector {
                attempts: attempts.clone(),
                plan: StdMutex::new(plan.iter().copied().collect()),
                smscs,
            };
            (connector, attempts, rx)
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        fn binding_type(&self) -> BindingType {
            BindingType::Transceiver
        }

        async fn connect(&self) -> SmppResult<Connection> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.plan.lock().unwrap().pop_front().unwrap_or(true) {
                return Err(SmppError::Connection(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    "refused",
                )));
            }

            let (client, server) = duplex(4096);
            let smscs = self.smscs.clone();
            tokio::spawn(async move {
                let mut smsc = Connection::new(server);
                let frame = smsc.read_frame(TIMEOUT).await.unwrap().unwrap();
                let Frame::BindRequest(request) = frame else {
                    panic!("expected bind request, got {frame:?}");
                };
                let response = BindResponse::new(
                    request.binding_type,
                    request.sequence_number,
                    "SMSC".parse().unwrap(),
                );
                smsc.write_frame(&Frame::BindResponse(response), TIMEOUT)
                    .await
                    .unwrap();
                let _ = smscs.send(smsc);
            });

            let request = BindRequest::new(
                BindingType::Transceiver,
                attempt as u32,
                "esme".parse().unwrap(),
                "secret".parse().unwrap(),
            );
            bind(Connection::new(client), request, TIMEOUT).await
        }
    }

    type States = Arc<StdMutex<Vec<State>>>;

    fn recording(builder: crate::session::SettingsBuilder) -> (Settings, States, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let states: States = Arc::new(StdMutex::new(Vec::new()));
        let rebinds = Arc::new(AtomicUsize::new(0));
        let rebind_errors = Arc::new(AtomicUsize::new(0));

        let (s, r, e) = (states.clone(), rebinds.clone(), rebind_errors.clone());
        let settings = builder
            .on_closed(move |state| s.lock().unwrap().push(state))
            .on_rebind(move || {
                r.fetch_add(1, Ordering::SeqCst);
            })
            .on_rebinding_error(move |_| {
                e.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();
        (settings, states, rebinds, rebind_errors)
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    async fn next_smsc(smscs: &mut mpsc::UnboundedReceiver<Connection>) -> Connection {
        tokio::time::timeout(TIMEOUT, smscs.recv())
            .await
            .expect("no bind within timeout")
            .expect("connector dropped")
    }

    #[tokio::test]
    async fn submit_reaches_smsc_and_close_unbinds() {
        let (connector, _, mut smscs) = FakeConnector::new(&[]);
        let (settings, states, _, _) = recording(Settings::builder());

        let session = Session::new(connector, settings, Duration::ZERO).await.unwrap();
        let mut smsc = next_smsc(&mut smscs).await;
        assert_eq!(session.system_id().unwrap(), "SMSC");
        assert_eq!(session.binding_type(), BindingType::Transceiver);
        assert!(session.is_bound());

        session
            .submit(EnquireLink::new(session.next_sequence_number()))
            .await
            .unwrap();
        let frame = smsc.read_frame(TIMEOUT).await.unwrap().unwrap();
        assert!(matches!(frame, Frame::EnquireLink(_)));

        session.close().await;
        session.close().await;
        assert!(session.is_closed());
        assert_eq!(*states.lock().unwrap(), vec![State::ExplicitClosing]);

        let frame = smsc.read_frame(TIMEOUT).await.unwrap().unwrap();
        assert!(matches!(frame, Frame::Unbind(_)));
        assert!(matches!(
            session.submit(EnquireLink::new(9)).await,
            Err(SmppError::Closing)
        ));
    }

    #[tokio::test]
    async fn invalid_settings_never_connect() {
        let (connector, attempts, _smscs) = FakeConnector::new(&[]);
        let settings = Settings {
            read_timeout: Duration::ZERO,
            ..Settings::default()
        };

        let result = Session::new(connector, settings, Duration::ZERO).await;
        assert!(matches!(result, Err(SmppError::InvalidSettings(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn initial_connect_failure_is_returned() {
        let (connector, _, _smscs) = FakeConnector::new(&[false]);
        let result = Session::new(connector, Settings::default(), Duration::from_millis(10)).await;
        assert!(matches!(result, Err(SmppError::Connection(_))));
    }

    #[tokio::test]
    async fn rebinds_after_peer_unbind() {
        let (connector, attempts, mut smscs) = FakeConnector::new(&[]);
        let (settings, states, rebinds, _) = recording(Settings::builder());

        let session = Session::new(connector, settings, Duration::from_millis(50))
            .await
            .unwrap();
        let mut first = next_smsc(&mut smscs).await;

        first
            .write_frame(&Frame::Unbind(Unbind::new(7)), TIMEOUT)
            .await
            .unwrap();
        let reply = first.read_frame(TIMEOUT).await.unwrap().unwrap();
        assert!(matches!(reply, Frame::UnbindResp(_)));

        let mut second = next_smsc(&mut smscs).await;
        wait_until(|| rebinds.load(Ordering::SeqCst) == 1).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(*states.lock().unwrap(), vec![State::UnbindClosing]);

        session.submit(EnquireLink::new(40)).await.unwrap();
        let frame = second.read_frame(TIMEOUT).await.unwrap().unwrap();
        assert_eq!(frame.sequence_number(), 40);

        session.close().await;
        // Explicit close is not reported while rebinding is enabled
        assert_eq!(*states.lock().unwrap(), vec![State::UnbindClosing]);
    }

    #[tokio::test]
    async fn rebind_retries_after_connect_errors() {
        let (connector, attempts, mut smscs) = FakeConnector::new(&[true, false, false]);
        let (settings, states, rebinds, rebind_errors) = recording(Settings::builder());

        let session = Session::new(connector, settings, Duration::from_millis(20))
            .await
            .unwrap();
        drop(next_smsc(&mut smscs).await);

        let _smsc = next_smsc(&mut smscs).await;
        wait_until(|| rebinds.load(Ordering::SeqCst) == 1).await;
        assert_eq!(rebind_errors.load(Ordering::SeqCst), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(*states.lock().unwrap(), vec![State::InvalidStreaming]);
        assert!(session.system_id().is_some());

        session.close().await;
    }

    #[tokio::test]
    async fn close_stops_rebinding() {
        let plan = [true, false, false, false, false, false, false, false, false, false];
        let (connector, attempts, mut smscs) = FakeConnector::new(&plan);
        let (settings, _, rebinds, rebind_errors) = recording(Settings::builder());

        let session = Session::new(connector, settings, Duration::from_millis(20))
            .await
            .unwrap();
        drop(next_smsc(&mut smscs).await);

        wait_until(|| rebind_errors.load(Ordering::SeqCst) >= 1).await;
        assert!(session.system_id().is_none());
        assert!(!session.is_bound());
        assert!(matches!(
            session.submit(EnquireLink::new(3)).await,
            Err(SmppError::Closing)
        ));

        session.close().await;
        let seen = attempts.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), seen);
        assert_eq!(rebinds.load(Ordering::SeqCst), 0);
    }
}
