// ABOUTME: Pairs one transmit loop and one receive loop over a single bound connection
// ABOUTME: Cross-wires their closing, runs the request window expiry sweep and reports the close cause

use crate::connection::{Connection, FrameWriter};
use crate::datatypes::SystemId;
use crate::error::{SmppError, SmppResult};
use crate::frame::Frame;
use crate::session::receivable::Receivable;
use crate::session::settings::{ClosedCallback, Settings};
use crate::session::transmittable::Transmittable;
use crate::session::State;
use crate::window::Window;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A bound connection driven by a transmit loop and a receive loop
pub(crate) struct Transceivable {
    settings: Arc<Settings>,
    system_id: SystemId,
    writer: FrameWriter,
    window: Option<Window>,
    halves: OnceLock<(Arc<Transmittable>, Arc<Receivable>)>,
    alive: AtomicBool,
    cancel: CancellationToken,
}

impl Transceivable {
    /// Take over `connection` and start both loops plus, when configured,
    /// the expiry sweep
    pub(crate) fn start(connection: Connection, settings: Arc<Settings>) -> Arc<Self> {
        let (reader, writer, system_id) = connection.into_split();
        let window = settings.window.as_ref().and_then(|config| {
            config
                .store
                .clone()
                .map(|store| Window::new(store, config.store_access_timeout))
        });

        let transceivable = Arc::new(Transceivable {
            settings: settings.clone(),
            system_id,
            writer: writer.clone(),
            window: window.clone(),
            halves: OnceLock::new(),
            alive: AtomicBool::new(true),
            cancel: CancellationToken::new(),
        });
        let weak = Arc::downgrade(&transceivable);

        let out = Transmittable::start(
            writer.clone(),
            settings.clone(),
            window.clone(),
            transmitter_closed(weak.clone()),
        );
        let input = Receivable::start(
            reader,
            writer,
            settings,
            window,
            receiver_closed(weak.clone()),
        );
        let _ = transceivable.halves.set((out, input));

        if let Some((window, timeout, every)) = transceivable.sweep_config() {
            tokio::spawn(sweep_expired(
                weak,
                window,
                timeout,
                every,
                transceivable.cancel.clone(),
            ));
        }

        transceivable
    }

    pub(crate) fn system_id(&self) -> SystemId {
        self.system_id
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub(crate) async fn submit(&self, frame: Frame) -> SmppResult<()> {
        match self.halves.get() {
            Some((out, _)) => out.submit(frame).await,
            None => Err(SmppError::Closing),
        }
    }

    /// Number of requests currently awaiting a response
    pub(crate) async fn window_size(&self) -> SmppResult<usize> {
        let window = self.window.as_ref().ok_or(SmppError::WindowNotConfigured)?;
        Ok(window.length().await?)
    }

    /// Stop both loops, shut the connection and report
    /// [`State::ExplicitClosing`]. Later calls do nothing.
    pub(crate) async fn close(&self) {
        if !self.mark_closed() {
            return;
        }

        self.cancel.cancel();
        if let Some((out, input)) = self.halves.get() {
            out.close(State::StoppingProcessOnly).await;
            input.close(State::StoppingProcessOnly).await;
        }
        let _ = self.writer.shutdown().await;

        self.notify(State::ExplicitClosing);
    }

    /// Flip to closed; only the first caller gets `true`
    fn mark_closed(&self) -> bool {
        self.alive
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn notify(&self, state: State) {
        debug!(%state, system_id = %self.system_id, "transceiver closed");
        if let Some(on_closed) = &self.settings.on_closed {
            on_closed(state);
        }
    }

    fn sweep_config(&self) -> Option<(Window, Duration, Duration)> {
        let config = self.settings.window.as_ref()?;
        if config.pdu_expire_timeout.is_zero() || config.expire_check_timer.is_zero() {
            return None;
        }
        Some((
            self.window.clone()?,
            config.pdu_expire_timeout,
            config.expire_check_timer,
        ))
    }
}

/// A write failure closes the receiving side too
fn transmitter_closed(transceivable: Weak<Transceivable>) -> ClosedCallback {
    Arc::new(move |state: State| {
        if state != State::ConnectionIssue {
            return;
        }
        let Some(transceivable) = transceivable.upgrade() else {
            return;
        };
        if !transceivable.mark_closed() {
            return;
        }
        tokio::spawn(async move {
            if let Some((_, input)) = transceivable.halves.get() {
                input.close(State::ExplicitClosing).await;
            }
            transceivable.cancel.cancel();
            transceivable.notify(State::ConnectionIssue);
        });
    })
}

/// A broken stream or an unbind closes the transmitting side too
fn receiver_closed(transceivable: Weak<Transceivable>) -> ClosedCallback {
    Arc::new(move |state: State| {
        if !matches!(state, State::InvalidStreaming | State::UnbindClosing) {
            return;
        }
        let Some(transceivable) = transceivable.upgrade() else {
            return;
        };
        if !transceivable.mark_closed() {
            return;
        }
        tokio::spawn(async move {
            if let Some((out, _)) = transceivable.halves.get() {
                out.close(State::ExplicitClosing).await;
            }
            transceivable.cancel.cancel();
            transceivable.notify(state);
        });
    })
}

/// Periodically drop requests older than `timeout` and report them
async fn sweep_expired(
    transceivable: Weak<Transceivable>,
    window: Window,
    timeout: Duration,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let Some(transceivable) = transceivable.upgrade() else {
            return;
        };

        let requests = match window.list().await {
            Ok(requests) => requests,
            Err(e) => {
                warn!(error = %e, "expiry sweep could not list requests");
                continue;
            }
        };

        for request in requests.into_iter().filter(|r| r.is_expired(timeout)) {
            let sequence_number = request.sequence_number();
            if let Err(e) = window.delete(sequence_number).await {
                warn!(sequence_number, error = %e, "could not remove expired request");
                continue;
            }
            warn!(
                sequence_number,
                command_id = ?request.frame.command_id(),
                "request expired without response"
            );

            let close_bind = transceivable
                .settings
                .on_expired_pdu_request
                .as_ref()
                .is_some_and(|on_expired| on_expired(request));
            if close_bind {
                let transceivable = transceivable.clone();
                tokio::spawn(async move { transceivable.close().await });
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{Address, EnquireLink, ShortMessage, SubmitSm, Unbind};
    use crate::session::WindowConfig;
    use crate::window::Request;
    use std::sync::Mutex as StdMutex;
    use tokio::io::{DuplexStream, duplex};

    const TIMEOUT: Duration = Duration::from_secs(1);

    type States = Arc<StdMutex<Vec<State>>>;

    fn start(mut settings: Settings) -> (Arc<Transceivable>, DuplexStream, States) {
        let states = Arc::new(StdMutex::new(Vec::new()));
        let sink = states.clone();
        settings.on_closed = Some(Arc::new(move |state: State| sink.lock().unwrap().push(state)));

        let (client, server) = duplex(4096);
        let transceivable = Transceivable::start(Connection::new(client), Arc::new(settings));
        (transceivable, server, states)
    }

    async fn wait_for_state(states: &States) -> Vec<State> {
        for _ in 0..100 {
            if !states.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        states.lock().unwrap().clone()
    }

    fn submit_sm(sequence_number: u32) -> Frame {
        SubmitSm::new(
            sequence_number,
            Address::default(),
            Address::international("1234").unwrap(),
            ShortMessage::new("hi").unwrap(),
        )
        .into()
    }

    #[tokio::test]
    async fn explicit_close_reports_once() {
        let (transceivable, server, states) = start(Settings::default());
        transceivable.close().await;
        transceivable.close().await;

        assert_eq!(*states.lock().unwrap(), vec![State::ExplicitClosing]);
        assert!(matches!(
            transceivable.submit(submit_sm(1)).await,
            Err(SmppError::Closing)
        ));

        let mut smsc = Connection::new(server);
        let frame = smsc.read_frame(TIMEOUT).await.unwrap().unwrap();
        assert!(matches!(frame, Frame::Unbind(_)));
    }

    #[tokio::test]
    async fn peer_unbind_closes_both_halves() {
        let (transceivable, server, states) = start(Settings::default());
        let mut smsc = Connection::new(server);

        smsc.write_frame(&Frame::Unbind(Unbind::new(2)), TIMEOUT)
            .await
            .unwrap();
        let reply = smsc.read_frame(TIMEOUT).await.unwrap().unwrap();
        assert!(matches!(reply, Frame::UnbindResp(_)));

        // The transmitter is closed before the cause is reported
        assert_eq!(wait_for_state(&states).await, vec![State::UnbindClosing]);
        assert!(matches!(
            transceivable.submit(submit_sm(3)).await,
            Err(SmppError::Closing)
        ));
    }

    #[tokio::test]
    async fn window_size_requires_window() {
        let (transceivable, _server, _) = start(Settings::default());
        assert!(matches!(
            transceivable.window_size().await,
            Err(SmppError::WindowNotConfigured)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_requests_are_swept() {
        let expired = Arc::new(StdMutex::new(Vec::new()));
        let sink = expired.clone();
        let settings = Settings {
            read_timeout: Duration::from_secs(60),
            enquire_link: Duration::ZERO,
            window: Some(
                WindowConfig::new(10)
                    .with_expiry(Duration::from_secs(2), Duration::from_millis(500)),
            ),
            on_expired_pdu_request: Some(Arc::new(move |request: Request| {
                sink.lock().unwrap().push(request.sequence_number());
                false
            })),
            ..Settings::default()
        };
        let (transceivable, server, _) = start(settings);
        let mut smsc = Connection::new(server);

        transceivable.submit(submit_sm(9)).await.unwrap();
        smsc.read_frame(TIMEOUT).await.unwrap().unwrap();
        assert_eq!(transceivable.window_size().await.unwrap(), 1);

        // Still present just before expiry
        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(transceivable.window_size().await.unwrap(), 1);

        // Gone after expiry plus one sweep interval
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(transceivable.window_size().await.unwrap(), 0);
        assert_eq!(*expired.lock().unwrap(), vec![9]);
        assert!(transceivable.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_request_may_close_bind() {
        let settings = Settings {
            read_timeout: Duration::from_secs(60),
            enquire_link: Duration::ZERO,
            window: Some(
                WindowConfig::new(10).with_expiry(Duration::from_secs(1), Duration::from_secs(1)),
            ),
            on_expired_pdu_request: Some(Arc::new(|_: Request| true)),
            ..Settings::default()
        };
        let (transceivable, server, states) = start(settings);
        let mut smsc = Connection::new(server);

        transceivable
            .submit(Frame::EnquireLink(EnquireLink::new(4)))
            .await
            .unwrap();
        smsc.read_frame(TIMEOUT).await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(wait_for_state(&states).await, vec![State::ExplicitClosing]);
        assert!(!transceivable.is_alive());
    }
}
