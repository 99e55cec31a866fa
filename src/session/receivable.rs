// ABOUTME: Inbound half of a bound session: reads PDUs, answers keep-alive and unbind, dispatches the rest
// ABOUTME: Correlates responses with windowed requests when request window tracking is configured

use crate::codec::CodecError;
use crate::connection::{FrameReader, FrameWriter};
use crate::datatypes::GenericNack;
use crate::error::SmppError;
use crate::frame::Frame;
use crate::session::State;
use crate::session::settings::{ClosedCallback, Settings};
use crate::window::{Response, Window};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Time given to a response to reach the wire before the bind is closed
const FLUSH_BEFORE_CLOSE: Duration = Duration::from_millis(50);

pub(crate) struct Receivable {
    settings: Arc<Settings>,
    writer: FrameWriter,
    window: Option<Window>,
    alive: AtomicBool,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    on_closed: ClosedCallback,
}

impl Receivable {
    /// Spawn the receive loop over `reader`. Responses are written through
    /// `writer`.
    pub(crate) fn start(
        reader: FrameReader,
        writer: FrameWriter,
        settings: Arc<Settings>,
        window: Option<Window>,
        on_closed: ClosedCallback,
    ) -> Arc<Self> {
        let receivable = Arc::new(Receivable {
            settings,
            writer,
            window,
            alive: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
            on_closed,
        });

        let handle = tokio::spawn(receivable.clone().run(reader));
        if let Ok(mut task) = receivable.task.lock() {
            *task = Some(handle);
        }
        receivable
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    async fn run(self: Arc<Self>, mut reader: FrameReader) {
        loop {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = reader.read_frame_timeout(self.settings.read_timeout) => result,
            };

            let frame = match result {
                Ok(Some(frame)) => frame,
                Ok(None) => return self.fail(SmppError::ConnectionClosed),
                Err(SmppError::Codec(CodecError::UnknownCommandId {
                    command_id,
                    sequence_number,
                })) => {
                    self.reject_unknown(command_id, sequence_number).await;
                    continue;
                }
                Err(err) => return self.fail(err),
            };

            if self.dispatch(frame).await {
                tokio::time::sleep(FLUSH_BEFORE_CLOSE).await;
                self.closing(State::UnbindClosing);
                return;
            }
        }
    }

    /// The stream can no longer be trusted
    fn fail(self: &Arc<Self>, err: SmppError) {
        if !self.is_alive() {
            return;
        }
        error!(error = %err, "receiving failed, closing connection");
        if let Some(on_receiving_error) = &self.settings.on_receiving_error {
            on_receiving_error(&err);
        }
        self.closing(State::InvalidStreaming);
    }

    /// The whole frame was consumed by its length, so the stream stays
    /// aligned: answer generic_nack and keep reading.
    async fn reject_unknown(&self, command_id: u32, sequence_number: u32) {
        warn!(
            command_id = format_args!("{command_id:#010x}"),
            sequence_number, "unknown command_id"
        );
        if let Some(on_receiving_error) = &self.settings.on_receiving_error {
            on_receiving_error(&SmppError::Codec(CodecError::UnknownCommandId {
                command_id,
                sequence_number,
            }));
        }
        let nack = GenericNack::invalid_command_id(sequence_number);
        self.respond(Some(Frame::GenericNack(nack))).await;
    }

    /// Route one PDU. Returns true when the bind should be closed.
    async fn dispatch(&self, frame: Frame) -> bool {
        debug!(
            command_id = ?frame.command_id(),
            sequence_number = frame.sequence_number(),
            "received PDU"
        );

        if self.settings.window_mode() {
            self.handle_window_pdu(frame).await
        } else if let Some(on_all_pdu) = &self.settings.on_all_pdu {
            let (response, close_bind) = on_all_pdu(frame);
            self.respond(response).await;
            close_bind
        } else {
            self.handle_or_close(frame).await
        }
    }

    async fn handle_window_pdu(&self, frame: Frame) -> bool {
        if frame.is_response() {
            self.correlate(frame).await;
            return false;
        }

        let auto_respond = self.settings.auto_respond;
        match frame {
            Frame::EnquireLink(_) if auto_respond => {
                self.respond(frame.response()).await;
                false
            }
            Frame::EnquireLink(_) => {
                // The callback may withhold the keep-alive reply, never close
                self.ask_application(frame).await;
                false
            }
            Frame::Unbind(_) if auto_respond => {
                self.respond(frame.response()).await;
                true
            }
            _ => self.ask_application(frame).await,
        }
    }

    async fn correlate(&self, frame: Frame) {
        let Some(window) = &self.window else {
            return;
        };

        let sequence_number = frame.sequence_number();
        let request = match window.take(sequence_number).await {
            Ok(request) => request,
            Err(e) => {
                warn!(sequence_number, error = %e, "request window lookup failed");
                None
            }
        };

        match request {
            Some(original_request) => {
                if let Some(on_expected) = &self.settings.on_expected_pdu_response {
                    on_expected(Response {
                        frame,
                        original_request,
                    });
                }
            }
            None => {
                warn!(
                    command_id = ?frame.command_id(),
                    sequence_number, "response matches no outstanding request"
                );
                if let Some(on_unexpected) = &self.settings.on_unexpected_pdu_response {
                    on_unexpected(frame);
                }
            }
        }
    }

    /// Let `on_received_pdu_request` answer. Returns its close decision.
    async fn ask_application(&self, frame: Frame) -> bool {
        let Some(on_request) = &self.settings.on_received_pdu_request else {
            return false;
        };
        let (response, close_bind) = on_request(frame);
        self.respond(response).await;
        close_bind
    }

    async fn handle_or_close(&self, frame: Frame) -> bool {
        match frame {
            Frame::EnquireLink(_) => {
                self.respond(frame.response()).await;
                false
            }
            Frame::Unbind(_) => {
                self.respond(frame.response()).await;
                true
            }
            _ => {
                let responded = frame.can_respond();
                if responded {
                    self.respond(frame.response()).await;
                }
                if let Some(on_pdu) = &self.settings.on_pdu {
                    on_pdu(frame, responded);
                }
                false
            }
        }
    }

    async fn respond(&self, response: Option<Frame>) {
        let Some(response) = response else {
            return;
        };

        if let Err(e) = self
            .writer
            .write_frame_timeout(&response, self.settings.write_timeout)
            .await
        {
            warn!(
                command_id = ?response.command_id(),
                sequence_number = response.sequence_number(),
                error = %e,
                "could not write response"
            );
            if let Some(on_submit_error) = &self.settings.on_submit_error {
                on_submit_error(&response, &e);
            }
        }
    }

    fn closing(self: &Arc<Self>, state: State) {
        let receivable = self.clone();
        tokio::spawn(async move { receivable.close(state).await });
    }

    /// Stop reading. A PDU already being handled is finished first, so a
    /// response is never cut short. Unless `state` is
    /// [`State::StoppingProcessOnly`] the connection is shut down.
    pub(crate) async fn close(&self, state: State) {
        if self
            .alive
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        debug!(%state, "closing receiver");

        self.cancel.cancel();
        let task = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(task) = task {
            // Awaiting our own loop would never return
            if tokio::task::try_id() == Some(task.id()) {
                debug!("receiver closed from its own loop");
            } else {
                let _ = task.await;
            }
        }

        if state != State::StoppingProcessOnly {
            let _ = self.writer.shutdown().await;
        }

        (self.on_closed)(state);
    }
}
