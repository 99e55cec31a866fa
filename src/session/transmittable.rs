// ABOUTME: Outbound half of a bound session: a single-slot submission queue drained by one task
// ABOUTME: Sends periodic enquire_link, records windowed requests and classifies write failures

use crate::connection::FrameWriter;
use crate::datatypes::{EnquireLink, Unbind};
use crate::error::{SmppError, SmppResult};
use crate::frame::Frame;
use crate::session::settings::{ClosedCallback, Settings};
use crate::session::State;
use crate::window::{Request, Window};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub(crate) struct Transmittable {
    settings: Arc<Settings>,
    writer: FrameWriter,
    window: Option<Window>,
    input: mpsc::Sender<Frame>,
    alive: AtomicBool,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    on_closed: ClosedCallback,
}

impl Transmittable {
    /// Spawn the transmit loop over `writer`
    pub(crate) fn start(
        writer: FrameWriter,
        settings: Arc<Settings>,
        window: Option<Window>,
        on_closed: ClosedCallback,
    ) -> Arc<Self> {
        let (input, queue) = mpsc::channel(1);
        let transmittable = Arc::new(Transmittable {
            settings,
            writer,
            window,
            input,
            alive: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
            on_closed,
        });

        let handle = tokio::spawn(transmittable.clone().run(queue));
        if let Ok(mut task) = transmittable.task.lock() {
            *task = Some(handle);
        }
        transmittable
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Queue a PDU for writing. Waits while the queue slot is taken and
    /// fails with [`SmppError::Closing`] once closing has begun.
    pub(crate) async fn submit(&self, frame: Frame) -> SmppResult<()> {
        if !self.is_alive() {
            return Err(SmppError::Closing);
        }
        self.input
            .send(frame)
            .await
            .map_err(|_| SmppError::Closing)
    }

    async fn run(self: Arc<Self>, mut queue: mpsc::Receiver<Frame>) {
        let mut ticker = keepalive_ticker(&self.settings);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tick(&mut ticker) => {
                    let frame = Frame::EnquireLink(EnquireLink::new(self.settings.sequence.next()));
                    debug!(sequence_number = frame.sequence_number(), "sending enquire_link");
                    if self.send(&frame).await {
                        return;
                    }
                }
                frame = queue.recv() => match frame {
                    Some(frame) => {
                        if self.send(&frame).await {
                            return;
                        }
                    }
                    None => return,
                },
            }
        }

        // Closing: stop accepting, then write whatever already made it into
        // the queue.
        queue.close();
        while let Some(frame) = queue.recv().await {
            self.send(&frame).await;
        }
    }

    /// Write one frame, reporting any failure. Returns true when the failure
    /// closed the transmitter.
    async fn send(self: &Arc<Self>, frame: &Frame) -> bool {
        let Err(err) = self.write(frame).await else {
            return false;
        };

        if let Some(on_submit_error) = &self.settings.on_submit_error {
            on_submit_error(frame, &err);
        }

        if !err.is_fatal() {
            warn!(
                command_id = ?frame.command_id(),
                sequence_number = frame.sequence_number(),
                error = %err,
                "submit failed"
            );
            return false;
        }

        error!(
            command_id = ?frame.command_id(),
            sequence_number = frame.sequence_number(),
            error = %err,
            "write failed, closing connection"
        );
        let transmittable = self.clone();
        tokio::spawn(async move { transmittable.close(State::ConnectionIssue).await });
        true
    }

    async fn write(&self, frame: &Frame) -> SmppResult<()> {
        let timeout = self.settings.write_timeout;

        let window = match &self.window {
            Some(window) if frame.is_windowable() => window,
            _ => return self.writer.write_frame_timeout(frame, timeout).await,
        };

        let max_window_size = self
            .settings
            .window
            .as_ref()
            .map_or(usize::MAX, |config| config.max_window_size);
        let outstanding = window.length().await?;
        if outstanding >= max_window_size {
            return Err(SmppError::WindowFull(outstanding));
        }

        // Recorded before the write so a fast response always finds it
        let sequence_number = frame.sequence_number();
        window.set(Request::new(frame.clone())).await?;
        if let Err(e) = self.writer.write_frame_timeout(frame, timeout).await {
            let _ = window.delete(sequence_number).await;
            return Err(e);
        }
        Ok(())
    }

    /// Stop the loop and release the connection.
    ///
    /// Frames already queued are written, then a best-effort unbind is sent.
    /// Unless `state` is [`State::StoppingProcessOnly`] the writer is shut
    /// down. Requests still in the window are reported and removed.
    pub(crate) async fn close(&self, state: State) {
        if self
            .alive
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        debug!(%state, "closing transmitter");

        self.cancel.cancel();
        let task = self.task.lock().ok().and_then(|mut task| task.take());
        if let Some(task) = task {
            let _ = task.await;
        }

        let unbind = Frame::Unbind(Unbind::new(self.settings.sequence.next()));
        if let Err(e) = self
            .writer
            .write_frame_timeout(&unbind, self.settings.write_timeout)
            .await
        {
            debug!(error = %e, "unbind on close not delivered");
        }

        if state != State::StoppingProcessOnly {
            let _ = self.writer.shutdown().await;
        }

        (self.on_closed)(state);

        self.release_window().await;
    }

    async fn release_window(&self) {
        let Some(window) = &self.window else {
            return;
        };

        let requests = match window.list().await {
            Ok(requests) => requests,
            Err(e) => {
                warn!(error = %e, "could not list pending requests on close");
                return;
            }
        };

        for request in requests {
            let _ = window.delete(request.sequence_number()).await;
            if let Some(on_close_pdu_request) = &self.settings.on_close_pdu_request {
                on_close_pdu_request(request);
            }
        }
    }
}

fn keepalive_ticker(settings: &Settings) -> Option<Interval> {
    let period = settings.enquire_link;
    if period.is_zero() {
        return None;
    }
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
