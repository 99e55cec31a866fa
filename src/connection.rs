// ABOUTME: Frame-based SMPP transport over any async byte stream, split into reader and writer halves
// ABOUTME: Applies read/write deadlines and performs the bind handshake that tags the connection

use crate::codec::{CodecError, Encodable};
use crate::datatypes::{BindRequest, BindResponse, CommandStatus, SystemId};
use crate::error::{SmppError, SmppResult};
use crate::frame::Frame;
use bytes::{Buf, BytesMut};
use std::future::Future;
use std::io::{self, Cursor};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::debug;

type BoxedReader = Box<dyn AsyncRead + Send + Sync + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Sync + Unpin>;

/// SMPP v3.4 Connection Management
///
/// Handles frame-based communication for an SMPP session. The underlying
/// stream is split in two: the [`FrameReader`] is owned by the receive loop,
/// while the [`FrameWriter`] is cloned into every task that needs to write
/// (the transmit loop for submissions, the receive loop for responses).
///
/// ## Connection Lifecycle
/// 1. Stream established (TCP dial, or an in-memory pipe in tests)
/// 2. Bind handshake performed with [`Connection::bind`]
/// 3. Halves handed to the session loops with [`Connection::into_split`]
/// 4. Writer shut down when the session closes
pub struct Connection {
    reader: FrameReader,
    writer: FrameWriter,
    system_id: SystemId,
}

impl Connection {
    /// Create a new `Connection`, backed by `stream`. Read and write buffers
    /// are initialized.
    pub fn new<S>(stream: S) -> Connection
    where
        S: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        Connection {
            reader: FrameReader::new(Box::new(read_half)),
            writer: FrameWriter::new(Box::new(write_half)),
            system_id: SystemId::default(),
        }
    }

    /// system_id reported by the SMSC in its bind response.
    /// Empty until [`Connection::bind`] succeeds.
    pub fn system_id(&self) -> &SystemId {
        &self.system_id
    }

    pub async fn read_frame(&mut self, timeout: Duration) -> SmppResult<Option<Frame>> {
        self.reader.read_frame_timeout(timeout).await
    }

    pub async fn write_frame(&self, frame: &Frame, timeout: Duration) -> SmppResult<()> {
        self.writer.write_frame_timeout(frame, timeout).await
    }

    /// Send a bind request and wait for the matching bind response.
    ///
    /// Any other PDU arriving before the bind response is skipped. A
    /// generic_nack or a non-zero command_status fails the handshake with
    /// [`SmppError::Protocol`]. On success the SMSC's system_id is recorded.
    pub async fn bind(&mut self, request: BindRequest, timeout: Duration) -> SmppResult<BindResponse> {
        let binding_type = request.binding_type;
        let sequence_number = request.sequence_number;
        self.write_frame(&Frame::BindRequest(request), timeout).await?;

        loop {
            let frame = self
                .read_frame(timeout)
                .await?
                .ok_or(SmppError::ConnectionClosed)?;

            match frame {
                Frame::BindResponse(response) if response.binding_type == binding_type => {
                    if response.command_status != CommandStatus::Ok {
                        return Err(SmppError::Protocol(response.command_status));
                    }
                    debug!(
                        system_id = %response.system_id,
                        %binding_type,
                        "bind accepted"
                    );
                    self.system_id = response.system_id;
                    return Ok(response);
                }
                Frame::GenericNack(nack) if nack.sequence_number == sequence_number => {
                    return Err(SmppError::Protocol(nack.command_status));
                }
                other => {
                    debug!(
                        command_id = ?other.command_id(),
                        sequence_number = other.sequence_number(),
                        "skipping PDU while waiting for bind response"
                    );
                }
            }
        }
    }

    /// Hand the halves to the session loops
    pub fn into_split(self) -> (FrameReader, FrameWriter, SystemId) {
        (self.reader, self.writer, self.system_id)
    }

    pub async fn shutdown(&self) -> SmppResult<()> {
        self.writer.shutdown().await
    }
}

/// Reading half of a [`Connection`]
pub struct FrameReader {
    stream: BoxedReader,

    // The buffer for reading frames. Bytes of a partial frame stay here
    // across cancelled reads.
    buffer: BytesMut,
}

impl FrameReader {
    fn new(stream: BoxedReader) -> FrameReader {
        FrameReader {
            stream,
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single `Frame` value from the underlying stream.
    ///
    /// The function waits until it has retrieved enough data to parse a frame.
    /// Any data remaining in the read buffer after the frame has been parsed is
    /// kept there for the next call to `read_frame`.
    ///
    /// This is cancel safe: dropping the future never loses buffered bytes.
    ///
    /// # Returns
    ///
    /// On success, the received frame is returned. If the stream is closed
    /// in a way that doesn't break a frame in half, it returns `None`.
    /// Otherwise, an error is returned.
    pub async fn read_frame(&mut self) -> SmppResult<Option<Frame>> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // For this to be a clean shutdown, there should be no data in
                // the read buffer.
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer").into())
                };
            }
        }
    }

    /// [`FrameReader::read_frame`] bounded by `timeout`
    pub async fn read_frame_timeout(&mut self, timeout: Duration) -> SmppResult<Option<Frame>> {
        with_deadline(timeout, self.read_frame()).await
    }

    /// Tries to parse a frame from the buffer. If the buffer contains enough
    /// data, the frame is returned and the data removed from the buffer. If not
    /// enough data has been buffered yet, `Ok(None)` is returned.
    ///
    /// A frame whose body fails to decode is still removed from the buffer,
    /// so an unknown command_id leaves the stream aligned on the next PDU.
    fn parse_frame(&mut self) -> SmppResult<Option<Frame>> {
        let mut buf = Cursor::new(&self.buffer[..]);

        match Frame::check(&mut buf) {
            Ok(len) => {
                let parsed = Frame::parse(&mut buf);
                self.buffer.advance(len);
                Ok(Some(parsed?))
            }
            Err(CodecError::Incomplete) => Ok(None),
            // An invalid command_length means the stream can no longer be
            // framed. Returning `Err` closes the connection.
            Err(e) => Err(e.into()),
        }
    }
}

/// Writing half of a [`Connection`].
///
/// Cloning shares the same underlying stream; writes are serialized by an
/// async mutex so concurrent writers never interleave partial frames.
#[derive(Clone)]
pub struct FrameWriter {
    shared: Arc<WriterShared>,
}

struct WriterShared {
    stream: Mutex<BufWriter<BoxedWriter>>,
    closed: AtomicBool,
}

impl FrameWriter {
    fn new(stream: BoxedWriter) -> FrameWriter {
        FrameWriter {
            shared: Arc::new(WriterShared {
                stream: Mutex::new(BufWriter::new(stream)),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Encode and write a single `Frame`, then flush it to the stream.
    pub async fn write_frame(&self, frame: &Frame) -> SmppResult<()> {
        if self.is_closed() {
            return Err(SmppError::ConnectionClosed);
        }

        // Encode before taking the lock so a bad PDU never blocks other writers
        let bytes = frame.to_bytes()?;

        let mut stream = self.shared.stream.lock().await;
        stream.write_all(&bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// [`FrameWriter::write_frame`] bounded by `timeout`. A zero timeout
    /// waits indefinitely.
    pub async fn write_frame_timeout(&self, frame: &Frame, timeout: Duration) -> SmppResult<()> {
        if timeout.is_zero() {
            return self.write_frame(frame).await;
        }
        with_deadline(timeout, self.write_frame(frame)).await
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Flush and shut down the write side. Later writes fail with
    /// [`SmppError::ConnectionClosed`]. Calling this twice is harmless.
    pub async fn shutdown(&self) -> SmppResult<()> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut stream = self.shared.stream.lock().await;
        stream.shutdown().await?;
        Ok(())
    }
}

async fn with_deadline<T>(
    timeout: Duration,
    future: impl Future<Output = SmppResult<T>>,
) -> SmppResult<T> {
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| SmppError::Timeout(timeout))?
}
