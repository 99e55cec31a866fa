//! SMPP v3.4 client sessions over tokio.
//!
//! The crate is layered:
//!
//! * [`datatypes`] and [`frame`] - every SMPP v3.4 PDU with its wire codec
//! * [`encoding`] - GSM 7-bit, UCS2 and the other data_coding text encodings
//! * [`connection`] - framed reads and writes over any async byte stream
//! * [`window`] - outstanding request tracking
//! * [`session`] - bound sessions with keepalive, request windows and rebind
//!
//! ```rust,no_run
//! use smpp::datatypes::{Address, ShortMessage, SubmitSm};
//! use smpp::session::{Auth, Session, Settings, TcpConnector};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = Auth::new("localhost:2775", "system_id".parse()?, "password".parse()?);
//!     let session = Session::new(
//!         TcpConnector::transmitter(auth),
//!         Settings::default(),
//!         Duration::ZERO,
//!     )
//!     .await?;
//!
//!     // Long texts are split into concatenated parts
//!     let submit = SubmitSm::new(
//!         session.next_sequence_number(),
//!         Address::international("447700900123")?,
//!         Address::international("447700900456")?,
//!         ShortMessage::new("Hello, World!")?,
//!     );
//!     for part in submit.split(session.sequence())? {
//!         session.submit(part).await?;
//!     }
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

mod macros;

pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod sequence;
pub mod session;
pub mod window;


pub use codec::{CodecError, Decodable, Encodable, MAX_PDU_SIZE, PduHeader, PduRegistry};
pub use connection::Connection;
pub use error::{SmppError, SmppResult};
pub use frame::Frame;
pub use sequence::SequenceNumber;
pub use session::{Session, Settings, State};
