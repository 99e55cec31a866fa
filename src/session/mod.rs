// ABOUTME: SMPP session runtime: transmit and receive loops, request window and auto rebind
// ABOUTME: Exports the Session handle, its settings and the connectors used to bind

//! SMPP Session Module
//!
//! A [`Session`] owns one bound connection at a time and drives it with two
//! loops:
//!
//! * **Transmit** - submitted PDUs are written in order through a bounded
//!   queue, with an enquire_link sent on every keepalive tick
//! * **Receive** - inbound PDUs are read with a deadline, answered when
//!   needed and handed to the application callbacks
//!
//! With a [`WindowConfig`] in the [`Settings`], outgoing requests are kept in
//! a [`RequestStore`](crate::window::RequestStore) until their response
//! arrives or they expire. With a non-zero rebind interval the session binds
//! again through its [`Connector`] whenever the connection is lost.
//!
//! ```rust,no_run
//! use smpp::session::{Auth, Session, Settings, TcpConnector, WindowConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::builder()
//!     .enquire_link(Duration::from_secs(15))
//!     .read_timeout(Duration::from_secs(45))
//!     .window(WindowConfig::new(10).with_expiry(Duration::from_secs(30), Duration::from_secs(5)))
//!     .on_expected_pdu_response(|response| println!("{:?}", response.frame))
//!     .build()?;
//!
//! let auth = Auth::new("localhost:2775", "system_id".parse()?, "password".parse()?);
//! let session = Session::new(TcpConnector::transceiver(auth), settings, Duration::from_secs(5)).await?;
//! # session.close().await;
//! # Ok(())
//! # }
//! ```

mod connector;
mod handle;
mod receivable;
mod settings;
mod state;
mod transceivable;
mod transmittable;

pub use connector::{Auth, Connector, TcpConnector, bind};
pub use handle::Session;
pub use settings::{
    ClosedCallback, ErrorCallback, ExpiredRequestCallback, FrameCallback, PduCallback,
    RebindCallback, RequestCallback, RequestLeftCallback, ResponseCallback, Settings,
    SettingsBuilder, SubmitErrorCallback, WindowConfig,
};
pub use state::State;
