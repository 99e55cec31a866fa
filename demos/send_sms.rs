// ABOUTME: Example application sending one SMS, split into parts when long, over a bound session
// ABOUTME: Waits for every submit_sm_resp through the request window before unbinding

use argh::FromArgs;
use smpp::Frame;
use smpp::datatypes::{Address, ShortMessage, SubmitSm};
use smpp::session::{Auth, Session, Settings, TcpConnector, WindowConfig};
use std::error::Error;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Send an SMS message through an SMSC
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// the hostname of IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u32>,

    /// seconds to wait for the submit responses (default: 30)
    #[argh(option)]
    response_timeout: Option<u64>,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the telephone number that the message will be from
    #[argh(option, short = 'f')]
    from: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging { Level::DEBUG } else { Level::INFO })
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let system_id = cli_args.system_id.unwrap_or_default();
    let password = cli_args.password.unwrap_or_default();
    let response_timeout = Duration::from_secs(cli_args.response_timeout.unwrap_or(30));

    let (responses_tx, mut responses) = mpsc::unbounded_channel();
    let settings = Settings::builder()
        .auto_respond(true)
        .window(WindowConfig::new(10).with_expiry(response_timeout, Duration::from_secs(1)))
        .on_expected_pdu_response(move |response| {
            let _ = responses_tx.send(response.frame);
        })
        .on_expired_pdu_request(|request| {
            warn!(sequence_number = request.sequence_number(), "no response from SMSC");
            false
        })
        .on_received_pdu_request(|frame| {
            info!("<- {frame:?}");
            (frame.response(), false)
        })
        .on_closed(|state| info!(%state, "session closed"))
        .build()?;

    let auth = Auth::new(format!("{host}:{port}"), system_id.parse()?, password.parse()?);
    info!("Connecting to {}", auth.smsc);

    let session = Session::new(TcpConnector::transmitter(auth), settings, Duration::ZERO)
        .await
        .map_err(|e| {
            error!("Connection/bind failed: {e}");
            e
        })?;
    info!(system_id = ?session.system_id(), "Connected and bound successfully");

    let submit = SubmitSm::new(
        session.next_sequence_number(),
        Address::international(&cli_args.from)?,
        Address::international(&cli_args.to)?,
        ShortMessage::long(&cli_args.message),
    );
    let parts = submit.split(session.sequence())?;
    info!("Sending {} part(s)", parts.len());

    for part in parts.iter().cloned() {
        session.submit(part).await?;
    }

    let mut outcome: Result<(), Box<dyn Error>> = Ok(());
    for _ in 0..parts.len() {
        match tokio::time::timeout(response_timeout, responses.recv()).await {
            Ok(Some(Frame::SubmitSmResp(response))) if response.command_status.is_ok() => {
                info!(
                    sequence_number = response.sequence_number,
                    "Message part accepted, ID: {}", response.message_id
                );
            }
            Ok(Some(other)) => {
                error!("Message part rejected: {other:?}");
                outcome = Err(format!("rejected with {:?}", other.command_status()).into());
            }
            Ok(_) | Err(_) => {
                error!("Timed out waiting for submit_sm_resp");
                outcome = Err("no response from SMSC".into());
                break;
            }
        }
    }

    session.close().await;
    outcome
}
