#![deny(unsafe_code)]
#![deny(warnings)]
//! Timer server client implementing NetworkClient trait
//!
//! One `run` is one WebSocket connection:
//!
//! 1. resolve and connect, then upgrade to WebSocket;
//! 2. send `Hello`;
//! 3. a reader loop pushes decoded frames into [`INBOUND_FRAMES`] while a
//!    handler loop drains it into the [`Session`] and sends probes.
//!
//! The connection ends when either loop fails, the server closes it, or the
//! time probe stalls.

use defmt::{debug, info, warn, Debug2Format};
use embassy_futures::select::{select, Either};
use embassy_net::dns::DnsQueryType;
use embassy_net::{IpEndpoint, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{with_timeout, Duration, Timer};
use embedded_io_async::{Read, Write};
use hal_abstractions::MonotonicClock;
use rand_core::RngCore;
use timer_core::ws::Opcode;
use timer_core::{Session, SessionAction, SharedState};

use super::client::NetworkClient;
use super::config::ServerConfig;
use super::error::NetworkError;
use super::socket::AsyncTcpSocket;
use super::websocket::{self, FrameReader, FrameWriter, WsEvent, RX_CAPACITY};
use super::INBOUND_FRAMES;
use crate::time::Uptime;

/// How often the handler wakes to poll the probe when no frames arrive
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Timer server client
pub struct TimerClient<'r, G> {
    config: ServerConfig,
    session: Session<'static, CriticalSectionRawMutex>,
    rng: &'r mut G,
}

impl<'r, G: RngCore> TimerClient<'r, G> {
    pub fn new(
        config: ServerConfig,
        state: &'static SharedState<CriticalSectionRawMutex>,
        rng: &'r mut G,
    ) -> Self {
        let session = Session::new(state, config.timer_id);
        Self {
            config,
            session,
            rng,
        }
    }

    async fn resolve(&self, stack: &Stack<'static>) -> Result<IpEndpoint, NetworkError> {
        let server_ip = stack
            .dns_query(self.config.host, DnsQueryType::A)
            .await
            .map_err(|_| NetworkError::DnsError)?
            .first()
            .copied()
            .ok_or(NetworkError::DnsError)?;

        let endpoint = IpEndpoint::new(server_ip, self.config.port);
        info!(
            "Resolved {} to {}",
            self.config.host,
            Debug2Format(&endpoint)
        );
        Ok(endpoint)
    }

    async fn serve(&mut self, stack: &Stack<'static>) -> Result<(), NetworkError> {
        let endpoint = self.resolve(stack).await?;
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);

        let mut rx_buffer = [0u8; 2048];
        let mut tx_buffer = [0u8; 1024];
        let mut socket = AsyncTcpSocket::new(*stack, &mut rx_buffer, &mut tx_buffer);
        with_timeout(connect_timeout, socket.connect(endpoint))
            .await
            .map_err(|_| NetworkError::Timeout)??;

        let key = websocket::new_key(&mut *self.rng);
        let mut frame_buf = [0u8; RX_CAPACITY];
        let leftover = with_timeout(
            connect_timeout,
            websocket::handshake(&mut socket, &self.config, &key, &mut frame_buf),
        )
        .await
        .map_err(|_| NetworkError::Timeout)??;
        info!("WebSocket connected to {}{}", self.config.host, self.config.path);

        // Frames still queued belong to the previous connection.
        INBOUND_FRAMES.clear();

        let (reader, writer) = socket.split();
        let mut reader = FrameReader::new(reader, &mut frame_buf, leftover);
        let mut writer = FrameWriter::new(writer, &mut *self.rng);

        let mut hello = [0u8; 64];
        let len = self.session.on_connected(&mut hello).map_err(|e| {
            warn!("Cannot encode Hello for timer id {}: {}", self.config.timer_id, e);
            NetworkError::FrameTooLarge
        })?;
        writer.send_text(&hello[..len]).await?;

        let reading = read_loop(&mut reader);
        let handling = handle_loop(&mut self.session, &mut writer);
        let result = match select(reading, handling).await {
            Either::First(e) => Err(e),
            Either::Second(result) => result,
        };

        socket.abort();
        result
    }
}

impl<G: RngCore> NetworkClient for TimerClient<'_, G> {
    type Output = ();

    async fn run(&mut self, stack: &Stack<'static>) -> Result<Self::Output, NetworkError> {
        info!("Connecting to timer server {}:{}", self.config.host, self.config.port);
        let result = self.serve(stack).await;
        self.session.on_disconnected();
        result
    }
}

/// Push every inbound event into the channel until the stream fails
async fn read_loop<R>(reader: &mut FrameReader<'_, R>) -> NetworkError
where
    R: Read<Error = NetworkError>,
{
    loop {
        match reader.next_event().await {
            Ok(event) => INBOUND_FRAMES.send(event).await,
            Err(e) => return e,
        }
    }
}

/// Apply inbound events to the session and send whatever it asks for
async fn handle_loop<W, G>(
    session: &mut Session<'static, CriticalSectionRawMutex>,
    writer: &mut FrameWriter<'_, W, G>,
) -> Result<(), NetworkError>
where
    W: Write<Error = NetworkError>,
    G: RngCore,
{
    let mut out = [0u8; 64];
    loop {
        match select(INBOUND_FRAMES.receive(), Timer::after(POLL_INTERVAL)).await {
            Either::First(WsEvent::Text {
                payload,
                received_at,
            }) => {
                // Rejected frames are logged by the session and change nothing.
                if let Ok(applied) = session.on_text(&payload, received_at) {
                    debug!("Applied {}", applied);
                }
            }
            Either::First(WsEvent::Ping(payload)) => writer.send(Opcode::Pong, &payload).await?,
            Either::First(WsEvent::Closed) => {
                info!("Timer server closed the connection");
                // Best effort; the server may already be gone.
                writer.send(Opcode::Close, &[]).await.ok();
                return Ok(());
            }
            Either::Second(()) => {}
        }

        match session.poll(Uptime.now_ms(), &mut out) {
            SessionAction::Idle => {}
            SessionAction::Send(len) => writer.send_text(&out[..len]).await?,
            SessionAction::Reconnect => return Err(NetworkError::Timeout),
        }
    }
}
