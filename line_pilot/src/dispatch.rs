//! Command dispatchers for the thruster link.
//!
//! The vision loop is synchronous and must never wait on a slow link. Every
//! transport therefore sits behind a bounded channel: the loop `try_send`s an
//! encoded line and a background task owns the serial port or the socket. A full
//! channel drops the command and reports backpressure, and the next cycle sends a
//! fresh one anyway.
//!
//! The final stop is the exception. It waits for room in the channel, so it is
//! queued behind the motion commands still pending, and the throttle never
//! suppresses it. It must be called from outside the runtime.

use crate::wire::WireMode;
use line_vision::{CommandDispatcher, DirectionCommand, DispatchError};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lines that may wait for the writer before commands start being dropped.
pub const CHANNEL_CAPACITY: usize = 8;

const SERIAL_TIMEOUT: Duration = Duration::from_millis(100);

/// Encodes commands and hands them to a writer task.
pub struct ChannelDispatcher {
    wire: WireMode,
    tx: mpsc::Sender<String>,
}

impl ChannelDispatcher {
    pub fn new(wire: WireMode, tx: mpsc::Sender<String>) -> Self {
        Self { wire, tx }
    }
}

impl CommandDispatcher for ChannelDispatcher {
    fn dispatch(&mut self, command: DirectionCommand, speed: u8) -> Result<(), DispatchError> {
        self.tx
            .try_send(self.wire.encode(command, speed))
            .map_err(|err| match err {
                TrySendError::Full(_) => DispatchError::Backpressure,
                TrySendError::Closed(_) => DispatchError::Closed,
            })
    }

    fn dispatch_stop(&mut self) -> Result<(), DispatchError> {
        self.tx
            .blocking_send(self.wire.encode(DirectionCommand::NoLine, 0))
            .map_err(|_| DispatchError::Closed)
    }
}

/// Suppresses repeats: a command goes out when it differs from the last one sent,
/// or when `resend` has passed since then.
pub struct ThrottledDispatcher<D> {
    inner: D,
    resend: Duration,
    last: Option<(DirectionCommand, u8, Instant)>,
}

impl<D: CommandDispatcher> ThrottledDispatcher<D> {
    pub fn new(inner: D, resend: Duration) -> Self {
        Self {
            inner,
            resend,
            last: None,
        }
    }
}

impl<D: CommandDispatcher> CommandDispatcher for ThrottledDispatcher<D> {
    fn dispatch(&mut self, command: DirectionCommand, speed: u8) -> Result<(), DispatchError> {
        if let Some((last_command, last_speed, sent_at)) = self.last {
            if last_command == command && last_speed == speed && sent_at.elapsed() < self.resend {
                return Ok(());
            }
        }
        self.inner.dispatch(command, speed)?;
        self.last = Some((command, speed, Instant::now()));
        Ok(())
    }

    fn dispatch_stop(&mut self) -> Result<(), DispatchError> {
        self.inner.dispatch_stop()?;
        self.last = Some((DirectionCommand::NoLine, 0, Instant::now()));
        Ok(())
    }
}

/// Opens `port_name` and starts a blocking writer for it.
pub fn spawn_serial(
    runtime: &Runtime,
    port_name: &str,
    baud_rate: u32,
    wire: WireMode,
) -> Result<(ChannelDispatcher, JoinHandle<()>), serialport::Error> {
    let mut port = serialport::new(port_name, baud_rate)
        .timeout(SERIAL_TIMEOUT)
        .open()?;
    info!(port = port_name, baud_rate, "serial link open");

    let (tx, mut rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let name = port_name.to_string();
    let writer = runtime.spawn_blocking(move || {
        while let Some(line) = rx.blocking_recv() {
            if let Err(err) = port.write_all(line.as_bytes()).and_then(|()| port.flush()) {
                warn!(port = %name, %err, "serial write failed");
            }
        }
        debug!(port = %name, "serial writer finished");
    });

    Ok((ChannelDispatcher::new(wire, tx), writer))
}

/// Binds a local socket connected to `target` and starts an async writer.
pub fn spawn_udp(
    runtime: &Runtime,
    target: SocketAddr,
    wire: WireMode,
) -> io::Result<(ChannelDispatcher, JoinHandle<()>)> {
    let local: SocketAddr = if target.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        SocketAddr::from(([0u16; 8], 0))
    };
    let socket = runtime.block_on(async {
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        Ok::<_, io::Error>(socket)
    })?;
    info!(%target, "udp link ready");

    let (tx, mut rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let writer = runtime.spawn(async move {
        while let Some(line) = rx.recv().await {
            if let Err(err) = socket.send(line.as_bytes()).await {
                warn!(%target, %err, "udp send failed");
            }
        }
        debug!(%target, "udp writer finished");
    });

    Ok((ChannelDispatcher::new(wire, tx), writer))
}
