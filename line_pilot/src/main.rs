// THEORY:
// `line_pilot` is the process that runs on the vehicle (or next to a simulator).
// It does no vision work of its own. It loads the configuration, opens a frame
// source, builds the thruster link, and hands all three to `LineFollower`.
//
// Threading model: the follower loop is synchronous and runs on the main thread.
// A tokio runtime is built explicitly and only hosts the link writers, so a slow
// serial port or socket can never stall a frame. On exit the dispatcher is dropped,
// which closes its channel, and the writer is joined so the final stop command
// actually leaves the machine.
//
// Ctrl-C is caught on the runtime and only raises a flag. The frame source sees it
// at the next frame and ends the stream, so an interrupted live run leaves through
// the same stop-and-join path as a replay that ran out of frames.

mod dispatch;
mod source;
mod wire;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use dispatch::{ChannelDispatcher, ThrottledDispatcher, spawn_serial, spawn_udp};
use line_vision::{CommandDispatcher, FrameSource, LineFollower, LinePipeline, PipelineConfig};
use source::InterruptibleSource;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wire::WireMode;

const DEFAULT_LOG_FILTER: &str = "line_pilot=info,line_vision=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DispatchKind {
    /// Decide but send nothing.
    None,
    Serial,
    Udp,
}

#[derive(Parser, Debug)]
#[command(name = "line_pilot")]
#[command(
    about = "Follows a painted line on the pool floor and steers the vehicle along it",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// TOML file overriding the default thresholds and gains
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of frames (png, jpg, bmp) replayed in name order
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Camera device index (needs the `camera` feature)
    #[arg(long)]
    camera: Option<i32>,

    /// Video file to read frames from (needs the `camera` feature)
    #[arg(long)]
    video: Option<String>,

    /// Where commands go
    #[arg(long, value_enum, default_value = "none")]
    dispatch: DispatchKind,

    /// Serial port of the thruster controller, e.g. /dev/ttyUSB0
    #[arg(long)]
    port: Option<String>,

    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Simulator address for UDP dispatch
    #[arg(long, default_value = "127.0.0.1:5005")]
    udp_target: SocketAddr,

    /// Wire format of each command line
    #[arg(long, value_enum, default_value = "cmd")]
    wire: WireMode,

    /// Cruise speed override (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    speed: Option<u8>,

    /// Resend an unchanged command after this many milliseconds
    #[arg(long, default_value_t = 150)]
    resend_ms: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(speed) = cli.speed {
        config.cruise_speed = speed;
    }
    let pipeline = LinePipeline::new(config).context("invalid pipeline configuration")?;

    let runtime = Runtime::new().context("starting tokio runtime")?;
    let (dispatcher, writer) = build_dispatcher(&cli, &runtime)?;

    let mut follower = LineFollower::new(pipeline);
    if let Some(dispatcher) = dispatcher {
        follower = follower.with_dispatcher(dispatcher);
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    watch_for_interrupt(&runtime, interrupted.clone());

    let mut source = InterruptibleSource::new(open_source(&cli)?, interrupted);
    let summary = follower.run(&mut source);
    info!(
        cycles = summary.cycles,
        dispatch_failures = summary.dispatch_failures,
        last = ?summary.last_direction,
        end = ?summary.end,
        "run finished"
    );

    drop(follower);
    if let Some(writer) = writer {
        if let Err(err) = runtime.block_on(writer) {
            warn!(%err, "link writer did not shut down cleanly");
        }
    }
    Ok(())
}

/// Raises `interrupted` on the first Ctrl-C.
fn watch_for_interrupt(runtime: &Runtime, interrupted: Arc<AtomicBool>) {
    runtime.spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, stopping after the current frame");
                interrupted.store(true, Ordering::SeqCst);
            }
            Err(err) => warn!(%err, "cannot listen for ctrl-c"),
        }
    });
}

type BoxedDispatcher = Box<dyn CommandDispatcher + Send>;
type Link = (Option<BoxedDispatcher>, Option<JoinHandle<()>>);

fn build_dispatcher(cli: &Cli, runtime: &Runtime) -> Result<Link> {
    let resend = Duration::from_millis(cli.resend_ms);
    match cli.dispatch {
        DispatchKind::None => Ok((None, None)),
        DispatchKind::Serial => {
            let Some(port) = cli.port.as_deref() else {
                bail!("--dispatch serial needs --port");
            };
            let link = spawn_serial(runtime, port, cli.baud, cli.wire);
            Ok(attach_link(link, resend, port))
        }
        DispatchKind::Udp => {
            let link = spawn_udp(runtime, cli.udp_target, cli.wire);
            Ok(attach_link(link, resend, &cli.udp_target.to_string()))
        }
    }
}

/// Wraps an opened link in the resend throttle. A link that failed to open is
/// logged and the run goes on without a dispatcher.
fn attach_link<E: Display>(
    opened: std::result::Result<(ChannelDispatcher, JoinHandle<()>), E>,
    resend: Duration,
    name: &str,
) -> Link {
    match opened {
        Ok((dispatcher, writer)) => {
            let throttled: BoxedDispatcher =
                Box::new(ThrottledDispatcher::new(dispatcher, resend));
            (Some(throttled), Some(writer))
        }
        Err(err) => {
            warn!(link = name, %err, "cannot open link, running without dispatcher");
            (None, None)
        }
    }
}

fn open_source(cli: &Cli) -> Result<Box<dyn FrameSource>> {
    #[cfg(feature = "camera")]
    {
        if let Some(path) = &cli.video {
            return Ok(Box::new(source::CameraSource::file(path)?));
        }
        if let Some(index) = cli.camera {
            return Ok(Box::new(source::CameraSource::device(index)?));
        }
    }
    #[cfg(not(feature = "camera"))]
    if cli.camera.is_some() || cli.video.is_some() {
        bail!("built without the `camera` feature, use --frames <dir>");
    }

    match &cli.frames {
        Some(dir) => {
            let frames = source::ImageSequenceSource::open(dir)?;
            if frames.is_empty() {
                warn!(dir = %dir.display(), "no frames found");
            } else {
                info!(frames = frames.len(), "replaying image sequence");
            }
            Ok(Box::new(frames))
        }
        None => bail!("no frame source given, use --frames <dir>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["line_pilot", "--frames", "run1"]).unwrap();
        assert_eq!(cli.dispatch, DispatchKind::None);
        assert_eq!(cli.wire, WireMode::Cmd);
        assert_eq!(cli.baud, 115_200);
        assert_eq!(cli.resend_ms, 150);
        assert_eq!(cli.udp_target, "127.0.0.1:5005".parse::<SocketAddr>().unwrap());
        assert!(cli.speed.is_none());
    }

    #[test]
    fn speed_over_100_is_rejected() {
        assert!(Cli::try_parse_from(["line_pilot", "--speed", "140"]).is_err());
    }

    #[test]
    fn udp_velocity_flags_parse() {
        let cli = Cli::try_parse_from([
            "line_pilot",
            "--dispatch",
            "udp",
            "--wire",
            "vel",
            "--udp-target",
            "10.0.0.2:6000",
        ])
        .unwrap();
        assert_eq!(cli.dispatch, DispatchKind::Udp);
        assert_eq!(cli.wire, WireMode::Vel);
    }

    #[test]
    fn serial_without_port_is_an_error() {
        let cli = Cli::try_parse_from(["line_pilot", "--dispatch", "serial"]).unwrap();
        let runtime = Runtime::new().unwrap();
        assert!(build_dispatcher(&cli, &runtime).is_err());
    }

    #[test]
    fn unopenable_serial_port_runs_without_dispatcher() {
        let cli = Cli::try_parse_from([
            "line_pilot",
            "--dispatch",
            "serial",
            "--port",
            "/dev/line-pilot-no-such-port",
        ])
        .unwrap();
        let runtime = Runtime::new().unwrap();
        let (dispatcher, writer) = build_dispatcher(&cli, &runtime).unwrap();
        assert!(dispatcher.is_none());
        assert!(writer.is_none());
    }

    #[test]
    fn failed_udp_link_runs_without_dispatcher() {
        let failed = Err(std::io::Error::other("network unreachable"));
        let (dispatcher, writer) = attach_link(failed, Duration::from_millis(150), "10.0.0.2:6000");
        assert!(dispatcher.is_none());
        assert!(writer.is_none());
    }

    #[test]
    fn udp_link_is_throttled_and_joinable() {
        let receiver = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = receiver.local_addr().unwrap().to_string();
        let cli = Cli::try_parse_from(["line_pilot", "--dispatch", "udp", "--udp-target", &target])
            .unwrap();
        let runtime = Runtime::new().unwrap();

        let (dispatcher, writer) = build_dispatcher(&cli, &runtime).unwrap();
        let mut dispatcher = dispatcher.unwrap();
        dispatcher.dispatch_stop().unwrap();
        drop(dispatcher);
        runtime.block_on(writer.unwrap()).unwrap();
    }

    #[test]
    fn missing_source_is_an_error() {
        let cli = Cli::try_parse_from(["line_pilot"]).unwrap();
        assert!(open_source(&cli).is_err());
    }
}
