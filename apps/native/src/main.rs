//! `grbl-console`: talk to a Grbl controller over a serial port.
//!
//! Controller output is printed as it arrives. Input lines are either
//! console commands (`%run`, `%check`, `%status`, `%reset`, `help`) or sent
//! to the controller as-is. Ends on EOF or ctrl-c.

use bridge::{logging, Bridge, BridgeConfig, BridgeError, Transport};
use clap::Parser;
use console::{Completion, ConsoleError, Output, Session, StdoutOutput};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "grbl-console", about = "Serial console for Grbl CNC controllers", version)]
struct Cli {
    /// Show debug logs, including every serial read and write
    #[arg(short, long)]
    debug: bool,

    /// Serial baud rate [default: 115200]
    #[arg(short, long = "baudrate", value_name = "N")]
    baudrate: Option<u32>,

    /// JSON connection settings; flags override values from the file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip the wake-up sequence after opening the port
    #[arg(long)]
    no_wakeup: bool,

    /// Serial device, e.g. /dev/ttyUSB0 or COM3
    device: String,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "exiting");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<BridgeConfig, BridgeError> {
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::from_json_file(path)?,
        None => BridgeConfig::default(),
    };
    config.serial.device = cli.device.clone();
    if let Some(baud) = cli.baudrate {
        config.serial.baud_rate = baud;
    }
    if cli.no_wakeup {
        config.send_wakeup = false;
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = load_config(&cli)?;
    debug!(?config, "configuration");

    let bridge = Arc::new(Bridge::connect(config)?);
    let result = interact(&bridge).await;
    if let Err(e) = bridge.shutdown().await {
        warn!(error = %e, "shutdown failed");
    }
    result
}

async fn interact<T: Transport>(bridge: &Arc<Bridge<T>>) -> Result<(), AppError> {
    startup(bridge).await?;

    let mut display = spawn_display(bridge.clone());
    let mut session = Session::new(bridge.clone(), StdoutOutput);
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    // One listener for the whole session, so a signal during a command is
    // not lost between loop passes.
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    info!("end of input");
                    return Ok(());
                };
                let completion = session.handle_input_until(&line, interrupt.as_mut()).await?;
                if completion == Completion::Cancelled {
                    info!("interrupted");
                    return Ok(());
                }
            }
            _ = interrupt.as_mut() => {
                info!("interrupted");
                return Ok(());
            }
            stopped = &mut display => {
                return match stopped {
                    Ok(e) => Err(e.into()),
                    Err(_) => Err(BridgeError::ChannelClosed.into()),
                };
            }
        }
    }
}

/// Wake the controller and wait for its banner. A controller that was
/// already running does not print one, so a timeout only warns.
async fn startup<T: Transport>(bridge: &Bridge<T>) -> Result<(), BridgeError> {
    let config = bridge.config();
    if config.send_wakeup {
        bridge.wakeup().await?;
    }
    match tokio::time::timeout(config.banner_timeout(), bridge.wait_for_banner()).await {
        Ok(banner) => StdoutOutput.line(banner?.as_str()),
        Err(_) => warn!(
            timeout_ms = config.banner_timeout_ms,
            "no banner received, continuing"
        ),
    }
    Ok(())
}

/// Print default-queue lines until the reply channel closes.
fn spawn_display<T: Transport>(bridge: Arc<Bridge<T>>) -> JoinHandle<BridgeError> {
    tokio::spawn(async move {
        let mut out = StdoutOutput;
        loop {
            match bridge.next_line().await {
                Ok(line) => out.line(line.as_str()),
                Err(e) => return e,
            }
        }
    })
}
