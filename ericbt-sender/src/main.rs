mod config;

use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use ericbt_domain::command::Backlight;
use ericbt_domain::status::{STATUS_BANNER, StatusFrame};
use ericbt_link::finder::Finder;
use ericbt_link::link::UartLink;
use ericbt_link::pump::pump;
use futures::StreamExt;
use tokio::{signal, time};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::SenderConfig;

const DEBUG_FILTER: &str = "info,ericbt_link=debug,ericbt_sender=debug,ericbt_domain=debug";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// log payloads and print acknowledgements from the display
    #[arg(long)]
    debug: bool,

    /// turn the display backlight off
    #[arg(long)]
    backlight_off: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let default_filter = if args.debug { DEBUG_FILTER } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = SenderConfig::default();
    let finder = Finder::new().await.context("opening Bluetooth adapter")?;
    let Some(peripheral) = finder
        .find(&config.target, config.scan_timeout)
        .await
        .context("scanning for device")?
    else {
        return Ok(ExitCode::SUCCESS);
    };

    time::sleep(config.settle).await;
    let mut link = UartLink::connect(peripheral, config.delivery)
        .await
        .context("connecting to device")?;

    if args.debug {
        spawn_ack_logger(&link).await;
    }

    let backlight = if args.backlight_off {
        Backlight::Off
    } else {
        Backlight::On
    };
    let mut frame = StatusFrame::new(STATUS_BANNER, backlight);

    let interrupted = tokio::select! {
        result = pump(&mut link, &mut frame, config.interval, None, || Local::now().time()) => {
            result.context("sending status")?;
            false
        }
        _ = signal::ctrl_c() => true,
    };

    if interrupted {
        println!("\nInterrupted by user.");
        if let Err(e) = link.disconnect().await {
            warn!("disconnect: {e}");
        }
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

async fn spawn_ack_logger(link: &UartLink) {
    match link.subscribe_acks().await {
        Ok(Some(mut acks)) => {
            tokio::spawn(async move {
                while let Some(ack) = acks.next().await {
                    info!("Notify: {}", String::from_utf8_lossy(&ack));
                }
            });
        }
        Ok(None) => info!("Device has no TX characteristic, not listening for acks"),
        Err(e) => warn!("subscribing to acks: {e}"),
    }
}
