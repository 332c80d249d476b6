use agenda_edge_rs::{
    audio_capture::ToneSource,
    clock::SystemClock,
    config::load_config,
    controller::Device,
    panel::{Button, ConsolePanel},
    upload::TcpConnector,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Upload service host (overrides AGENDA_SERVER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Upload service port (overrides AGENDA_SERVER_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Frequency of the synthetic microphone tone in Hz
    #[arg(long, default_value = "440.0")]
    tone_hz: f32,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    log::info!("🚀 Starting agenda device with args: {:?}", args);

    let mut config = load_config().context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }
    config.validate().context("Invalid configuration")?;

    // Buttons arrive as lines on stdin
    let (tx, rx) = crossbeam_channel::unbounded();
    let running = Arc::new(AtomicBool::new(true));
    let input_running = running.clone();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match Button::from_str(line.trim()) {
                Ok(button) => {
                    if tx.send(button).is_err() {
                        break;
                    }
                }
                Err(_) => log::warn!("⚠️ Unknown button '{}', use A or B", line.trim()),
            }
        }
        log::info!("⌨️ Input closed");
        input_running.store(false, Ordering::Relaxed);
    });

    println!("🗓️ Agenda device ready, uploading to {}", config.authority());
    println!("   B + Enter starts a recording, B + Enter again stops it");
    println!("   A + Enter completes the next scheduled event");

    let connector = TcpConnector::new(config.poll_interval);
    let mut device = Device::new(
        config,
        ConsolePanel::new(),
        rx,
        ToneSource::new(args.tone_hz),
        connector,
        SystemClock,
    );
    device.run_while(|| running.load(Ordering::Relaxed));

    Ok(())
}
