use agenda_edge_rs::mock_server::{MockServerConfig, MockUploadServer};
use clap::Parser;
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mock_upload_server")]
#[command(about = "Mock scheduling service that accepts voice-note uploads")]
struct Args {
    /// Address to bind the TCP server to
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    bind: String,

    /// Request path accepting uploads
    #[arg(long, default_value = "/upload")]
    path: String,

    /// Directory to store received WAV files in
    #[arg(long)]
    upload_dir: Option<PathBuf>,

    /// Event name returned for every upload
    #[arg(long, default_value = "Call mom")]
    event_name: String,

    /// Status returned for every upload
    #[arg(long, default_value = "confirmed")]
    status: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    info!("🚀 Starting mock upload server with args: {:?}", args);

    let config = MockServerConfig {
        bind_address: args.bind,
        upload_path: args.path,
        event_name: args.event_name,
        status: args.status,
        upload_dir: args.upload_dir,
        ..MockServerConfig::default()
    };

    let mut server = MockUploadServer::new(config)?;
    let port = server.start()?;
    info!("🗓️ Mock upload server started on port {}", port);

    // Serve until the process is killed
    loop {
        std::thread::park();
    }
}
