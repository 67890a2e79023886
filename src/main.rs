//! feedpipe CLI
//!
//! Pipes stdin/stdout through one feed topic pair: every stdin line is
//! pushed as a broker message, every inbound payload is printed as a line.
//! The pipe knows nothing about topics or reconnection, which is the point.

use clap::Parser;
use feedpipe::observability::init_default_logging;
use feedpipe::{FeedStream, StreamConfig};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "feedpipe",
    about = "Pipe stdin/stdout through an MQTT feed topic pair"
)]
struct Cli {
    /// Path to the stream configuration TOML file
    #[arg(short, long, env = "FEEDPIPE_CONFIG")]
    config: PathBuf,

    /// Override the configured stream id for this session
    #[arg(long)]
    stream_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_default_logging();
    let cli = Cli::parse();

    let config = StreamConfig::load_from_file(&cli.config)?;
    let mut stream = FeedStream::new(config)?;
    stream.connect(cli.stream_id.as_deref()).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    // pull() pops a payload only at the instant it returns, so losing the
    // race in select! never discards data.
    loop {
        tokio::select! {
            chunk = stream.pull() => {
                stdout.write_all(&chunk).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => stream.push(line.as_bytes()).await,
                    None => {
                        info!("stdin closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
