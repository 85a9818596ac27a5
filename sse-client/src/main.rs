use anyhow::Result;
use clap::Parser;
use colored::*;
use log::*;
use sse::message::UserKeys;
use sse_client::{output, ClientSession, EventSourceTransport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "sse-client")]
#[command(about = "Subscribe to the push channel and print incoming notifications")]
struct Cli {
    /// Base URL of the server (e.g., http://localhost:4000)
    #[arg(long, default_value = "http://localhost:4000")]
    base_url: String,

    /// User key to subscribe as. Repeat the flag or separate keys with commas.
    #[arg(long = "user-id", required = true, value_delimiter = ',')]
    user_ids: Vec<String>,

    /// Exit after this many events
    #[arg(long)]
    max_events: Option<usize>,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    let user_ids = UserKeys::parse_query_param(&cli.user_ids.join(","));
    if user_ids.is_empty() {
        anyhow::bail!("at least one non-blank --user-id is required");
    }

    let session = ClientSession::new(
        cli.base_url.as_str(),
        user_ids.clone(),
        EventSourceTransport::current()?,
    );

    let received = Arc::new(AtomicUsize::new(0));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    let counter = Arc::clone(&received);
    let max_events = cli.max_events;
    let limit_tx = done_tx.clone();
    session.on_message(move |payload| {
        let index = counter.fetch_add(1, Ordering::SeqCst) + 1;
        output::print_event(index, &payload);
        if max_events.is_some_and(|max| index >= max) {
            let _ = limit_tx.send(None);
        }
    });

    session.on_error(move |error| {
        output::print_error(error);
        if matches!(error, sse::Error::Transport(_)) {
            let _ = done_tx.send(Some(error.clone()));
        }
    });

    output::print_connecting(&session.url());
    session.connect()?;
    output::print_connected(&user_ids.to_query_param());

    let error = tokio::select! {
        outcome = done_rx.recv() => outcome.flatten(),
        _ = tokio::signal::ctrl_c() => {
            println!("\n{} Interrupted", "→".blue());
            None
        }
    };

    debug!("Shutting down session to {}", session.url());
    session.disconnect();
    output::print_summary(received.load(Ordering::SeqCst), error.as_ref());

    if error.is_some() {
        std::process::exit(1);
    }

    Ok(())
}
