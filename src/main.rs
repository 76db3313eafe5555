use std::io;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use gpt_relay::cli::{Args, Command};
use gpt_relay::render::SnapshotRenderer;
use gpt_relay::{relay, RelayClient, RelayConfig, StreamSession};

fn init_tracing() {
    // Logs go to stderr; stdout carries only response text.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gpt_relay=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing();

    if let Command::Completions { shell } = args.command {
        clap_complete::generate(shell, &mut Args::command(), "gpt-relay", &mut io::stdout());
        return Ok(());
    }

    if args.plain {
        colored::control::set_override(false);
    }

    let mut config = RelayConfig::load(args.config.as_deref())?;
    if let Some(api) = &args.api {
        config.base_url = api.clone();
    }
    let client = RelayClient::new(config)?;

    let mut session = StreamSession::new();
    let ticket = session.begin();
    let request = args
        .command
        .to_request(ticket.cancel.clone())
        .ok_or("command does not stream")?;

    // Ctrl-C cancels the stream; whatever was printed stands.
    let ctrl_c = ticket.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut renderer = SnapshotRenderer::new(args.format);
    let mut stdout = io::stdout();
    let label = match args.command {
        Command::Translate { .. } => "Translate",
        _ => "Pros/Cons",
    };
    renderer.header(&mut stdout, label, &request.echo())?;

    let outcome = relay(&client, &request, &mut renderer, &mut stdout).await?;
    session.finish(ticket.generation, outcome.state);

    if let Some(e) = outcome.error {
        return Err(e.into());
    }
    Ok(())
}
