use anyhow::{Result, bail};
use clap::Args;
use devek_core::{EditStreamer, SessionHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::ConfigLoader;
use crate::input::{Control, InputLine, parse_line};
use crate::session::{CliSession, print_update};

/// Edit batches buffered between stdin and the session
const EDIT_BUFFER: usize = 256;

#[derive(Args)]
pub struct ConnectArgs {
    /// Run the login flow first when no token is stored
    #[arg(long)]
    pub login: bool,
}

pub async fn run(args: ConnectArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let mut session = CliSession::start(&config).await?;
    session.handle.activate()?;

    if !session.handle.snapshot().await?.logged_in {
        if !args.login {
            session.shutdown().await?;
            bail!("Not logged in. Run `devek login` or pass --login.");
        }
        if !session.handle.login()?.wait().await? {
            session.shutdown().await?;
            bail!("Login failed");
        }
    }

    let (edits_tx, edits_rx) = mpsc::channel(EDIT_BUFFER);
    let streamer = EditStreamer::new(session.device.clone());
    let streaming = tokio::spawn(streamer.run(edits_rx, session.handle.clone()));

    info!("Reading edits from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => match parse_line(&line) {
                    Ok(Some(InputLine::Edit(batch))) => {
                        if edits_tx.send(batch).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(InputLine::Control { command })) => {
                        handle_control(&session.handle, command).await?;
                    }
                    Ok(None) => {}
                    Err(e) => warn!("{:#}", e),
                },
                None => break,
            },
            update = session.updates.recv() => match update {
                Some(update) => print_update(&update),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(edits_tx);
    let _ = streaming.await;
    session.shutdown().await
}

async fn handle_control(handle: &SessionHandle, command: Control) -> Result<()> {
    match command {
        Control::Login => {
            let outcome = handle.login()?;
            tokio::spawn(async move {
                match outcome.wait().await {
                    Ok(true) => println!("Logged in to Devek.dev"),
                    Ok(false) => println!("Login failed"),
                    Err(e) => println!("Login abandoned: {}", e),
                }
            });
        }
        Control::Logout => handle.logout()?,
        Control::Reconnect | Control::Retry => handle.reconnect()?,
        Control::Cancel => handle.decline_retry()?,
        Control::Status => println!("{}", handle.snapshot().await?),
    }
    Ok(())
}
