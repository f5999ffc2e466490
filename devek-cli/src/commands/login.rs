use anyhow::{Result, bail};
use devek_core::ConnectionStatus;

use super::SETTLE_TIMEOUT;
use crate::config::ConfigLoader;
use crate::session::{CliSession, print_update};

pub async fn run() -> Result<()> {
    let config = ConfigLoader::load()?;
    let mut session = CliSession::start(&config).await?;

    session.handle.activate()?;
    if session.handle.snapshot().await?.logged_in {
        let snapshot = session.settle(SETTLE_TIMEOUT).await?;
        session.shutdown().await?;
        if snapshot.status == ConnectionStatus::Connected {
            println!("Already logged in as {}", snapshot.device.computer_name);
            return Ok(());
        }
        bail!("Stored login could not connect: {}", snapshot.status);
    }

    println!("Opening the Devek.dev login page...");
    let outcome = session.handle.login()?;
    let logged_in = outcome.wait().await?;

    while let Ok(update) = session.updates.try_recv() {
        print_update(&update);
    }
    session.shutdown().await?;

    if !logged_in {
        bail!("Login failed");
    }
    println!("Logged in to Devek.dev");
    Ok(())
}
