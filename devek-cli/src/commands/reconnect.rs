use anyhow::{Result, bail};

use super::SETTLE_TIMEOUT;
use crate::config::ConfigLoader;
use crate::session::CliSession;

pub async fn run() -> Result<()> {
    let config = ConfigLoader::load()?;
    let mut session = CliSession::start(&config).await?;

    session.handle.activate()?;
    if !session.handle.snapshot().await?.logged_in {
        session.shutdown().await?;
        bail!("Not logged in. Run `devek login` first.");
    }

    session.handle.reconnect()?;
    let snapshot = session.settle(SETTLE_TIMEOUT).await?;
    session.shutdown().await?;

    println!("{}", snapshot);
    Ok(())
}
