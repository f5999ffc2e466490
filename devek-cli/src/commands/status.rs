use anyhow::Result;
use devek_core::StatusPresentation;

use super::SETTLE_TIMEOUT;
use crate::config::ConfigLoader;
use crate::session::CliSession;

pub async fn run() -> Result<()> {
    let config = ConfigLoader::load()?;
    let mut session = CliSession::start(&config).await?;

    session.handle.activate()?;
    let snapshot = session.settle(SETTLE_TIMEOUT).await?;
    session.shutdown().await?;

    println!("{}", StatusPresentation::LABEL);
    println!("{}", snapshot);
    println!("{}", snapshot.status.presentation().tooltip);
    Ok(())
}
