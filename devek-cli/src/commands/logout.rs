use anyhow::Result;

use crate::config::ConfigLoader;
use crate::session::CliSession;

pub async fn run() -> Result<()> {
    let config = ConfigLoader::load()?;
    let session = CliSession::start(&config).await?;

    session.handle.logout()?;
    // Replies come after the logout has been handled
    session.handle.snapshot().await?;
    session.shutdown().await?;

    println!("Logged out of Devek.dev");
    Ok(())
}
