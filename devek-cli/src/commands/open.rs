use anyhow::Result;
use clap::{Args, ValueEnum};
use devek_core::{APP_URL, BrowserOpener, DOCS_URL, UrlOpener};

#[derive(Args)]
pub struct OpenArgs {
    /// Page to open
    #[arg(value_enum)]
    pub target: OpenTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OpenTarget {
    /// The Devek.dev app (sign up or view activity)
    App,
    /// Documentation
    Docs,
}

impl OpenTarget {
    pub fn url(self) -> &'static str {
        match self {
            Self::App => APP_URL,
            Self::Docs => DOCS_URL,
        }
    }
}

pub fn run(args: OpenArgs) -> Result<()> {
    let url = args.target.url();
    if let Err(e) = BrowserOpener.open(url) {
        println!("{}", e);
        println!("Open {} manually.", url);
    }
    Ok(())
}
