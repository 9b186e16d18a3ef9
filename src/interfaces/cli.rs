use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mt-bridge")]
#[command(about = "Line-delimited JSON translation subprocess.")]
#[command(version)]
pub struct Cli {
    /// Source language code
    #[arg(short = 'f', long)]
    pub from: Option<String>,

    /// Target language code
    #[arg(short = 't', long)]
    pub to: Option<String>,

    /// Package index location (http(s) URL or local file)
    #[arg(long, env = "MT_BRIDGE_INDEX_URL")]
    pub index_url: Option<String>,

    /// Directory holding the package index and installed packages
    #[arg(long, env = "MT_BRIDGE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Generate config sample
    #[arg(long)]
    pub generate_config: bool,

    /// Show installed packages and paths
    #[arg(long)]
    pub status: bool,

    /// Refresh the package index and list available packages
    #[arg(long)]
    pub list_available: bool,
}

impl Cli {
    /// True when stdout carries the JSON protocol.
    pub fn is_protocol_mode(&self) -> bool {
        !(self.generate_config || self.status || self.list_available)
    }
}
