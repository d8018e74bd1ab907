use clap::Parser;

use dedukt_lsp::config::Cli;
use dedukt_lsp::log;
use dedukt_lsp::lsp::server::run_server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // Dropped last, after the server loop ends, so pending log lines flush
    let _log_guard = log::init(&cli.log_config())?;

    run_server(cli.server_config()).await
}
