// Entrypoint for the CLI application.
// - Keeps `main` small: load configuration, create an API client and hand
//   both to the interactive run.
// - Returns `anyhow::Result` so any unhandled error prints once with a
//   uniform prefix and the process exits non-zero.

use meshfit_cli::{api::ApiClient, config::Config, ui};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Reads .env (if present) and the USERNAME/PASSWORD/API_URL variables.
    let config = Config::from_env()?;
    let api = ApiClient::new(&config)?;

    ui::run(&config, api)
}
