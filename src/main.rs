//! Binary entry point: resolve paths, start logging, open the database and
//! hand it to the terminal UI until the user quits.
use anyhow::Context;
use school_records::{logging, run_app, App, Config, SchoolStore};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init(&config.log_path)?;

    let store = SchoolStore::open(&config.db_path).with_context(|| {
        format!("failed to open database {}", config.db_path.display())
    })?;

    let mut app = App::new(store);
    run_app(&mut app)
}
