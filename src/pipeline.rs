//! `imdbp run`: clean, load, and render the dashboard in one go.
//!
//! Stages run strictly in order and each one consumes the previous stage's
//! artifact from disk. A failed stage stops the run; the dashboard is
//! never rendered over a load that did not commit.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::clean_cmd::run_clean;
use crate::config::Config;
use crate::dashboard::{run_dashboard, Format};
use crate::load::run_load;

pub async fn run_pipeline(config: &Config, raw: &Path, clean: &Path, format: Format) -> Result<()> {
    info!("Stage 1/3: clean");
    run_clean(&config.clean.options(), raw, clean, None)?;

    info!("Stage 2/3: load");
    run_load(config, clean).await?;

    info!("Stage 3/3: dashboard");
    run_dashboard(config, format, None).await
}
