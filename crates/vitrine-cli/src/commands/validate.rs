//! `vitrine validate` - check that a dashboard can be published.

use std::path::Path;

use vitrine_policy::validate_dashboard_publishable;

use super::load_dashboard;

pub fn run(file: &Path) -> anyhow::Result<()> {
    let dashboard = load_dashboard(file)?;
    validate_dashboard_publishable(&dashboard)?;
    println!("✔ Dashboard '{}' can be published", dashboard.uid);
    Ok(())
}
