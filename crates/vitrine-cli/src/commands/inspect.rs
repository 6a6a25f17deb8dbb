//! `vitrine inspect` - show what a dashboard exposes in public mode.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use vitrine_core::{Dashboard, QueryDescriptor};
use vitrine_policy::{AnonymousContextBuilder, ExecutionContext, ValidationError};
use vitrine_query::{DashboardQueries, group_queries_by_datasource};

use super::load_dashboard;

/// Key used for queries without a datasource uid.
const NO_DATASOURCE: &str = "(none)";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub uid: String,
    pub title: String,
    pub has_template_variables: bool,
    pub panels: BTreeMap<i64, Vec<QueryDescriptor>>,
    pub datasource_uids: Vec<String>,
    pub context: ExecutionContext,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelReport {
    pub panel_id: i64,
    pub datasources: BTreeMap<String, Vec<QueryDescriptor>>,
}

pub fn dashboard_report(dashboard: &Dashboard) -> DashboardReport {
    let queries = DashboardQueries::from_dashboard(dashboard);
    let context = AnonymousContextBuilder::from_queries(dashboard.org_id, &queries);
    DashboardReport {
        uid: dashboard.uid.clone(),
        title: dashboard.title.clone(),
        has_template_variables: dashboard.has_template_variables(),
        datasource_uids: queries.datasource_uids(),
        panels: queries.into_inner(),
        context,
    }
}

pub fn panel_report(dashboard: &Dashboard, panel_id: i64) -> Result<PanelReport, ValidationError> {
    let queries = DashboardQueries::from_dashboard(dashboard);
    let panel = queries
        .panel(panel_id)
        .ok_or_else(|| ValidationError::panel_not_found(panel_id))?;

    let datasources = group_queries_by_datasource(panel)
        .into_iter()
        .map(|(uid, queries)| (uid.unwrap_or_else(|| NO_DATASOURCE.to_string()), queries))
        .collect();

    Ok(PanelReport {
        panel_id,
        datasources,
    })
}

pub fn run(file: &Path, panel: Option<i64>) -> anyhow::Result<()> {
    let dashboard = load_dashboard(file)?;
    let output = match panel {
        Some(panel_id) => serde_json::to_string_pretty(&panel_report(&dashboard, panel_id)?)?,
        None => serde_json::to_string_pretty(&dashboard_report(&dashboard))?,
    };
    println!("{output}");
    Ok(())
}
