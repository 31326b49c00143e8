pub mod bootstrap;
pub mod config;
mod error;
mod logging;
pub mod notifications;
pub mod reports;
pub mod runtime;
pub mod services;
pub mod sync;
pub mod writes;

use std::path::Path;

use chrono::Utc;

pub use error::AppError;

use crate::adapters::gateway::RemoteData;
use crate::domain::export::ExportOutcome;

fn bootstrap() -> Result<(config::AppConfig, bootstrap::Services), AppError> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        api_base_url = %config.api_base_url,
        socket_url = %config.socket_url,
        state_db_path = %config.state_db_path,
        status_bind = %config.status_bind,
        request_timeout_ms = config.request_timeout_ms,
        credentials = config.credentials.is_some(),
        "application bootstrap initialized"
    );

    let services = bootstrap::open_services(&config)?;
    let session = bootstrap::ensure_session(
        &services.gateway,
        services.store.as_ref(),
        services.store.as_ref(),
        config.credentials.as_ref(),
    )?;
    tracing::info!(user = %session.user.name, role = session.user.role.as_str(), "session ready");

    Ok((config, services))
}

pub fn run() -> Result<(), AppError> {
    let (config, services) = bootstrap()?;
    runtime::run(config, services)
}

pub fn run_export() -> Result<(), AppError> {
    let (config, services) = bootstrap()?;

    let now = Utc::now();
    let range = config
        .export_range
        .resolve(config.display_clock.today(now));
    let request = reports::ExportRequest::new(config.export_family, range);
    let remote: std::sync::Arc<dyn RemoteData> = services.gateway.clone();
    let service = reports::ReportService::new(
        remote,
        config.display_clock,
        &config.organization_name,
    );

    tracing::info!(
        family = config.export_family.as_str(),
        period = %request.range.period_label(),
        "export starting"
    );

    for outcome in service.export(&request, config.export_format.formats(), now)? {
        match outcome {
            ExportOutcome::Document { file_name, bytes } => {
                let path =
                    reports::write_document(Path::new(&config.export_dir), &file_name, &bytes)?;
                tracing::info!(path = %path.display(), "report written");
            }
            ExportOutcome::NoRecords => {
                tracing::info!("no records found for the selected period");
            }
        }
    }

    Ok(())
}
