use std::{process, sync::Arc};

use pdfmaker::{
    application::{error::AppError, pdf::PdfService, templates::TemplateRenderer},
    config,
    infra::{
        api2pdf::Api2PdfClient,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
        templates::HandlebarsTemplates,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let api = Arc::new(Api2PdfClient::new(&settings.api).map_err(AppError::from)?);
    let templates: Arc<dyn TemplateRenderer> = Arc::new(
        HandlebarsTemplates::from_directory(&settings.templates.directory)
            .map_err(AppError::from)?,
    );

    let state = HttpState {
        pdf: Arc::new(PdfService::new(api, templates.clone())),
        templates,
        defaults: Arc::new(settings.options.clone()),
    };
    let router = http::build_router(state, settings.integrations);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "pdfmaker::serve",
        addr = %settings.server.addr,
        formie = settings.integrations.formie,
        commerce = settings.integrations.commerce,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
