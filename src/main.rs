use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};

mod api;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod service;
mod store;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::service::attendance::AttendanceService;
use crate::service::payroll::PayrollService;
use crate::store::mysql::MySqlStore;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HRM attendance & payroll service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config).await?;

    let store = Arc::new(MySqlStore::new(pool.clone()));
    let attendance = Data::new(AttendanceService::new(
        store.clone(),
        config.weekend_days.clone(),
    ));
    let payroll = Data::new(PayrollService::new(store));

    let limits = routes::RateLimits::from_config(&config)?;
    let api_prefix = config.api_prefix.clone();
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(attendance.clone())
            .app_data(payroll.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &api_prefix, &limits))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
