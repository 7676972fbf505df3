use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use config::Settings;
use documents::{DocumentRenderer, PdfRenderer};
use dotenv::dotenv;
use email::{EmailSender, LogEmailSender, SmtpEmailSender};
use errors::AppError;
use models::{PgStore, Store};
use sqlx::postgres::PgPoolOptions;
use storage::{AssetStore, LocalAssetStore};
use tracing_subscriber::EnvFilter;

mod config;
mod documents;
mod email;
mod errors;
mod handlers;
mod middlewares;
mod models;
mod paths;
mod schema;
mod services;
mod storage;
mod utils;

#[cfg(test)]
mod test_init_app;

/// Everything a request handler can reach.
#[derive(Clone)]
pub struct GlobalState{
    pub store: Arc<dyn Store>,
    pub assets: Arc<dyn AssetStore>,
    pub mailer: Arc<dyn EmailSender>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub settings: Settings,
}

fn mailer(settings: &Settings) -> Result<Arc<dyn EmailSender>, AppError> {
    match &settings.smtp {
        Some(smtp) => {
            let sender = SmtpEmailSender::new(smtp, &settings.email_from).map_err(AppError::Config)?;
            Ok(Arc::new(sender))
        }
        None => {
            tracing::warn!("SMTP_SERVER not set, emails will only be logged");
            Ok(Arc::new(LogEmailSender))
        }
    }
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {

    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;

    let pool = PgPoolOptions::new()
    .max_connections(settings.database_max_connections)
    .connect(&settings.database_url)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "database connection failed");
        AppError::DbConnect
    })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "migrations failed");
            AppError::Migrate
        })?;

    let global_state = GlobalState{
        store: Arc::new(PgStore::new(pool)),
        assets: Arc::new(LocalAssetStore::new(&settings.media_root)),
        mailer: mailer(&settings)?,
        renderer: Arc::new(PdfRenderer),
        settings: settings.clone(),
    };

    let app_data = web::Data::new(global_state);

    tracing::info!(address = %settings.bind_address, "the server is running");

    HttpServer::new(
        move||{
            App::new()
            .app_data(app_data.clone())
            .wrap(Logger::default())
            .configure(handlers::configure)
            .default_service(web::to(handlers::not_found))
        }
    ).bind(&settings.bind_address)
    .map_err(|_e|AppError::SocketBind)?
    .run()
    .await
    .map_err(|_e|AppError::ServerStart)?;

    Ok(())

}
