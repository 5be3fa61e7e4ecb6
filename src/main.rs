use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info, warn};
use std::sync::Arc;

use orgchart_backend::config::Config;
use orgchart_backend::db::{EntityStore, MemoryStore, PgStore};
use orgchart_backend::handlers;
use orgchart_backend::services::OrgServices;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, err));
        }
    };

    match config.database_url.clone() {
        Some(database_url) => {
            let store = PgStore::connect(&database_url).await.map_err(|err| {
                error!("Failed to connect to the database: {}", err);
                std::io::Error::new(std::io::ErrorKind::Other, err)
            })?;
            info!("Using Postgres store");
            serve(store, &config).await
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
            serve(MemoryStore::new(), &config).await
        }
    }
}

async fn serve<S: EntityStore>(store: S, config: &Config) -> std::io::Result<()> {
    let services = web::Data::new(OrgServices::new(Arc::new(store), config));

    info!("Starting server at {}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(services.clone())
            .configure(handlers::configure::<S>)
    })
    .bind(config.bind_address.as_str())?
    .run()
    .await
}
