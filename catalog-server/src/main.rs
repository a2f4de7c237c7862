use actix_web::{middleware, web, App, HttpServer};
use catalog::{Catalog, CatalogConfig};

mod handlers;

/// Shared application state
pub struct AppState {
    pub catalog: Catalog,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting catalog server");

    let config = CatalogConfig::load(None).map_err(std::io::Error::other)?;
    let catalog = Catalog::open(&config).map_err(std::io::Error::other)?;

    let state = web::Data::new(AppState { catalog });
    let host = config.server.host.clone();
    let port = config.server.port;

    log::info!("Listening on {host}:{port}");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(handlers::json_config())
            .app_data(handlers::query_config())
            .wrap(middleware::NormalizePath::trim())
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
