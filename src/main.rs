use actix_web::{middleware::Logger, web, App, HttpServer};
use color_eyre::eyre::Report;
use polls_server::{config::Config, db, log, managers::MemoryStore, server, store::PollStore};
use std::sync::Arc;
use tracing::{info, warn};

#[actix_rt::main]
async fn main() -> Result<(), Report> {
    log::init()?;
    let config = Config::from_env()?;

    let store: Arc<dyn PollStore> = match &config.database_url {
        Some(database_url) => {
            let pool = db::new_pool(database_url).await?;
            db::migrate(&pool).await?;
            info!("Connected to database");
            Arc::new(db::PgStore::start(pool))
        }
        None => {
            warn!("DATABASE_URL not set, polls are kept in memory and lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let bind_address = config.bind_address.clone();
    let store = web::Data::from(store);
    let config = web::Data::new(config);

    info!("Starting HTTP server on {}", bind_address);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(server::configure(store.clone(), config.clone()))
    })
    .bind(bind_address)?
    .run()
    .await?;

    Ok(())
}
