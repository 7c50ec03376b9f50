#[macro_use]
extern crate diesel;

use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use diesel::r2d2::{self, ConnectionManager};
use diesel::mysql::MysqlConnection;
use failsafe::Config;

mod auth;
mod cache;
mod config;
mod error;
mod foods;
mod models;
mod query;
mod repository;
mod routes;
mod schema;

use crate::cache::FoodListCache;
use crate::config::Settings;
use crate::foods::FoodService;
use crate::repository::{MysqlStore, Store};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::from_env()?;

    // set up database connection pool
    let manager = ConnectionManager::<MysqlConnection>::new(settings.database_url.as_str());
    let pool = r2d2::Pool::builder()
        .max_size(settings.db_pool_max_size)
        .build(manager)?;

    let circuit_breaker = Config::new().build();
    let store: Arc<dyn Store> = Arc::new(MysqlStore::new(pool, circuit_breaker));

    let cache = match &settings.redis_url {
        Some(url) => FoodListCache::connect(url, settings.cache_ttl_seconds)?,
        None => {
            log::info!("REDIS_URL not set, food list caching disabled");
            FoodListCache::disabled()
        }
    };

    let service = web::Data::new(FoodService::new(store, cache));

    log::info!(
        "starting HTTP server at http://{}:{}",
        settings.bind_address,
        settings.port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind((settings.bind_address.as_str(), settings.port))?
    .run()
    .await?;

    Ok(())
}
