mod config;
mod errors;
mod db;
mod models;
mod routes;
mod store;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use crate::config::Config;
use crate::db::Db;
use crate::routes::{health as health_routes, rooms as rooms_routes};
use crate::store::ChatStore;
use actix_web::middleware::Logger;
use actix_web::http::header;
use actix_web::web::Data;
use env_logger::Env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Init logger to show info by default, but can be overridden by RUST_LOG
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cfg = Config::load();

    let db = Db::connect_and_migrate(&cfg.database_path).await
        .expect("database init failed");
    let store = ChatStore::new(db);

    log::info!("Starting server at {}", cfg.listen);

    let listen_addr = cfg.listen.clone();
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);
        for origin in &cfg.allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(Data::new(store.clone()))
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(health_routes::health_check))
                    .route("/rooms", web::get().to(rooms_routes::list_rooms))
                    .route("/rooms/{slug}", web::get().to(rooms_routes::room_detail))
            )
    })
    .bind(listen_addr)?
    .run()
    .await
}
