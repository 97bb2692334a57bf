use actix_cors::Cors;
use actix_web::{App, HttpServer, web};

use nutrition_api::config::Config;
use nutrition_api::{db, get_food, health, importer, search_foods};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(std::io::Error::other)?;

    // The import runs on the blocking pool so startup and serving are not held up.
    importer::spawn_startup_import(&config);

    let pool = db::init_pool(
        &config.database.url,
        &config.importer.schema,
        config.database.max_connections,
        config.database.connect_timeout,
    )
    .map_err(std::io::Error::other)?;

    log::info!("Starting Nutrition API server on port {}", config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive(); // Configure this properly for production

        App::new()
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .service(health)
            .service(search_foods)
            .service(get_food)
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await
}
