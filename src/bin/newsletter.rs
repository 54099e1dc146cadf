use actix_web::{middleware::Logger, web, App, HttpServer};
use taskmanager::newsletter::{routes, MailingListClient, NewsletterConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config =
        NewsletterConfig::from_env().map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let client = web::Data::new(MailingListClient::new(&config));

    log::info!("Newsletter signup running on http://{}:{}", config.server_host, config.server_port);
    HttpServer::new(move || {
        App::new()
            .app_data(client.clone())
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
