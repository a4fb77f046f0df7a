use actix_cors::Cors;
use actix_web::{http::header, middleware::Condition, web, App, HttpServer};
use std::{io, sync::Arc};

use taskgate::{
    auth::{CredentialStore, DemoCredentials, RemoteAuthClient, SessionAuthorizer},
    config::{AuthMode, DatabaseDriver, TasksConfig},
    logging,
    middleware::{
        security_headers, CsrfMiddleware, HttpMetrics, MetricsMiddleware, RequestIdMiddleware,
        RequestLogger, CSRF_HEADER, REQUEST_ID_HEADER,
    },
    repository::{InMemoryTaskRepository, PostgresTaskRepository, TaskRepository},
    routes::{self, health, metrics, ServiceName},
    service::TaskService,
};

fn cors(allowed_origin: Option<&str>) -> Cors {
    match allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .allowed_header(CSRF_HEADER)
            .allowed_header(REQUEST_ID_HEADER)
            .supports_credentials()
            .max_age(3600),
        None => Cors::default(),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    let config = TasksConfig::from_env().map_err(io::Error::other)?;
    logging::init("tasks", &config.log_level).map_err(io::Error::other)?;

    let mut postgres = None;
    let repo: Arc<dyn TaskRepository> = match config.db.driver {
        DatabaseDriver::Postgres => {
            let options = config.db.connect_options().map_err(io::Error::other)?;
            let repo = Arc::new(
                PostgresTaskRepository::connect(options)
                    .await
                    .map_err(io::Error::other)?,
            );
            log::info!(component = "storage", host = config.db.host.as_str(); "connected to postgres");
            postgres = Some(repo.clone());
            repo
        }
        DatabaseDriver::Memory => {
            log::warn!(component = "storage"; "using in-memory task storage, data is lost on exit");
            Arc::new(InMemoryTaskRepository::new())
        }
    };

    let authorizer = match config.auth_mode {
        AuthMode::CookieSession => {
            let credentials: Arc<dyn CredentialStore> = Arc::new(DemoCredentials);
            SessionAuthorizer::CookieSession(credentials)
        }
        AuthMode::RemoteToken => {
            let endpoint = config.auth_endpoint();
            log::info!(component = "auth_client", endpoint = endpoint.as_str(); "verifying bearer tokens remotely");
            let client = RemoteAuthClient::connect_lazy(&endpoint, config.auth_timeout)
                .map_err(io::Error::other)?;
            SessionAuthorizer::RemoteToken(client)
        }
    };

    let service = web::Data::new(TaskService::new(repo));
    let authorizer = web::Data::new(authorizer);
    let http_metrics =
        Arc::new(HttpMetrics::new().map_err(|e| io::Error::other(e.to_string()))?);
    let metrics_data = web::Data::from(http_metrics.clone());
    let cors_origin = config.cors_allowed_origin.clone();

    log::info!(component = "http_server", addr = config.server_url().as_str(); "starting tasks service");

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .app_data(authorizer.clone())
            .app_data(metrics_data.clone())
            .app_data(web::Data::new(ServiceName("tasks")))
            .service(health::health)
            .service(metrics::metrics)
            .configure(routes::tasks_config)
            .wrap(CsrfMiddleware)
            .wrap(security_headers())
            .wrap(MetricsMiddleware::new(http_metrics.clone()))
            .wrap(RequestLogger)
            .wrap(RequestIdMiddleware)
            .wrap(Condition::new(
                cors_origin.is_some(),
                cors(cors_origin.as_deref()),
            ))
    })
    .bind((config.host.as_str(), config.port))?
    .shutdown_timeout(30)
    .run()
    .await?;

    if let Some(repo) = postgres {
        repo.close().await;
    }
    log::info!(component = "http_server"; "tasks service stopped");
    Ok(())
}
