use actix_web::{web, App, HttpServer};
use std::{io, net::SocketAddr, sync::Arc};
use tonic::transport::Server;

use taskgate::{
    auth::{AuthGrpcService, CredentialStore, DemoCredentials},
    config::AuthConfig,
    logging,
    middleware::{RequestIdMiddleware, RequestLogger},
    proto::auth_service_server::AuthServiceServer,
    routes::{self, health, ServiceName},
};

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!(error = e.to_string().as_str(); "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!(error = e.to_string().as_str(); "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    let config = AuthConfig::from_env().map_err(io::Error::other)?;
    logging::init("auth", &config.log_level).map_err(io::Error::other)?;

    let credentials: Arc<dyn CredentialStore> = Arc::new(DemoCredentials);
    let grpc_addr: SocketAddr = config
        .grpc_addr()
        .parse()
        .map_err(io::Error::other)?;

    let grpc = Server::builder()
        .add_service(AuthServiceServer::new(AuthGrpcService::new(credentials.clone())))
        .serve_with_shutdown(grpc_addr, shutdown_signal());

    let credentials = web::Data::from(credentials);
    let http = HttpServer::new(move || {
        App::new()
            .app_data(credentials.clone())
            .app_data(web::Data::new(ServiceName("auth")))
            .service(health::health)
            .configure(routes::auth_config)
            .wrap(RequestLogger)
            .wrap(RequestIdMiddleware)
    })
    .bind((config.host.as_str(), config.http_port))?
    .shutdown_timeout(30)
    .run();

    log::info!(
        component = "http_server",
        http_port = config.http_port,
        grpc_addr = grpc_addr.to_string().as_str();
        "starting auth service"
    );

    let grpc = async move {
        grpc.await.map_err(|e| {
            log::error!(component = "grpc_server", error = e.to_string().as_str(); "gRPC server failed");
            io::Error::other(e)
        })
    };
    tokio::try_join!(http, grpc)?;

    log::info!(component = "http_server"; "auth service stopped");
    Ok(())
}
