pub mod auth;
pub mod health;
pub mod metrics;
pub mod tasks;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::{auth::SessionGate, error::AppError};

pub use health::ServiceName;

/// Task routes under `/v1/tasks`. `/search` is registered ahead of `/{id}`.
/// `SessionGate` settles authorization before any handler reads its body.
pub fn tasks_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).service(
        web::scope("/v1/tasks")
            .wrap(SessionGate)
            .service(tasks::create_task)
            .service(tasks::list_tasks)
            .service(tasks::search_tasks)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    );
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(web::scope("/v1/auth").service(auth::login));
}

/// Maps every JSON decoding failure to `400 {"error": "invalid request body"}`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        log::debug!(error = err.to_string().as_str(); "rejecting request body");
        AppError::BadRequest("invalid request body".into()).into()
    })
}
