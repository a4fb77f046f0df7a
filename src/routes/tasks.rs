use crate::{
    auth::AuthorizedSession,
    error::AppError,
    middleware::RequestId,
    models::{CreateTaskInput, SearchQuery, UpdateTaskInput},
    service::TaskService,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};

/// Creates a task.
///
/// `title` is required; `description` and `due_date` are optional. Text fields
/// are HTML-escaped before they are stored.
///
/// ## Responses:
/// - `201 Created`: the stored `Task`.
/// - `400 Bad Request`: undecodable body or empty title.
/// - `401 Unauthorized` / `403 Forbidden`: session or CSRF check failed.
#[post("")]
pub async fn create_task(
    _session: AuthorizedSession,
    request_id: RequestId,
    service: web::Data<TaskService>,
    input: web::Json<CreateTaskInput>,
) -> Result<impl Responder, AppError> {
    let task = service.create(input.into_inner()).await?;

    log::info!(
        component = "http_handler",
        handler = "create_task",
        request_id = request_id.as_str(),
        task_id = task.id.as_str();
        "task created"
    );
    Ok(HttpResponse::Created().json(task))
}

/// Lists every task, newest first.
#[get("")]
pub async fn list_tasks(
    _session: AuthorizedSession,
    request_id: RequestId,
    service: web::Data<TaskService>,
) -> Result<impl Responder, AppError> {
    let tasks = service.list().await?;

    log::debug!(
        component = "http_handler",
        handler = "list_tasks",
        request_id = request_id.as_str(),
        count = tasks.len();
        "tasks listed"
    );
    Ok(HttpResponse::Ok().json(tasks))
}

/// Searches tasks by title.
///
/// ## Query Parameters:
/// - `q` (required): the text to look for.
/// - `unsafe` (optional): `true` switches to the injectable search used for
///   security training. Any other value keeps the parameterized search.
#[get("/search")]
pub async fn search_tasks(
    _session: AuthorizedSession,
    request_id: RequestId,
    service: web::Data<TaskService>,
    query: web::Query<SearchQuery>,
) -> Result<impl Responder, AppError> {
    let query = query.into_inner();
    let q = match query.q.as_deref() {
        Some(q) if !q.is_empty() => q,
        _ => {
            return Err(AppError::BadRequest(
                "search query parameter 'q' is required".into(),
            ))
        }
    };

    let tasks = if query.is_unsafe() {
        log::warn!(
            component = "http_handler",
            handler = "search_tasks",
            request_id = request_id.as_str();
            "unsafe search requested"
        );
        service.search_by_title_unsafe(q).await?
    } else {
        service.search_by_title(q).await?
    };

    Ok(HttpResponse::Ok().json(tasks))
}

#[get("/{id}")]
pub async fn get_task(
    _session: AuthorizedSession,
    service: web::Data<TaskService>,
    task_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let task = service.get(&task_id).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task. Absent fields keep their stored value.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `400 Bad Request`: undecodable body or an empty `title`.
/// - `404 Not Found`: no task with this id.
#[patch("/{id}")]
pub async fn update_task(
    _session: AuthorizedSession,
    request_id: RequestId,
    service: web::Data<TaskService>,
    task_id: web::Path<String>,
    patch: web::Json<UpdateTaskInput>,
) -> Result<impl Responder, AppError> {
    let task = service.update(&task_id, patch.into_inner()).await?;

    log::info!(
        component = "http_handler",
        handler = "update_task",
        request_id = request_id.as_str(),
        task_id = task.id.as_str();
        "task updated"
    );
    Ok(HttpResponse::Ok().json(task))
}

#[delete("/{id}")]
pub async fn delete_task(
    _session: AuthorizedSession,
    request_id: RequestId,
    service: web::Data<TaskService>,
    task_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    service.delete(&task_id).await?;

    log::info!(
        component = "http_handler",
        handler = "delete_task",
        request_id = request_id.as_str(),
        task_id = task_id.as_str();
        "task deleted"
    );
    Ok(HttpResponse::NoContent().finish())
}
