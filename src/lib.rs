#![doc = "The `taskgate` library crate."]
#![doc = ""]
#![doc = "Shared code for the two services of the task-management backend: the tasks"]
#![doc = "service (`taskgate-tasks`), a session-gated JSON CRUD API over a task store,"]
#![doc = "and the auth service (`taskgate-auth`), which issues session cookies over HTTP"]
#![doc = "and verifies bearer tokens over gRPC. The binaries under `src/bin/` assemble"]
#![doc = "the applications from these modules."]

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod security;
pub mod service;

/// Generated types for `proto/auth.proto`.
pub mod proto {
    tonic::include_proto!("auth");
}
