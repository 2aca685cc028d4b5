use super::{handler, trace_layer, X_REQUEST_ID};
use crate::state::Zustand;
use agora_config::server;
use axum::{extract::DefaultBodyLimit, routing, Router};
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

/// Room for the multipart framing around the file itself
const MULTIPART_OVERHEAD: usize = 16 * 1024;

pub fn create(state: Zustand, server_config: &server::Configuration) -> Router {
    let api = Router::new()
        .route("/search", routing::get(handler::search::get))
        .nest(
            "/accounts",
            Router::new()
                .route(
                    "/me",
                    routing::get(handler::accounts::me).patch(handler::accounts::update_me),
                )
                .route("/{id}", routing::get(handler::accounts::get))
                .route("/{id}/follow", routing::post(handler::accounts::follow))
                .route("/{id}/follows", routing::get(handler::accounts::follows)),
        )
        .nest(
            "/communities",
            Router::new()
                .route(
                    "/",
                    routing::get(handler::communities::list).post(handler::communities::create),
                )
                .route("/popular", routing::get(handler::communities::popular))
                .route(
                    "/{id}",
                    routing::get(handler::communities::get).patch(handler::communities::update),
                )
                .route("/{id}/members", routing::get(handler::communities::members))
                .route(
                    "/{id}/membership",
                    routing::post(handler::communities::membership),
                ),
        )
        .route(
            "/media",
            routing::post(handler::media::post).layer(DefaultBodyLimit::max(
                server_config.max_upload_size + MULTIPART_OVERHEAD,
            )),
        );

    Router::new()
        .nest("/api/v1", api)
        .route("/media/{file}", routing::get(handler::media::get))
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(
            server_config.request_timeout_secs,
        )))
        .layer(trace_layer())
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
        .layer(SetRequestIdLayer::new(
            X_REQUEST_ID.clone(),
            MakeRequestUuid,
        ))
        .with_state(state)
}
