use crate::AppState;
use crate::api::handlers::files;
use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, header},
    response::{IntoResponse, Response},
};

/// Picks a handler by HTTP verb. Every branch answers with a permissive CORS origin.
pub async fn handler(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    tracing::debug!("Routing {} {}", method, request.uri());

    let mut response = match method {
        Method::GET => files::list_files(&state).await.into_response(),
        Method::POST => files::upload_files(&state, request).await.into_response(),
        Method::OPTIONS => files::preflight().await.into_response(),
        _ => files::default_route().await.into_response(),
    };

    allow_any_origin(&mut response);
    response
}

pub fn allow_any_origin(response: &mut Response) {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
}
