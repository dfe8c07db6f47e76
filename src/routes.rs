//! 路由装配：`GET /` 首页与 `POST /` 上传。

use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::Request;
use axum::routing::get;
use axum::{Router, middleware};
use std::sync::Arc;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::http::{add_security_headers, request_span};
use crate::{frontend, upload};

/// 构建应用路由，配置通过 `Extension` 注入每个请求。
pub fn build_router(config: Arc<ServerConfig>) -> Router {
    Router::new()
        .route(
            "/",
            get(frontend::landing_page)
                .post(upload::upload_files)
                .layer(DefaultBodyLimit::disable()),
        )
        .layer(middleware::from_fn(add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| request_span(request))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(config))
}
