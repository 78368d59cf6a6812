#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use actix_web::dev::Server;
use actix_web::http::StatusCode;
use actix_web::{get, middleware, web, App, HttpRequest, HttpResponse, HttpServer, ResponseError};
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::domain::{AppState, StressQuery};
use crate::error::PressureError;
use crate::validation::validate_stress;

const GENERIC_INTERNAL_MESSAGE: &str = "Something went wrong";

/// A `PressureError` on its way to the client.
#[derive(Debug)]
pub struct ApiError {
    inner: PressureError,
    development: bool,
}

impl ApiError {
    pub fn new(inner: PressureError, development: bool) -> Self {
        Self { inner, development }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.inner.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let message = match &self.inner {
            PressureError::Internal(e) if self.development => format!("{e:#}"),
            PressureError::Internal(_) => GENERIC_INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        };
        json_error(self.status_code(), self.inner.label(), &message)
    }
}

#[get("/")]
pub async fn root() -> HttpResponse {
    info!("root endpoint accessed");
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Hello from pressure-agent!")
}

#[get("/health")]
pub async fn health(data: web::Data<AppState>) -> HttpResponse {
    let report = data.dispatcher.health();
    info!(status=%report.status, "health check performed");
    HttpResponse::Ok().json(report)
}

#[get("/stress")]
pub async fn stress(
    query: web::Query<StressQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    info!(
        duration=?query.duration,
        chunks=?query.chunks,
        mode=?query.mode,
        "stress test initiated"
    );
    let req = validate_stress(&query, data.dispatcher.limits()).map_err(|e| {
        data.metrics.validation_rejections_total.inc();
        reject(e, data.development)
    })?;
    let summary = data
        .dispatcher
        .dispatch(req)
        .await
        .map_err(|e| reject(e, data.development))?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/clear")]
pub async fn clear(data: web::Data<AppState>) -> HttpResponse {
    let summary = data.dispatcher.clear();
    info!(freed_bytes = summary.freed_bytes, "memory cleared");
    HttpResponse::Ok().json(summary)
}

#[get("/metrics")]
pub async fn scrape_metrics(data: web::Data<AppState>) -> HttpResponse {
    match data.dispatcher.encode_metrics() {
        Ok(buf) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(buf),
        Err(e) => {
            error!(error=%format!("{e:#}"), "encode metrics failed");
            HttpResponse::InternalServerError().body("encode metrics failed")
        }
    }
}

async fn not_found(req: HttpRequest) -> HttpResponse {
    json_error(
        StatusCode::NOT_FOUND,
        "not_found",
        &format!("no route for {} {}", req.method(), req.path()),
    )
}

/// Routes plus the query extractor config, shared by the server and tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::new(PressureError::validation("query", err.to_string()), false).into()
    }))
    .service(root)
    .service(health)
    .service(stress)
    .service(clear)
    .service(scrape_metrics)
    .default_service(web::to(not_found));
}

/// Builds the server without starting it. Actix signal handling is off, the
/// caller owns shutdown through the returned server's handle.
pub fn server(state: AppState, config: &Config) -> std::io::Result<Server> {
    // Actix's own grace period must outlast the drain deadline, otherwise it
    // would cancel in-flight burns and make every drain look cooperative.
    let grace_secs = config.drain_deadline().as_secs() + 2;
    let mut http = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Compress::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "SAMEORIGIN"))
                    .add(("Referrer-Policy", "no-referrer"))
                    .add(("Access-Control-Allow-Origin", "*")),
            )
            .wrap(middleware::Logger::default())
            .configure(routes)
    })
    .disable_signals()
    .shutdown_timeout(grace_secs);
    if let Some(workers) = config.workers {
        http = http.workers(workers);
    }
    Ok(http.bind(config.bind_addr())?.run())
}

fn reject(e: PressureError, development: bool) -> ApiError {
    match &e {
        PressureError::Internal(inner) => error!(error=%format!("{inner:#}"), "stress failed"),
        PressureError::Draining => warn!("stress rejected, draining"),
        other => warn!(error=%other, "stress rejected"),
    }
    ApiError::new(e, development)
}

fn json_error(code: StatusCode, error: &str, message: &str) -> HttpResponse {
    HttpResponse::build(code).json(json!({"error": error, "message": message}))
}
