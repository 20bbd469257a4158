use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};

use crate::cache::OrderCache;
use crate::error::OrderError;
use crate::metrics::Metrics;
use crate::models::Order;

// ============================================================================
// Read Endpoint
// ============================================================================
//
// One read operation, GET /order/{order_uid}, served from the cache with the
// store as fallback, plus /health and /metrics on the same listener. NotFound
// maps to 404; every other failure maps to a generic 500 with detail only in
// the logs.

pub struct AppState {
    pub cache: Arc<OrderCache>,
    pub metrics: Arc<Metrics>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Order>,
}

impl ApiResponse {
    fn ok(order: Order) -> Self {
        Self {
            status: "ok".into(),
            msg: None,
            data: Some(order),
        }
    }

    fn error(msg: &str) -> Self {
        Self {
            status: "error".into(),
            msg: Some(msg.into()),
            data: None,
        }
    }
}

async fn get_order(path: web::Path<String>, state: web::Data<AppState>) -> HttpResponse {
    let order_uid = path.into_inner();

    match state.cache.get(&order_uid).await {
        Ok(order) => {
            state.metrics.record_http("ok");
            HttpResponse::Ok().json(ApiResponse::ok(order))
        }
        Err(OrderError::NotFound(detail)) => {
            state.metrics.record_http("not_found");
            tracing::info!(order_uid = %order_uid, detail = %detail, "order not found");
            HttpResponse::NotFound().json(ApiResponse::error("order not found"))
        }
        Err(e) => {
            state.metrics.record_http("error");
            tracing::error!(order_uid = %order_uid, error = %e, "failed to get order");
            HttpResponse::InternalServerError().json(ApiResponse::error("internal server error"))
        }
    }
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "order-pipeline"
    }))
}

async fn metrics_endpoint(state: web::Data<AppState>) -> HttpResponse {
    let metric_families = state.metrics.registry().gather();
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/order/{order_uid}", web::get().to(get_order))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_endpoint));
}

/// Bind the listener and return the server for the caller to run and stop.
pub fn serve(addr: &str, state: AppState) -> std::io::Result<Server> {
    tracing::info!(addr = %addr, "starting HTTP server");
    let state = web::Data::new(state);

    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind(addr)?
        .run();
    Ok(server)
}
