use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

use super::Metrics;

/// Serve `/metrics` (Prometheus text format) and `/health` on `port`.
///
/// Blocks until the server stops, so callers run it on its own thread and
/// runtime next to the actix system that owns the tracker.
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> std::io::Result<()> {
    tracing::info!(port, "📊 Serving tracker metrics on http://0.0.0.0:{}/metrics", port);

    HttpServer::new(move || App::new().configure(routes(metrics.clone())))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}

fn routes(metrics: Arc<Metrics>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::from(metrics))
            .route("/metrics", web::get().to(scrape))
            .route("/health", web::get().to(health));
    }
}

async fn scrape(metrics: web::Data<Metrics>) -> impl Responder {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&metrics.registry().gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

// Liveness only; the controller link is reported through the failure counters
async fn health(metrics: web::Data<Metrics>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "wms-order-sync",
        "tracked_orders": metrics.tracked_orders.get(),
    }))
}
