use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wms_order_sync::domain::article::{ArticleId, ArticleRecord, InMemoryInventory};
use wms_order_sync::domain::order::{OperationMode, OrderDraft};
use wms_order_sync::metrics::{self, Metrics};
use wms_order_sync::remote::SimulatedController;
use wms_order_sync::{OrderTracker, TrackerConfig};

fn demo_inventory() -> InMemoryInventory {
    InMemoryInventory::new([
        ("1001", "Hex bolt M8", 1, 250.0),
        ("1002", "Washer 8mm", 2, 1200.0),
        ("1003", "Cable tie 200mm", 3, 40.0),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (no, desc, tray, quantity))| ArticleRecord {
        id: ArticleId(i as i32 + 1),
        article_no: no.to_string(),
        article_desc: desc.to_string(),
        elevator: "Sim_1".to_string(),
        tray_no: tray,
        quantity,
    }))
}

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,wms_order_sync=debug"))
        )
        .init();

    tracing::info!("🚀 Starting warehouse order tracker demo");

    // === 1. Configuration ===
    let config = TrackerConfig::from_env()?;
    tracing::info!(
        store = %config.store_path.display(),
        remote = %config.remote_address,
        openings = config.service_openings,
        "Loaded configuration"
    );

    // === 2. Initialize Prometheus metrics ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    if let Some(port) = config.metrics_port {
        // Metrics HTTP server runs on its own thread and runtime
        let server_metrics = metrics.clone();
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Could not start metrics runtime: {}", e);
                    return;
                }
            };
            rt.block_on(async {
                if let Err(e) = metrics::start_metrics_server(server_metrics, port).await {
                    tracing::error!("Metrics server error: {}", e);
                }
            });
        });
    }

    // === 3. Start the tracker against the simulated controller ===
    let controller = Arc::new(SimulatedController::new());
    let inventory = Arc::new(demo_inventory());
    let tracker = OrderTracker::start(&config, controller.clone(), inventory, metrics.clone()).await?;

    let mut notifications = tracker.subscribe();
    actix::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            tracing::info!(
                sequence = notification.sequence_number,
                event_type = %notification.event_type,
                order_id = %notification.event_data.order_id(),
                "🔔 Notification"
            );
        }
    });

    for order in tracker.orders().await? {
        tracing::info!(order_id = %order.id, status = %order.status, "Resumed tracking order");
    }

    // === 4. Demonstrate an order lifecycle ===
    tracing::info!("📝 Picking 10 x article 1 at opening 1");
    let order = tracker
        .create_order(OrderDraft::new(ArticleId(1), OperationMode::Out, 10.0, 1))
        .await?;
    tracing::info!("✅ Order created: {}", order.id);

    tokio::time::sleep(Duration::from_millis(500)).await;

    tracker.acknowledge_order(order.id, 10.0).await?;
    tracing::info!("✅ Order acknowledged: {}", order.id);

    tokio::time::sleep(Duration::from_millis(500)).await;

    for article in tracker.articles().await? {
        tracing::info!(
            article_id = %article.id,
            article_no = %article.article_no,
            quantity = article.quantity,
            "Article"
        );
    }
    tracing::info!(open_orders = tracker.orders().await?.len(), "Tracker state");

    tracker.shutdown().await?;
    tracing::info!("🎉 Demo complete!");

    Ok(())
}
