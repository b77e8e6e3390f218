#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::net::SocketAddr;

    use study_hub::config::{self, AppConfig};
    use study_hub::ticker::{StatusTicker, local_now};
    use study_hub::{Dashboard, GeminiClient, http_api};
    use tracing::info;

    config::init_tracing();
    let config = AppConfig::from_env();
    let addr: SocketAddr = config.http_addr.parse()?;

    let store = config::open_store(&config)?;
    let dashboard = Dashboard::load(store).with_student_name(config.student_name.clone());

    let mut ticker = StatusTicker::new(dashboard.timetable().clone(), local_now());
    ticker.start(config.tick_interval);
    let mut updates = ticker.subscribe();
    tokio::spawn(async move {
        let mut last_kind = "";
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.status.kind() == last_kind {
                continue;
            }
            last_kind = snapshot.status.kind();
            info!(
                status = last_kind,
                next = snapshot.next_class.as_ref().map(|c| c.code.as_str()).unwrap_or("-"),
                "dashboard status changed"
            );
        }
    });

    let client = GeminiClient::new(config.gemini.clone())?;
    let state = http_api::AppState::new(dashboard, client).with_ticker(&ticker);

    println!("study-hub HTTP API listening on http://{addr}");
    http_api::serve(addr, state).await?;
    ticker.stop();
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
