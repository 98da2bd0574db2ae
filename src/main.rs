mod admin;
mod app;
mod audit;
mod auth;
mod config;
mod error;
mod returns;
mod seed;
mod state;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "returnly=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;

    // `returnly --seed` provisions the demo accounts and exits.
    if std::env::args().any(|arg| arg == "--seed") {
        return seed::run(&state).await;
    }

    let app = app::build_app(state);
    app::serve(app).await
}
