use anyhow::Context;
use tracing_subscriber::EnvFilter;

use obesity_predictor::{config::Config, server, Predictor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = Config::from_env()?;
    let predictor = Predictor::load(&cfg.pipeline_path, &cfg.label_encoder_path)
        .context("failed to load model artifacts")?;
    tracing::info!(
        "loaded pipeline {} and label encoder {}",
        cfg.pipeline_path.display(),
        cfg.label_encoder_path.display()
    );
    let features = predictor.feature_columns();
    tracing::info!("features[{}]: {:?}", features.len(), features);
    tracing::info!("classes[{}]: {:?}", predictor.classes().len(), predictor.classes());

    // Fail before binding if the artifacts cannot score a default record
    let warm = predictor.warmup().context("warmup prediction failed")?;
    tracing::info!("warmup ok -> {}", warm.label);

    let app = server::router(server::AppState::new(predictor, cfg.log_predictions));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
