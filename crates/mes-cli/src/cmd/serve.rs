use crate::context::Context;
use anyhow::{anyhow, Result};
use mes_server::AppState;

pub fn run(ctx: &Context, port: Option<u16>, bind: Option<String>) -> Result<()> {
    ctx.check()?;
    let config = &ctx.config;
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let port = port.unwrap_or(config.server.port);

    let db = ctx.open_db()?;
    let models = ctx.load_models();
    if let Some(e) = models.load_error() {
        if config.models.required {
            return Err(anyhow!("prediction models are required but failed to load: {e}"));
        }
        tracing::warn!("serving without predictions: {e}");
    }

    let state = AppState::new(db, models, config.progress);
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind((bind.as_str(), port)).await?;
        mes_server::serve_on(state, listener).await
    })
}
