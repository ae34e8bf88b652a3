use crate::bootstrap;
use anyhow::Result;
use tema_web_api::ApiServer;

pub async fn run(addr: Option<String>, profile: Option<&str>) -> Result<()> {
    let config = bootstrap::load_config(profile)?;
    let addr = addr.unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    tracing::info!(
        "serving snapshot root {} on {addr}",
        config.data.root.display()
    );
    let state = bootstrap::build_state(config)?;
    ApiServer::new(state).serve(&addr).await
}
