use tclip_twitch::HelixClient;
use tclip_worker::{Topic, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;
    dotenvy::dotenv().ok();

    ensure_env_present(&["TWITCH_CLIENT_ID", "TWITCH_CLIENT_SECRET"])?;
    println!("tclip-selfcheck: env ok");

    let config = WorkerConfig::from_env()?;
    println!(
        "tclip-selfcheck: config ok (topic={}, lookback={}s, partner_only={}, min_clips={})",
        config.topic,
        config.selection.lookback_window.as_secs(),
        config.selection.require_verified_partner,
        config.selection.min_clips_per_creator
    );

    let client = HelixClient::new(config.helix.clone())?;
    let token = client
        .app_token()
        .await
        .map_err(|e| anyhow::anyhow!("app token unavailable: {}", e))?;
    println!("tclip-selfcheck: app token ok");

    let game_id = match &config.topic {
        Topic::Id(id) => id.clone(),
        Topic::Name(name) => client
            .get_game_id(name, &token)
            .await
            .map_err(|e| anyhow::anyhow!("topic lookup failed: {}", e))?,
    };
    println!("tclip-selfcheck: topic ok (game_id={})", game_id);

    println!("tclip-selfcheck: ok");
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
