use crate::bootstrap;
use anyhow::{Context, Result};
use tema_snapshots::rank_themes;

pub async fn run(
    date: Option<String>,
    limit: i64,
    exclude_dominant: bool,
    profile: Option<&str>,
) -> Result<()> {
    let config = bootstrap::load_config(profile)?;
    let state = bootstrap::build_state(config)?;

    let date_dir = match date {
        Some(date) => date,
        None => state
            .store
            .latest_date()
            .context("no snapshot days found under the data root")?,
    };

    let mut ranked = rank_themes(
        &state.store,
        &date_dir,
        &state.config.ranking.deny,
        exclude_dominant,
    );
    ranked.truncate(usize::try_from(limit.max(0)).unwrap_or(0));

    println!(
        "Themes for {date_dir} (exclude_dominant={exclude_dominant}):"
    );
    for theme in ranked {
        println!(
            "{:>3}. {:<28} trade_sum={:>16}  {}",
            theme.rank, theme.title, theme.trade_sum, theme.filename
        );
    }
    Ok(())
}
