use crate::bootstrap;
use anyhow::Result;
use tema_snapshots::insights::summarize;

pub async fn run(
    lookback: i64,
    top_n: i64,
    exclude_dominant: bool,
    profile: Option<&str>,
) -> Result<()> {
    let config = bootstrap::load_config(profile)?;
    let state = bootstrap::build_state(config)?;

    let lookback = usize::try_from(lookback.clamp(5, 120)).unwrap_or(20);
    let top_n = usize::try_from(top_n.clamp(3, 30)).unwrap_or(10);
    let summary = summarize(
        &state.store,
        &state.config.ranking.deny,
        lookback,
        top_n,
        exclude_dominant,
    );

    println!(
        "Window: {} days ({} snapshot days found)",
        lookback,
        summary.dates.len()
    );
    println!("\nHottest:");
    for theme in &summary.hottest {
        println!(
            "  {:<28} freq={:<3} avg_rank={:<6} momentum={:<8} last={}#{}",
            theme.title,
            theme.freq,
            theme.avg_rank,
            theme.momentum_score,
            theme.last_seen,
            theme.last_rank
        );
    }
    println!("\nRising:");
    for theme in &summary.rising {
        println!(
            "  {:<28} improvement={:<6} newer_avg_rank={:<6} newer_freq={}",
            theme.title, theme.improvement, theme.newer_avg_rank, theme.newer_freq
        );
    }
    Ok(())
}
