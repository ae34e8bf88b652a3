use crate::bootstrap;
use anyhow::Result;

pub async fn run(profile: Option<&str>) -> Result<()> {
    let config = bootstrap::load_config(profile)?;
    let state = bootstrap::build_state(config)?;

    let fixed = state
        .ledger
        .fix_forward_fields(&state.calendar, &state.joiner)
        .await?;
    println!("corrected {fixed} ledger rows");
    Ok(())
}
