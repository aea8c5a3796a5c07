//! Latest command

use anyhow::{Result, bail};

use super::{Context, filter_manifest};
use crate::ModelArgs;

/// Print the most recent release matching the filters.
pub async fn latest(ctx: &Context, filter: &ModelArgs, branch: Option<&str>) -> Result<()> {
    let manifest = filter_manifest(ctx.manifest().await?, filter)?;

    let releases = match branch {
        Some(name) => manifest.releases.branch(name).releases,
        None => manifest.releases,
    };
    if releases.is_empty() {
        bail!("No matching releases");
    }

    println!("{}", releases.latest());
    Ok(())
}
