//! Url command

use anyhow::{Context as _, Result};

use super::Context;

/// Print the package URL of `version`.
pub async fn url(ctx: &Context, version: &str) -> Result<()> {
    let manifest = ctx.manifest().await?;
    let release = manifest
        .releases
        .find(version)
        .with_context(|| format!("Unknown version '{version}'"))?;

    println!("{}", manifest.resolve(release)?);
    Ok(())
}
