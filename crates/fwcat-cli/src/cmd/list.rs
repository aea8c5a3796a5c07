//! List command

use anyhow::Result;

use super::{Context, filter_manifest};
use crate::ModelArgs;

/// Print releases grouped by branch, optionally restricted to one branch.
pub async fn list(ctx: &Context, filter: &ModelArgs, branch: Option<&str>) -> Result<()> {
    let manifest = filter_manifest(ctx.manifest().await?, filter)?;

    if manifest.releases.is_empty() {
        println!("No releases match.");
        return Ok(());
    }

    match branch {
        Some(name) => {
            let branch = manifest.releases.branch(name);
            if branch.releases.is_empty() {
                println!("No releases on branch {name}.");
                return Ok(());
            }
            println!("Branch {}:", branch.name);
            for release in &branch.releases {
                println!("  {release}");
            }
        }
        None => print!("{}", manifest.summary()),
    }
    Ok(())
}
