//! Download command

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use fwcat_core::io::fetch::unpack_and_verify;
use fwcat_core::open_package;

use super::Context;

/// Download `version`, unpack it into `dest` and verify the checksum.
///
/// Ctrl-C closes the package reader, which aborts the transfer.
pub async fn download(ctx: &Context, version: &str, dest: &Path) -> Result<()> {
    let manifest = ctx.manifest().await?;
    let release = manifest
        .releases
        .find(version)
        .with_context(|| format!("Unknown version '{version}'"))?;

    let reader = Arc::new(
        open_package(&ctx.client, &manifest.origin, release)
            .await
            .with_context(|| format!("Failed to open package {version}"))?,
    );

    let interrupt = {
        let reader = Arc::clone(&reader);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling download");
                if let Err(err) = reader.close().await {
                    tracing::debug!(error = %err, "close after interrupt failed");
                }
            }
        })
    };

    let result = unpack_and_verify(&reader, release, dest).await;
    interrupt.abort();
    let closed = reader.close().await;

    let files = result.with_context(|| format!("Failed to download {version}"))?;
    closed.context("Failed to close package")?;

    for file in &files {
        println!("{}\t{}", file.absolute_path.display(), file.size);
    }
    println!("md5 {}", reader.checksum_digest());
    Ok(())
}
