//! Entries command

use std::path::Path;

use anyhow::{Context as _, Result};
use fwcat_core::PackageReader;

/// List the files of a local package with their models, then its MD5.
pub async fn entries(file: &Path) -> Result<()> {
    let input = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let reader = PackageReader::new(input)
        .await
        .with_context(|| format!("Failed to read package {}", file.display()))?;

    let mut listed = Ok(());
    loop {
        match reader.next().await {
            Ok(Some(header)) => println!(
                "{}\t{}\t{}\t{}",
                header.path, header.size, header.mod_time, header.models
            ),
            Ok(None) => break,
            Err(err) => {
                listed = Err(err);
                break;
            }
        }
    }
    reader.close().await?;
    listed?;

    println!("md5 {}", reader.checksum_digest());
    Ok(())
}
