//! Subcommand implementations

pub mod download;
pub mod entries;
pub mod latest;
pub mod list;
pub mod url;

use anyhow::{Context as _, Result, bail};
use fwcat_core::{ManifestSource, load_manifest};
use fwcat_schema::{Filter, Manifest};
use reqwest::Client;

use crate::{Cli, ModelArgs};

/// Shared state for commands that read the manifest.
#[derive(Debug)]
pub struct Context {
    /// HTTP client carrying the configured timeout
    pub client: Client,
    source: Option<String>,
}

impl Context {
    /// Build the context from global options.
    pub fn new(cli: &Cli) -> Result<Self> {
        let client = fwcat_core::client(cli.timeout()).context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            source: cli.manifest.clone(),
        })
    }

    /// Load the configured manifest.
    pub async fn manifest(&self) -> Result<Manifest> {
        let Some(source) = self.source.as_deref() else {
            bail!("No manifest configured. Pass --manifest or set FWCAT_MANIFEST.");
        };
        let source = ManifestSource::parse(source)?;
        load_manifest(&self.client, &source)
            .await
            .with_context(|| format!("Failed to load manifest from {source}"))
    }
}

/// Filters selected by `args`, each inverted when `--exclude` is set.
pub fn model_filters(args: &ModelArgs) -> Result<Vec<Filter>> {
    let mut filters = Vec::new();
    if !args.models.is_empty() {
        filters.push(Filter::models(args.models.iter().cloned()));
    }
    if let Some(pattern) = &args.pattern {
        let pattern = glob::Pattern::new(pattern)
            .with_context(|| format!("Invalid model pattern '{pattern}'"))?;
        filters.push(Filter::model_match(pattern));
    }
    if args.exclude {
        filters = filters.into_iter().map(Filter::invert).collect();
    }
    Ok(filters)
}

/// Apply every filter in `args` to `manifest`.
pub fn filter_manifest(manifest: Manifest, args: &ModelArgs) -> Result<Manifest> {
    let filters = model_filters(args)?;
    Ok(filters
        .iter()
        .fold(manifest, |manifest, filter| manifest.filter(filter)))
}
