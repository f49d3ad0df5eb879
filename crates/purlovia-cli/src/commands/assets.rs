//! Asset loading handlers

use anyhow::{Context, Result};
use purlovia_loader::AssetQuery;
use serde_json::json;
use tracing::debug;

use super::{AssetCommand, Output};

pub fn handle(cmd: AssetCommand, output: Output) -> Result<()> {
    match cmd {
        AssetCommand::Asset {
            name,
            shallow,
            loader,
        } => {
            let mut loader = loader.open()?;
            let name = loader
                .find_from_external_path(&name)
                .with_context(|| format!("No asset matches {name}"))?;

            if shallow {
                let package = loader.retrieve_shallow(&name)?;
                output.print(&json!({
                    "name": name,
                    "summary": package.summary,
                    "names": package.names.len(),
                    "imports": package.imports.len(),
                    "exports": package.exports.len(),
                }))
            } else {
                let asset = loader
                    .retrieve(&name)
                    .with_context(|| format!("Failed to load {name}"))?;
                output.print(asset.as_ref())
            }
        }
        AssetCommand::Raw {
            name,
            bytes,
            loader,
        } => {
            let loader = loader.open()?;
            let data = loader.load_raw(&name)?;
            let head = &data[..data.len().min(bytes)];
            output.print(&json!({
                "name": loader.clean(&name),
                "size": data.len(),
                "head": hex::encode(head),
            }))
        }
        AssetCommand::Find {
            pattern,
            under,
            exclude,
            extensions,
            loader,
        } => {
            let loader = loader.open()?;
            let query = exclude
                .into_iter()
                .fold(AssetQuery::new(pattern).under(under), AssetQuery::excluding)
                .with_extensions(extensions);
            let names: Vec<String> = loader.find_asset_names(&query)?.collect();
            debug!(count = names.len(), "Enumerated assets");
            output.print(&names)
        }
        AssetCommand::Ancestry { class, loader } => {
            let mut loader = loader.open()?;
            let chain = loader
                .ancestry(&class)
                .with_context(|| format!("Failed to walk ancestry of {class}"))?;
            debug!(stats = ?loader.stats(), "Ancestry complete");
            output.print(&chain)
        }
    }
}
