//! Mod record and key-value handlers

use anyhow::{Context, Result};
use purlovia_formats::keyvalue;
use purlovia_loader::mods::{find_installed_mods, gather_mod_info, write_mod_data};
use tracing::info;

use super::{ModCommand, Output};

pub fn handle(cmd: ModCommand, output: Output) -> Result<()> {
    match cmd {
        ModCommand::ModInfo { id, write, loader } => {
            let config = loader.config()?;
            let root = &config.asset_root;
            let Some(id) = id else {
                let installed = find_installed_mods(root)
                    .with_context(|| format!("Failed to scan {}", root.display()))?;
                return output.print(&installed);
            };

            let data = gather_mod_info(root, &id)
                .with_context(|| format!("Failed to read descriptors of mod {id}"))?;
            if write {
                let path = write_mod_data(root, &data)?;
                info!(path = %path.display(), "Wrote mod record");
            }
            output.print(&data)
        }
        ModCommand::Keyvalue { file, path } => {
            let document = keyvalue::read_file(&file)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            match path {
                None => output.print(&document),
                Some(path) => {
                    let keys: Vec<&str> = path.split('/').filter(|k| !k.is_empty()).collect();
                    let value = document
                        .get_path(&keys)
                        .with_context(|| format!("No value at {path}"))?;
                    output.print(value)
                }
            }
        }
    }
}
