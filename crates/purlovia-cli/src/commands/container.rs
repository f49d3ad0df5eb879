//! Container encode and decode handlers

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use purlovia_formats::container::{self, ContainerBuilder};
use tracing::info;

use super::{ContainerCommand, Output};

pub fn handle(cmd: ContainerCommand, output: Output) -> Result<()> {
    match cmd {
        ContainerCommand::Unpack { src, dst } => {
            let summary = container::unpack_file(&src, &dst)
                .with_context(|| format!("Failed to unpack {}", src.display()))?;
            info!(
                src = %src.display(),
                dst = %dst.display(),
                chunks = summary.chunk_count,
                "Unpacked container"
            );
            output.print(&summary)
        }
        ContainerCommand::Pack {
            src,
            dst,
            chunk_size,
            level,
        } => {
            let data =
                std::fs::read(&src).with_context(|| format!("Failed to read {}", src.display()))?;
            let builder = ContainerBuilder::new()
                .with_chunk_size(chunk_size)
                .context("Invalid chunk size")?
                .with_compression_level(level);

            let file =
                File::create(&dst).with_context(|| format!("Failed to create {}", dst.display()))?;
            let mut writer = BufWriter::new(file);
            let summary = builder
                .write_to(&data, &mut writer)
                .with_context(|| format!("Failed to pack {}", src.display()))?;
            writer.flush()?;
            info!(
                dst = %dst.display(),
                compressed = summary.compressed_size,
                uncompressed = summary.uncompressed_size,
                "Packed container"
            );
            output.print(&summary)
        }
        ContainerCommand::UnpackMod { src, dst } => {
            let report = container::unpack_directory(&src, &dst)
                .with_context(|| format!("Failed to unpack mod tree {}", src.display()))?;
            info!(
                decoded = report.decoded,
                copied = report.copied,
                skipped = report.skipped,
                "Unpacked mod tree"
            );
            output.print(&report)
        }
    }
}
