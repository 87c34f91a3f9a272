use std::path::{Path, PathBuf};

use anyhow::bail;
use convoy_diego::{BuildpackDesiredLrpBuilder, DesiredLrpOptions};
use sha2::{Digest, Sha256};
use tracing::info;

use super::Context;

pub struct DropletArgs {
    pub stack: String,
    pub droplet_uri: String,
    pub process_guid: String,
    pub droplet_hash: Option<String>,
    pub checksum_algorithm: String,
    pub checksum_value: Option<String>,
    pub droplet_file: Option<PathBuf>,
    pub ports: Vec<u16>,
}

pub fn print(ctx: &Context, args: DropletArgs, pretty: bool) -> anyhow::Result<()> {
    let opts = options(args)?;
    let descriptor = BuildpackDesiredLrpBuilder::new(&ctx.config, opts).build()?;
    let json = if pretty {
        descriptor.to_json_pretty()?
    } else {
        descriptor.to_json()?
    };
    println!("{json}");
    Ok(())
}

fn options(args: DropletArgs) -> anyhow::Result<DesiredLrpOptions> {
    let (checksum_algorithm, checksum_value) = match (args.checksum_value, &args.droplet_file) {
        (Some(value), _) => (args.checksum_algorithm, value),
        (None, Some(path)) => {
            if args.checksum_algorithm != "sha256" {
                bail!(
                    "cannot compute {} checksums locally, pass --checksum-value",
                    args.checksum_algorithm
                );
            }
            let digest = droplet_checksum(path)?;
            info!(file = %path.display(), sha256 = %digest, "computed droplet checksum");
            ("sha256".to_string(), digest)
        }
        (None, None) => bail!("either --checksum-value or --droplet-file is required"),
    };

    Ok(DesiredLrpOptions {
        stack: args.stack,
        droplet_uri: args.droplet_uri,
        process_guid: args.process_guid,
        droplet_hash: args.droplet_hash.unwrap_or_else(|| checksum_value.clone()),
        checksum_algorithm,
        checksum_value,
        ports: Some(args.ports),
    })
}

/// Hex sha256 of the droplet file.
pub fn droplet_checksum(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
