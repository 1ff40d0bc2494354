//! Implementation of `slipway clean`.

use anyhow::Result;

use slipway::util::fs::remove_dir_all_if_exists;

use crate::cli::CleanArgs;
use crate::commands::load_config;

pub fn execute(args: CleanArgs) -> Result<()> {
    let (config, _) = load_config(&args.manifest_path)?;

    let build_dir = config.build_dir();
    remove_dir_all_if_exists(&build_dir)?;
    eprintln!("     Removed {}", build_dir.display());

    Ok(())
}
