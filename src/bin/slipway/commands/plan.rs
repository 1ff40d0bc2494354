//! Implementation of `slipway plan`.

use anyhow::Result;

use slipway::Pipeline;

use crate::cli::PlanArgs;
use crate::commands::load_config;

pub fn execute(args: PlanArgs) -> Result<()> {
    let (config, _) = load_config(&args.manifest_path)?;

    let pipeline = Pipeline::new(config);
    for line in pipeline.plan()? {
        println!("{}", line);
    }

    Ok(())
}
