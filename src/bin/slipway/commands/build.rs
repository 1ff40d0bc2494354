//! Implementation of `slipway build`.

use anyhow::Result;

use slipway::util::fs::relative_path;
use slipway::Pipeline;

use crate::cli::BuildArgs;
use crate::commands::load_config;

pub fn execute(args: BuildArgs, verbose: bool) -> Result<()> {
    let (mut config, package_dir) = load_config(&args.manifest_path)?;

    // The pipeline is contractually invoked from the packaging directory.
    config.expected_cwd = Some(package_dir.clone());

    if args.emit_compile_commands {
        config.emit_compile_commands = true;
    }

    let mut pipeline = Pipeline::new(config).with_progress(!verbose);
    let report = pipeline.run()?;

    let cwd = std::env::current_dir().unwrap_or_default();
    eprintln!(
        "    Finished {} artifact(s), {} glue file(s)",
        report.artifacts.len(),
        report.glue_files.len()
    );
    for file in &report.packaged_files {
        eprintln!("   Packaged {}", relative_path(&cwd, file).display());
    }
    if let Some(ref path) = report.compile_commands {
        eprintln!("    Emitted {}", relative_path(&cwd, path).display());
    }

    Ok(())
}
