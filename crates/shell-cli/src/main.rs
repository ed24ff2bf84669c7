use abi::{Machine, VMStatus};
use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;
use log::{debug, info};
use std::io::{self, BufWriter, Write};
use std::{env, process};
use um_core::image;

mod config;
mod logger;

use config::Config;

const USAGE: &str = "\
USAGE:
    {program} <image.um>

ENVIRONMENT:
    UM_LOG          off|error|warn|info|debug|trace (default warn)
    UM_MAX_STEPS    stop with an error after this many instructions
";

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        let program = args.first().map(String::as_str).unwrap_or("um");
        eprintln!("{}", USAGE.replace("{program}", program));
        process::exit(1);
    }

    if let Err(e) = run(&args[1]) {
        eprintln!("{} {e:#}", "fatal:".red().bold());
        process::exit(1);
    }
}

fn run(path: &str) -> Result<()> {
    let config = Config::from_env()?;
    logger::init(config.log_level).context("failed to install logger")?;
    debug!("{config:?}");

    let image = image::load(path)?;
    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());
    let mut vm = Machine::from_image(&image, stdin, stdout)?;
    info!("loaded {path} ({} words)", vm.memory().program().len());

    let result = match config.max_steps {
        Some(limit) => vm.run_for(limit),
        None => vm.run().map(|_| VMStatus::Halted),
    };
    // Bytes written before a fault are still part of the program's output.
    let flushed = vm.output_mut().flush();

    match result {
        Ok(VMStatus::Halted) => flushed.context("failed to flush stdout"),
        Ok(VMStatus::Running) => bail!("no halt within {} instructions", vm.retired()),
        Err(fault) => Err(anyhow!(fault).context(format!(
            "machine fault at pc {} after {} instructions",
            vm.pc().wrapping_sub(1),
            vm.retired()
        ))),
    }
}
