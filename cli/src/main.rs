use anyhow::{Context, Result};
use netpower_usb::device::LibUsbRegistry;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

use crate::runner::{parse_invocation, run, Invocation};

mod cli;
mod runner;

fn main() -> Result<()> {
    let invocation = match parse_invocation(std::env::args_os()) {
        Ok(invocation) => invocation,
        // Help and Version output
        Err(error) => error.exit(),
    };

    if let Invocation::Run { log_level, .. } = invocation {
        CombinedLogger::init(vec![TermLogger::new(
            log_level.into(),
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )])
        .context("Could not configure the logger")?;
    }

    run(invocation, &LibUsbRegistry::new(), &mut std::io::stdout())
}
