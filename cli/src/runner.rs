use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use netpower_usb::device::base::DeviceRegistry;
use netpower_usb::netpower::{NetPower, PowerState};
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;

use crate::cli::{Cli, LevelFilter, PowerCommand};

static DEFAULT_PROGRAM: &str = "usbnetpower8800";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Invocation {
    Run {
        log_level: LevelFilter,
        command: PowerCommand,
    },
    Usage {
        program: String,
    },
}

/// Works out what we've been asked to do. A missing or unrecognised command isn't an error,
/// it just prints the usage line. Only help and version requests come back as `Err`.
pub fn parse_invocation<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let program = program_name(args.first());

    match Cli::try_parse_from(&args) {
        Ok(Cli {
            log_level,
            command: Some(command),
        }) => Ok(Invocation::Run { log_level, command }),
        Ok(Cli { command: None, .. }) => Ok(Invocation::Usage { program }),
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Err(error),
            _ => Ok(Invocation::Usage { program }),
        },
    }
}

fn program_name(arg: Option<&OsString>) -> String {
    arg.and_then(|arg| Path::new(arg).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_PROGRAM.to_string())
}

pub fn run(
    invocation: Invocation,
    registry: &dyn DeviceRegistry,
    out: &mut dyn Write,
) -> Result<()> {
    match invocation {
        Invocation::Run { command, .. } => execute(command, registry, out),
        Invocation::Usage { program } => {
            writeln!(out, "usage: {} [on|off|stat]", program)?;
            Ok(())
        }
    }
}

pub fn execute(
    command: PowerCommand,
    registry: &dyn DeviceRegistry,
    out: &mut dyn Write,
) -> Result<()> {
    let mut netpower = NetPower::open(registry)?;

    match command {
        PowerCommand::On => {
            netpower
                .set_power(true)
                .context("Unable to switch the outlet on")?;
        }
        PowerCommand::Off => {
            netpower
                .set_power(false)
                .context("Unable to switch the outlet off")?;
        }
        PowerCommand::Stat => {
            let status = netpower
                .read_status()
                .context("Unable to read the outlet state")?;
            writeln!(out, "Power: {}", PowerState::from_status(status))?;
        }
    }

    Ok(())
}
