use std::fmt;

use clap::Subcommand;

use crate::command;

///////////////////////////////
/// Possible subcommands to parse
#[derive(Subcommand)]
pub enum Commands {
    /// Reassemble windows from every read sharing their barcodes
    Assemble(command::AssembleCMD),
    /// Tally the barcodes of the reads in a window
    Barcodes(command::BarcodesCMD),
    /// Align sequences against targets or a reference window
    Align(command::AlignCMD),
}

impl fmt::Debug for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cmd = match self {
            Commands::Assemble(_) => "Assemble",
            Commands::Barcodes(_) => "Barcodes",
            Commands::Align(_) => "Align",
        };
        write!(f, "{}", cmd)
    }
}

impl Commands {
    pub fn try_execute(&mut self) -> anyhow::Result<()> {
        match self {
            Commands::Assemble(cmd) => cmd.try_execute(),
            Commands::Barcodes(cmd) => cmd.try_execute(),
            Commands::Align(cmd) => cmd.try_execute(),
        }
    }
}
