mod command;
mod runner;

pub use command::Command;
pub use runner::{CliError, load_data, parse_documents, run};
