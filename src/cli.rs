mod args;

pub use args::{Cli, Command, NotifyArgs, ReportFormat, RunArgs};
