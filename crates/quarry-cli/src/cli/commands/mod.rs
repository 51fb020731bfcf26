use super::args::*;
use quarry_core::errors::as_config_error;

pub mod average;
pub mod compare;
pub mod queries;
pub mod run;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const RUN_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let outcome = match cli.cmd {
        Command::Run(args) => run::cmd_run(args).await,
        Command::Average(args) => average::cmd_average(args),
        Command::Compare(args) => compare::cmd_compare(args),
        Command::Queries(args) => queries::cmd_queries(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    };

    match outcome {
        Ok(code) => Ok(code),
        Err(e) if as_config_error(&e).is_some() => {
            eprintln!("config error: {}", e);
            Ok(exit_codes::CONFIG_ERROR)
        }
        Err(e) => {
            tracing::error!(event = "quarry.fatal", error = %e);
            eprintln!("error: {:#}", e);
            Ok(exit_codes::RUN_FAILED)
        }
    }
}
