use super::exit_codes;
use crate::cli::args::QueriesArgs;
use quarry_core::config::load_layered;
use quarry_core::config::resolve::table_naming;
use quarry_core::model::System;
use quarry_core::suite;

pub fn cmd_queries(args: QueriesArgs) -> anyhow::Result<i32> {
    let system: System = args.system.parse()?;
    let mut cfg = load_layered(args.config.as_deref())?;
    cfg.benchmark_type = Some(args.benchmark);

    let naming = table_naming(&cfg, system)?;
    for task in suite::queries(cfg.benchmark()?, &naming)? {
        println!("-- {}", task.name);
        println!("{}", task.sql.trim());
        println!();
    }
    Ok(exit_codes::OK)
}
