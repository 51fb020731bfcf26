use super::exit_codes;
use crate::cli::args::AverageArgs;
use quarry_core::model::CacheMode;
use quarry_core::report::average_for_key;
use quarry_core::storage::ResultKey;

pub fn cmd_average(args: AverageArgs) -> anyhow::Result<i32> {
    let key = ResultKey {
        system: args.system.parse()?,
        benchmark: args.benchmark.parse()?,
        dataset: args.dataset,
        scale_unit: args.scale_unit,
        cache: CacheMode::from_flag(args.cache),
    };
    let path = average_for_key(&args.results_dir, &key)?;
    eprintln!("wrote {}", path.display());
    Ok(exit_codes::OK)
}
