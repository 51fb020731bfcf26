use super::exit_codes;
use crate::cli::args::CompareArgs;
use quarry_core::model::{BenchmarkType, CacheMode, System};
use quarry_core::report::average::read_average_file;
use quarry_core::report::console::{compare_rows, render_compare};
use quarry_core::storage::ResultKey;

pub fn cmd_compare(args: CompareArgs) -> anyhow::Result<i32> {
    let benchmark: BenchmarkType = args.benchmark.parse()?;
    let cache = CacheMode::from_flag(args.cache);
    let key = |system: System, scale_unit: &str| ResultKey {
        system,
        benchmark,
        dataset: args.dataset.clone(),
        scale_unit: scale_unit.to_string(),
        cache,
    };

    let sf = read_average_file(&key(System::Snowflake, &args.warehouse_size).average_file(&args.results_dir))?;
    let eb = read_average_file(&key(System::Embucket, &args.instance).average_file(&args.results_dir))?;

    print!("{}", render_compare(&compare_rows(&sf, &eb)));
    Ok(exit_codes::OK)
}
