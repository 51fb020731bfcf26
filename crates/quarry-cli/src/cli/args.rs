use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "quarry",
    version,
    about = "Cold-cache TPC-H benchmarks for Snowflake and Embucket"
)]
pub struct Cli {
    /// emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the benchmark and persist one result file per system and iteration
    Run(RunArgs),
    /// Recompute avg_results.csv for one result directory
    Average(AverageArgs),
    /// Print averaged Snowflake and Embucket timings side by side
    Compare(CompareArgs),
    /// Print the query suite as it would be sent
    Queries(QueriesArgs),
    Version,
}

#[derive(Parser, Clone, Debug)]
pub struct RunArgs {
    /// snowflake | embucket | both
    #[arg(long, default_value = "both")]
    pub system: String,

    #[arg(long, default_value_t = 3)]
    pub runs: u32,

    /// tpch | tpcds (overrides BENCHMARK_TYPE)
    #[arg(long)]
    pub benchmark: Option<String>,

    /// overrides DATASET_PATH
    #[arg(long)]
    pub dataset_path: Option<String>,

    /// keep warm state between queries
    #[arg(long)]
    pub cache: bool,

    #[arg(long, env = "QUARRY_RESULTS_DIR", default_value = "result")]
    pub results_dir: PathBuf,

    /// YAML file layered under the environment
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
pub struct AverageArgs {
    /// snowflake | embucket
    #[arg(long)]
    pub system: String,

    #[arg(long)]
    pub dataset: String,

    /// warehouse size (snowflake) or instance (embucket)
    #[arg(long)]
    pub scale_unit: String,

    #[arg(long)]
    pub cache: bool,

    #[arg(long, default_value = "tpch")]
    pub benchmark: String,

    #[arg(long, env = "QUARRY_RESULTS_DIR", default_value = "result")]
    pub results_dir: PathBuf,
}

#[derive(Parser, Clone, Debug)]
pub struct CompareArgs {
    #[arg(long)]
    pub dataset: String,

    #[arg(long)]
    pub warehouse_size: String,

    #[arg(long)]
    pub instance: String,

    #[arg(long)]
    pub cache: bool,

    #[arg(long, default_value = "tpch")]
    pub benchmark: String,

    #[arg(long, env = "QUARRY_RESULTS_DIR", default_value = "result")]
    pub results_dir: PathBuf,
}

#[derive(Parser, Clone, Debug)]
pub struct QueriesArgs {
    #[arg(long, default_value = "tpch")]
    pub benchmark: String,

    /// table naming to apply: snowflake | embucket
    #[arg(long, default_value = "embucket")]
    pub system: String,

    #[arg(long)]
    pub config: Option<PathBuf>,
}
