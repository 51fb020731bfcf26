pub mod average;
pub mod console;
pub mod results;

pub use average::{average_for_key, calculate_averages};
pub use results::write_result_file;
