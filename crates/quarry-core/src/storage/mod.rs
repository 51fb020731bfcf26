pub mod csv;
pub mod layout;

pub use layout::ResultKey;
