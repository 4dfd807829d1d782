pub mod bits;
pub mod mapper;

pub use bits::{count_bit_errors, random_bits};
pub use mapper::{MapError, QpskMapper};
