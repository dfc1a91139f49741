pub mod caida;

pub use caida::{parse_serial_2, CAIDAASGraphReader};
