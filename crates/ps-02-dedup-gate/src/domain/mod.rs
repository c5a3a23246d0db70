pub mod errors;
pub mod marks;
