pub mod convert;
pub mod postprocess;
