pub mod runner;

pub use runner::{ProcessOutput, ProcessRequest, ProcessRunner, TokioRunner};
