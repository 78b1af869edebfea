pub mod arpd;
pub mod cli;
pub mod instances;
pub mod logger;
pub mod parse;
pub mod perf;
pub mod plot;
pub mod runner;
