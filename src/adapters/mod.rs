// Adapters layer: concrete fax backends and request parsers

pub mod command_line;
pub mod http;
pub mod process;

pub use command_line::CommandLineRequestParser;
pub use http::HttpBackend;
pub use process::ProcessBackend;
