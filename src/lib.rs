pub mod analysis;
pub mod config;
pub mod log;
pub mod lsp;
pub mod rpc;
