//! dmrelay core library: product catalog, reply resolver, completion client,
//! Instagram channel and the webhook gateway used by the CLI.

pub mod catalog;
pub mod channels;
pub mod config;
pub mod gateway;
pub mod init;
pub mod llm;
pub mod resolver;
