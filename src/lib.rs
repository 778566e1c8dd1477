pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use frameworks::config::LISTENER_PORT;
pub use frameworks::server::{RuntimeSettings, SwarmRuntime, run, run_with_config, start};
