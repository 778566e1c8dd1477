// Interface adapters: OSC wire codec, telemetry protocol and network handling.

pub mod net;
pub mod osc;
pub mod protocol;
pub mod state;
