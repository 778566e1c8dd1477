pub mod engine;
pub mod policy;
pub mod registry;
pub mod simulation;
pub mod types;

pub use engine::SimulationEngine;
pub use policy::{ChunkPlacement, SwarmPolicy, TargetSelection};
pub use registry::{SessionRegistry, Subscriber};
pub use simulation::{CommandReceiver, CommandSender, Simulation, command_queue, simulation_task};
pub use types::{FrameUpdate, SimCommand, SwarmEvent};
