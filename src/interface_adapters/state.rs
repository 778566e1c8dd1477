use crate::use_cases::{CommandSender, FrameUpdate};
use std::sync::Arc;
use tokio::sync::{Notify, watch};

#[derive(Clone)]
pub struct AppState {
    // Mutations posted to the tick context (manual triggers, retuning).
    pub command_tx: CommandSender,
    // Latest frame published by the tick context.
    pub frame_rx: watch::Receiver<FrameUpdate>,
    // Fired by the shutdown message or by the embedding host.
    pub shutdown: Arc<Notify>,
}
