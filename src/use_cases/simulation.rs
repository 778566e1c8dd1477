use super::engine::SimulationEngine;
use super::types::{FrameUpdate, SimCommand};
use crate::domain::{ForceId, SimulationTuning};
use glam::Vec3;
use std::time::Duration;
use tokio::sync::{
    mpsc,
    mpsc::error::{SendError, TryRecvError, TrySendError},
    watch,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Tick-context state: the engine plus the session's repulsion force.
#[derive(Debug)]
pub struct Simulation {
    engine: SimulationEngine,
    repulsion_id: ForceId,
    tick: u64,
}

impl Simulation {
    pub fn new(tuning: SimulationTuning) -> Self {
        let mut engine = SimulationEngine::new(tuning);
        let repulsion_id = engine.add_repulsion(engine.tuning().force.repulsion);
        Self {
            engine,
            repulsion_id,
            tick: 0,
        }
    }

    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SimulationEngine {
        &mut self.engine
    }

    pub fn repulsion_id(&self) -> ForceId {
        self.repulsion_id
    }

    pub fn apply(&mut self, command: SimCommand) {
        match command {
            SimCommand::ResetSession => {
                self.engine.reset();
                self.repulsion_id = self
                    .engine
                    .add_repulsion(self.engine.tuning().force.repulsion);
                info!("simulation reset");
            }
            SimCommand::SpawnEmitter { id, position } => {
                if !self.engine.insert_emitter(id, position, Vec3::ZERO) {
                    debug!(emitter_id = id, "emitter already exists");
                }
            }
            SimCommand::GrowEmitter { id } => {
                self.engine.grow_emitter(id);
            }
            SimCommand::AddAttractor {
                target_id,
                location,
            } => {
                self.attract(target_id, location);
            }
            SimCommand::AttractRandom { location } => {
                if let Some(target_id) = self.engine.random_emitter_id() {
                    self.attract(target_id, location);
                }
            }
            SimCommand::RemoveForce { id } => {
                self.engine.remove_force(id);
            }
            SimCommand::Retune(tuning) => {
                if let Err(e) = tuning.validate() {
                    warn!(error = %e, "rejected invalid tuning");
                    return;
                }
                self.engine.retune(|current| *current = tuning);
                let repulsion = self.engine.tuning().force.repulsion;
                if let Some(force) = self.engine.get_force(self.repulsion_id) {
                    force.set_magnitude(repulsion);
                }
            }
        }
    }

    /// Advances one tick and returns the frame presentation should draw.
    pub fn tick(&mut self, elapsed: Duration) -> FrameUpdate {
        self.engine.advance_timeline(elapsed);
        self.engine.update(1);
        self.prune_expired();

        self.tick += 1;
        FrameUpdate {
            tick: self.tick,
            emitters: self.engine.emitters().collect(),
            forces: self.engine.forces().collect(),
        }
    }

    fn attract(&mut self, target_id: u32, location: Vec3) {
        let tuning = self.engine.tuning().force;
        self.engine.add_id_attractor(
            tuning.attraction_magnitude,
            tuning.attraction_duration,
            location,
            target_id,
        );
    }

    // Spent attractors would otherwise pile up for the whole session.
    fn prune_expired(&mut self) {
        let expired: Vec<ForceId> = self
            .engine
            .forces()
            .filter(|f| f.id != self.repulsion_id)
            .filter(|f| {
                self.engine
                    .force(f.id)
                    .and_then(|force| force.as_attractor())
                    .is_some_and(|a| a.is_expired())
            })
            .map(|f| f.id)
            .collect();
        for id in expired {
            self.engine.remove_force(id);
        }
    }
}

/// Creates the tick context's inbound queues.
///
/// Structural commands (session resets, spawns, retuning) travel on an
/// unbounded lane so they are never lost. Per-chunk effects share a bounded
/// lane and are dropped when it is full.
pub fn command_queue(effect_capacity: usize) -> (CommandSender, CommandReceiver) {
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (effect_tx, effect_rx) = mpsc::channel(effect_capacity);
    (
        CommandSender {
            control: control_tx,
            effects: effect_tx,
        },
        CommandReceiver {
            control: control_rx,
            effects: effect_rx,
        },
    )
}

#[derive(Debug, Clone)]
pub struct CommandSender {
    control: mpsc::UnboundedSender<SimCommand>,
    effects: mpsc::Sender<SimCommand>,
}

impl CommandSender {
    /// Posts without blocking; only droppable effects are lost on a full queue.
    pub fn post(&self, command: SimCommand) {
        if !command.is_droppable() {
            if self.control.send(command).is_err() {
                debug!("command queue closed");
            }
            return;
        }
        match self.effects.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => {
                warn!(?command, "effect queue full; dropping");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("command queue closed");
            }
        }
    }

    /// Waits for room instead of dropping; for hosts outside the network context.
    pub async fn send(&self, command: SimCommand) -> Result<(), SendError<SimCommand>> {
        if command.is_droppable() {
            self.effects.send(command).await
        } else {
            self.control.send(command)
        }
    }
}

#[derive(Debug)]
pub struct CommandReceiver {
    control: mpsc::UnboundedReceiver<SimCommand>,
    effects: mpsc::Receiver<SimCommand>,
}

impl CommandReceiver {
    /// Next queued command, structural ones first.
    pub fn try_recv(&mut self) -> Option<SimCommand> {
        self.control
            .try_recv()
            .ok()
            .or_else(|| self.effects.try_recv().ok())
    }

    /// Applies everything queued since the last tick; false once the senders are gone.
    ///
    /// Effects still queued when a reset is applied belong to the discarded
    /// session and are skipped.
    pub fn drain_into(&mut self, simulation: &mut Simulation) -> bool {
        let mut reset = false;
        loop {
            match self.control.try_recv() {
                Ok(command) => {
                    reset |= matches!(command, SimCommand::ResetSession);
                    simulation.apply(command);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return false,
            }
        }

        let mut stale = 0usize;
        loop {
            match self.effects.try_recv() {
                Ok(command) if reset && command.is_droppable() => stale += 1,
                Ok(command) => simulation.apply(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
        if stale > 0 {
            debug!(stale, "skipped effects queued before a session reset");
        }
        true
    }
}

/// Fixed-step tick loop owning all emitter and force state.
///
/// Commands queued since the previous tick are drained before stepping, so a
/// tick never observes a half-applied mutation.
pub async fn simulation_task(
    mut simulation: Simulation,
    mut commands: CommandReceiver,
    frame_tx: watch::Sender<FrameUpdate>,
    tick_interval: Duration,
) {
    let mut interval = tokio::time::interval(tick_interval);
    let mut last_tick = Instant::now();

    loop {
        interval.tick().await;

        if !commands.drain_into(&mut simulation) {
            info!("command queue closed; simulation exiting");
            return;
        }

        let now = Instant::now();
        let frame = simulation.tick(now - last_tick);
        last_tick = now;

        frame_tx.send_replace(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ForceKind;

    fn seeded() -> Simulation {
        Simulation::new(SimulationTuning {
            seed: Some(9),
            ..SimulationTuning::default()
        })
    }

    #[test]
    fn when_created_then_repulsion_force_has_id_one() {
        let sim = seeded();

        let forces: Vec<_> = sim.engine().forces().collect();

        assert_eq!(sim.repulsion_id(), 1);
        assert_eq!(forces.len(), 1);
        assert_eq!(forces[0].kind, ForceKind::Repulsion);
        assert_eq!(forces[0].magnitude, 10.0);
    }

    #[test]
    fn when_reset_is_applied_twice_then_state_matches_a_single_reset() {
        let mut sim = seeded();
        sim.apply(SimCommand::SpawnEmitter {
            id: 0,
            position: Vec3::new(10.0, 10.0, 0.0),
        });
        sim.apply(SimCommand::AddAttractor {
            target_id: 0,
            location: Vec3::ZERO,
        });

        sim.apply(SimCommand::ResetSession);
        let once: Vec<_> = sim.engine().forces().collect();
        sim.apply(SimCommand::ResetSession);
        let twice: Vec<_> = sim.engine().forces().collect();

        assert_eq!(sim.engine().emitter_count(), 0);
        assert_eq!(once, twice);
        assert_eq!(sim.repulsion_id(), 1);
    }

    #[test]
    fn when_retuned_then_repulsion_magnitude_follows() {
        let mut sim = seeded();
        let mut tuning = sim.engine().tuning().clone();
        tuning.force.repulsion = 3.5;

        sim.apply(SimCommand::Retune(tuning));

        assert_eq!(
            sim.engine().force(sim.repulsion_id()).map(|f| f.magnitude()),
            Some(3.5)
        );
    }

    #[test]
    fn when_attractor_expires_then_tick_prunes_it() {
        let mut sim = seeded();
        sim.apply(SimCommand::SpawnEmitter {
            id: 0,
            position: Vec3::new(600.0, 400.0, 0.0),
        });
        sim.apply(SimCommand::AddAttractor {
            target_id: 0,
            location: Vec3::new(100.0, 400.0, 0.0),
        });

        let live = sim.tick(Duration::from_millis(16));
        let spent = sim.tick(Duration::from_secs(5));

        assert_eq!(live.forces.len(), 2);
        assert_eq!(spent.forces.len(), 1);
        assert_eq!(spent.tick, 2);
    }

    #[test]
    fn when_no_emitters_exist_then_random_attraction_is_skipped() {
        let mut sim = seeded();

        sim.apply(SimCommand::AttractRandom {
            location: Vec3::ZERO,
        });

        assert_eq!(sim.engine().forces().count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn when_commands_are_queued_then_next_tick_applies_them() {
        let (command_tx, command_rx) = command_queue(16);
        let (frame_tx, mut frame_rx) = watch::channel(FrameUpdate::default());
        tokio::spawn(simulation_task(
            seeded(),
            command_rx,
            frame_tx,
            Duration::from_millis(16),
        ));

        command_tx
            .send(SimCommand::SpawnEmitter {
                id: 4,
                position: Vec3::new(200.0, 200.0, 0.0),
            })
            .await
            .expect("simulation should be running");

        let frame = frame_rx
            .wait_for(|frame| !frame.emitters.is_empty())
            .await
            .expect("frames should keep coming")
            .clone();
        assert_eq!(frame.emitters[0].id, 4);
    }

    #[test]
    fn when_retune_is_invalid_then_tuning_is_kept() {
        let mut sim = seeded();
        let mut tuning = sim.engine().tuning().clone();
        tuning.emitter.charge_max = tuning.emitter.charge_min;

        sim.apply(SimCommand::Retune(tuning));

        assert_eq!(sim.engine().tuning().emitter.charge_max, 0.75);
    }

    #[test]
    fn when_effect_lane_is_full_then_structural_commands_still_arrive() {
        let (tx, mut rx) = command_queue(1);

        tx.post(SimCommand::GrowEmitter { id: 5 });
        tx.post(SimCommand::AddAttractor {
            target_id: 5,
            location: Vec3::ZERO,
        });
        tx.post(SimCommand::ResetSession);
        tx.post(SimCommand::SpawnEmitter {
            id: 6,
            position: Vec3::new(100.0, 100.0, 0.0),
        });

        let mut received = Vec::new();
        while let Some(command) = rx.try_recv() {
            received.push(command);
        }
        assert!(matches!(
            received.as_slice(),
            [
                SimCommand::ResetSession,
                SimCommand::SpawnEmitter { id: 6, .. },
                SimCommand::GrowEmitter { id: 5 },
            ]
        ));
    }

    #[test]
    fn when_reset_is_drained_then_effects_from_the_old_session_are_skipped() {
        let mut sim = seeded();
        let (tx, mut rx) = command_queue(3);
        tx.post(SimCommand::SpawnEmitter {
            id: 5,
            position: Vec3::new(300.0, 300.0, 0.0),
        });
        assert!(rx.drain_into(&mut sim));

        tx.post(SimCommand::GrowEmitter { id: 5 });
        tx.post(SimCommand::AddAttractor {
            target_id: 5,
            location: Vec3::ZERO,
        });
        tx.post(SimCommand::ResetSession);
        assert!(rx.drain_into(&mut sim));

        assert_eq!(sim.engine().emitter_count(), 0);
        assert_eq!(sim.engine().forces().count(), 1);
    }

    #[test]
    fn when_senders_are_dropped_then_drain_reports_closed() {
        let mut sim = seeded();
        let (tx, mut rx) = command_queue(1);
        drop(tx);

        assert!(!rx.drain_into(&mut sim));
    }
}
