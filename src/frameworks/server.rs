// Framework bootstrap for the swarm visualizer runtime.

use crate::domain::{ProtocolDesyncError, SimulationTuning};
use crate::frameworks::config::{self, ConfigurationError};
use crate::frameworks::errors::AppError;
use crate::interface_adapters::net::{
    ConnectionError, OscClient, accept_loop, bind_listener, dispatch_task,
};
use crate::interface_adapters::protocol::InboundMessage;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{
    ChunkPlacement, CommandSender, FrameUpdate, SessionRegistry, Simulation, SwarmPolicy,
    TargetSelection, command_queue, simulation_task,
};

use std::net::SocketAddr;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub server_host: String,
    pub server_port: u16,
    pub tuning: SimulationTuning,
    pub tick_interval: Duration,
    pub placement: ChunkPlacement,
    pub selection: TargetSelection,
}

impl RuntimeSettings {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Ok(Self {
            server_host: config::server_address(),
            server_port: config::server_port()?,
            tuning: config::tuning()?,
            tick_interval: config::TICK_INTERVAL,
            placement: ChunkPlacement::default(),
            selection: config::target_selection()?,
        })
    }
}

/// Running tasks plus the handles a host needs to observe and steer them.
pub struct SwarmRuntime {
    state: AppState,
    listener_addr: SocketAddr,
    // Held so the outbound connection stays open for the session.
    _client: OscClient,
    accept: JoinHandle<()>,
    dispatcher: JoinHandle<Result<(), ProtocolDesyncError>>,
    simulation: JoinHandle<()>,
}

impl SwarmRuntime {
    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn listener_addr(&self) -> SocketAddr {
        self.listener_addr
    }

    pub fn frames(&self) -> watch::Receiver<FrameUpdate> {
        self.state.frame_rx.clone()
    }

    pub fn commands(&self) -> CommandSender {
        self.state.command_tx.clone()
    }

    /// Resolves on a shutdown request, a dispatcher failure, or Ctrl-C.
    pub async fn wait(mut self) -> Result<(), AppError> {
        let result = tokio::select! {
            _ = self.state.shutdown.notified() => {
                tracing::info!("shutting down");
                Ok(())
            }
            joined = &mut self.dispatcher => match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(AppError::from(e)),
                Err(e) => Err(AppError::from(e)),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                Ok(())
            }
        };

        self.accept.abort();
        self.dispatcher.abort();
        self.simulation.abort();
        result
    }
}

/// Wires the channels, registers with the telemetry server and spawns the
/// listener, dispatcher and simulation tasks.
pub async fn start(listener: TcpListener, settings: RuntimeSettings) -> Result<SwarmRuntime, AppError> {
    let listener_addr = listener
        .local_addr()
        .map_err(|source| ConnectionError::Bind {
            addr: "listener".to_string(),
            source,
        })?;

    // The listener is already bound, so the server's first connection waits
    // in the backlog until the accept loop starts.
    let mut client = OscClient::connect(&settings.server_host, settings.server_port).await?;
    client.register(listener_addr.port()).await?;

    // message_tx/rx: decoded telemetry from every connection, in arrival order.
    let (message_tx, message_rx) = mpsc::channel::<InboundMessage>(config::MESSAGE_CHANNEL_CAPACITY);
    // command_tx/rx: mutations applied at the start of the next tick.
    let (command_tx, command_rx) = command_queue(config::COMMAND_QUEUE_CAPACITY);
    let (frame_tx, frame_rx) = watch::channel(FrameUpdate::default());
    let shutdown = Arc::new(Notify::new());

    let mut registry = SessionRegistry::new();
    let policy = swarm_policy(&settings, command_tx.clone(), Arc::clone(&shutdown));
    registry.subscribe(policy.into_subscriber());

    let simulation = tokio::spawn(simulation_task(
        Simulation::new(settings.tuning),
        command_rx,
        frame_tx,
        settings.tick_interval,
    ));
    let dispatcher = tokio::spawn(dispatch_task(registry, message_rx));
    let accept = tokio::spawn(accept_loop(listener, message_tx));

    tracing::info!(%listener_addr, server = client.addr(), "runtime started");

    Ok(SwarmRuntime {
        state: AppState {
            command_tx,
            frame_rx,
            shutdown,
        },
        listener_addr,
        _client: client,
        accept,
        dispatcher,
        simulation,
    })
}

fn swarm_policy(settings: &RuntimeSettings, commands: CommandSender, shutdown: Arc<Notify>) -> SwarmPolicy {
    let policy = SwarmPolicy::new(commands, shutdown, settings.tuning.world)
        .with_placement(settings.placement)
        .with_selection(settings.selection);
    match settings.tuning.seed {
        Some(seed) => policy.with_seed(seed),
        None => policy,
    }
}

pub async fn run(listener: TcpListener, settings: RuntimeSettings) -> Result<(), AppError> {
    start(listener, settings).await?.wait().await
}

pub async fn run_with_config() -> Result<(), AppError> {
    init_runtime();

    let settings = RuntimeSettings::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
    })?;

    let address = SocketAddr::from(([0, 0, 0, 0], config::LISTENER_PORT));
    let listener = bind_listener(address).await.inspect_err(|e| {
        tracing::error!(%address, error = ?e, "failed to bind");
    })?;

    run(listener, settings).await.inspect_err(|e| {
        tracing::error!(error = ?e, "runtime stopped");
    })
}
