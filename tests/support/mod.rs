// Shared harness: a stand-in telemetry server and a runtime on ephemeral ports.
#![allow(dead_code)]

use std::{future::Future, time::Duration};
use swarm_visualizer::domain::SimulationTuning;
use swarm_visualizer::interface_adapters::osc::{OscArg, decode_packet, read_frame, write_message};
use swarm_visualizer::interface_adapters::protocol::InboundMessage;
use swarm_visualizer::use_cases::FrameUpdate;
use swarm_visualizer::{RuntimeSettings, SwarmRuntime, start};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

pub const TIMEOUT: Duration = Duration::from_secs(2);

pub struct Harness {
    pub runtime: SwarmRuntime,
    // Connection the telemetry server pushes session messages over.
    pub telemetry: TcpStream,
    // Port announced in the registration handshake.
    pub registered_port: i32,
    // Kept open so the runtime's outbound connection stays alive.
    _registration: TcpStream,
}

pub fn seeded_tuning() -> SimulationTuning {
    SimulationTuning {
        seed: Some(1),
        ..SimulationTuning::default()
    }
}

pub async fn start_runtime() -> Harness {
    let server = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind telemetry server");
    let server_port = server.local_addr().expect("server addr").port();
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind runtime listener");

    let runtime = start(
        listener,
        RuntimeSettings {
            server_host: "127.0.0.1".to_string(),
            server_port,
            tuning: seeded_tuning(),
            tick_interval: Duration::from_millis(5),
            placement: Default::default(),
            selection: Default::default(),
        },
    )
    .await
    .expect("runtime should start");

    let (mut registration, _) = server.accept().await.expect("registration connection");
    let frame = within(read_frame(&mut registration))
        .await
        .expect("read registration")
        .expect("registration frame");
    let messages = decode_packet(&frame).expect("decode registration");
    let registered_port = match messages.as_slice() {
        [message] if message.address == "/register" => match message.args.as_slice() {
            [OscArg::Int(port)] => *port,
            other => panic!("unexpected registration args {other:?}"),
        },
        other => panic!("unexpected registration {other:?}"),
    };

    let telemetry = TcpStream::connect(runtime.listener_addr())
        .await
        .expect("connect to runtime listener");

    Harness {
        runtime,
        telemetry,
        registered_port,
        _registration: registration,
    }
}

impl Harness {
    pub async fn send(&mut self, message: InboundMessage) {
        write_message(&mut self.telemetry, &(&message).into())
            .await
            .expect("push telemetry");
    }
}

pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(TIMEOUT, future)
        .await
        .expect("operation should finish in time")
}

pub async fn wait_for_frame<P>(frames: &mut watch::Receiver<FrameUpdate>, predicate: P) -> FrameUpdate
where
    P: FnMut(&FrameUpdate) -> bool,
{
    within(frames.wait_for(predicate))
        .await
        .expect("simulation should keep publishing")
        .clone()
}
