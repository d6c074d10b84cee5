// tether_sim/src/simulation/plugins/control_plane.rs

//! The remote side of every bridge, played in-process: a scripted command
//! source and a monitor subscribed to every state topic.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};
use tether_core::messages::{self, StateMessage};
use tether_core::naming;

use crate::prelude::*;
use crate::simulation::config::ResolvedEntities;

pub struct ControlPlanePlugin;

impl Plugin for ControlPlanePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CommandScript>()
            .init_resource::<StateMonitor>()
            .add_systems(
                OnEnter(AppState::Running),
                (build_command_script, subscribe_state_monitor),
            )
            .add_systems(
                FixedUpdate,
                send_scripted_commands
                    .in_set(SimulationSet::Precomputation)
                    .after(crate::simulation::core::simulation_setup::sync_sim_clock),
            )
            .configure_sets(FixedUpdate, MonitorSystems.in_set(SimulationSet::Monitoring))
            .add_systems(
                FixedUpdate,
                (drain_state_monitor, log_observed_states)
                    .chain()
                    .in_set(MonitorSystems),
            );
    }
}

/// The state monitor's systems, for ordering against.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonitorSystems;

// =========================================================================
// == Scripted Command Source ==
// =========================================================================

#[derive(Debug, Clone)]
pub struct ScheduledCommand {
    pub at: f64,
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Every scripted command of the scenario, ordered by send time.
#[derive(Resource, Debug, Default)]
pub struct CommandScript {
    pending: Vec<ScheduledCommand>,
    next: usize,
    pub sent: u64,
}

impl CommandScript {
    pub fn new(mut commands: Vec<ScheduledCommand>) -> Self {
        // Stable, so commands scheduled at the same time keep file order.
        commands.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self {
            pending: commands,
            next: 0,
            sent: 0,
        }
    }

    /// Commands due at `now` that were not handed out yet.
    pub fn due(&mut self, now: f64) -> &[ScheduledCommand] {
        let start = self.next;
        while self.next < self.pending.len() && self.pending[self.next].at <= now {
            self.next += 1;
        }
        &self.pending[start..self.next]
    }

    pub fn remaining(&self) -> usize {
        self.pending.len() - self.next
    }
}

fn build_command_script(mut commands: Commands, resolved: Res<ResolvedEntities>) {
    let mut scheduled = Vec::new();
    for entity in &resolved.0 {
        let topics = match naming::resolve(&entity.name, &entity.namespace) {
            Ok(topics) => topics,
            Err(e) => {
                warn!("No script for '{}': {}", entity.name, e);
                continue;
            }
        };
        for step in &entity.script {
            match messages::encode_command(&step.to_command()) {
                Ok(payload) => scheduled.push(ScheduledCommand {
                    at: step.at,
                    topic: topics.command.clone(),
                    payload,
                }),
                Err(e) => warn!("Skipping scripted command for '{}': {}", entity.name, e),
            }
        }
    }
    info!("Command script ready: {} command(s)", scheduled.len());
    commands.insert_resource(CommandScript::new(scheduled));
}

pub fn send_scripted_commands(
    clock: Res<SimClock>,
    network: Res<BridgeNetwork>,
    mut script: ResMut<CommandScript>,
) {
    let now = clock.now();
    let script = &mut *script;
    let mut sent = 0;
    for command in script.due(now) {
        match network.send(&command.topic, &command.payload) {
            Ok(()) => {
                debug!("[CONTROL] t = {:.3} s -> {}", now, command.topic);
                sent += 1;
            }
            Err(e) => warn!("[CONTROL] sending on {} failed: {}", command.topic, e),
        }
    }
    script.sent += sent;
}

// =========================================================================
// == State Monitor ==
// =========================================================================

/// Subscribed to every state topic. The transport delivers on its own thread,
/// so publications are funnelled through a channel and drained each tick.
#[derive(Resource)]
pub struct StateMonitor {
    sender: Sender<(Arc<str>, Vec<u8>)>,
    receiver: Receiver<(Arc<str>, Vec<u8>)>,
    subscriptions: Vec<SubscriptionId>,
    pub received: HashMap<String, u64>,
    pub malformed: u64,
}

impl Default for StateMonitor {
    fn default() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            sender,
            receiver,
            subscriptions: Vec::new(),
            received: HashMap::new(),
            malformed: 0,
        }
    }
}

impl StateMonitor {
    pub fn subscribe(&mut self, transport: &dyn Transport, topic: &str) -> BridgeResult<()> {
        let sender = self.sender.clone();
        let topic_name: Arc<str> = Arc::from(topic);
        let handler: InboundHandler = Arc::new(move |raw: &[u8]| {
            // The monitor only goes away with the app; a send error is harmless.
            let _ = sender.send((topic_name.clone(), raw.to_vec()));
        });
        let id = transport.subscribe(topic, handler)?;
        self.subscriptions.push(id);
        Ok(())
    }

    /// Decodes everything received so far.
    pub fn drain(&mut self) -> Vec<(String, StateMessage)> {
        let mut decoded = Vec::new();
        while let Ok((topic, raw)) = self.receiver.try_recv() {
            match messages::decode_state(&raw) {
                Ok(message) => {
                    *self.received.entry(topic.to_string()).or_default() += 1;
                    decoded.push((topic.to_string(), message));
                }
                Err(e) => {
                    self.malformed += 1;
                    warn!("[MONITOR] malformed state on {}: {}", topic, e);
                }
            }
        }
        decoded
    }

    /// Number of state topics watched.
    pub fn watching(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn total_received(&self) -> u64 {
        self.received.values().sum()
    }
}

fn subscribe_state_monitor(
    network: Res<BridgeNetwork>,
    mut monitor: ResMut<StateMonitor>,
    links: Query<&BridgeLink>,
) {
    for link in &links {
        let topic = &link.0.topics().state;
        match monitor.subscribe(network.transport.as_ref(), topic) {
            Ok(()) => info!("[MONITOR] watching {}", topic),
            Err(e) => error!("[MONITOR] cannot watch {}: {}", topic, e),
        }
    }
}

fn drain_state_monitor(mut monitor: ResMut<StateMonitor>, mut events: EventWriter<StateObserved>) {
    for (topic, message) in monitor.drain() {
        events.write(StateObserved { topic, message });
    }
}

fn log_observed_states(mut events: EventReader<StateObserved>) {
    for event in events.read() {
        trace!(
            "[MONITOR] {} #{} @ {:.3} s: position ({:.3}, {:.3}, {:.3})",
            event.topic,
            event.message.header.seq,
            event.message.header.stamp,
            event.message.position.x,
            event.message.position.y,
            event.message.position.z
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduled(at: f64, topic: &str) -> ScheduledCommand {
        ScheduledCommand {
            at,
            topic: topic.to_string(),
            payload: Vec::new(),
        }
    }

    #[test]
    fn script_hands_out_commands_once_in_time_order() {
        let mut script = CommandScript::new(vec![
            scheduled(0.5, "/b"),
            scheduled(0.0, "/a"),
            scheduled(0.5, "/c"),
        ]);

        let first: Vec<_> = script.due(0.1).iter().map(|c| c.topic.clone()).collect();
        assert_eq!(first, vec!["/a"]);
        assert!(script.due(0.2).is_empty());

        let second: Vec<_> = script.due(0.5).iter().map(|c| c.topic.clone()).collect();
        assert_eq!(second, vec!["/b", "/c"]);
        assert_eq!(script.remaining(), 0);
    }

    #[test]
    fn monitor_counts_per_topic_and_flags_garbage() {
        let transport = LoopbackTransport::new();
        let mut monitor = StateMonitor::default();
        monitor.subscribe(&transport, "/env/box/State").unwrap();

        let state = PhysicalState::new("box", "env", EntityKind::RigidBody);
        let raw = messages::encode_state(
            &state,
            messages::Header {
                seq: 0,
                stamp: 0.0,
            },
        )
        .unwrap();
        transport.publish("/env/box/State", &raw).unwrap();
        transport.publish("/env/box/State", b"nope").unwrap();

        let decoded = monitor.drain();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].1.name, "box");
        assert_eq!(monitor.received["/env/box/State"], 1);
        assert_eq!(monitor.malformed, 1);
    }
}
