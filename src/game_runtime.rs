use std::sync::Arc;

use bevy::prelude::*;

use crate::config::{PlayConfig, Viewport};
use crate::entities::Terminal;
use crate::input::{Action, InputQueue};
use crate::map::GameMap;
use crate::render::{build_frame, Frame};
use crate::simulation::{Simulation, FRAME_MS};

/// Receiver of run lifecycle signals. Each is delivered at most once per run.
pub trait RunHost {
    fn on_stop(&mut self);
    fn on_win(&mut self);
    fn on_death(&mut self);
}

#[derive(Event, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunSignal {
    Stop,
    Win,
    Death,
}

#[derive(Clone, Copy, Debug)]
struct PendingSignal {
    signal: RunSignal,
    remaining_ms: f32,
}

#[derive(Default)]
struct Delivered {
    stop: bool,
    win: bool,
    death: bool,
}

impl Delivered {
    /// Marks `signal` delivered; false if it already was.
    fn claim(&mut self, signal: RunSignal) -> bool {
        let slot = match signal {
            RunSignal::Stop => &mut self.stop,
            RunSignal::Win => &mut self.win,
            RunSignal::Death => &mut self.death,
        };
        !std::mem::replace(slot, true)
    }
}

fn deliver(host: &mut dyn RunHost, signal: RunSignal) {
    match signal {
        RunSignal::Stop => host.on_stop(),
        RunSignal::Win => host.on_win(),
        RunSignal::Death => host.on_death(),
    }
}

/// Owns one run: ticks it, renders it, and reports its end to a host.
pub struct GameLoop {
    sim: Option<Simulation>,
    pending: Vec<PendingSignal>,
    delivered: Delivered,
    exit_requested: bool,
}

impl GameLoop {
    pub fn start(map: Arc<GameMap>, config: PlayConfig) -> Self {
        info!(
            "[Tileplay] Starting run on {}x{} map ({} layers)",
            map.width,
            map.height,
            map.layers.len()
        );
        Self {
            sim: Some(Simulation::new(map, config)),
            pending: Vec::new(),
            delivered: Delivered::default(),
            exit_requested: false,
        }
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.sim.as_ref()
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.sim.is_some()
    }

    /// Whether a delayed win/death signal has yet to fire.
    #[cfg(test)]
    pub fn has_pending_signals(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn set_action(&mut self, action: Action, down: bool) {
        if action == Action::Exit {
            if down {
                self.exit_requested = true;
            }
            return;
        }
        if let Some(sim) = self.sim.as_mut() {
            sim.set_action(action, down);
        }
    }

    /// One frame: honour an exit request, tick the run, then age pending signals.
    pub fn frame(&mut self, host: &mut dyn RunHost) {
        if self.exit_requested {
            self.stop(host);
        }
        if let Some(sim) = self.sim.as_mut() {
            if let Some(terminal) = sim.tick() {
                let timing = &sim.config().timing;
                let (signal, delay) = match terminal {
                    Terminal::Won => (RunSignal::Win, timing.win_delay_ms),
                    Terminal::Died => (RunSignal::Death, timing.death_delay_ms),
                };
                info!(
                    "[Tileplay] Run ended: {:?} with score {} at frame {}",
                    terminal,
                    sim.world().score,
                    sim.world().frame
                );
                self.pending.push(PendingSignal {
                    signal,
                    remaining_ms: delay,
                });
            }
        }
        self.advance(FRAME_MS, host);
    }

    /// Ages delayed signals by `dt_ms` and delivers the ones that are due.
    /// Runs whether or not the run has been torn down.
    pub fn advance(&mut self, dt_ms: f32, host: &mut dyn RunHost) {
        let mut due = Vec::new();
        self.pending.retain_mut(|p| {
            p.remaining_ms -= dt_ms;
            if p.remaining_ms <= 0.0 {
                due.push(p.signal);
                false
            } else {
                true
            }
        });
        for signal in due {
            if self.delivered.claim(signal) {
                deliver(host, signal);
            }
        }
    }

    /// Tears the run down. Safe to call any number of times.
    pub fn stop(&mut self, host: &mut dyn RunHost) {
        self.exit_requested = false;
        if self.sim.take().is_some() {
            info!("[Tileplay] Run stopped");
        }
        if self.delivered.claim(RunSignal::Stop) {
            host.on_stop();
        }
    }

    pub fn render(&self, viewport: Viewport) -> Option<Frame> {
        self.sim.as_ref().map(|sim| build_frame(sim, viewport))
    }
}

/// Collects signals so Bevy systems can forward them as events.
#[derive(Default)]
pub struct SignalOutbox(pub Vec<RunSignal>);

impl RunHost for SignalOutbox {
    fn on_stop(&mut self) {
        self.0.push(RunSignal::Stop);
    }

    fn on_win(&mut self) {
        self.0.push(RunSignal::Win);
    }

    fn on_death(&mut self) {
        self.0.push(RunSignal::Death);
    }
}

#[derive(Resource)]
pub struct MapSource(pub Arc<GameMap>);

#[derive(Resource)]
pub struct ActiveRun(pub GameLoop);

pub struct RuntimePlugin;

impl Plugin for RuntimePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<RunSignal>()
            .add_systems(Startup, start_run)
            .add_systems(FixedUpdate, drive_run.run_if(resource_exists::<ActiveRun>))
            .add_systems(Update, handle_run_signals.run_if(resource_exists::<ActiveRun>));
    }
}

fn start_run(mut commands: Commands, map: Res<MapSource>, config: Res<PlayConfig>) {
    commands.insert_resource(ActiveRun(GameLoop::start(map.0.clone(), config.clone())));
}

fn drive_run(
    mut run: ResMut<ActiveRun>,
    queue: Option<ResMut<InputQueue>>,
    mut signals: EventWriter<RunSignal>,
) {
    if let Some(mut queue) = queue {
        for (action, down) in queue.transitions.drain(..) {
            run.0.set_action(action, down);
        }
    }
    let mut outbox = SignalOutbox::default();
    run.0.frame(&mut outbox);
    for signal in outbox.0 {
        signals.send(signal);
    }
}

fn handle_run_signals(
    mut signals: EventReader<RunSignal>,
    mut run: ResMut<ActiveRun>,
    map: Res<MapSource>,
    config: Res<PlayConfig>,
    mut exit: EventWriter<AppExit>,
) {
    for signal in signals.read() {
        match signal {
            RunSignal::Stop => {
                info!("[Tileplay] Exit requested");
                exit.send(AppExit::Success);
            }
            RunSignal::Win | RunSignal::Death => {
                if config.restart_on_end {
                    info!("[Tileplay] {:?}; restarting", signal);
                    run.0 = GameLoop::start(map.0.clone(), config.clone());
                } else {
                    info!("[Tileplay] {:?}; leaving play mode", signal);
                    exit.send(AppExit::Success);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{EntityKind, Placement, TileKind};

    #[derive(Default)]
    struct CountingHost {
        stops: u32,
        wins: u32,
        deaths: u32,
    }

    impl RunHost for CountingHost {
        fn on_stop(&mut self) {
            self.stops += 1;
        }

        fn on_win(&mut self) {
            self.wins += 1;
        }

        fn on_death(&mut self) {
            self.deaths += 1;
        }
    }

    fn portal_map() -> Arc<GameMap> {
        let mut map = GameMap::new(3, 3, 32.0);
        map.layers[0].fill_row(2, 0..3, TileKind::Ground);
        map.layers[0].entities = vec![
            Placement::new(EntityKind::Player, 0.0, 0.0),
            Placement::new(EntityKind::Portal, 64.0, 0.0),
        ];
        Arc::new(map)
    }

    fn lava_map() -> Arc<GameMap> {
        let mut map = GameMap::new(3, 3, 32.0);
        map.layers[0].fill_row(2, 0..3, TileKind::Lava);
        map.layers[0].entities = vec![Placement::new(EntityKind::Player, 0.0, 36.0)];
        Arc::new(map)
    }

    #[test]
    fn win_fires_once_after_delay() {
        let mut game = GameLoop::start(portal_map(), PlayConfig::default());
        let mut host = CountingHost::default();
        game.set_action(Action::MoveRight, true);

        let mut frames = 0;
        while !game.has_pending_signals() {
            game.frame(&mut host);
            frames += 1;
            assert!(frames < 120, "never reached the portal");
        }
        assert_eq!(host.wins, 0, "win is delayed");

        // 1000 ms at 60 fps is 60 frames.
        for _ in 0..61 {
            game.frame(&mut host);
        }
        assert_eq!(host.wins, 1);
        assert_eq!(host.deaths, 0);
        assert_eq!(host.stops, 0);

        for _ in 0..120 {
            game.frame(&mut host);
        }
        assert_eq!(host.wins, 1);
    }

    #[test]
    fn death_signal_survives_stop() {
        let mut game = GameLoop::start(lava_map(), PlayConfig::default());
        let mut host = CountingHost::default();
        game.frame(&mut host);
        assert!(game.has_pending_signals());

        game.stop(&mut host);
        assert!(!game.is_running());
        assert_eq!(host.stops, 1);

        game.advance(250.0, &mut host);
        assert_eq!(host.deaths, 0);
        game.advance(250.0, &mut host);
        assert_eq!(host.deaths, 1);
        game.advance(1000.0, &mut host);
        assert_eq!(host.deaths, 1);
    }

    #[test]
    fn stop_is_idempotent_after_game_over() {
        let mut game = GameLoop::start(lava_map(), PlayConfig::default());
        let mut host = CountingHost::default();
        for _ in 0..40 {
            game.frame(&mut host);
        }
        assert_eq!(host.deaths, 1);

        game.stop(&mut host);
        game.stop(&mut host);
        game.set_action(Action::Exit, true);
        game.frame(&mut host);
        assert_eq!(host.stops, 1);
        assert_eq!(host.deaths, 1);
        assert_eq!(host.wins, 0);
        assert!(game.render(Viewport::default()).is_none());
    }

    #[test]
    fn exit_action_stops_before_next_tick() {
        let mut game = GameLoop::start(portal_map(), PlayConfig::default());
        let mut host = CountingHost::default();
        game.frame(&mut host);
        let frame_before = game.simulation().map(|s| s.world().frame);
        assert_eq!(frame_before, Some(1));

        game.set_action(Action::Exit, true);
        game.frame(&mut host);
        assert!(game.simulation().is_none());
        assert_eq!(host.stops, 1);
    }

    #[test]
    fn runtime_systems_drive_run_and_forward_exit() {
        let mut app = App::new();
        app.add_event::<RunSignal>()
            .add_event::<AppExit>()
            .insert_resource(PlayConfig::default())
            .insert_resource(InputQueue::default())
            .insert_resource(ActiveRun(GameLoop::start(
                portal_map(),
                PlayConfig::default(),
            )))
            .insert_resource(MapSource(portal_map()))
            .add_systems(Update, (drive_run, handle_run_signals).chain());

        app.update();
        app.update();
        let frame = app
            .world()
            .resource::<ActiveRun>()
            .0
            .simulation()
            .map(|s| s.world().frame);
        assert_eq!(frame, Some(2));

        app.world_mut()
            .resource_mut::<InputQueue>()
            .transitions
            .push((Action::Exit, true));
        app.update();

        assert!(!app.world().resource::<ActiveRun>().0.is_running());
        let exits = app.world().resource::<Events<AppExit>>();
        assert_eq!(exits.len(), 1);
    }
}
