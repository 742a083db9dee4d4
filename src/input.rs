use std::collections::HashSet;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{KeyBindings, PlayConfig};

/// Semantic actions the simulation understands. Key bindings map onto these.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[serde(alias = "left")]
    MoveLeft,
    #[serde(alias = "right")]
    MoveRight,
    #[serde(alias = "up")]
    Jump,
    Interact,
    Fire,
    Exit,
}

/// Held actions plus edge latches. A press latches once; the latch lasts until
/// a consumer takes it, or until the end of the first tick after release.
#[derive(Default, Clone, Debug)]
pub struct ActionState {
    held: HashSet<Action>,
    latched: HashSet<Action>,
}

impl ActionState {
    pub fn press(&mut self, action: Action) {
        if self.held.insert(action) {
            self.latched.insert(action);
        }
    }

    pub fn release(&mut self, action: Action) {
        self.held.remove(&action);
    }

    pub fn set(&mut self, action: Action, down: bool) {
        if down {
            self.press(action);
        } else {
            self.release(action);
        }
    }

    pub fn held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    pub fn latched(&self, action: Action) -> bool {
        self.latched.contains(&action)
    }

    /// Takes the latch for `action`, returning whether it was set.
    pub fn consume(&mut self, action: Action) -> bool {
        self.latched.remove(&action)
    }

    /// Drops latches whose action is no longer held. Called once per tick.
    pub fn expire_released(&mut self) {
        let held = &self.held;
        self.latched.retain(|a| held.contains(a));
    }
}

/// Press/release transitions captured between ticks, drained by the run driver.
#[derive(Resource, Default)]
pub struct InputQueue {
    pub transitions: Vec<(Action, bool)>,
}

#[derive(Resource, Default)]
pub struct ResolvedBindings {
    pub keys: Vec<(KeyCode, Action)>,
}

impl ResolvedBindings {
    pub fn from_config(bindings: &KeyBindings) -> Self {
        let groups = [
            (&bindings.move_left, Action::MoveLeft),
            (&bindings.move_right, Action::MoveRight),
            (&bindings.jump, Action::Jump),
            (&bindings.interact, Action::Interact),
            (&bindings.fire, Action::Fire),
            (&bindings.exit, Action::Exit),
        ];
        let mut keys = Vec::new();
        for (names, action) in groups {
            for name in names {
                match key_code(name) {
                    Some(code) => keys.push((code, action)),
                    None => warn!("[Tileplay] Unknown key binding '{}' for {:?}", name, action),
                }
            }
        }
        Self { keys }
    }
}

const LETTERS: [(&str, KeyCode); 26] = [
    ("KeyA", KeyCode::KeyA),
    ("KeyB", KeyCode::KeyB),
    ("KeyC", KeyCode::KeyC),
    ("KeyD", KeyCode::KeyD),
    ("KeyE", KeyCode::KeyE),
    ("KeyF", KeyCode::KeyF),
    ("KeyG", KeyCode::KeyG),
    ("KeyH", KeyCode::KeyH),
    ("KeyI", KeyCode::KeyI),
    ("KeyJ", KeyCode::KeyJ),
    ("KeyK", KeyCode::KeyK),
    ("KeyL", KeyCode::KeyL),
    ("KeyM", KeyCode::KeyM),
    ("KeyN", KeyCode::KeyN),
    ("KeyO", KeyCode::KeyO),
    ("KeyP", KeyCode::KeyP),
    ("KeyQ", KeyCode::KeyQ),
    ("KeyR", KeyCode::KeyR),
    ("KeyS", KeyCode::KeyS),
    ("KeyT", KeyCode::KeyT),
    ("KeyU", KeyCode::KeyU),
    ("KeyV", KeyCode::KeyV),
    ("KeyW", KeyCode::KeyW),
    ("KeyX", KeyCode::KeyX),
    ("KeyY", KeyCode::KeyY),
    ("KeyZ", KeyCode::KeyZ),
];

/// Maps a DOM-style key code name ("KeyA", "ArrowLeft", "Space") to a Bevy key.
pub fn key_code(name: &str) -> Option<KeyCode> {
    let code = match name {
        "ArrowLeft" => KeyCode::ArrowLeft,
        "ArrowRight" => KeyCode::ArrowRight,
        "ArrowUp" => KeyCode::ArrowUp,
        "ArrowDown" => KeyCode::ArrowDown,
        "Space" => KeyCode::Space,
        "Escape" => KeyCode::Escape,
        "Enter" => KeyCode::Enter,
        "Tab" => KeyCode::Tab,
        "ShiftLeft" => KeyCode::ShiftLeft,
        "ShiftRight" => KeyCode::ShiftRight,
        "ControlLeft" => KeyCode::ControlLeft,
        "ControlRight" => KeyCode::ControlRight,
        "AltLeft" => KeyCode::AltLeft,
        other => {
            return LETTERS
                .iter()
                .find(|(n, _)| *n == other)
                .map(|(_, code)| *code);
        }
    };
    Some(code)
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(InputQueue::default())
            .add_systems(Startup, resolve_bindings)
            .add_systems(
                PreUpdate,
                (
                    keyboard_to_actions.run_if(resource_exists::<ButtonInput<KeyCode>>),
                    mouse_to_actions.run_if(resource_exists::<ButtonInput<MouseButton>>),
                ),
            );
    }
}

fn resolve_bindings(mut commands: Commands, config: Res<PlayConfig>) {
    commands.insert_resource(ResolvedBindings::from_config(&config.bindings));
}

fn keyboard_to_actions(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Option<Res<ResolvedBindings>>,
    mut queue: ResMut<InputQueue>,
) {
    let Some(bindings) = bindings else {
        return;
    };
    for (code, action) in &bindings.keys {
        if keyboard.just_pressed(*code) {
            queue.transitions.push((*action, true));
        }
        if keyboard.just_released(*code) {
            // Another bound key may still hold the action.
            let still_held = bindings
                .keys
                .iter()
                .any(|(other, a)| a == action && other != code && keyboard.pressed(*other));
            if !still_held {
                queue.transitions.push((*action, false));
            }
        }
    }
}

fn mouse_to_actions(mouse: Res<ButtonInput<MouseButton>>, mut queue: ResMut<InputQueue>) {
    if mouse.just_pressed(MouseButton::Left) {
        queue.transitions.push((Action::Fire, true));
    }
    if mouse.just_released(MouseButton::Left) {
        queue.transitions.push((Action::Fire, false));
    }
}
