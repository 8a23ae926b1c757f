//! Keyboard and mouse state fed explicitly by the window's event handler.
//!
//! The application owns one `InputState` and passes it every winit event the
//! overlay did not consume; nothing here is global.

use std::collections::HashSet;

use winit::{
    event::{DeviceEvent, ElementState, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::camera::CameraInput;

/// Discrete requests triggered by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// Zero-based index into the level catalog.
    SwitchLevel(usize),
    ToggleOverlay,
}

#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    looking: bool,
    mouse_delta: (f32, f32),
}

fn axis(positive: bool, negative: bool) -> f32 {
    (positive as i32 - negative as i32) as f32
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> Option<InputAction> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return None;
                };
                self.handle_key(code, event.state, event.repeat)
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Right,
                ..
            } => {
                self.looking = *state == ElementState::Pressed;
                None
            }
            WindowEvent::Focused(false) => {
                self.held.clear();
                self.looking = false;
                None
            }
            _ => None,
        }
    }

    pub fn handle_key(
        &mut self,
        code: KeyCode,
        state: ElementState,
        repeat: bool,
    ) -> Option<InputAction> {
        match state {
            ElementState::Released => {
                self.held.remove(&code);
                None
            }
            ElementState::Pressed => {
                self.held.insert(code);
                if repeat {
                    return None;
                }
                match code {
                    KeyCode::F1 => Some(InputAction::ToggleOverlay),
                    other => level_hotkey(other).map(InputAction::SwitchLevel),
                }
            }
        }
    }

    /// Raw mouse motion only turns the camera while the right button is held.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.looking {
                self.mouse_delta.0 += *dx as f32;
                self.mouse_delta.1 += *dy as f32;
            }
        }
    }

    /// Movement for this frame. The accumulated mouse delta is consumed.
    pub fn take_camera_input(&mut self) -> CameraInput {
        let (mouse_dx, mouse_dy) = std::mem::take(&mut self.mouse_delta);
        CameraInput {
            forward: axis(self.is_held(KeyCode::KeyW), self.is_held(KeyCode::KeyS)),
            strafe: axis(self.is_held(KeyCode::KeyD), self.is_held(KeyCode::KeyA)),
            vertical: axis(self.is_held(KeyCode::Space), self.is_held(KeyCode::ShiftLeft)),
            mouse_dx,
            mouse_dy,
        }
    }
}

fn level_hotkey(code: KeyCode) -> Option<usize> {
    let index = match code {
        KeyCode::Digit1 => 0,
        KeyCode::Digit2 => 1,
        KeyCode::Digit3 => 2,
        KeyCode::Digit4 => 3,
        KeyCode::Digit5 => 4,
        KeyCode::Digit6 => 5,
        KeyCode::Digit7 => 6,
        KeyCode::Digit8 => 7,
        KeyCode::Digit9 => 8,
        _ => return None,
    };
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposing_keys_cancel() {
        let mut input = InputState::new();
        input.handle_key(KeyCode::KeyW, ElementState::Pressed, false);
        input.handle_key(KeyCode::KeyS, ElementState::Pressed, false);
        input.handle_key(KeyCode::KeyD, ElementState::Pressed, false);
        let cam = input.take_camera_input();
        assert_eq!(cam.forward, 0.0);
        assert_eq!(cam.strafe, 1.0);
    }

    #[test]
    fn digits_switch_levels_once_per_press() {
        let mut input = InputState::new();
        assert_eq!(
            input.handle_key(KeyCode::Digit2, ElementState::Pressed, false),
            Some(InputAction::SwitchLevel(1))
        );
        assert_eq!(input.handle_key(KeyCode::Digit2, ElementState::Pressed, true), None);
        assert_eq!(input.handle_key(KeyCode::Digit2, ElementState::Released, false), None);
    }

    #[test]
    fn mouse_motion_needs_right_button() {
        let mut input = InputState::new();
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (5.0, 3.0) });
        assert_eq!(input.take_camera_input().mouse_dx, 0.0);

        input.looking = true;
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (5.0, 3.0) });
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (1.0, 1.0) });
        let cam = input.take_camera_input();
        assert_eq!((cam.mouse_dx, cam.mouse_dy), (6.0, 4.0));
        assert_eq!(input.take_camera_input().mouse_dx, 0.0);
    }
}
