use nalgebra::{Point3, Rotation3, Vector3};
use winit::dpi::PhysicalPosition;
use winit::event::{
    ElementState, KeyboardInput, MouseButton, MouseScrollDelta, VirtualKeyCode, WindowEvent,
};

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub target: Point3<f32>,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    // 마우스 1픽셀당 회전량(라디안)
    pub orbit_sensitivity: f32,
    // 약 85도. 극점에서 뒤집히는 걸 막음
    pub pitch_limit: f32,
    // 휠 한 칸에 거리를 몇 % 바꿀지
    pub zoom_step: f32,
    // 1ms당 이동 거리
    pub pan_speed: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            target: Point3::new(0.0, 0.3, -1.0),
            distance: 2.0,
            min_distance: 0.5,
            max_distance: 10.0,
            orbit_sensitivity: 0.01,
            pitch_limit: 1.484,
            zoom_step: 0.1,
            pan_speed: 0.1 * 0.05,
        }
    }
}

/// 목표점을 중심으로 도는 3인칭 카메라.
///
/// 여기 있는 값이 바뀌면 누적된 샘플은 더 이상 쓸 수 없으니, 바뀌었다고 알려주는
/// 메서드(`orbit`, `zoom`, `input`, `update`)가 true를 돌려주면 반드시 초기화할 것.
pub struct OrbitCamera {
    target: Point3<f32>,
    yaw: f32,
    pitch: f32,
    distance: f32,

    settings: CameraSettings,

    dragging: bool,
    last_mouse: Option<PhysicalPosition<f64>>,
    inputs: [bool; 6],
    // W A S D Q E
}

impl OrbitCamera {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            target: settings.target,
            yaw: 0.0,
            pitch: 0.0,
            distance: settings.distance.clamp(settings.min_distance, settings.max_distance),
            settings,
            dragging: false,
            last_mouse: None,
            inputs: [false; 6],
        }
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    // 목표점 + 구면 좌표(yaw, pitch, distance)
    pub fn eye(&self) -> Point3<f32> {
        let offset = Vector3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.cos() * self.pitch.cos(),
        );

        self.target + offset * self.distance
    }

    // delta는 (이전 위치 - 현재 위치), 픽셀 단위
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) -> bool {
        let yaw = self.yaw + delta_x * self.settings.orbit_sensitivity;
        let pitch = (self.pitch + delta_y * self.settings.orbit_sensitivity)
            .clamp(-self.settings.pitch_limit, self.settings.pitch_limit);

        let changed = yaw != self.yaw || pitch != self.pitch;
        self.yaw = yaw;
        self.pitch = pitch;
        changed
    }

    // 양수면 가까이, 음수면 멀리
    pub fn zoom(&mut self, steps: f32) -> bool {
        let factor = if steps > 0.0 {
            1.0 - self.settings.zoom_step
        } else if steps < 0.0 {
            1.0 + self.settings.zoom_step
        } else {
            return false;
        };

        let distance = (self.distance * factor).clamp(self.settings.min_distance, self.settings.max_distance);
        let changed = distance != self.distance;
        self.distance = distance;
        changed
    }

    // direction은 카메라 기준(-z가 앞). yaw만큼 돌려서 월드 좌표로 바꿈
    pub fn pan(&mut self, direction: Vector3<f32>, amount: f32) -> bool {
        if direction.norm_squared() == 0.0 || amount == 0.0 {
            return false;
        }

        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), self.yaw);
        self.target += rotation * direction.normalize() * amount;
        true
    }

    pub fn input(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = matches!(state, ElementState::Pressed);
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.last_mouse.replace(*position);
                match previous {
                    Some(previous) if self.dragging => self.orbit(
                        (previous.x - position.x) as f32,
                        (previous.y - position.y) as f32,
                    ),
                    _ => false,
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32,
                };
                self.zoom(steps)
            }
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(key),
                        ..
                    },
                ..
            } => {
                let is_press = matches!(state, ElementState::Pressed);
                match key {
                    VirtualKeyCode::W => self.inputs[0] = is_press,
                    VirtualKeyCode::A => self.inputs[1] = is_press,
                    VirtualKeyCode::S => self.inputs[2] = is_press,
                    VirtualKeyCode::D => self.inputs[3] = is_press,
                    VirtualKeyCode::Q => self.inputs[4] = is_press,
                    VirtualKeyCode::E => self.inputs[5] = is_press,
                    _ => {}
                };

                // 실제 이동은 update에서
                false
            }
            WindowEvent::Focused(false) => {
                self.inputs = [false; 6];
                self.dragging = false;
                false
            }
            _ => false,
        }
    }

    // 눌려 있는 키만큼 목표점을 옮김. frame_time은 ms 단위
    pub fn update(&mut self, frame_time: f32) -> bool {
        let mut direction = Vector3::zeros();

        if self.inputs[0] {
            direction.z -= 1.0;
        }
        if self.inputs[1] {
            direction.x -= 1.0;
        }
        if self.inputs[2] {
            direction.z += 1.0;
        }
        if self.inputs[3] {
            direction.x += 1.0;
        }
        if self.inputs[4] {
            direction.y -= 1.0;
        }
        if self.inputs[5] {
            direction.y += 1.0;
        }

        self.pan(direction, self.settings.pan_speed * frame_time)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(CameraSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn default_eye_sits_behind_target() {
        let camera = OrbitCamera::default();
        assert_relative_eq!(camera.eye(), Point3::new(0.0, 0.3, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn eye_stays_at_distance() {
        let mut camera = OrbitCamera::default();
        camera.orbit(40.0, -25.0);
        assert_relative_eq!((camera.eye() - camera.target()).norm(), camera.distance(), epsilon = 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = OrbitCamera::default();
        assert!(camera.orbit(0.0, 10_000.0));
        assert_eq!(camera.pitch(), 1.484);

        // 이미 한계라 더 올라가지 않음
        assert!(!camera.orbit(0.0, 10.0));
        assert!(camera.orbit(0.0, -10_000.0));
        assert_eq!(camera.pitch(), -1.484);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = OrbitCamera::default();
        assert!(camera.zoom(1.0));
        assert_relative_eq!(camera.distance(), 1.8, epsilon = 1e-6);

        for _ in 0..100 {
            camera.zoom(-1.0);
        }
        assert_eq!(camera.distance(), 10.0);
        assert!(!camera.zoom(-1.0));

        for _ in 0..100 {
            camera.zoom(1.0);
        }
        assert_eq!(camera.distance(), 0.5);
        assert!(!camera.zoom(0.0));
    }

    #[test]
    fn pan_follows_yaw() {
        let mut camera = OrbitCamera::default();
        camera.orbit(std::f32::consts::FRAC_PI_2 / 0.01, 0.0);

        // yaw = 90도면 앞(-z)이 -x가 됨
        assert!(camera.pan(Vector3::new(0.0, 0.0, -1.0), 1.0));
        assert_relative_eq!(camera.target(), Point3::new(-1.0, 0.3, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn idle_update_does_not_move() {
        let mut camera = OrbitCamera::default();
        assert!(!camera.update(16.0));
        assert_eq!(camera.target(), Point3::new(0.0, 0.3, -1.0));
    }
}
