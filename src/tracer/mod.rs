use std::path::PathBuf;

use log::{debug, trace};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use winit::dpi::PhysicalSize;

use crate::camera::{CameraSettings, OrbitCamera};
use crate::tracer::camera::build_basis;
use crate::tracer::packer::{pack, PackedScene};
use crate::tracer::scene::Scene;
use crate::tracer::uniforms::{FrameUniform, PresentUniform};
use crate::util::frame_seed;

pub mod camera;
pub mod gpu;
pub mod packer;
pub mod scene;
pub mod texture;
pub mod uniforms;

pub struct Settings {
    // false면 매 프레임 누적을 버리고 샘플 하나만 보여줌
    pub should_accumulate: bool,
    // 세로 시야각, 도 단위
    pub vertical_fov: f32,
    pub glass_ior: f32,
    pub ground_texture: Option<PathBuf>,
    pub camera: CameraSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            should_accumulate: true,
            vertical_fov: 75.0,
            glass_ior: 1.5,
            ground_texture: Some(PathBuf::from("textures/wood.png")),
            camera: CameraSettings::default(),
        }
    }
}

/// 그래픽 API 경계. 덕분에 GPU 없이도 프레임 루프를 시험할 수 있음.
pub trait RenderBackend {
    type Error;

    // 화면 밖 누적 버퍼를 0으로
    fn clear_accumulation(&mut self);

    fn upload_scene(&mut self, scene: &PackedScene);

    fn resize(&mut self, new_size: PhysicalSize<u32>);

    /// 1번 패스: 경로 추적 결과를 누적 버퍼에 더함(additive blending).
    /// 2번 패스: 누적 버퍼를 `present.sample_count`로 나눠서 화면에 그림.
    fn draw(&mut self, frame: &FrameUniform, present: &PresentUniform) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accumulation {
    sample_count: u32,
    seed: [f32; 3],
}

impl Accumulation {
    pub fn new() -> Self {
        Self {
            sample_count: 1,
            seed: [0.0; 3],
        }
    }

    pub fn reset(&mut self) {
        self.sample_count = 1;
    }

    pub fn advance(&mut self) {
        self.sample_count = self.sample_count.saturating_add(1);
    }

    // 다음 프레임을 나눌 값이기도 함
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn seed(&self) -> [f32; 3] {
        self.seed
    }
}

impl Default for Accumulation {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Tracer<B: RenderBackend> {
    backend: B,
    accumulation: Accumulation,
    uploaded: Option<PackedScene>,
    rng: StdRng,
    viewport: PhysicalSize<u32>,
    pub settings: Settings,
}

impl<B: RenderBackend> Tracer<B> {
    pub fn new(backend: B, viewport: PhysicalSize<u32>, settings: Settings) -> Self {
        Self::with_rng(backend, viewport, settings, StdRng::from_entropy())
    }

    pub fn with_rng(backend: B, viewport: PhysicalSize<u32>, settings: Settings, rng: StdRng) -> Self {
        let mut tracer = Self {
            backend,
            accumulation: Accumulation::new(),
            uploaded: None,
            rng,
            viewport,
            settings,
        };

        tracer.reset();
        tracer
    }

    // 장면, 카메라, 화면 크기 중 하나라도 바뀌면 반드시 불러야 함.
    // 안 그러면 서로 다른 상태에서 계산한 프레임이 섞여버림.
    pub fn reset(&mut self) {
        self.accumulation.reset();
        self.backend.clear_accumulation();
        debug!("누적 초기화");
    }

    /// 장면을 다시 펼쳐서 이전에 올린 것과 다르면 올리고 누적을 초기화함.
    ///
    /// 실제로 바뀐 게 있었는지 돌려줌.
    pub fn sync_scene(&mut self, scene: &Scene) -> bool {
        let packed = pack(scene);
        if self.uploaded.as_ref() == Some(&packed) {
            return false;
        }

        self.backend.upload_scene(&packed);
        self.uploaded = Some(packed);
        self.reset();
        true
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.viewport = new_size;
        self.backend.resize(new_size);
        self.reset();
    }

    // 한 프레임. 실패하면 샘플 번호는 그대로라 다음 프레임에 같은 번호로 다시 시도함.
    pub fn update(&mut self, camera: &OrbitCamera) -> Result<(), B::Error> {
        self.accumulation.seed = frame_seed(&mut self.rng);

        let width = self.viewport.width.max(1) as f32;
        let height = self.viewport.height.max(1) as f32;
        let aspect = width / height;

        let basis = build_basis(camera.eye(), camera.target(), Vector3::y(), self.settings.vertical_fov, aspect);
        let sample_count = self.accumulation.sample_count();
        let frame = FrameUniform::new(
            &basis,
            aspect,
            sample_count,
            self.accumulation.seed,
            [1.0 / width, 1.0 / height],
            self.settings.glass_ior,
        );

        self.backend.draw(&frame, &PresentUniform::new(sample_count))?;
        trace!("샘플 {} 출력", sample_count);

        if self.settings.should_accumulate {
            self.accumulation.advance();
        } else {
            self.reset();
        }

        Ok(())
    }

    pub fn sample_count(&self) -> u32 {
        self.accumulation.sample_count()
    }

    pub fn accumulation(&self) -> &Accumulation {
        &self.accumulation
    }

    pub fn viewport(&self) -> PhysicalSize<u32> {
        self.viewport
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tracer::scene::{Material, MAX_OBJECTS};
    use nalgebra::Point3;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Clear,
        Upload(u32, u32, u32),
        Resize(u32, u32),
        Draw { iteration: f32, divisor: f32, random: [f32; 3] },
    }

    // 호출 순서만 기록하는 가짜 백엔드
    #[derive(Default)]
    pub struct Recorder {
        pub calls: Vec<Call>,
        pub fail_next_draw: bool,
    }

    impl RenderBackend for Recorder {
        type Error = &'static str;

        fn clear_accumulation(&mut self) {
            self.calls.push(Call::Clear);
        }

        fn upload_scene(&mut self, scene: &PackedScene) {
            self.calls.push(Call::Upload(scene.sphere_count, scene.cuboid_count, scene.triangle_count));
        }

        fn resize(&mut self, new_size: PhysicalSize<u32>) {
            self.calls.push(Call::Resize(new_size.width, new_size.height));
        }

        fn draw(&mut self, frame: &FrameUniform, present: &PresentUniform) -> Result<(), Self::Error> {
            if std::mem::take(&mut self.fail_next_draw) {
                return Err("surface lost");
            }
            self.calls.push(Call::Draw {
                iteration: frame.iteration,
                divisor: present.sample_count,
                random: frame.random,
            });
            Ok(())
        }
    }

    fn tracer() -> Tracer<Recorder> {
        Tracer::with_rng(
            Recorder::default(),
            PhysicalSize::new(800, 600),
            Settings::default(),
            StdRng::seed_from_u64(42),
        )
    }

    fn divisors(recorder: &Recorder) -> Vec<f32> {
        recorder
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Draw { divisor, .. } => Some(*divisor),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn starts_cleared_at_one() {
        let tracer = tracer();
        assert_eq!(tracer.sample_count(), 1);
        assert_eq!(tracer.backend().calls, vec![Call::Clear]);
    }

    #[test]
    fn counter_grows_by_one_per_tick() {
        let mut tracer = tracer();
        let camera = OrbitCamera::default();

        for expected in 1..=5 {
            assert_eq!(tracer.sample_count(), expected);
            tracer.update(&camera).unwrap();
        }

        assert_eq!(divisors(tracer.backend()), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(tracer.sample_count(), 6);
    }

    #[test]
    fn reset_makes_next_frame_divide_by_one() {
        let mut tracer = tracer();
        let camera = OrbitCamera::default();
        for _ in 0..10 {
            tracer.update(&camera).unwrap();
        }

        tracer.reset();
        assert_eq!(tracer.sample_count(), 1);
        assert_eq!(tracer.backend().calls.last(), Some(&Call::Clear));

        tracer.update(&camera).unwrap();
        assert_eq!(divisors(tracer.backend()).last(), Some(&1.0));
    }

    #[test]
    fn seed_is_redrawn_every_tick() {
        let mut tracer = tracer();
        let camera = OrbitCamera::default();
        tracer.update(&camera).unwrap();
        let first = tracer.accumulation().seed();
        tracer.reset();
        tracer.update(&camera).unwrap();
        let second = tracer.accumulation().seed();

        assert_ne!(first, second);
        assert!(first.iter().chain(second.iter()).all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn failed_draw_does_not_advance() {
        let mut tracer = tracer();
        let camera = OrbitCamera::default();
        tracer.update(&camera).unwrap();

        tracer.backend_mut().fail_next_draw = true;
        assert!(tracer.update(&camera).is_err());
        assert_eq!(tracer.sample_count(), 2);

        tracer.update(&camera).unwrap();
        assert_eq!(divisors(tracer.backend()), vec![1.0, 2.0]);
    }

    #[test]
    fn accumulation_can_be_disabled() {
        let mut tracer = tracer();
        tracer.settings.should_accumulate = false;
        let camera = OrbitCamera::default();

        for _ in 0..3 {
            tracer.update(&camera).unwrap();
        }

        assert_eq!(divisors(tracer.backend()), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn resize_resets_and_ignores_zero_size() {
        let mut tracer = tracer();
        let camera = OrbitCamera::default();
        tracer.update(&camera).unwrap();
        tracer.update(&camera).unwrap();

        tracer.resize(PhysicalSize::new(0, 300));
        assert_eq!(tracer.sample_count(), 3);

        tracer.resize(PhysicalSize::new(1024, 768));
        assert_eq!(tracer.sample_count(), 1);
        assert_eq!(tracer.viewport(), PhysicalSize::new(1024, 768));
        assert_eq!(
            &tracer.backend().calls[tracer.backend().calls.len() - 2..],
            &[Call::Resize(1024, 768), Call::Clear]
        );
    }

    #[test]
    fn unchanged_scene_is_not_uploaded_twice() {
        let mut tracer = tracer();
        let mut scene = Scene::with_default_layout();

        assert!(tracer.sync_scene(&scene));
        tracer.update(&OrbitCamera::default()).unwrap();
        assert!(!tracer.sync_scene(&scene));
        assert_eq!(tracer.sample_count(), 2);

        // 꽉 찬 상태에서 실패한 추가는 아무것도 바꾸지 않음
        while scene.add_sphere(Point3::origin(), 1.0, Vector3::zeros(), Material::Metal) {}
        assert!(tracer.sync_scene(&scene));
        assert_eq!(tracer.backend().calls.iter().filter(|c| matches!(c, Call::Upload(..))).count(), 2);
        assert_eq!(scene.spheres().len(), MAX_OBJECTS);
        assert!(!scene.add_sphere(Point3::origin(), 1.0, Vector3::zeros(), Material::Metal));
        assert!(!tracer.sync_scene(&scene));
    }
}
