// 쉐이더(src/shaders/path_trace.wgsl)의 uniform 구조체와 바이트 단위로 똑같아야 함.
// vec3 뒤에는 언제나 4바이트짜리 값 하나가 붙어서 16바이트 정렬을 맞춤.

use bytemuck::{Pod, Zeroable};

use crate::tracer::camera::RayBasis;
use crate::tracer::packer::PackedScene;
use crate::tracer::scene::MAX_OBJECTS;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuSphere {
    pub center: [f32; 3],
    pub radius: f32,
    pub color: [f32; 3],
    pub material: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuCuboid {
    pub center: [f32; 3],
    pub material: i32,
    pub size: [f32; 3],
    pub _pad0: f32,
    pub color: [f32; 3],
    pub _pad1: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuTriangle {
    pub v0: [f32; 3],
    pub material: i32,
    pub v1: [f32; 3],
    pub _pad0: f32,
    pub v2: [f32; 3],
    pub _pad1: f32,
    pub color: [f32; 3],
    pub _pad2: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuGround {
    pub position: [f32; 3],
    pub material: i32,
    pub normal: [f32; 3],
    pub texture_scale: f32,
    pub color: [f32; 3],
    // 0이면 텍스쳐 없음
    pub has_texture: u32,
    pub size: [f32; 2],
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneUniform {
    pub sphere_count: u32,
    pub cuboid_count: u32,
    pub triangle_count: u32,
    pub _pad: u32,
    pub ground: GpuGround,
    pub spheres: [GpuSphere; MAX_OBJECTS],
    pub cuboids: [GpuCuboid; MAX_OBJECTS],
    pub triangles: [GpuTriangle; MAX_OBJECTS],
}

fn vec3_at(values: &[f32], index: usize) -> [f32; 3] {
    [values[index * 3], values[index * 3 + 1], values[index * 3 + 2]]
}

// 평평한 배열 -> GPU 레이아웃. 패딩 칸(0)도 그대로 옮겨서 count 뒤는 언제나 0임.
impl From<&PackedScene> for SceneUniform {
    fn from(packed: &PackedScene) -> Self {
        let mut uniform = SceneUniform::zeroed();

        uniform.sphere_count = packed.sphere_count;
        uniform.cuboid_count = packed.cuboid_count;
        uniform.triangle_count = packed.triangle_count;

        for (i, sphere) in uniform.spheres.iter_mut().enumerate() {
            *sphere = GpuSphere {
                center: vec3_at(&packed.sphere_centers, i),
                radius: packed.sphere_radii[i],
                color: vec3_at(&packed.sphere_colors, i),
                material: packed.sphere_materials[i],
            };
        }

        for (i, cuboid) in uniform.cuboids.iter_mut().enumerate() {
            *cuboid = GpuCuboid {
                center: vec3_at(&packed.cuboid_centers, i),
                material: packed.cuboid_materials[i],
                size: vec3_at(&packed.cuboid_sizes, i),
                color: vec3_at(&packed.cuboid_colors, i),
                ..GpuCuboid::zeroed()
            };
        }

        for (i, triangle) in uniform.triangles.iter_mut().enumerate() {
            *triangle = GpuTriangle {
                v0: vec3_at(&packed.triangle_vertices, i * 3),
                v1: vec3_at(&packed.triangle_vertices, i * 3 + 1),
                v2: vec3_at(&packed.triangle_vertices, i * 3 + 2),
                material: packed.triangle_materials[i],
                color: vec3_at(&packed.triangle_colors, i),
                ..GpuTriangle::zeroed()
            };
        }

        uniform.ground = GpuGround {
            position: packed.ground_position,
            material: packed.ground_material,
            normal: packed.ground_normal,
            texture_scale: packed.ground_texture_scale,
            color: packed.ground_color,
            has_texture: u32::from(packed.ground_texture.is_some()),
            size: packed.ground_size,
            _pad: [0.0; 2],
        };

        uniform
    }
}

/// 매 프레임 바뀌는 값들. 카메라 기저, 난수, 샘플 번호.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub origin: [f32; 3],
    pub aspect: f32,
    pub lower_left_corner: [f32; 3],
    pub iteration: f32,
    pub horizontal: [f32; 3],
    pub glass_ior: f32,
    pub vertical: [f32; 3],
    pub _pad0: f32,
    pub random: [f32; 3],
    pub _pad1: f32,
    pub screen_size_inv: [f32; 2],
    pub _pad2: [f32; 2],
}

impl FrameUniform {
    pub fn new(basis: &RayBasis, aspect: f32, iteration: u32, random: [f32; 3], screen_size_inv: [f32; 2], glass_ior: f32) -> Self {
        Self {
            origin: basis.origin.coords.into(),
            aspect,
            lower_left_corner: basis.lower_left_corner.coords.into(),
            iteration: iteration as f32,
            horizontal: basis.horizontal.into(),
            glass_ior,
            vertical: basis.vertical.into(),
            random,
            screen_size_inv,
            ..Self::zeroed()
        }
    }
}

// 두 번째 패스에서 누적 버퍼를 나눌 값
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PresentUniform {
    pub sample_count: f32,
    pub _pad: [f32; 3],
}

impl PresentUniform {
    pub fn new(sample_count: u32) -> Self {
        Self {
            sample_count: sample_count as f32,
            _pad: [0.0; 3],
        }
    }
}
