use crate::tracer::scene::{Scene, TextureHandle, MAX_OBJECTS};

pub const VEC3_SLOTS: usize = MAX_OBJECTS * 3;
// 삼각형 하나 = 꼭짓점 3개 * 좌표 3개
pub const TRIANGLE_VERTEX_SLOTS: usize = MAX_OBJECTS * 9;

/// 장면을 쉐이더의 고정 크기 배열 모양으로 펼친 것.
///
/// `[0, count)` 구간에는 장면 순서 그대로의 값이, 나머지는 전부 0이 들어감.
/// 장면이 바뀔 때마다 [`pack`]으로 새로 만듦.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedScene {
    pub sphere_count: u32,
    pub sphere_centers: [f32; VEC3_SLOTS],
    pub sphere_radii: [f32; MAX_OBJECTS],
    pub sphere_colors: [f32; VEC3_SLOTS],
    pub sphere_materials: [i32; MAX_OBJECTS],

    pub cuboid_count: u32,
    pub cuboid_centers: [f32; VEC3_SLOTS],
    pub cuboid_sizes: [f32; VEC3_SLOTS],
    pub cuboid_colors: [f32; VEC3_SLOTS],
    pub cuboid_materials: [i32; MAX_OBJECTS],

    pub triangle_count: u32,
    pub triangle_vertices: [f32; TRIANGLE_VERTEX_SLOTS],
    pub triangle_colors: [f32; VEC3_SLOTS],
    pub triangle_materials: [i32; MAX_OBJECTS],

    pub ground_position: [f32; 3],
    pub ground_normal: [f32; 3],
    pub ground_color: [f32; 3],
    pub ground_material: i32,
    pub ground_texture: Option<TextureHandle>,
    pub ground_texture_scale: f32,
    pub ground_size: [f32; 2],
}

// 배열 앞쪽부터 채워 넣는 작은 도우미. 남은 칸은 처음부터 0이라 따로 채울 필요 없음.
struct Filler<'a, T> {
    slots: &'a mut [T],
    cursor: usize,
}

impl<'a, T: Copy> Filler<'a, T> {
    fn new(slots: &'a mut [T]) -> Self {
        Self { slots, cursor: 0 }
    }

    fn push(&mut self, values: &[T]) {
        self.slots[self.cursor..self.cursor + values.len()].copy_from_slice(values);
        self.cursor += values.len();
    }
}

pub fn pack(scene: &Scene) -> PackedScene {
    let mut packed = PackedScene {
        sphere_count: scene.spheres().len() as u32,
        sphere_centers: [0.0; VEC3_SLOTS],
        sphere_radii: [0.0; MAX_OBJECTS],
        sphere_colors: [0.0; VEC3_SLOTS],
        sphere_materials: [0; MAX_OBJECTS],
        cuboid_count: scene.cuboids().len() as u32,
        cuboid_centers: [0.0; VEC3_SLOTS],
        cuboid_sizes: [0.0; VEC3_SLOTS],
        cuboid_colors: [0.0; VEC3_SLOTS],
        cuboid_materials: [0; MAX_OBJECTS],
        triangle_count: scene.triangles().len() as u32,
        triangle_vertices: [0.0; TRIANGLE_VERTEX_SLOTS],
        triangle_colors: [0.0; VEC3_SLOTS],
        triangle_materials: [0; MAX_OBJECTS],
        ground_position: scene.ground.position.coords.into(),
        ground_normal: scene.ground.normal.into(),
        ground_color: scene.ground.color.into(),
        ground_material: scene.ground.material.as_index(),
        ground_texture: scene.ground.texture,
        ground_texture_scale: scene.ground.texture_scale,
        ground_size: scene.ground.size.into(),
    };

    {
        let mut centers = Filler::new(&mut packed.sphere_centers);
        let mut radii = Filler::new(&mut packed.sphere_radii);
        let mut colors = Filler::new(&mut packed.sphere_colors);
        let mut materials = Filler::new(&mut packed.sphere_materials);

        for sphere in scene.spheres() {
            centers.push(sphere.center.coords.as_slice());
            radii.push(&[sphere.radius]);
            // 색은 자르지 않음. 광원은 1.0을 훌쩍 넘는 값을 씀.
            colors.push(sphere.color.as_slice());
            materials.push(&[sphere.material.as_index()]);
        }
    }

    {
        let mut centers = Filler::new(&mut packed.cuboid_centers);
        let mut sizes = Filler::new(&mut packed.cuboid_sizes);
        let mut colors = Filler::new(&mut packed.cuboid_colors);
        let mut materials = Filler::new(&mut packed.cuboid_materials);

        for cuboid in scene.cuboids() {
            centers.push(cuboid.center.coords.as_slice());
            sizes.push(cuboid.size.as_slice());
            colors.push(cuboid.color.as_slice());
            materials.push(&[cuboid.material.as_index()]);
        }
    }

    {
        let mut vertices = Filler::new(&mut packed.triangle_vertices);
        let mut colors = Filler::new(&mut packed.triangle_colors);
        let mut materials = Filler::new(&mut packed.triangle_materials);

        for triangle in scene.triangles() {
            for vertex in &triangle.vertices {
                vertices.push(vertex.coords.as_slice());
            }
            colors.push(triangle.color.as_slice());
            materials.push(&[triangle.material.as_index()]);
        }
    }

    packed
}
