use nalgebra::Vector3;
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::Rng;
use std::ops::RangeBounds;

pub fn random_vec<T: SampleUniform, R: RangeBounds<T> + SampleRange<T> + Clone>(
    rng: &mut impl Rng,
    range: R,
) -> Vector3<T> {
    Vector3::new(
        rng.gen_range(range.clone()),
        rng.gen_range(range.clone()),
        rng.gen_range(range),
    )
}

// 쉐이더에 넘길 프레임별 난수 세 개, 각각 [0, 1)
pub fn frame_seed(rng: &mut impl Rng) -> [f32; 3] {
    random_vec(rng, 0.0..1.0f32).into()
}
