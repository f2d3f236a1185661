use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use thiserror::Error;
use wgpu::{
    AddressMode, Device, Extent3d, FilterMode, ImageCopyTexture, ImageDataLayout, Origin3d, Queue,
    Sampler, SamplerDescriptor, Texture, TextureAspect, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages, TextureView, TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("지원하지 않는 이미지 형식: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("이미지 파일을 열 수 없음: {0}")]
    Io(#[from] std::io::Error),
    #[error("이미지 디코딩 실패: {0}")]
    Decode(#[from] image::ImageError),
    #[cfg(target_arch = "wasm32")]
    #[error("이미지를 받아올 수 없음: {0}")]
    Fetch(String),
}

// 화면 밖 누적 버퍼 포맷. 16비트는 합이 2048을 넘으면 샘플이 더해지지 않음.
// 블렌딩도 필터링도 안되니 쉐이더에서 textureLoad로 읽고 직접 더함
pub const ACCUMULATION_FORMAT: TextureFormat = TextureFormat::Rgba32Float;

pub struct Image {
    pub gpu_texture: Texture,
    pub view: TextureView,
    pub sampler: Sampler,
    pub name: String,
    format: TextureFormat,
    usage: TextureUsages,
}

impl Image {
    // 쉐이더에서 읽기만 하는 sRGB 텍스쳐. 바닥처럼 반복해서 깔 수 있게 Repeat으로 감쌈
    pub fn new(device: &Device, width: u32, height: u32, label: &str) -> Image {
        Self::create(
            device,
            width,
            height,
            label,
            TextureFormat::Rgba8UnormSrgb,
            // Texture Binding: 쉐이더에서 쓸 예정
            // Copy destination: CPU에서 GPU로 데이터가 복사될 예정
            TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        )
    }

    // 경로 추적 결과를 계속 더해 나갈 렌더 타겟
    pub fn accumulation(device: &Device, size: PhysicalSize<u32>, label: &str) -> Image {
        Self::create(
            device,
            size.width,
            size.height,
            label,
            ACCUMULATION_FORMAT,
            TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
        )
    }

    fn create(
        device: &Device,
        width: u32,
        height: u32,
        label: &str,
        format: TextureFormat,
        usage: TextureUsages,
    ) -> Image {
        let gpu_texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1, // 이미지의 레이어 갯수. 단순한 2차원 이미지니 1개로
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });

        let view = gpu_texture.create_view(&TextureViewDescriptor {
            label: Some(&format!("{} view", label)),
            ..Default::default() // label 뺴고 나머진 기본값 그대로
        });

        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some(&format!("{} sampler", label)),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            mag_filter: FilterMode::Linear, // 이미지를 확대해야 할 경우 선형으로 색상을 유추함
            min_filter: FilterMode::Nearest, // 이미지를 축소해야 할 경우 가장 가까운 픽셀의 값을 그대로 사용
            ..Default::default()
        });

        Self {
            gpu_texture,
            view,
            sampler,
            name: label.to_string(),
            format,
            usage,
        }
    }

    pub fn load_image(&mut self, queue: &Queue, rgba: &[u8]) {
        let pixel_count = {
            let size = self.gpu_texture.size();
            size.width * size.height
        } as usize;
        assert_eq!(pixel_count, rgba.len() / 4, "텍스쳐 크기와 픽셀 수가 다름");

        queue.write_texture(
            ImageCopyTexture {
                texture: &self.gpu_texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            rgba,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.gpu_texture.width()),
                rows_per_image: Some(self.gpu_texture.height()),
            },
            self.gpu_texture.size(),
        )
    }

    pub fn from_rgba(device: &Device, queue: &Queue, rgba: &RgbaImage, label: &str) -> Self {
        let mut to_return = Self::new(device, rgba.width(), rgba.height(), label);
        to_return.load_image(queue, rgba);
        to_return
    }

    pub fn resize(&mut self, device: &Device, new_size: PhysicalSize<u32>) {
        if self.gpu_texture.width() == new_size.width
            && self.gpu_texture.height() == new_size.height
        {
            return;
        }

        let new = Self::create(device, new_size.width, new_size.height, &self.name, self.format, self.usage);
        self.sampler = new.sampler;
        self.view = new.view;
        self.gpu_texture = new.gpu_texture;
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.gpu_texture.width(), self.gpu_texture.height())
    }
}

/// 경로의 PNG/JPEG를 읽어 RGBA로 풀어줌. 라벨로 쓸 파일 이름도 같이 돌려줌.
///
/// 네이티브에선 파일 시스템에서, wasm에선 페이지 기준 상대 URL로 fetch해서 읽음.
pub async fn load(path: &Path) -> Result<(RgbaImage, String), TextureError> {
    let format = image_format(path).ok_or_else(|| TextureError::UnsupportedFormat(path.to_path_buf()))?;
    let bytes = read_bytes(path).await?;
    let label = path
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("texture")
        .to_owned();

    Ok((decode(&bytes, format)?, label))
}

#[cfg(not(target_arch = "wasm32"))]
async fn read_bytes(path: &Path) -> Result<Vec<u8>, TextureError> {
    Ok(std::fs::read(path)?)
}

#[cfg(target_arch = "wasm32")]
async fn read_bytes(path: &Path) -> Result<Vec<u8>, TextureError> {
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;

    let url = path.to_string_lossy();
    let fetch_error = |err: JsValue| TextureError::Fetch(format!("{}: {:?}", url, err));

    let window = web_sys::window().ok_or_else(|| TextureError::Fetch("window가 없음".to_owned()))?;
    let response: web_sys::Response = JsFuture::from(window.fetch_with_str(&url))
        .await
        .map_err(fetch_error)?
        .dyn_into()
        .map_err(fetch_error)?;
    if !response.ok() {
        return Err(TextureError::Fetch(format!("{}: HTTP {}", url, response.status())));
    }

    let buffer = JsFuture::from(response.array_buffer().map_err(fetch_error)?)
        .await
        .map_err(fetch_error)?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

fn decode(bytes: &[u8], format: ImageFormat) -> Result<RgbaImage, TextureError> {
    Ok(image::load_from_memory_with_format(bytes, format)?.into_rgba8())
}

fn image_format(path: &Path) -> Option<ImageFormat> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "png" => Some(ImageFormat::Png),
        _ => None,
    }
}
