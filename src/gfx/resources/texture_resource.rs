//! GPU texture bundles for the wgpu backend
//!
//! Converts backend-neutral [`TextureUpload`]s into wgpu textures, views and
//! samplers, and creates the depth and color targets the backend renders into.

use super::texture::{MagFilter, MinFilter, TextureUpload, WrapMode};

/// GPU texture resource containing texture, view, and sampler
#[derive(Clone)]
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

fn mag_filter_mode(filter: MagFilter) -> wgpu::FilterMode {
    match filter {
        MagFilter::Nearest => wgpu::FilterMode::Nearest,
        MagFilter::Linear => wgpu::FilterMode::Linear,
    }
}

/// Splits a min filter into (texel filter, mipmap filter).
fn min_filter_modes(filter: MinFilter) -> (wgpu::FilterMode, wgpu::FilterMode) {
    use wgpu::FilterMode::{Linear, Nearest};
    match filter {
        MinFilter::Nearest | MinFilter::NearestMipmapNearest => (Nearest, Nearest),
        MinFilter::Linear | MinFilter::LinearMipmapNearest => (Linear, Nearest),
        MinFilter::NearestMipmapLinear => (Nearest, Linear),
        MinFilter::LinearMipmapLinear => (Linear, Linear),
    }
}

/// Halves an RGBA8 image with a 2x2 box filter. Odd edges repeat the last
/// texel.
fn downsample(pixels: &[u8], width: u32, height: u32) -> (Vec<u8>, u32, u32) {
    let out_w = (width / 2).max(1);
    let out_h = (height / 2).max(1);
    let mut out = Vec::with_capacity((out_w * out_h * 4) as usize);
    for y in 0..out_h {
        for x in 0..out_w {
            for c in 0..4 {
                let mut sum = 0u32;
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let sx = (x * 2 + dx).min(width - 1);
                    let sy = (y * 2 + dy).min(height - 1);
                    sum += pixels[((sy * width + sx) * 4 + c) as usize] as u32;
                }
                out.push((sum / 4) as u8);
            }
        }
    }
    (out, out_w, out_h)
}

/// Full mip chain of an RGBA8 image, level 0 first.
pub fn mip_chain(pixels: &[u8], width: u32, height: u32) -> Vec<(Vec<u8>, u32, u32)> {
    let mut levels = vec![(pixels.to_vec(), width, height)];
    while let Some((data, w, h)) = levels.last() {
        if *w == 1 && *h == 1 {
            break;
        }
        let next = downsample(data, *w, *h);
        levels.push(next);
    }
    levels
}

impl TextureResource {
    /// Standard depth buffer format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Color format of uploaded material textures
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Creates a depth texture of the given size
    ///
    /// # Arguments
    /// * `device` - WGPU device for creating resources
    /// * `width` - Width of the render target in pixels
    /// * `height` - Height of the render target in pixels
    /// * `label` - Debug label for the texture
    pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Creates an offscreen color target that can be copied back to the CPU
    pub fn create_render_target(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor::default());

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Creates a sampled texture from an upload, generating mip levels on the
    /// CPU when the upload asks for them.
    ///
    /// # Arguments
    /// * `device` - WGPU device for creating resources
    /// * `queue` - WGPU queue for uploading data
    /// * `upload` - RGBA8 pixels with wrap and filter settings
    pub fn from_upload(device: &wgpu::Device, queue: &wgpu::Queue, upload: &TextureUpload) -> Self {
        let levels = if upload.generate_mipmaps {
            mip_chain(&upload.pixels, upload.width, upload.height)
        } else {
            vec![(upload.pixels.clone(), upload.width, upload.height)]
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&upload.label),
            size: wgpu::Extent3d {
                width: upload.width,
                height: upload.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, (data, width, height)) in levels.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(*height),
                },
                wgpu::Extent3d {
                    width: *width,
                    height: *height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let (min_filter, mipmap_filter) = min_filter_modes(upload.min_filter);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", upload.label)),
            address_mode_u: address_mode(upload.wrap_s),
            address_mode_v: address_mode(upload.wrap_t),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: mag_filter_mode(upload.mag_filter),
            min_filter,
            mipmap_filter,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_chain_halves_to_one() {
        let pixels = vec![255u8; 8 * 4 * 4];
        let levels = mip_chain(&pixels, 8, 4);
        let sizes: Vec<(u32, u32)> = levels.iter().map(|(_, w, h)| (*w, *h)).collect();
        assert_eq!(sizes, vec![(8, 4), (4, 2), (2, 1), (1, 1)]);
        assert!(levels.iter().all(|(d, w, h)| d.len() == (w * h * 4) as usize));
    }

    #[test]
    fn test_downsample_averages() {
        // 2x2: black, white, white, black
        let pixels = [
            0, 0, 0, 255, 255, 255, 255, 255, //
            255, 255, 255, 255, 0, 0, 0, 255,
        ];
        let (out, w, h) = downsample(&pixels, 2, 2);
        assert_eq!((w, h), (1, 1));
        assert_eq!(out, vec![127, 127, 127, 255]);
    }

    #[test]
    fn test_min_filter_split() {
        assert_eq!(
            min_filter_modes(MinFilter::NearestMipmapLinear),
            (wgpu::FilterMode::Nearest, wgpu::FilterMode::Linear)
        );
        assert_eq!(
            min_filter_modes(MinFilter::Linear),
            (wgpu::FilterMode::Linear, wgpu::FilterMode::Nearest)
        );
    }
}
