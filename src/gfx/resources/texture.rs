//! # Textures
//!
//! CPU-side texture state shared between materials and the renderer.
//!
//! A [`Texture`] is a cheap clonable handle. Pixel data either arrives up
//! front ([`Texture::from_pixels`]) or through a [`PendingPixels`] receiver that
//! the render loop polls each frame. Until the data resolves, the texture
//! uploads as a 1x1 image of its default color.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};

use crate::gfx::math::Color;

macro_rules! gl_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $value:expr),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u32", into = "u32")]
        pub enum $name {
            $($variant),+
        }

        impl TryFrom<u32> for $name {
            type Error = String;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!("invalid {} value {:#x}", stringify!($name), other)),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                match value {
                    $($name::$variant => $value,)+
                }
            }
        }
    };
}

gl_enum! {
    /// Texture coordinate wrapping.
    WrapMode {
        ClampToEdge = 0x812F,
        Repeat = 0x2901,
        MirroredRepeat = 0x8370,
    }
}

gl_enum! {
    MagFilter {
        Nearest = 0x2600,
        Linear = 0x2601,
    }
}

gl_enum! {
    MinFilter {
        Nearest = 0x2600,
        Linear = 0x2601,
        NearestMipmapNearest = 0x2700,
        LinearMipmapNearest = 0x2701,
        NearestMipmapLinear = 0x2702,
        LinearMipmapLinear = 0x2703,
    }
}

gl_enum! {
    /// Channel layout of the source pixel data.
    ImageFormat {
        Rgba = 0x1908,
        Rgb = 0x1907,
        LuminanceAlpha = 0x190A,
        Luminance = 0x1909,
    }
}

gl_enum! {
    /// Storage type of the source pixel data.
    ImageType {
        UnsignedByte = 0x1401,
        UnsignedShort4444 = 0x8033,
        UnsignedShort5551 = 0x8034,
        UnsignedShort565 = 0x8363,
    }
}

impl MinFilter {
    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, MinFilter::Nearest | MinFilter::Linear)
    }
}

/// Decoded pixels delivered by an asynchronous loader.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Receiving end of an in-flight texture load.
pub type PendingPixels = oneshot::Receiver<Result<PixelData, String>>;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Pending,
    Loaded,
    Failed(String),
}

/// Everything the backend needs to create one GPU texture. Pixels are always
/// tightly packed RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureUpload {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub generate_mipmaps: bool,
}

pub struct TextureState {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub format: ImageFormat,
    pub image_type: ImageType,
    pub default_color: Color,
    width: u32,
    height: u32,
    data: Option<Vec<u8>>,
    load_state: LoadState,
    pending: Option<PendingPixels>,
    needs_upload: bool,
    source_key: String,
}

impl TextureState {
    fn new(source_key: String) -> Self {
        Self {
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            min_filter: MinFilter::Nearest,
            mag_filter: MagFilter::Nearest,
            format: ImageFormat::Rgba,
            image_type: ImageType::UnsignedByte,
            default_color: Color::WHITE,
            width: 0,
            height: 0,
            data: None,
            load_state: LoadState::Pending,
            pending: None,
            needs_upload: true,
            source_key,
        }
    }
}

/// Shared handle to a texture. Clones refer to the same state.
#[derive(Clone)]
pub struct Texture(Rc<RefCell<TextureState>>);

impl Texture {
    /// Creates an empty texture that renders as its default color.
    pub fn new(source_key: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(TextureState::new(source_key.into()))))
    }

    /// Creates a texture from raw pixels, immediately loaded.
    pub fn from_pixels(source_key: impl Into<String>, data: Vec<u8>, width: u32, height: u32) -> Self {
        let texture = Self::new(source_key);
        texture.set_data(data, width, height);
        texture
    }

    /// Creates a texture whose pixels arrive later through `pending`.
    pub fn from_pending(source_key: impl Into<String>, pending: PendingPixels) -> Self {
        let texture = Self::new(source_key);
        texture.0.borrow_mut().pending = Some(pending);
        texture
    }

    /// Creates a pending texture along with the sender a loader completes.
    pub fn loading(source_key: impl Into<String>) -> (Self, oneshot::Sender<Result<PixelData, String>>) {
        let (sender, receiver) = oneshot::channel();
        (Self::from_pending(source_key, receiver), sender)
    }

    pub fn with_wrap(self, wrap_s: WrapMode, wrap_t: WrapMode) -> Self {
        {
            let mut state = self.0.borrow_mut();
            state.wrap_s = wrap_s;
            state.wrap_t = wrap_t;
            state.needs_upload = true;
        }
        self
    }

    pub fn with_filters(self, min_filter: MinFilter, mag_filter: MagFilter) -> Self {
        {
            let mut state = self.0.borrow_mut();
            state.min_filter = min_filter;
            state.mag_filter = mag_filter;
            state.needs_upload = true;
        }
        self
    }

    pub fn with_format(self, format: ImageFormat, image_type: ImageType) -> Self {
        {
            let mut state = self.0.borrow_mut();
            state.format = format;
            state.image_type = image_type;
            state.needs_upload = true;
        }
        self
    }

    pub fn with_default_color(self, color: Color) -> Self {
        {
            let mut state = self.0.borrow_mut();
            state.default_color = color;
            state.needs_upload = true;
        }
        self
    }

    /// Replaces the pixel data and marks the texture for re-upload.
    pub fn set_data(&self, data: Vec<u8>, width: u32, height: u32) {
        let mut state = self.0.borrow_mut();
        state.data = Some(data);
        state.width = width;
        state.height = height;
        state.load_state = LoadState::Loaded;
        state.pending = None;
        state.needs_upload = true;
    }

    /// Checks an in-flight load without blocking.
    ///
    /// # Returns
    /// `true` if the load resolved (successfully or not) during this call
    pub fn poll_load(&self) -> bool {
        let mut state = self.0.borrow_mut();
        let Some(pending) = state.pending.as_mut() else {
            return false;
        };

        match pending.try_recv() {
            Ok(None) => false,
            Ok(Some(Ok(pixels))) => {
                log::debug!(
                    "Texture '{}' loaded ({}x{})",
                    state.source_key,
                    pixels.width,
                    pixels.height
                );
                state.data = Some(pixels.data);
                state.width = pixels.width;
                state.height = pixels.height;
                state.load_state = LoadState::Loaded;
                state.pending = None;
                state.needs_upload = true;
                true
            }
            Ok(Some(Err(message))) => {
                log::warn!("Texture '{}' failed to load: {}", state.source_key, message);
                state.load_state = LoadState::Failed(message);
                state.pending = None;
                true
            }
            Err(oneshot::Canceled) => {
                log::warn!("Texture '{}' loader was dropped", state.source_key);
                state.load_state = LoadState::Failed("loader dropped".to_string());
                state.pending = None;
                true
            }
        }
    }

    pub fn state(&self) -> Ref<'_, TextureState> {
        self.0.borrow()
    }

    pub fn load_state(&self) -> LoadState {
        self.0.borrow().load_state.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.0.borrow().data.is_some()
    }

    pub fn needs_upload(&self) -> bool {
        self.0.borrow().needs_upload
    }

    pub fn mark_uploaded(&self) {
        self.0.borrow_mut().needs_upload = false;
    }

    pub fn source_key(&self) -> String {
        self.0.borrow().source_key.clone()
    }

    pub fn width(&self) -> u32 {
        self.0.borrow().width
    }

    pub fn height(&self) -> u32 {
        self.0.borrow().height
    }

    pub fn uses_mipmaps(&self) -> bool {
        self.0.borrow().min_filter.uses_mipmaps()
    }

    pub fn ptr_eq(&self, other: &Texture) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Builds the RGBA8 image the backend should upload.
    ///
    /// Loaded data is expanded to RGBA8 and resampled to the next power of two
    /// when either side is not one. An unloaded texture, or one whose data does
    /// not match its declared size, yields a 1x1 image of the default color.
    pub fn upload_pixels(&self) -> TextureUpload {
        let state = self.0.borrow();
        let mut upload = TextureUpload {
            label: state.source_key.clone(),
            width: 1,
            height: 1,
            pixels: state.default_color.to_rgba8().to_vec(),
            wrap_s: state.wrap_s,
            wrap_t: state.wrap_t,
            min_filter: state.min_filter,
            mag_filter: state.mag_filter,
            generate_mipmaps: state.min_filter.uses_mipmaps(),
        };

        let Some(data) = state.data.as_deref() else {
            return upload;
        };
        if state.width == 0 || state.height == 0 {
            return upload;
        }
        let Some(rgba) = expand_to_rgba8(data, state.width, state.height, state.format, state.image_type)
        else {
            log::warn!(
                "Texture '{}' data length {} does not match {}x{} {:?}/{:?}, using fallback color",
                state.source_key,
                data.len(),
                state.width,
                state.height,
                state.format,
                state.image_type
            );
            return upload;
        };

        let width = state.width.next_power_of_two();
        let height = state.height.next_power_of_two();
        upload.pixels = if width != state.width || height != state.height {
            log::debug!(
                "Resizing texture '{}' from {}x{} to {}x{}",
                state.source_key,
                state.width,
                state.height,
                width,
                height
            );
            resample_nearest(&rgba, state.width, state.height, width, height)
        } else {
            rgba
        };
        upload.width = width;
        upload.height = height;
        upload
    }

    pub fn to_record(&self) -> TextureRecord {
        let state = self.0.borrow();
        TextureRecord {
            wrap_s: state.wrap_s,
            wrap_t: state.wrap_t,
            min_filter: state.min_filter,
            mag_filter: state.mag_filter,
            format: state.format,
            image_type: state.image_type,
            default_color: state.default_color.to_array(),
            width: state.width,
            height: state.height,
            data: state.data.clone(),
        }
    }

    pub fn from_record(record: &TextureRecord, source_key: impl Into<String>) -> Self {
        let texture = Self::new(source_key);
        {
            let mut state = texture.0.borrow_mut();
            state.wrap_s = record.wrap_s;
            state.wrap_t = record.wrap_t;
            state.min_filter = record.min_filter;
            state.mag_filter = record.mag_filter;
            state.format = record.format;
            state.image_type = record.image_type;
            state.default_color = Color::from(record.default_color);
            state.width = record.width;
            state.height = record.height;
        }
        if let Some(data) = &record.data {
            texture.set_data(data.clone(), record.width, record.height);
        }
        texture
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("Texture")
            .field("source_key", &state.source_key)
            .field("width", &state.width)
            .field("height", &state.height)
            .field("load_state", &state.load_state)
            .finish()
    }
}

fn expand_to_rgba8(
    data: &[u8],
    width: u32,
    height: u32,
    format: ImageFormat,
    image_type: ImageType,
) -> Option<Vec<u8>> {
    let pixel_count = width as usize * height as usize;

    if image_type != ImageType::UnsignedByte {
        if data.len() != pixel_count * 2 {
            return None;
        }
        return Some(
            data.chunks_exact(2)
                .flat_map(|c| unpack_short(u16::from_le_bytes([c[0], c[1]]), image_type))
                .collect(),
        );
    }

    let channels = match format {
        ImageFormat::Rgba => 4,
        ImageFormat::Rgb => 3,
        ImageFormat::LuminanceAlpha => 2,
        ImageFormat::Luminance => 1,
    };
    if data.len() != pixel_count * channels {
        return None;
    }
    Some(
        data.chunks_exact(channels)
            .flat_map(|c| match format {
                ImageFormat::Rgba => [c[0], c[1], c[2], c[3]],
                ImageFormat::Rgb => [c[0], c[1], c[2], 255],
                ImageFormat::LuminanceAlpha => [c[0], c[0], c[0], c[1]],
                ImageFormat::Luminance => [c[0], c[0], c[0], 255],
            })
            .collect(),
    )
}

fn unpack_short(value: u16, image_type: ImageType) -> [u8; 4] {
    let scale = |v: u16, bits: u32| ((v as u32 * 255) / ((1 << bits) - 1)) as u8;
    match image_type {
        ImageType::UnsignedShort4444 => [
            scale(value >> 12, 4),
            scale((value >> 8) & 0xF, 4),
            scale((value >> 4) & 0xF, 4),
            scale(value & 0xF, 4),
        ],
        ImageType::UnsignedShort5551 => [
            scale(value >> 11, 5),
            scale((value >> 6) & 0x1F, 5),
            scale((value >> 1) & 0x1F, 5),
            scale(value & 0x1, 1),
        ],
        ImageType::UnsignedShort565 => [
            scale(value >> 11, 5),
            scale((value >> 5) & 0x3F, 6),
            scale(value & 0x1F, 5),
            255,
        ],
        ImageType::UnsignedByte => [0, 0, 0, 255],
    }
}

fn resample_nearest(rgba: &[u8], width: u32, height: u32, new_width: u32, new_height: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(new_width as usize * new_height as usize * 4);
    for y in 0..new_height {
        let src_y = (y as u64 * height as u64 / new_height as u64) as usize;
        for x in 0..new_width {
            let src_x = (x as u64 * width as u64 / new_width as u64) as usize;
            let i = (src_y * width as usize + src_x) * 4;
            out.extend_from_slice(&rgba[i..i + 4]);
        }
    }
    out
}

/// Serialized form of a [`Texture`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureRecord {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub format: ImageFormat,
    #[serde(rename = "type")]
    pub image_type: ImageType,
    pub default_color: [f32; 4],
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let texture = Texture::new("empty");
        let state = texture.state();
        assert_eq!(state.wrap_s, WrapMode::ClampToEdge);
        assert_eq!(state.min_filter, MinFilter::Nearest);
        assert_eq!(state.format, ImageFormat::Rgba);
        assert_eq!(state.image_type, ImageType::UnsignedByte);
        assert_eq!(state.default_color, Color::WHITE);
        drop(state);
        assert_eq!(texture.load_state(), LoadState::Pending);
    }

    #[test]
    fn test_unloaded_texture_uploads_default_color() {
        let texture = Texture::new("fallback").with_default_color(Color::new(1.0, 0.0, 0.0, 1.0));
        let upload = texture.upload_pixels();
        assert_eq!((upload.width, upload.height), (1, 1));
        assert_eq!(upload.pixels, vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_non_power_of_two_is_resized() {
        let texture = Texture::from_pixels("npot", vec![7u8; 3 * 2 * 4], 3, 2);
        let upload = texture.upload_pixels();
        assert_eq!((upload.width, upload.height), (4, 2));
        assert_eq!(upload.pixels.len(), 4 * 2 * 4);
        assert!(upload.pixels.iter().all(|p| *p == 7));
    }

    #[test]
    fn test_rgb_expands_to_rgba() {
        let texture = Texture::from_pixels("rgb", vec![10, 20, 30], 1, 1)
            .with_format(ImageFormat::Rgb, ImageType::UnsignedByte);
        assert_eq!(texture.upload_pixels().pixels, vec![10, 20, 30, 255]);
    }

    #[test]
    fn test_packed_565_unpacks() {
        let white = 0xFFFFu16.to_le_bytes().to_vec();
        let texture = Texture::from_pixels("565", white, 1, 1)
            .with_format(ImageFormat::Rgb, ImageType::UnsignedShort565);
        assert_eq!(texture.upload_pixels().pixels, vec![255, 255, 255, 255]);
    }

    #[test]
    fn test_mismatched_data_falls_back() {
        let texture = Texture::from_pixels("short", vec![1, 2, 3], 2, 2);
        let upload = texture.upload_pixels();
        assert_eq!((upload.width, upload.height), (1, 1));
    }

    #[test]
    fn test_mipmap_filters() {
        let texture = Texture::new("mip").with_filters(MinFilter::LinearMipmapLinear, MagFilter::Linear);
        assert!(texture.uses_mipmaps());
        assert!(texture.upload_pixels().generate_mipmaps);
        assert!(!Texture::new("plain").uses_mipmaps());
    }

    #[test]
    fn test_pending_load_resolves_on_poll() {
        let (texture, sender) = Texture::loading("async");
        assert!(!texture.poll_load());
        assert!(!texture.is_loaded());

        texture.mark_uploaded();
        sender
            .send(Ok(PixelData { data: vec![0, 0, 0, 255], width: 1, height: 1 }))
            .unwrap();

        assert!(texture.poll_load());
        assert_eq!(texture.load_state(), LoadState::Loaded);
        assert!(texture.needs_upload());
        assert_eq!(texture.upload_pixels().pixels, vec![0, 0, 0, 255]);
    }

    #[test]
    fn test_failed_and_dropped_loads() {
        let (texture, sender) = Texture::loading("bad");
        sender.send(Err("decode error".to_string())).unwrap();
        assert!(texture.poll_load());
        assert_eq!(texture.load_state(), LoadState::Failed("decode error".to_string()));

        let (texture, sender) = Texture::loading("dropped");
        drop(sender);
        assert!(texture.poll_load());
        assert!(matches!(texture.load_state(), LoadState::Failed(_)));
        assert_eq!(texture.upload_pixels().width, 1);
    }

    #[test]
    fn test_clones_share_state() {
        let a = Texture::new("shared");
        let b = a.clone();
        a.set_data(vec![1, 2, 3, 4], 1, 1);
        assert!(b.is_loaded());
        assert_eq!(a, b);
        assert_ne!(a, Texture::new("shared"));
    }

    #[test]
    fn test_record_uses_gl_numbers() {
        let texture = Texture::from_pixels("rec", vec![1, 2, 3, 4], 1, 1)
            .with_wrap(WrapMode::Repeat, WrapMode::MirroredRepeat);
        let json = serde_json::to_value(texture.to_record()).unwrap();
        assert_eq!(json["wrapS"], 0x2901);
        assert_eq!(json["wrapT"], 0x8370);
        assert_eq!(json["type"], 0x1401);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3, 4]));

        let record: TextureRecord = serde_json::from_value(json).unwrap();
        let back = Texture::from_record(&record, "rec");
        assert!(back.is_loaded());
        assert_eq!(back.state().wrap_s, WrapMode::Repeat);
    }

    #[test]
    fn test_invalid_gl_enum_is_rejected() {
        assert!(serde_json::from_str::<WrapMode>("12345").is_err());
    }
}
