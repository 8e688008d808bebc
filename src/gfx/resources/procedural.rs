//! Procedurally generated RGBA8 textures for quick material setups: noise,
//! brick and sine-bump normal maps, and ripple, wave and brick displacement.

use cgmath::{InnerSpace, Vector3};
use rand::Rng;

use super::texture::Texture;

/// Grayscale noise, one random value per texel.
pub fn noise_texture(size: u32, rng: &mut impl Rng) -> Texture {
    let key = format!("noise_{}_{:08x}", size, rng.random::<u32>());
    let mut texels = Vec::with_capacity((size * size * 4) as usize);
    for _ in 0..size * size {
        let value: u8 = rng.random();
        texels.extend_from_slice(&[value, value, value, 255]);
    }
    Texture::from_pixels(key, texels, size, size)
}

/// Tangent-space normal map of a brick wall.
///
/// Mortar lines face straight out; brick edges tilt their normals so the
/// bricks read as bevelled under lighting.
pub fn brick_normal_map(size: u32, brick_width: u32, brick_height: u32) -> Texture {
    let brick_width = brick_width.max(2);
    let brick_height = brick_height.max(2);
    let mut texels = Vec::with_capacity((size * size * 4) as usize);

    for y in 0..size {
        for x in 0..size {
            let bx = x % brick_width;
            let by = y % brick_height;
            let in_mortar = bx == brick_width - 1 || by == brick_height - 1;

            let (nx, ny) = if in_mortar {
                (0.0, 0.0)
            } else if bx == 0 || by == 0 {
                (-0.5, -0.5)
            } else {
                (0.5, 0.5)
            };
            let nz: f32 = (1.0f32 - nx * nx - ny * ny).sqrt();

            let encode = |n: f32| ((n * 0.5 + 0.5) * 255.0).round() as u8;
            texels.extend_from_slice(&[encode(nx), encode(ny), encode(nz), 255]);
        }
    }
    Texture::from_pixels(
        format!("brick_normal_{}_{}x{}", size, brick_width, brick_height),
        texels,
        size,
        size,
    )
}

/// Concentric sine ripples around the texture center, for displacement maps.
///
/// # Arguments
/// * `frequency` - Ripple count across the texture
/// * `amplitude` - Peak height in 0..=1
pub fn ripple_displacement(size: u32, frequency: f32, amplitude: f32) -> Texture {
    let center = size as f32 / 2.0;
    let mut texels = Vec::with_capacity((size * size * 4) as usize);

    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let distance = (dx * dx + dy * dy).sqrt();
            let wave = ((distance * frequency * std::f32::consts::PI / size as f32).sin() + 1.0) / 2.0;
            let value = (wave * amplitude.clamp(0.0, 1.0) * 255.0).round() as u8;
            texels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    Texture::from_pixels(
        format!("ripple_{}_{}_{}", size, frequency, amplitude),
        texels,
        size,
        size,
    )
}

/// Height of the sine bump field sampled by [`bump_normal_map`] and
/// [`wave_displacement`], in 0..=1.
fn wave_height(x: f32, y: f32, frequency: f32) -> f32 {
    ((x * frequency).sin() + (y * frequency).sin()) * 0.25 + 0.5
}

/// Sine bumps along both axes, as grayscale heights for a displacement map.
///
/// # Arguments
/// * `frequency` - Radians advanced per texel along each axis
pub fn wave_displacement(size: u32, frequency: f32) -> Texture {
    let mut texels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let value = (wave_height(x as f32, y as f32, frequency) * 255.0).round() as u8;
            texels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    Texture::from_pixels(format!("wave_{}_{}", size, frequency), texels, size, size)
}

/// Tangent-space normal map of the same sine bumps, with normals taken from
/// the height gradient.
///
/// # Arguments
/// * `frequency` - Radians advanced per texel along each axis
/// * `strength` - Gradient scale; 0 gives a flat map
pub fn bump_normal_map(size: u32, frequency: f32, strength: f32) -> Texture {
    let mut texels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            // d/dx of wave_height
            let dx = 0.25 * frequency * (x as f32 * frequency).cos() * strength;
            let dy = 0.25 * frequency * (y as f32 * frequency).cos() * strength;
            let normal = Vector3::new(-dx, -dy, 1.0).normalize();

            let encode = |n: f32| ((n * 0.5 + 0.5) * 255.0).round() as u8;
            texels.extend_from_slice(&[encode(normal.x), encode(normal.y), encode(normal.z), 255]);
        }
    }
    Texture::from_pixels(
        format!("bump_normal_{}_{}_{}", size, frequency, strength),
        texels,
        size,
        size,
    )
}

/// Displacement map of raised bricks separated by sunken mortar lines.
///
/// # Arguments
/// * `mortar_depth` - Mortar height in 0..=1; bricks sit at 1
pub fn brick_displacement(size: u32, brick_width: u32, brick_height: u32, mortar_depth: f32) -> Texture {
    let brick_width = brick_width.max(2);
    let brick_height = brick_height.max(2);
    let mortar = (mortar_depth.clamp(0.0, 1.0) * 255.0).round() as u8;
    let mut texels = Vec::with_capacity((size * size * 4) as usize);

    for y in 0..size {
        for x in 0..size {
            let in_brick = x % brick_width < brick_width - 1 && y % brick_height < brick_height - 1;
            let value = if in_brick { 255 } else { mortar };
            texels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    Texture::from_pixels(
        format!("brick_displacement_{}_{}x{}_{}", size, brick_width, brick_height, mortar_depth),
        texels,
        size,
        size,
    )
}
