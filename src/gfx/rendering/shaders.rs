//! Built-in WGSL programs.
//!
//! Each source holds both entry points (`vs_main` and `fs_main`) so the same
//! string serves as vertex and fragment source. Custom
//! [`ShaderMaterial`](crate::gfx::resources::ShaderMaterial) sources must
//! declare the same entry points and may include [`UNIFORMS`] to share the
//! uniform block and vertex layout.

/// Uniform block, texture bindings and vertex input shared by all programs.
pub const UNIFORMS: &str = include_str!("shaders/uniforms.wgsl");

/// Flat color, or per-vertex color when enabled.
pub const BASIC: &str = concat!(
    include_str!("shaders/uniforms.wgsl"),
    include_str!("shaders/basic.wgsl")
);

/// Blinn-Phong lighting with optional diffuse, specular, normal and
/// displacement maps.
pub const PHONG: &str = concat!(
    include_str!("shaders/uniforms.wgsl"),
    include_str!("shaders/phong.wgsl")
);

/// Entry point names every program must provide.
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_programs_carry_both_entry_points() {
        for source in [BASIC, PHONG] {
            assert!(source.starts_with(UNIFORMS));
            assert!(source.contains(&format!("fn {}(", VERTEX_ENTRY)));
            assert!(source.contains(&format!("fn {}(", FRAGMENT_ENTRY)));
        }
        assert_ne!(BASIC, PHONG);
    }
}
