//! # Materials
//!
//! A material is a shader pair plus a named parameter set. Three variants
//! exist: [`BasicMaterial`] (flat color), [`PhongMaterial`] (lit, with up to
//! four optional texture maps) and [`ShaderMaterial`] (custom sources with a
//! free-form uniform map).
//!
//! Every material gets a process-unique id of the form `M<n>`, which the
//! renderer uses to cache one linked program per material.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::gfx::math::Color;
use crate::gfx::rendering::shaders;

use super::texture::{Texture, TextureRecord};

static NEXT_MATERIAL_ID: AtomicUsize = AtomicUsize::new(0);

fn next_material_id() -> String {
    format!("M{}", NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("invalid material record: {0}")]
    Json(#[from] serde_json::Error),
}

/// A material parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vector(Vec<f32>),
    Bool(bool),
    Texture(Option<Texture>),
}

impl UniformValue {
    /// JSON form: numbers, arrays and booleans as-is, textures as `null`.
    pub fn to_json(&self) -> Value {
        match self {
            UniformValue::Float(v) => Value::from(*v),
            UniformValue::Vector(v) => Value::from(v.clone()),
            UniformValue::Bool(v) => Value::from(*v),
            UniformValue::Texture(_) => Value::Null,
        }
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(UniformValue::Texture(None)),
            Value::Bool(b) => Some(UniformValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(|v| UniformValue::Float(v as f32)),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32))
                .collect::<Option<Vec<f32>>>()
                .map(UniformValue::Vector),
            _ => None,
        }
    }
}

fn uniforms_to_json(uniforms: &BTreeMap<String, UniformValue>) -> BTreeMap<String, Value> {
    uniforms
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect()
}

fn uniforms_from_json(json: &BTreeMap<String, Value>) -> BTreeMap<String, UniformValue> {
    json.iter()
        .filter_map(|(k, v)| match UniformValue::from_json(v) {
            Some(value) => Some((k.clone(), value)),
            None => {
                log::warn!("Skipping unsupported uniform '{}'", k);
                None
            }
        })
        .collect()
}

/// Flat-color material.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicMaterial {
    id: String,
    pub color: Color,
}

impl Default for BasicMaterial {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

impl BasicMaterial {
    pub fn new(color: Color) -> Self {
        Self {
            id: next_material_id(),
            color,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Phong-lit material with optional texture maps.
#[derive(Debug, Clone, PartialEq)]
pub struct PhongMaterial {
    id: String,
    pub ambient_color: Color,
    pub diffuse_color: Color,
    pub specular_color: Color,
    pub shininess: f32,
    pub diffuse_map: Option<Texture>,
    pub specular_map: Option<Texture>,
    pub normal_map: Option<Texture>,
    pub displacement_map: Option<Texture>,
    pub ambient_coef: f32,
    pub specular_coef: f32,
    pub displacement_coef: f32,
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self::new(Color::WHITE, Color::WHITE, Color::WHITE, 32.0)
    }
}

impl PhongMaterial {
    pub const DEFAULT_AMBIENT_COEF: f32 = 0.9;
    pub const DEFAULT_SPECULAR_COEF: f32 = 0.9;
    pub const DEFAULT_DISPLACEMENT_COEF: f32 = 0.0;

    pub fn new(ambient_color: Color, diffuse_color: Color, specular_color: Color, shininess: f32) -> Self {
        Self {
            id: next_material_id(),
            ambient_color,
            diffuse_color,
            specular_color,
            shininess,
            diffuse_map: None,
            specular_map: None,
            normal_map: None,
            displacement_map: None,
            ambient_coef: Self::DEFAULT_AMBIENT_COEF,
            specular_coef: Self::DEFAULT_SPECULAR_COEF,
            displacement_coef: Self::DEFAULT_DISPLACEMENT_COEF,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn with_diffuse_map(mut self, texture: Texture) -> Self {
        self.diffuse_map = Some(texture);
        self
    }

    pub fn with_specular_map(mut self, texture: Texture) -> Self {
        self.specular_map = Some(texture);
        self
    }

    pub fn with_normal_map(mut self, texture: Texture) -> Self {
        self.normal_map = Some(texture);
        self
    }

    pub fn with_displacement_map(mut self, texture: Texture) -> Self {
        self.displacement_map = Some(texture);
        self
    }

    pub fn with_coefficients(mut self, ambient: f32, specular: f32, displacement: f32) -> Self {
        self.ambient_coef = ambient;
        self.specular_coef = specular;
        self.displacement_coef = displacement;
        self
    }
}

/// Custom shader sources with a free-form uniform map.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderMaterial {
    id: String,
    vertex_shader: String,
    fragment_shader: String,
    pub uniforms: BTreeMap<String, UniformValue>,
}

impl Default for ShaderMaterial {
    fn default() -> Self {
        Self::new(shaders::BASIC, shaders::BASIC)
    }
}

impl ShaderMaterial {
    pub fn new(vertex_shader: impl Into<String>, fragment_shader: impl Into<String>) -> Self {
        Self {
            id: next_material_id(),
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            uniforms: BTreeMap::new(),
        }
    }

    pub fn with_uniform(mut self, name: &str, value: UniformValue) -> Self {
        self.uniforms.insert(name.to_string(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Tag stored next to a serialized material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialType {
    BasicMaterial,
    PhongMaterial,
    ShaderMaterial,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Basic(BasicMaterial),
    Phong(PhongMaterial),
    Shader(ShaderMaterial),
}

impl Default for Material {
    fn default() -> Self {
        Material::Basic(BasicMaterial::default())
    }
}

impl From<BasicMaterial> for Material {
    fn from(m: BasicMaterial) -> Self {
        Material::Basic(m)
    }
}

impl From<PhongMaterial> for Material {
    fn from(m: PhongMaterial) -> Self {
        Material::Phong(m)
    }
}

impl From<ShaderMaterial> for Material {
    fn from(m: ShaderMaterial) -> Self {
        Material::Shader(m)
    }
}

impl Material {
    pub fn id(&self) -> &str {
        match self {
            Material::Basic(m) => m.id(),
            Material::Phong(m) => m.id(),
            Material::Shader(m) => m.id(),
        }
    }

    pub fn material_type(&self) -> MaterialType {
        match self {
            Material::Basic(_) => MaterialType::BasicMaterial,
            Material::Phong(_) => MaterialType::PhongMaterial,
            Material::Shader(_) => MaterialType::ShaderMaterial,
        }
    }

    pub fn vertex_shader(&self) -> &str {
        match self {
            Material::Basic(_) => shaders::BASIC,
            Material::Phong(_) => shaders::PHONG,
            Material::Shader(m) => &m.vertex_shader,
        }
    }

    pub fn fragment_shader(&self) -> &str {
        match self {
            Material::Basic(_) => shaders::BASIC,
            Material::Phong(_) => shaders::PHONG,
            Material::Shader(m) => &m.fragment_shader,
        }
    }

    /// The named parameter set this material exposes to its shaders.
    pub fn uniforms(&self) -> BTreeMap<String, UniformValue> {
        match self {
            Material::Basic(m) => {
                BTreeMap::from([("color".to_string(), UniformValue::Vector(m.color.to_array().to_vec()))])
            }
            Material::Phong(m) => {
                let color = |c: Color| UniformValue::Vector(c.to_array().to_vec());
                let map = |t: &Option<Texture>| UniformValue::Texture(t.clone());
                BTreeMap::from([
                    ("ambientColor".to_string(), color(m.ambient_color)),
                    ("diffuseColor".to_string(), color(m.diffuse_color)),
                    ("specularColor".to_string(), color(m.specular_color)),
                    ("shininess".to_string(), UniformValue::Float(m.shininess)),
                    ("diffuseMap".to_string(), map(&m.diffuse_map)),
                    ("specularMap".to_string(), map(&m.specular_map)),
                    ("displacementMap".to_string(), map(&m.displacement_map)),
                    ("normalMap".to_string(), map(&m.normal_map)),
                    ("useDiffuseMap".to_string(), UniformValue::Bool(m.diffuse_map.is_some())),
                    ("useSpecularMap".to_string(), UniformValue::Bool(m.specular_map.is_some())),
                    (
                        "useDisplacementMap".to_string(),
                        UniformValue::Bool(m.displacement_map.is_some()),
                    ),
                    ("useNormalMap".to_string(), UniformValue::Bool(m.normal_map.is_some())),
                    ("ambientCoef".to_string(), UniformValue::Float(m.ambient_coef)),
                    ("specularCoef".to_string(), UniformValue::Float(m.specular_coef)),
                    (
                        "displacementCoef".to_string(),
                        UniformValue::Float(m.displacement_coef),
                    ),
                ])
            }
            Material::Shader(m) => m.uniforms.clone(),
        }
    }

    /// Serializes the variant-specific record. Pair it with [`material_type`](Self::material_type).
    pub fn to_json(&self) -> Result<Value, MaterialError> {
        let uniforms = uniforms_to_json(&self.uniforms());
        let value = match self {
            Material::Basic(m) => serde_json::to_value(BasicMaterialRecord {
                id: m.id.clone(),
                uniforms,
                color: m.color,
            })?,
            Material::Phong(m) => serde_json::to_value(PhongMaterialRecord {
                id: m.id.clone(),
                uniforms,
                ambient_color: m.ambient_color,
                diffuse_color: m.diffuse_color,
                specular_color: m.specular_color,
                shininess: m.shininess,
                diffuse_map: m.diffuse_map.as_ref().map(Texture::to_record),
                specular_map: m.specular_map.as_ref().map(Texture::to_record),
                displacement_map: m.displacement_map.as_ref().map(Texture::to_record),
                normal_map: m.normal_map.as_ref().map(Texture::to_record),
                ambient_coef: Some(m.ambient_coef),
                specular_coef: Some(m.specular_coef),
                displacement_coef: Some(m.displacement_coef),
            })?,
            Material::Shader(m) => serde_json::to_value(ShaderMaterialRecord {
                id: m.id.clone(),
                uniforms,
            })?,
        };
        Ok(value)
    }

    /// Rebuilds a material from its record. The result gets a fresh id.
    pub fn from_json(kind: MaterialType, value: &Value) -> Result<Self, MaterialError> {
        let material = match kind {
            MaterialType::BasicMaterial => {
                let record: BasicMaterialRecord = serde_json::from_value(value.clone())?;
                Material::Basic(BasicMaterial::new(record.color))
            }
            MaterialType::PhongMaterial => {
                let record: PhongMaterialRecord = serde_json::from_value(value.clone())?;
                let mut phong = PhongMaterial::new(
                    record.ambient_color,
                    record.diffuse_color,
                    record.specular_color,
                    record.shininess,
                );
                let key = |slot: &str| format!("{}/{}", phong.id, slot);
                let texture = |r: &Option<TextureRecord>, slot: &str| {
                    r.as_ref().map(|r| Texture::from_record(r, key(slot)))
                };
                let diffuse_map = texture(&record.diffuse_map, "diffuseMap");
                let specular_map = texture(&record.specular_map, "specularMap");
                let normal_map = texture(&record.normal_map, "normalMap");
                let displacement_map = texture(&record.displacement_map, "displacementMap");
                phong.diffuse_map = diffuse_map;
                phong.specular_map = specular_map;
                phong.normal_map = normal_map;
                phong.displacement_map = displacement_map;
                phong.ambient_coef = record.ambient_coef.unwrap_or(PhongMaterial::DEFAULT_AMBIENT_COEF);
                phong.specular_coef = record.specular_coef.unwrap_or(PhongMaterial::DEFAULT_SPECULAR_COEF);
                phong.displacement_coef = record
                    .displacement_coef
                    .unwrap_or(PhongMaterial::DEFAULT_DISPLACEMENT_COEF);
                Material::Phong(phong)
            }
            MaterialType::ShaderMaterial => {
                let record: ShaderMaterialRecord = serde_json::from_value(value.clone())?;
                let mut shader = ShaderMaterial::default();
                shader.uniforms = uniforms_from_json(&record.uniforms);
                Material::Shader(shader)
            }
        };
        Ok(material)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicMaterialRecord {
    pub id: String,
    #[serde(default)]
    pub uniforms: BTreeMap<String, Value>,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhongMaterialRecord {
    pub id: String,
    #[serde(default)]
    pub uniforms: BTreeMap<String, Value>,
    pub ambient_color: Color,
    pub diffuse_color: Color,
    pub specular_color: Color,
    pub shininess: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffuse_map: Option<TextureRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular_map: Option<TextureRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displacement_map: Option<TextureRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_map: Option<TextureRecord>,
    #[serde(default)]
    pub ambient_coef: Option<f32>,
    #[serde(default)]
    pub specular_coef: Option<f32>,
    #[serde(default)]
    pub displacement_coef: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderMaterialRecord {
    pub id: String,
    #[serde(default)]
    pub uniforms: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_prefixed() {
        let a = BasicMaterial::default();
        let b = BasicMaterial::default();
        assert!(a.id().starts_with('M'));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_phong_defaults() {
        let phong = PhongMaterial::default();
        assert_eq!(phong.ambient_coef, 0.9);
        assert_eq!(phong.specular_coef, 0.9);
        assert_eq!(phong.displacement_coef, 0.0);
        assert!(phong.diffuse_map.is_none());
    }

    #[test]
    fn test_phong_uniform_flags_follow_maps() {
        let material = Material::from(
            PhongMaterial::default().with_normal_map(Texture::new("normal")),
        );
        let uniforms = material.uniforms();
        assert_eq!(uniforms["useNormalMap"], UniformValue::Bool(true));
        assert_eq!(uniforms["useDiffuseMap"], UniformValue::Bool(false));
        assert!(matches!(uniforms["normalMap"], UniformValue::Texture(Some(_))));
    }

    #[test]
    fn test_texture_uniforms_serialize_as_null() {
        let material = Material::from(
            PhongMaterial::default().with_diffuse_map(Texture::from_pixels("d", vec![0; 4], 1, 1)),
        );
        let json = material.to_json().unwrap();
        assert_eq!(json["uniforms"]["diffuseMap"], Value::Null);
        assert_eq!(json["uniforms"]["shininess"], 32.0);
        assert_eq!(json["diffuseMap"]["width"], 1);
    }

    #[test]
    fn test_phong_round_trip_keeps_parameters() {
        let original = Material::from(
            PhongMaterial::new(Color::BLACK, Color::rgb(1.0, 0.0, 0.0), Color::WHITE, 12.0)
                .with_coefficients(0.5, 0.25, 0.1)
                .with_specular_map(Texture::from_pixels("s", vec![9; 4], 1, 1)),
        );
        let json = original.to_json().unwrap();
        let back = Material::from_json(MaterialType::PhongMaterial, &json).unwrap();

        let (Material::Phong(a), Material::Phong(b)) = (&original, &back) else {
            panic!("expected phong materials");
        };
        assert_ne!(a.id(), b.id());
        assert_eq!(b.diffuse_color, Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(b.shininess, 12.0);
        assert_eq!(b.specular_coef, 0.25);
        assert!(b.specular_map.as_ref().unwrap().is_loaded());
        assert!(b.normal_map.is_none());
    }

    #[test]
    fn test_missing_coefficients_use_defaults() {
        let json = serde_json::json!({
            "id": "M99",
            "ambientColor": {"r": 0.1, "g": 0.1, "b": 0.1, "a": 1.0},
            "diffuseColor": {"r": 1.0, "g": 1.0, "b": 1.0},
            "specularColor": {"r": 1.0, "g": 1.0, "b": 1.0, "a": 1.0},
            "shininess": 8.0
        });
        let Material::Phong(phong) = Material::from_json(MaterialType::PhongMaterial, &json).unwrap()
        else {
            panic!("expected phong");
        };
        assert_eq!(phong.ambient_coef, 0.9);
        assert_eq!(phong.displacement_coef, 0.0);
        assert_eq!(phong.diffuse_color.a, 1.0);
    }

    #[test]
    fn test_shader_material_uniforms_round_trip() {
        let material = Material::from(
            ShaderMaterial::default()
                .with_uniform("strength", UniformValue::Float(2.0))
                .with_uniform("tint", UniformValue::Vector(vec![1.0, 0.5, 0.0]))
                .with_uniform("enabled", UniformValue::Bool(true)),
        );
        let json = material.to_json().unwrap();
        let back = Material::from_json(MaterialType::ShaderMaterial, &json).unwrap();
        assert_eq!(back.uniforms(), material.uniforms());
        assert_eq!(back.vertex_shader(), shaders::BASIC);
    }

    #[test]
    fn test_material_type_tag_names() {
        assert_eq!(
            serde_json::to_value(MaterialType::PhongMaterial).unwrap(),
            Value::from("PhongMaterial")
        );
        assert!(serde_json::from_value::<MaterialType>(Value::from("Lambert")).is_err());
    }
}
