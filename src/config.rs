//! Tunables for the scene, the camera rig and the renderer.
//!
//! [`SceneConfig::default`] reproduces the stock scene. The native binary
//! may override a couple of fields from the environment via
//! [`SceneConfig::from_env`]; everything else is changed in code before
//! calling [`crate::flow::run`].

use cgmath::Deg;

/// Environment variable overriding [`SceneConfig::model_path`].
pub const MODEL_PATH_ENV: &str = "OCCLUSION_SCENE_MODEL";
/// Environment variable overriding [`SceneConfig::update_controls`].
pub const UPDATE_CONTROLS_ENV: &str = "OCCLUSION_SCENE_UPDATE_CONTROLS";

#[derive(Clone, Debug)]
pub struct SceneConfig {
    /// Relative path of the glTF binary, resolved under the asset root.
    pub model_path: String,
    /// DOM id of the canvas the wasm build renders into.
    pub canvas_id: String,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    /// The camera starts at `(offset, offset, offset)` looking at the origin.
    pub camera_offset: f32,
    /// Upper bound for the device pixel ratio used to size the surface.
    pub max_pixel_ratio: f64,
    /// 1 disables multisampling. WebGL2 guarantees 4.
    pub sample_count: u32,
    pub clear_colour: wgpu::Color,
    pub enable_damping: bool,
    pub damping_factor: f32,
    /// Run the orbit controller's per-frame integration step. Off by default,
    /// so damping is configured but never visibly applied.
    pub update_controls: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            model_path: "model/cyber2.glb".to_string(),
            canvas_id: "canvas".to_string(),
            fovy: Deg(75.0),
            znear: 0.1,
            zfar: 1000.0,
            camera_offset: 35.0,
            max_pixel_ratio: 2.0,
            sample_count: 4,
            clear_colour: wgpu::Color::TRANSPARENT,
            enable_damping: true,
            damping_factor: 0.05,
            update_controls: false,
        }
    }
}

impl SceneConfig {
    /// Defaults with [`MODEL_PATH_ENV`] and [`UPDATE_CONTROLS_ENV`] applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up through `lookup`. Unparseable boolean
    /// values are ignored with a warning.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(MODEL_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            self.model_path = path;
        }
        if let Some(raw) = lookup(UPDATE_CONTROLS_ENV) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.update_controls = true,
                "0" | "false" | "no" | "off" => self.update_controls = false,
                other => log::warn!("Ignoring {UPDATE_CONTROLS_ENV}={other}, expected a boolean"),
            }
        }
        self
    }

    pub fn camera_position(&self) -> cgmath::Point3<f32> {
        let p = self.camera_offset;
        cgmath::Point3::new(p, p, p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_scene() {
        let config = SceneConfig::default();
        assert_eq!(config.fovy, Deg(75.0));
        assert_eq!(config.camera_position(), cgmath::Point3::new(35.0, 35.0, 35.0));
        assert!(config.enable_damping);
        assert!(!config.update_controls);
        assert_eq!(config.max_pixel_ratio, 2.0);
    }

    #[test]
    fn overrides_are_applied() {
        let config = SceneConfig::default().with_overrides(|key| match key {
            MODEL_PATH_ENV => Some("model/other.glb".to_string()),
            UPDATE_CONTROLS_ENV => Some("On".to_string()),
            _ => None,
        });
        assert_eq!(config.model_path, "model/other.glb");
        assert!(config.update_controls);
    }

    #[test]
    fn garbage_boolean_keeps_default() {
        let config = SceneConfig::default()
            .with_overrides(|key| (key == UPDATE_CONTROLS_ENV).then(|| "maybe".to_string()));
        assert!(!config.update_controls);
    }
}
