/**
 * This module contains all logic for loading models and textures from external files.
 *
 * Assets are resolved under `./assets/` on native targets and under the page
 * origin on the web.
 */
pub mod gltf_import;

pub use gltf_import::{load_model_gltf, model_from_slice};

use crate::error::LoadError;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> Result<reqwest::Url, LoadError> {
    let window = web_sys::window().ok_or_else(|| LoadError::fetch(file_name, "no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| LoadError::fetch(file_name, "page has no origin"))?;
    let base = reqwest::Url::parse(&format!("{}/", origin))
        .map_err(|e| LoadError::fetch(file_name, e))?;
    base.join(file_name).map_err(|e| LoadError::fetch(file_name, e))
}

pub async fn load_binary(file_name: &str) -> Result<Vec<u8>, LoadError> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let response = reqwest::get(url)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LoadError::fetch(file_name, e))?;
        response
            .bytes()
            .await
            .map_err(|e| LoadError::fetch(file_name, e))?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| LoadError::fetch(file_name, e))?
    };

    Ok(data)
}

/// Resolves `uri` relative to the directory of `base`, as glTF does for
/// external buffers and images.
pub(crate) fn resolve_relative(base: &str, uri: &str) -> String {
    match base.rsplit_once('/') {
        Some((dir, _)) => format!("{}/{}", dir, uri),
        None => uri.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_uris_resolve_next_to_the_document() {
        assert_eq!(resolve_relative("model/cyber2.gltf", "cyber2.bin"), "model/cyber2.bin");
        assert_eq!(resolve_relative("scene.gltf", "scene.bin"), "scene.bin");
    }
}
