use thiserror::Error;

/// Why the model load did not produce a node tree.
///
/// Carried by the load-completion event; the scene owner logs it and keeps
/// rendering without the model.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },
    #[error("failed to parse glTF: {0}")]
    Parse(#[from] gltf::Error),
    #[error("failed to decode image {name}: {source}")]
    Image {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("glTF references external resource {0:?} but was loaded from memory")]
    ExternalResource(String),
    #[error("glTF document contains no meshes")]
    EmptyScene,
}

impl LoadError {
    pub fn fetch(path: &str, reason: impl std::fmt::Display) -> Self {
        LoadError::Fetch {
            path: path.to_owned(),
            reason: reason.to_string(),
        }
    }
}
