use occlusion_scene::SceneConfig;

fn main() -> anyhow::Result<()> {
    occlusion_scene::run(SceneConfig::from_env())
}
