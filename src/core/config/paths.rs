use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub config_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        Self::from_root(project_root)
    }

    pub fn from_root(project_root: PathBuf) -> Self {
        let config_path = env::var("F1GPT_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| project_root.join("config.yml"));
        let secrets_path = project_root.join("secrets.yaml");

        AppPaths {
            project_root,
            config_path,
            secrets_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("F1GPT_ROOT") {
        return PathBuf::from(root);
    }

    let cwd = env::current_dir().ok();
    if let Some(dir) = cwd.as_ref() {
        if dir.join("config.yml").exists() {
            return dir.clone();
        }
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    cwd.unwrap_or(manifest_dir)
}
