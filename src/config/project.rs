use serde::Deserialize;

/// One project in the registry.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Unique project name, e.g. `brighterscript` or `@scope/logger`.
    pub name: String,
    /// Name published to npm. Defaults to `name`.
    pub npm_name: Option<String>,
    /// Repository URL. Defaults to `https://github.com/<org>/<repo-name>`.
    pub repository_url: Option<String>,
    /// Names of projects this project depends on.
    pub dependencies: Vec<String>,
    /// Names of projects this project depends on for development.
    pub dev_dependencies: Vec<String>,
}

impl ProjectConfig {
    pub fn npm_name(&self) -> &str {
        self.npm_name.as_deref().unwrap_or(&self.name)
    }

    /// Repository (and clone directory) name: the last path segment of the
    /// project name, so `@scope/logger` maps to `logger`.
    pub fn repo_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn repository_url(&self, org: &str) -> String {
        self.repository_url.clone().unwrap_or_else(|| {
            format!("https://github.com/{org}/{}", self.repo_name())
        })
    }

    /// Dependencies followed by dev-dependencies, in declaration order.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &String> {
        self.dependencies.iter().chain(self.dev_dependencies.iter())
    }
}
