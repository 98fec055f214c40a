//! Configuration for the GitHub connection.
use secrecy::SecretString;

/// Default GitHub REST API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
/// Default page size for paginated queries.
pub const DEFAULT_PAGE_SIZE: u8 = 100;

/// Remote repository connection configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Access token for authentication.
    pub token: SecretString,
    /// REST API base URL.
    pub api_base: String,
}

impl RemoteConfig {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: SecretString,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            token,
            api_base: DEFAULT_API_BASE.into(),
        }
    }

    /// `owner/repo`.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}
