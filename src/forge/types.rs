/// A GitHub release.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub id: u64,
    pub tag_name: String,
    pub draft: bool,
    /// Upload URL template as returned by the API, e.g.
    /// `https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}`.
    pub upload_url: String,
    pub assets: Vec<AssetInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetInfo {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReleaseRequest {
    pub tag: String,
    pub name: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrRequest {
    pub head_branch: String,
    pub base_branch: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAssetRequest {
    pub upload_url: String,
    pub name: String,
    pub content: Vec<u8>,
}
