//! Traits related to remote git forges
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::{
    forge::types::{
        CreatePrRequest, CreateReleaseRequest, PullRequest, ReleaseInfo,
        UploadAssetRequest,
    },
    result::Result,
};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Forge: Send + Sync {
    /// Every release of the repository, drafts included.
    async fn list_releases(&self) -> Result<Vec<ReleaseInfo>>;
    async fn create_draft_release(
        &self,
        req: CreateReleaseRequest,
    ) -> Result<ReleaseInfo>;
    /// Mark a draft release as published.
    async fn publish_release(&self, id: u64) -> Result<()>;
    async fn delete_release(&self, id: u64) -> Result<()>;
    async fn delete_release_asset(&self, id: u64) -> Result<()>;
    async fn upload_release_asset(&self, req: UploadAssetRequest) -> Result<()>;
    /// The open pull request whose head is `head_branch`, if any.
    async fn find_open_pr(&self, head_branch: String)
    -> Result<Option<PullRequest>>;
    async fn create_pr(&self, req: CreatePrRequest) -> Result<PullRequest>;
    async fn close_pr(&self, number: u64) -> Result<()>;
    /// Delete a remote branch. Returns false if it did not exist.
    async fn delete_branch(&self, branch: String) -> Result<bool>;
}
