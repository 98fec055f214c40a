//! Implements the Forge trait for Github
use async_trait::async_trait;
use log::*;
use octocrab::{
    Octocrab,
    params::{self, repos::Reference},
};
use reqwest::{
    Client, StatusCode, Url,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT},
};
use secrecy::ExposeSecret;

use crate::{
    error::ReleaseError,
    forge::{
        config::{DEFAULT_PAGE_SIZE, RemoteConfig},
        traits::Forge,
        types::{
            AssetInfo, CreatePrRequest, CreateReleaseRequest, PullRequest,
            ReleaseInfo, UploadAssetRequest,
        },
    },
    result::Result,
};

const GITHUB_JSON: &str = "application/vnd.github+json";
const OCTET_STREAM: &str = "application/octet-stream";

/// GitHub forge implementation using Octocrab for API interactions with
/// releases, pull requests and branches. Asset uploads go through reqwest
/// because they target the separate uploads host.
pub struct Github {
    config: RemoteConfig,
    instance: Octocrab,
    upload_client: Client,
}

impl Github {
    /// Create GitHub client with personal access token authentication and API
    /// base URL configuration.
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let instance = Octocrab::builder()
            .personal_token(config.token.clone())
            .base_uri(config.api_base.clone())?
            .build()?;

        let mut headers = HeaderMap::new();
        headers.append(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        headers.append(
            USER_AGENT,
            HeaderValue::from_static(env!("CARGO_PKG_NAME")),
        );

        let upload_client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            config,
            instance,
            upload_client,
        })
    }

    fn owner(&self) -> &str {
        &self.config.owner
    }

    fn repo(&self) -> &str {
        &self.config.repo
    }
}

/// Strip the `{?name,label}` template suffix from a release upload URL and
/// add the asset name.
pub fn asset_upload_url(upload_url: &str, name: &str) -> Result<Url> {
    let base = upload_url
        .split_once('{')
        .map(|(base, _)| base)
        .unwrap_or(upload_url);

    let mut url = Url::parse(base)?;
    url.query_pairs_mut().append_pair("name", name);
    Ok(url)
}

fn release_info(release: octocrab::models::repos::Release) -> ReleaseInfo {
    ReleaseInfo {
        id: release.id.0,
        tag_name: release.tag_name,
        draft: release.draft,
        upload_url: release.upload_url,
        assets: release
            .assets
            .into_iter()
            .map(|a| AssetInfo {
                id: a.id.0,
                name: a.name,
            })
            .collect(),
    }
}

fn is_not_found(err: &octocrab::Error) -> bool {
    matches!(
        err,
        octocrab::Error::GitHub { source, .. }
            if source.status_code == StatusCode::NOT_FOUND
    )
}

#[async_trait]
impl Forge for Github {
    async fn list_releases(&self) -> Result<Vec<ReleaseInfo>> {
        let mut releases = vec![];
        let mut page_number = 1u32;

        loop {
            let page = self
                .instance
                .repos(self.owner(), self.repo())
                .releases()
                .list()
                .per_page(DEFAULT_PAGE_SIZE)
                .page(page_number)
                .send()
                .await
                .map_err(ReleaseError::from)?;

            let has_next = page.next.is_some();
            releases.extend(page.items.into_iter().map(release_info));

            if !has_next {
                break;
            }

            page_number += 1;
        }

        debug!("found {} releases in {}", releases.len(), self.config.slug());

        Ok(releases)
    }

    async fn create_draft_release(
        &self,
        req: CreateReleaseRequest,
    ) -> Result<ReleaseInfo> {
        info!("creating draft release {}", req.tag);

        let release = self
            .instance
            .repos(self.owner(), self.repo())
            .releases()
            .create(&req.tag)
            .name(&req.name)
            .body(&req.body)
            .draft(true)
            .prerelease(false)
            .send()
            .await
            .map_err(ReleaseError::from)?;

        Ok(release_info(release))
    }

    async fn publish_release(&self, id: u64) -> Result<()> {
        info!("publishing release {id}");

        self.instance
            .repos(self.owner(), self.repo())
            .releases()
            .update(id)
            .draft(false)
            .send()
            .await
            .map_err(ReleaseError::from)?;

        Ok(())
    }

    async fn delete_release(&self, id: u64) -> Result<()> {
        info!("deleting release {id}");

        self.instance
            .repos(self.owner(), self.repo())
            .releases()
            .delete(id)
            .await
            .map_err(ReleaseError::from)?;

        Ok(())
    }

    async fn delete_release_asset(&self, id: u64) -> Result<()> {
        debug!("deleting release asset {id}");

        self.instance
            .repos(self.owner(), self.repo())
            .release_assets()
            .delete(id)
            .await
            .map_err(ReleaseError::from)?;

        Ok(())
    }

    async fn upload_release_asset(&self, req: UploadAssetRequest) -> Result<()> {
        let url = asset_upload_url(&req.upload_url, &req.name)?;
        info!("uploading {} ({} bytes)", req.name, req.content.len());

        let response = self
            .upload_client
            .post(url)
            .bearer_auth(self.config.token.expose_secret())
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(req.content)
            .send()
            .await?;

        let status = response.status();

        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(ReleaseError::forge(format!(
                "failed to upload {}: status {status}: {body}",
                req.name
            ))
            .into());
        }

        Ok(())
    }

    async fn find_open_pr(
        &self,
        head_branch: String,
    ) -> Result<Option<PullRequest>> {
        let prs = self
            .instance
            .pulls(self.owner(), self.repo())
            .list()
            .state(params::State::Open)
            .head(format!("{}:{head_branch}", self.owner()))
            .send()
            .await
            .map_err(ReleaseError::from)?;

        Ok(prs
            .items
            .into_iter()
            .next()
            .map(|pr| PullRequest { number: pr.number }))
    }

    async fn create_pr(&self, req: CreatePrRequest) -> Result<PullRequest> {
        info!(
            "creating pull request {} -> {}",
            req.head_branch, req.base_branch
        );

        let pr = self
            .instance
            .pulls(self.owner(), self.repo())
            .create(req.title, req.head_branch, req.base_branch)
            .body(req.body)
            .send()
            .await
            .map_err(ReleaseError::from)?;

        Ok(PullRequest { number: pr.number })
    }

    async fn close_pr(&self, number: u64) -> Result<()> {
        info!("closing pull request #{number}");

        self.instance
            .pulls(self.owner(), self.repo())
            .update(number)
            .state(params::pulls::State::Closed)
            .send()
            .await
            .map_err(ReleaseError::from)?;

        Ok(())
    }

    async fn delete_branch(&self, branch: String) -> Result<bool> {
        let reference = Reference::Branch(branch.clone());
        let repos = self.instance.repos(self.owner(), self.repo());

        match repos.get_ref(&reference).await {
            Ok(_) => {}
            Err(err) if is_not_found(&err) => {
                debug!("branch {branch} does not exist on remote");
                return Ok(false);
            }
            Err(err) => return Err(ReleaseError::from(err).into()),
        }

        info!("deleting remote branch {branch}");
        repos
            .delete_ref(&reference)
            .await
            .map_err(ReleaseError::from)?;

        Ok(true)
    }
}
