//! Common functionality shared between release commands
use color_eyre::eyre::OptionExt;
use log::*;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

use crate::{
    changelog::version_ref,
    cli,
    config::Config,
    error::ReleaseError,
    forge::{
        config::RemoteConfig, github::Github, traits::Forge, types::ReleaseInfo,
    },
    npm::PackageManager,
    repo::Repository,
    result::Result,
    version::parse_version,
};

/// Everything a lifecycle command needs about the repository it runs in.
pub struct ReleaseContext {
    pub config: Config,
    pub repo: Repository,
    pub workdir: PathBuf,
    pub forge: Box<dyn Forge>,
}

impl ReleaseContext {
    /// Load the registry, open the repository at `--dir` and connect to
    /// GitHub.
    pub fn load(args: &cli::Args) -> Result<Self> {
        let config = load_configuration(&args.config)?;
        let repo = Repository::open(&args.dir, args.token())?;
        let workdir = repo.workdir()?.to_path_buf();
        let forge = create_forge(&repo, &config, args)?;

        Ok(Self {
            config,
            repo,
            workdir,
            forge,
        })
    }

    /// Name of the repository, used as the project name in templates.
    pub fn name(&self) -> String {
        self.workdir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Branch a release of `version` is staged on.
pub fn release_branch(version: &str) -> String {
    format!("release/{version}")
}

/// Tag a release of `version` is created with. Matches the `v<version>`
/// refs changelog compare links and dependency lookups point at.
pub fn release_tag(version: &str) -> String {
    version_ref(version)
}

/// Directory projects are cloned into for a changelog run. A relative
/// `clone_dir` is resolved against the directory holding the registry, so
/// clones stay out of the repository being released.
pub fn clone_root(config_path: &Path, config: &Config) -> PathBuf {
    config_path
        .parent()
        .unwrap_or(Path::new(""))
        .join(&config.clone_dir)
}

/// Load the project registry, falling back to defaults when the file does
/// not exist.
pub fn load_configuration(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!(
            "no configuration found at {}: using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    info!("loading configuration from {}", path.display());
    Config::load(path)
}

/// Normalize a version given on the command line to its bare form.
pub fn normalize_version(value: &str) -> Result<String> {
    parse_version(value).map(|v| v.to_string()).ok_or_else(|| {
        ReleaseError::invalid_args(format!("{value} is not a valid version"))
            .into()
    })
}

/// Version in the package.json of `dir`, normalized.
pub fn package_version(pm: &dyn PackageManager, dir: &Path) -> Result<String> {
    let raw = pm.manifest_version(dir)?;
    let version = parse_version(&raw).ok_or_eyre(format!(
        "package.json in {} has an invalid version: {raw}",
        dir.display()
    ))?;
    info!("current version: {version}");
    Ok(version.to_string())
}

/// Render the release and pull request body template.
pub fn render_body(
    template: &str,
    version: &str,
    project: &str,
    branch: &str,
) -> Result<String> {
    let mut context = Context::new();
    context.insert("version", version);
    context.insert("project", project);
    context.insert("branch", branch);

    Tera::one_off(template, &context, false).map_err(|e| {
        ReleaseError::invalid_config(format!(
            "failed to render release body: {e}"
        ))
        .into()
    })
}

/// Create the GitHub forge for `repo`.
///
/// Owner and name come from the `origin` remote, or from the configured org
/// and the directory name.
pub fn create_forge(
    repo: &Repository,
    config: &Config,
    args: &cli::Args,
) -> Result<Box<dyn Forge>> {
    let token = args.token().ok_or_else(|| {
        ReleaseError::invalid_args(format!(
            "a GitHub token is required: pass --github-token or set one of {}",
            cli::TOKEN_ENV_VARS.join(", ")
        ))
    })?;

    let (owner, name) = repo.remote_slug(&config.org)?;
    let remote = RemoteConfig::new(&owner, &name, token);
    info!("using GitHub repository {}", remote.slug());

    Ok(Box::new(Github::new(remote)?))
}

/// Release of `version`, if any. Both the `v<version>` tag and a bare
/// `<version>` tag are recognized.
pub async fn find_release(
    forge: &dyn Forge,
    version: &str,
) -> Result<Option<ReleaseInfo>> {
    let tag = release_tag(version);
    let releases = forge.list_releases().await?;
    Ok(releases
        .into_iter()
        .find(|r| r.tag_name == tag || r.tag_name == version))
}

/// Release of `version`.
///
/// # Errors
///
/// Returns [`ReleaseError::ReleaseNotFound`] if there is none.
pub async fn require_release(
    forge: &dyn Forge,
    version: &str,
) -> Result<ReleaseInfo> {
    find_release(forge, version)
        .await?
        .ok_or_else(|| ReleaseError::ReleaseNotFound(version.into()).into())
}
