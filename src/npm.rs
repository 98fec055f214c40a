//! npm operations used while diffing and staging releases.
use color_eyre::eyre::{Context, OptionExt};
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use std::{fs, path::Path};

use crate::{result::Result, runner::CommandRunner};

pub const PACKAGE_JSON: &str = "package.json";
pub const PACKAGE_LOCK_JSON: &str = "package-lock.json";

#[cfg_attr(test, automock)]
pub trait PackageManager {
    /// Install the latest published version of `package` in `dir`.
    fn install_latest(&self, dir: &Path, package: &str, dev: bool)
    -> Result<()>;

    /// Version of `package` currently installed under `dir/node_modules`.
    fn installed_version(&self, dir: &Path, package: &str) -> Result<String>;

    /// Version declared by the package.json in `dir`.
    fn manifest_version(&self, dir: &Path) -> Result<String>;

    /// Write `version` to package.json and package-lock.json without
    /// committing or tagging.
    fn set_version(&self, dir: &Path, version: &str) -> Result<()>;
}

/// [`PackageManager`] backed by the `npm` command line.
pub struct Npm<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Npm<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl PackageManager for Npm<'_> {
    fn install_latest(
        &self,
        dir: &Path,
        package: &str,
        dev: bool,
    ) -> Result<()> {
        let mut command = format!("npm install {package}@latest");
        if dev {
            command.push_str(" --save-dev");
        }
        self.runner.run(&command, dir)?;
        Ok(())
    }

    fn installed_version(&self, dir: &Path, package: &str) -> Result<String> {
        let manifest = dir.join("node_modules").join(package).join(PACKAGE_JSON);
        read_version(&manifest)
    }

    fn manifest_version(&self, dir: &Path) -> Result<String> {
        read_version(&dir.join(PACKAGE_JSON))
    }

    fn set_version(&self, dir: &Path, version: &str) -> Result<()> {
        self.runner.run(
            &format!("npm version {version} --no-commit-hooks --no-git-tag-version"),
            dir,
        )?;
        Ok(())
    }
}

/// Read the top level `version` field of a package.json file.
fn read_version(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let doc: Value = serde_json::from_str(&content)
        .wrap_err_with(|| format!("failed to parse {}", path.display()))?;

    let version = doc
        .get("version")
        .and_then(Value::as_str)
        .ok_or_eyre(format!("no version field found in {}", path.display()))?;

    Ok(version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::MockCommandRunner;
    use tempfile::TempDir;

    #[test]
    fn installs_latest_with_dev_flag() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd, _| cmd == "npm install roku-deploy@latest")
            .times(1)
            .returning(|_, _| Ok(String::new()));
        runner
            .expect_run()
            .withf(|cmd, _| cmd == "npm install @scope/lint@latest --save-dev")
            .times(1)
            .returning(|_, _| Ok(String::new()));

        let npm = Npm::new(&runner);
        npm.install_latest(Path::new("/repo"), "roku-deploy", false)
            .unwrap();
        npm.install_latest(Path::new("/repo"), "@scope/lint", true)
            .unwrap();
    }

    #[test]
    fn reads_installed_version_of_scoped_package() {
        let tmp = TempDir::new().unwrap();
        let pkg_dir = tmp.path().join("node_modules/@scope/lint");
        fs::create_dir_all(&pkg_dir).unwrap();
        fs::write(
            pkg_dir.join(PACKAGE_JSON),
            r#"{"name":"@scope/lint","version":"0.4.2"}"#,
        )
        .unwrap();

        let runner = MockCommandRunner::new();
        let npm = Npm::new(&runner);
        let version = npm.installed_version(tmp.path(), "@scope/lint").unwrap();
        assert_eq!(version, "0.4.2");
    }

    #[test]
    fn missing_installed_package_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let runner = MockCommandRunner::new();
        let npm = Npm::new(&runner);
        assert!(npm.installed_version(tmp.path(), "nope").is_err());
    }

    #[test]
    fn manifest_without_version_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(PACKAGE_JSON), r#"{"name":"x"}"#).unwrap();
        let runner = MockCommandRunner::new();
        let npm = Npm::new(&runner);
        assert!(npm.manifest_version(tmp.path()).is_err());
    }

    #[test]
    fn sets_version_without_git_side_effects() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd, _| {
                cmd == "npm version 1.3.0 --no-commit-hooks --no-git-tag-version"
            })
            .times(1)
            .returning(|_, _| Ok("v1.3.0".into()));

        let npm = Npm::new(&runner);
        npm.set_version(Path::new("/repo"), "1.3.0").unwrap();
    }
}
