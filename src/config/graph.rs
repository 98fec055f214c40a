//! Transitive dependency collection over the project registry.
use std::collections::HashSet;

use crate::{
    config::{Config, ProjectConfig},
    error::ReleaseError,
    result::Result,
};

/// Collect `root` and every project reachable from it through
/// `dependencies` and `dev_dependencies`.
///
/// The root comes first. The rest follow in depth-first post-order: a
/// dependency is listed after its own dependencies. Each project appears
/// once, and a cycle stops at the first repeated project.
pub fn collect_dependencies<'a>(
    config: &'a Config,
    root: &str,
) -> Result<Vec<&'a ProjectConfig>> {
    let root_project = config
        .project(root)
        .ok_or_else(|| ReleaseError::UnknownProject(root.to_string()))?;

    let mut walker = Walker {
        config,
        visited: HashSet::new(),
        emitted: HashSet::from([root_project.name.as_str()]),
        projects: vec![root_project],
    };

    walker.visit(root_project)?;

    Ok(walker.projects)
}

struct Walker<'a> {
    config: &'a Config,
    visited: HashSet<&'a str>,
    emitted: HashSet<&'a str>,
    projects: Vec<&'a ProjectConfig>,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, project: &'a ProjectConfig) -> Result<()> {
        if !self.visited.insert(project.name.as_str()) {
            return Ok(());
        }

        for name in project.all_dependencies() {
            let dependency = self
                .config
                .project(name)
                .ok_or_else(|| ReleaseError::UnknownProject(name.clone()))?;

            self.visit(dependency)?;

            if self.emitted.insert(dependency.name.as_str()) {
                self.projects.push(dependency);
            }
        }

        Ok(())
    }
}
