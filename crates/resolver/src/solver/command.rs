//! Solver backed by an external helper process
//!
//! The helper is invoked as
//! `<program> solve|probe [--arch <arch>] --repo <id>=<path>... -- <names>`
//! where each path holds one repository's decompressed primary XML, and
//! answers with one JSON object on stdout:
//!
//! ```json
//! {"status": "ok", "packages": [{"name": "bash", "evr": "5.1.8-6.el9",
//!   "arch": "x86_64", "repo": "repo0", "location": "Packages/b/bash.rpm"}]}
//! {"status": "ok", "candidates": {"bash": [{"name": "bash", "evr": "...",
//!   "arch": "x86_64", "repo": "repo0", "provides": ["bash = 5.1.8"]}]}}
//! {"status": "unsatisfiable", "explanation": "nothing provides ..."}
//! {"status": "not_found", "name": "ghost"}
//! ```

use super::{MetadataPool, PackageSolver, SolvedPackage};
use async_trait::async_trait;
use repofetch_errors::{Error, PlatformError, ResolveError};
use repofetch_platform::{HelperCommand, ProcessOperations};
use repofetch_types::Candidate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Reply {
    Ok {
        #[serde(default)]
        packages: Vec<ReplyPackage>,
        #[serde(default)]
        candidates: BTreeMap<String, Vec<ReplyCandidate>>,
    },
    Unsatisfiable {
        explanation: String,
    },
    NotFound {
        name: String,
    },
}

#[derive(Debug, Deserialize)]
struct ReplyPackage {
    name: String,
    evr: String,
    arch: String,
    repo: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyCandidate {
    name: String,
    evr: String,
    arch: String,
    repo: String,
    #[serde(default)]
    provides: Vec<String>,
}

/// Delegates solving to an external program
pub struct CommandSolver {
    program: String,
    fallback_dirs: Vec<PathBuf>,
    runner: Arc<dyn ProcessOperations>,
}

impl CommandSolver {
    #[must_use]
    pub fn new(program: impl Into<String>, runner: Arc<dyn ProcessOperations>) -> Self {
        Self {
            program: program.into(),
            fallback_dirs: Vec::new(),
            runner,
        }
    }

    /// Directories searched after `PATH`
    #[must_use]
    pub fn with_fallback_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.fallback_dirs = dirs;
        self
    }

    async fn invoke(
        &self,
        mode: &str,
        pool: &MetadataPool,
        names: &[String],
    ) -> Result<(Reply, HashMap<String, String>), Error> {
        let program = self.runner.which(&self.program, &self.fallback_dirs)?;
        let workdir = tempfile::tempdir()?;

        let mut cmd = HelperCommand::new(program);
        cmd.arg(mode);
        if let Some(arch) = &pool.arch {
            cmd.args(["--arch", arch.as_str()]);
        }

        let mut repo_ids = HashMap::new();
        for (index, source) in pool.sources.iter().enumerate() {
            let id = format!("repo{index}");
            let path = workdir.path().join(format!("{id}-primary.xml"));
            tokio::fs::write(&path, &source.primary_xml)
                .await
                .map_err(|e| Error::io_with_path(&e, &path))?;
            cmd.arg("--repo");
            cmd.arg(format!("{id}={}", path.display()));
            repo_ids.insert(id, source.repository.clone());
        }
        cmd.arg("--");
        cmd.args(names);

        let helper = cmd.helper_name();
        let output = self.runner.execute_command(cmd).await?.check(&helper)?;

        let reply = serde_json::from_slice(&output.stdout).map_err(|e| {
            PlatformError::InvalidOutput {
                helper: helper.clone(),
                message: format!("unreadable reply: {e}"),
            }
        })?;
        Ok((reply, repo_ids))
    }
}

fn repository_for(ids: &HashMap<String, String>, id: String) -> String {
    ids.get(&id).cloned().unwrap_or(id)
}

#[async_trait]
impl PackageSolver for CommandSolver {
    fn name(&self) -> &str {
        &self.program
    }

    async fn solve(
        &self,
        pool: &MetadataPool,
        names: &[String],
    ) -> Result<Vec<SolvedPackage>, Error> {
        let (reply, ids) = self.invoke("solve", pool, names).await?;
        match reply {
            Reply::Ok { packages, .. } => Ok(packages
                .into_iter()
                .map(|p| SolvedPackage {
                    name: p.name,
                    evr: p.evr,
                    arch: p.arch,
                    repository: repository_for(&ids, p.repo),
                    location: p.location,
                })
                .collect()),
            Reply::Unsatisfiable { explanation } => Err(ResolveError::Unsatisfiable {
                requested: names.to_vec(),
                explanation,
            }
            .into()),
            Reply::NotFound { name } => Err(ResolveError::PackageNotFound { name }.into()),
        }
    }

    async fn probe(
        &self,
        pool: &MetadataPool,
        names: &[String],
    ) -> Result<BTreeMap<String, Vec<Candidate>>, Error> {
        let (reply, ids) = self.invoke("probe", pool, names).await?;
        let Reply::Ok { mut candidates, .. } = reply else {
            return Err(ResolveError::SolverFailed {
                solver: self.program.clone(),
                message: "probe did not return candidates".to_string(),
            }
            .into());
        };

        Ok(names
            .iter()
            .map(|name| {
                let found = candidates
                    .remove(name)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| Candidate {
                        name: c.name,
                        evr: c.evr,
                        arch: c.arch,
                        repository: repository_for(&ids, c.repo),
                        provides: c.provides,
                    })
                    .collect();
                (name.clone(), found)
            })
            .collect())
    }
}
