//! Built-in closure solver over primary metadata

use super::primary::{load_primary, Dependency, Solvable};
use super::{MetadataPool, PackageSolver, SolvedPackage};
use async_trait::async_trait;
use repofetch_errors::{Error, ResolveError};
use repofetch_types::Candidate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Greedy requires→provides walk
///
/// Picks the best candidate for every requested name and follows
/// requirements through provides and file lists. Conflicts and obsoletes
/// are not evaluated.
#[derive(Debug, Clone, Default)]
pub struct ClosureSolver;

impl ClosureSolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PackageSolver for ClosureSolver {
    fn name(&self) -> &str {
        "native"
    }

    async fn solve(
        &self,
        pool: &MetadataPool,
        names: &[String],
    ) -> Result<Vec<SolvedPackage>, Error> {
        let loaded = LoadedPool::load_blocking(pool).await?;
        loaded.solve(names)
    }

    async fn probe(
        &self,
        pool: &MetadataPool,
        names: &[String],
    ) -> Result<BTreeMap<String, Vec<Candidate>>, Error> {
        let loaded = LoadedPool::load_blocking(pool).await?;
        Ok(names
            .iter()
            .map(|name| (name.clone(), loaded.probe(name)))
            .collect())
    }
}

/// Solvables of every source with lookup tables
struct LoadedPool {
    target_arch: Option<String>,
    solvables: Vec<Solvable>,
    by_name: HashMap<String, Vec<usize>>,
    by_provide: HashMap<String, Vec<usize>>,
    by_file: HashMap<String, Vec<usize>>,
}

impl LoadedPool {
    /// Parse on the blocking thread pool, off the async workers
    async fn load_blocking(pool: &MetadataPool) -> Result<Self, Error> {
        let pool = pool.clone();
        tokio::task::spawn_blocking(move || Self::load(&pool))
            .await
            .map_err(|e| ResolveError::SolverFailed {
                solver: "native".to_string(),
                message: format!("metadata load task failed: {e}"),
            })?
    }

    fn load(pool: &MetadataPool) -> Result<Self, Error> {
        let mut solvables = Vec::new();
        for (index, source) in pool.sources.iter().enumerate() {
            solvables.extend(load_primary(
                &source.primary_xml,
                &source.repository,
                index,
                pool.arch.as_deref(),
            )?);
        }

        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_provide: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_file: HashMap<String, Vec<usize>> = HashMap::new();
        for (id, solvable) in solvables.iter().enumerate() {
            by_name.entry(solvable.name.clone()).or_default().push(id);
            for provide in &solvable.provides {
                by_provide.entry(provide.name.clone()).or_default().push(id);
            }
            for file in &solvable.files {
                by_file.entry(file.clone()).or_default().push(id);
            }
        }

        Ok(Self {
            target_arch: pool.arch.clone(),
            solvables,
            by_name,
            by_provide,
            by_file,
        })
    }

    /// Candidate preference: highest EVR, earlier repository, exact arch
    fn preference(&self, a: usize, b: usize) -> Ordering {
        let (x, y) = (&self.solvables[a], &self.solvables[b]);
        let exact = |s: &Solvable| self.target_arch.as_deref() == Some(s.arch.as_str());
        y.evr
            .compare(&x.evr)
            .then_with(|| x.repo_index.cmp(&y.repo_index))
            .then_with(|| exact(y).cmp(&exact(x)))
    }

    fn best(&self, candidates: impl IntoIterator<Item = usize>) -> Option<usize> {
        candidates
            .into_iter()
            .min_by(|a, b| self.preference(*a, *b))
    }

    fn provides(&self, id: usize, req: &Dependency) -> bool {
        let solvable = &self.solvables[id];
        if solvable.name == req.name
            && req.is_satisfied_by(&Dependency {
                name: solvable.name.clone(),
                flags: Some("EQ".to_string()),
                evr: Some(solvable.evr.clone()),
            })
        {
            return true;
        }
        if req.name.starts_with('/') && solvable.files.iter().any(|f| *f == req.name) {
            return true;
        }
        solvable.provides.iter().any(|p| req.is_satisfied_by(p))
    }

    fn providers(&self, req: &Dependency) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .by_name
            .get(&req.name)
            .into_iter()
            .chain(self.by_provide.get(&req.name))
            .chain(self.by_file.get(&req.name))
            .flatten()
            .copied()
            .filter(|id| self.provides(*id, req))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn solve(&self, names: &[String]) -> Result<Vec<SolvedPackage>, Error> {
        let mut roots = Vec::with_capacity(names.len());
        for name in names {
            let candidates = self.by_name.get(name).cloned().unwrap_or_default();
            let Some(best) = self.best(candidates) else {
                return Err(ResolveError::PackageNotFound { name: name.clone() }.into());
            };
            roots.push(best);
        }

        let mut walk = Walk::default();
        for root in roots {
            self.visit(root, &mut walk);
        }

        if !walk.problems.is_empty() {
            return Err(ResolveError::Unsatisfiable {
                requested: names.to_vec(),
                explanation: walk.problems.join("; "),
            }
            .into());
        }

        Ok(walk
            .order
            .into_iter()
            .map(|id| {
                let s = &self.solvables[id];
                SolvedPackage {
                    name: s.name.clone(),
                    evr: s.evr.to_string(),
                    arch: s.arch.clone(),
                    repository: s.repository.clone(),
                    location: s.location.clone(),
                }
            })
            .collect())
    }

    /// Depth-first post-order so dependencies precede dependents
    fn visit(&self, id: usize, walk: &mut Walk) {
        if !walk.seen.insert(id) {
            return;
        }
        walk.chosen_names.insert(self.solvables[id].name.clone(), id);

        for req in &self.solvables[id].requires {
            if req.name.starts_with("rpmlib(") || self.provides(id, req) {
                continue;
            }
            let providers = self.providers(req);
            let already = providers.iter().copied().find(|p| walk.seen.contains(p));
            let chosen = already.or_else(|| {
                let fresh: Vec<usize> = providers
                    .iter()
                    .copied()
                    .filter(|p| !walk.chosen_names.contains_key(&self.solvables[*p].name))
                    .collect();
                self.best(fresh).or_else(|| self.best(providers.iter().copied()))
            });

            match chosen {
                Some(provider) => self.visit(provider, walk),
                None => {
                    let problem = format!(
                        "nothing provides {req} needed by {}",
                        self.solvables[id].nevra()
                    );
                    if !walk.problems.contains(&problem) {
                        walk.problems.push(problem);
                    }
                }
            }
        }

        walk.order.push(id);
    }

    fn probe(&self, name: &str) -> Vec<Candidate> {
        let ids = match self.by_name.get(name) {
            Some(ids) if !ids.is_empty() => ids.clone(),
            _ => self.by_provide.get(name).cloned().unwrap_or_default(),
        };

        let mut seen = HashSet::new();
        ids.into_iter()
            .filter(|id| seen.insert(*id))
            .map(|id| {
                let s = &self.solvables[id];
                Candidate {
                    name: s.name.clone(),
                    evr: s.evr.to_string(),
                    arch: s.arch.clone(),
                    repository: s.repository.clone(),
                    provides: s
                        .provides
                        .iter()
                        .map(ToString::to_string)
                        .filter(|p| p.contains(name))
                        .collect(),
                }
            })
            .collect()
    }
}

#[derive(Default)]
struct Walk {
    seen: HashSet<usize>,
    chosen_names: HashMap<String, usize>,
    order: Vec<usize>,
    problems: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::PrimarySource;

    fn package(name: &str, ver: &str, arch: &str, provides: &str, requires: &str) -> String {
        format!(
            r#"<package type="rpm"><name>{name}</name><arch>{arch}</arch>
<version epoch="0" ver="{ver}" rel="1"/>
<location href="Packages/{name}-{ver}-1.{arch}.rpm"/>
<format><rpm:provides>{provides}</rpm:provides><rpm:requires>{requires}</rpm:requires></format>
</package>"#
        )
    }

    fn entry(name: &str) -> String {
        format!(r#"<rpm:entry name="{name}"/>"#)
    }

    fn primary(packages: &[String]) -> Vec<u8> {
        format!(
            r#"<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm">{}</metadata>"#,
            packages.concat()
        )
        .into_bytes()
    }

    fn pool(sources: Vec<(&str, Vec<u8>)>) -> MetadataPool {
        MetadataPool {
            arch: Some("x86_64".to_string()),
            sources: sources
                .into_iter()
                .map(|(repository, primary_xml)| PrimarySource {
                    repository: repository.to_string(),
                    primary_xml: primary_xml.into(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_picks_highest_evr_and_follows_provides() {
        let xml = primary(&[
            package("app", "1.0", "x86_64", "", &entry("libfoo.so.1()(64bit)")),
            package("app", "1.2", "x86_64", "", &entry("libfoo.so.1()(64bit)")),
            package("foo-libs", "3.0", "x86_64", &entry("libfoo.so.1()(64bit)"), ""),
        ]);
        let solved = ClosureSolver::new()
            .solve(&pool(vec![("http://r/", xml)]), &["app".to_string()])
            .await
            .unwrap();

        let names: Vec<_> = solved.iter().map(|p| (p.name.as_str(), p.evr.as_str())).collect();
        assert_eq!(names, vec![("foo-libs", "3.0-1"), ("app", "1.2-1")]);
        assert_eq!(solved[1].repository, "http://r/");
    }

    #[tokio::test]
    async fn test_missing_provider_is_unsatisfiable() {
        let xml = primary(&[package(
            "app",
            "1.0",
            "x86_64",
            "",
            &[entry("libgone.so"), entry("rpmlib(PayloadIsXz)")].concat(),
        )]);
        let err = ClosureSolver::new()
            .solve(&pool(vec![("http://r/", xml)]), &["app".to_string()])
            .await
            .unwrap_err();

        match err {
            Error::Resolve(ResolveError::Unsatisfiable {
                requested,
                explanation,
            }) => {
                assert_eq!(requested, vec!["app"]);
                assert!(explanation.contains("nothing provides libgone.so"));
                assert!(!explanation.contains("rpmlib"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_name_is_not_found() {
        let xml = primary(&[package("app", "1.0", "x86_64", "", "")]);
        let err = ClosureSolver::new()
            .solve(&pool(vec![("http://r/", xml)]), &["ghost".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Resolve(ResolveError::PackageNotFound { ref name }) if name == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_file_requires_and_cycles() {
        let xml = primary(&[
            package("a", "1", "x86_64", "", &[entry("/bin/sh"), entry("b")].concat()),
            package("b", "1", "noarch", "", &entry("a")),
            r#"<package type="rpm"><name>bash</name><arch>x86_64</arch><version epoch="0" ver="5" rel="1"/><format><file>/bin/sh</file></format></package>"#
                .to_string(),
        ]);
        let solved = ClosureSolver::new()
            .solve(&pool(vec![("http://r/", xml)]), &["a".to_string()])
            .await
            .unwrap();

        let names: Vec<_> = solved.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["bash", "b", "a"]);
        assert_eq!(solved[0].location, None);
    }

    #[tokio::test]
    async fn test_earlier_repository_wins_on_equal_evr() {
        let first = primary(&[package("tool", "2.0", "x86_64", "", "")]);
        let second = primary(&[package("tool", "2.0", "x86_64", "", "")]);
        let solved = ClosureSolver::new()
            .solve(
                &pool(vec![("http://first/", first), ("http://second/", second)]),
                &["tool".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(solved[0].repository, "http://first/");
    }

    #[tokio::test]
    async fn test_probe_falls_back_to_provides() {
        let xml = primary(&[
            package("python3-requests", "2.25", "noarch", &entry("python-requests"), ""),
            package("wget", "1.21", "x86_64", "", ""),
        ]);
        let probes = ClosureSolver::new()
            .probe(
                &pool(vec![("http://r/", xml)]),
                &["python-requests".to_string(), "wget".to_string(), "nope".to_string()],
            )
            .await
            .unwrap();

        let requests = &probes["python-requests"];
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].name, "python3-requests");
        assert_eq!(requests[0].provides, vec!["python-requests"]);
        assert_eq!(probes["wget"][0].evr, "1.21-1");
        assert!(probes["nope"].is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_large_pool_solves_alongside_other_tasks() {
        let mut packages: Vec<String> = (0..2000)
            .map(|i| package(&format!("filler{i}"), "1.0", "x86_64", "", ""))
            .collect();
        packages.push(package("app", "1.0", "x86_64", "", &entry("filler1999")));
        let shared = pool(vec![("http://r/", primary(&packages))]);

        let ticker = tokio::spawn(async { tokio::task::yield_now().await });
        let solver = ClosureSolver::new();
        let solve_names = ["app".to_string()];
        let probe_names = ["filler7".to_string()];
        let (solved, probes) = tokio::join!(
            solver.solve(&shared, &solve_names),
            solver.probe(&shared, &probe_names),
        );
        ticker.await.unwrap();

        let names: Vec<_> = solved.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["filler1999", "app"]);
        assert_eq!(probes.unwrap()["filler7"].len(), 1);
        assert_eq!(shared.sources.len(), 1);
    }
}
