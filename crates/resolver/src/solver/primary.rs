//! Streaming loader for RPM primary metadata

use super::evr::Evr;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use repofetch_errors::{Error, MetadataError};
use std::cmp::Ordering;

/// A `provides` or `requires` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    /// `EQ`, `LT`, `LE`, `GT` or `GE`; absent for unversioned entries
    pub flags: Option<String>,
    pub evr: Option<Evr>,
}

impl Dependency {
    #[must_use]
    pub fn unversioned(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: None,
            evr: None,
        }
    }

    /// Whether a provide satisfies this requirement
    ///
    /// Provides are treated as exact versions; an unversioned side on either
    /// end matches by name alone.
    #[must_use]
    pub fn is_satisfied_by(&self, provide: &Dependency) -> bool {
        if self.name != provide.name {
            return false;
        }
        let (Some(flags), Some(wanted)) = (self.flags.as_deref(), self.evr.as_ref()) else {
            return true;
        };
        let Some(offered) = provide.evr.as_ref() else {
            return true;
        };

        let ord = offered.compare(wanted);
        match flags {
            "EQ" => ord == Ordering::Equal,
            "LT" => ord == Ordering::Less,
            "LE" => ord != Ordering::Greater,
            "GT" => ord == Ordering::Greater,
            "GE" => ord != Ordering::Less,
            _ => true,
        }
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if let (Some(flags), Some(evr)) = (&self.flags, &self.evr) {
            let op = match flags.as_str() {
                "EQ" => "=",
                "LT" => "<",
                "LE" => "<=",
                "GT" => ">",
                "GE" => ">=",
                other => other,
            };
            write!(f, " {op} {evr}")?;
        }
        Ok(())
    }
}

/// One package loaded from primary metadata
#[derive(Debug, Clone, Default)]
pub struct Solvable {
    pub name: String,
    pub arch: String,
    pub evr: Evr,
    pub location: Option<String>,
    pub provides: Vec<Dependency>,
    pub requires: Vec<Dependency>,
    pub files: Vec<String>,
    pub repository: String,
    /// Position of the source repository in the pool
    pub repo_index: usize,
}

impl Solvable {
    /// `name-evr.arch`
    #[must_use]
    pub fn nevra(&self) -> String {
        format!("{}-{}.{}", self.name, self.evr, self.arch)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Provides,
    Requires,
    Ignored,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    None,
    Name,
    Arch,
    File,
}

/// Whether a package architecture is installable on `target`
///
/// Source packages never are. Without a target every binary arch is kept.
#[must_use]
pub fn arch_matches(arch: &str, target: Option<&str>) -> bool {
    if arch == "src" || arch == "nosrc" {
        return false;
    }
    match target {
        Some(target) => arch == target || arch == "noarch",
        None => true,
    }
}

/// Parse one repository's primary XML into solvables
///
/// # Errors
///
/// Returns `MetadataError::InvalidXml` naming `repository` when the
/// document is malformed.
pub fn load_primary(
    xml: &[u8],
    repository: &str,
    repo_index: usize,
    arch: Option<&str>,
) -> Result<Vec<Solvable>, Error> {
    let invalid = |message: String| -> Error {
        MetadataError::InvalidXml {
            url: repository.to_string(),
            message,
        }
        .into()
    };

    let mut reader = Reader::from_reader(xml);
    let mut solvables = Vec::new();
    let mut current: Option<Solvable> = None;
    let mut section = Section::None;
    let mut target = TextTarget::None;

    loop {
        let event = reader.read_event().map_err(|e| invalid(e.to_string()))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let local = e.local_name();
                match local.as_ref() {
                    b"package" if !is_empty => {
                        current = Some(Solvable {
                            repository: repository.to_string(),
                            repo_index,
                            ..Solvable::default()
                        });
                    }
                    b"provides" if !is_empty => section = Section::Provides,
                    b"requires" if !is_empty => section = Section::Requires,
                    b"conflicts" | b"obsoletes" | b"recommends" | b"suggests"
                    | b"supplements" | b"enhances"
                        if !is_empty =>
                    {
                        section = Section::Ignored;
                    }
                    _ => {}
                }

                let Some(pkg) = current.as_mut() else {
                    continue;
                };
                match local.as_ref() {
                    b"name" if !is_empty && section == Section::None => {
                        target = TextTarget::Name;
                    }
                    b"arch" if !is_empty => target = TextTarget::Arch,
                    b"file" if !is_empty => target = TextTarget::File,
                    b"version" => {
                        let attrs = attributes(e).map_err(invalid)?;
                        pkg.evr = Evr::new(
                            lookup(&attrs, "epoch"),
                            lookup(&attrs, "ver").unwrap_or_default(),
                            lookup(&attrs, "rel"),
                        );
                    }
                    b"location" => {
                        let attrs = attributes(e).map_err(invalid)?;
                        pkg.location = lookup(&attrs, "href").map(str::to_string);
                    }
                    b"entry" if matches!(section, Section::Provides | Section::Requires) => {
                        let attrs = attributes(e).map_err(invalid)?;
                        let Some(name) = lookup(&attrs, "name") else {
                            continue;
                        };
                        let evr = lookup(&attrs, "ver")
                            .map(|ver| Evr::new(lookup(&attrs, "epoch"), ver, lookup(&attrs, "rel")));
                        let dep = Dependency {
                            name: name.to_string(),
                            flags: lookup(&attrs, "flags").map(str::to_string),
                            evr,
                        };
                        if section == Section::Provides {
                            pkg.provides.push(dep);
                        } else {
                            pkg.requires.push(dep);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if target == TextTarget::None {
                    continue;
                }
                let Some(pkg) = current.as_mut() else {
                    continue;
                };
                let text = e.unescape().map_err(|e| invalid(e.to_string()))?;
                let text = text.trim();
                match target {
                    TextTarget::Name => pkg.name.push_str(text),
                    TextTarget::Arch => pkg.arch.push_str(text),
                    TextTarget::File => pkg.files.push(text.to_string()),
                    TextTarget::None => {}
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"name" | b"arch" | b"file" => target = TextTarget::None,
                b"provides" | b"requires" | b"conflicts" | b"obsoletes" | b"recommends"
                | b"suggests" | b"supplements" | b"enhances" => section = Section::None,
                b"package" => {
                    if let Some(pkg) = current.take() {
                        if !pkg.name.is_empty() && arch_matches(&pkg.arch, arch) {
                            solvables.push(pkg);
                        }
                    }
                    section = Section::None;
                    target = TextTarget::None;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(solvables)
}

/// Unescaped attributes keyed by local name
fn attributes(element: &BytesStart<'_>) -> Result<Vec<(String, String)>, String> {
    element
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            Ok((key, value.into_owned()))
        })
        .collect()
}

fn lookup<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="2">
<package type="rpm">
  <name>bash</name>
  <arch>x86_64</arch>
  <version epoch="0" ver="5.1.8" rel="6.el9"/>
  <summary>The GNU Bourne Again shell</summary>
  <location href="Packages/b/bash-5.1.8-6.el9.x86_64.rpm"/>
  <format>
    <rpm:license>GPLv3+</rpm:license>
    <rpm:provides>
      <rpm:entry name="bash" flags="EQ" epoch="0" ver="5.1.8" rel="6.el9"/>
      <rpm:entry name="/bin/sh"/>
    </rpm:provides>
    <rpm:requires>
      <rpm:entry name="filesystem" flags="GE" epoch="0" ver="3"/>
      <rpm:entry name="rpmlib(CompressedFileNames)" flags="LE" epoch="0" ver="3.0.4" rel="1"/>
    </rpm:requires>
    <rpm:obsoletes>
      <rpm:entry name="bash-old"/>
    </rpm:obsoletes>
    <file>/usr/bin/bash</file>
  </format>
</package>
<package type="rpm">
  <name>bash</name>
  <arch>src</arch>
  <version epoch="0" ver="5.1.8" rel="6.el9"/>
  <location href="SRPMS/bash.src.rpm"/>
</package>
</metadata>"#;

    #[test]
    fn test_load_primary() {
        let solvables = load_primary(PRIMARY.as_bytes(), "http://x/", 0, Some("x86_64")).unwrap();
        assert_eq!(solvables.len(), 1);

        let bash = &solvables[0];
        assert_eq!(bash.name, "bash");
        assert_eq!(bash.arch, "x86_64");
        assert_eq!(bash.evr.to_string(), "5.1.8-6.el9");
        assert_eq!(
            bash.location.as_deref(),
            Some("Packages/b/bash-5.1.8-6.el9.x86_64.rpm")
        );
        assert_eq!(bash.provides.len(), 2);
        assert_eq!(bash.requires.len(), 2);
        assert_eq!(bash.files, vec!["/usr/bin/bash"]);
        assert_eq!(bash.nevra(), "bash-5.1.8-6.el9.x86_64");
    }

    #[test]
    fn test_arch_scoping() {
        assert!(arch_matches("x86_64", Some("x86_64")));
        assert!(arch_matches("noarch", Some("x86_64")));
        assert!(!arch_matches("aarch64", Some("x86_64")));
        assert!(!arch_matches("src", None));
        assert!(arch_matches("aarch64", None));
    }

    #[test]
    fn test_versioned_requirement() {
        let req = Dependency {
            name: "filesystem".to_string(),
            flags: Some("GE".to_string()),
            evr: Some(Evr::new(Some("0"), "3", None)),
        };
        let newer = Dependency {
            name: "filesystem".to_string(),
            flags: Some("EQ".to_string()),
            evr: Some(Evr::new(Some("0"), "3.16", Some("2.el9"))),
        };
        let older = Dependency {
            evr: Some(Evr::new(Some("0"), "2.9", Some("1"))),
            ..newer.clone()
        };
        assert!(req.is_satisfied_by(&newer));
        assert!(!req.is_satisfied_by(&older));
        assert!(req.is_satisfied_by(&Dependency::unversioned("filesystem")));
        assert_eq!(req.to_string(), "filesystem >= 3");
    }

    #[test]
    fn test_malformed_primary() {
        let err = load_primary(b"<metadata><package></metadata>", "http://x/", 0, None).unwrap_err();
        assert!(matches!(
            err,
            Error::Metadata(MetadataError::InvalidXml { .. })
        ));
    }
}
