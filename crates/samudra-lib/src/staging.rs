//! Output staging: the transient workspace the engines write into and the
//! destination area that consumers read published artifacts from.
//!
//! Publishing copies rather than moves, so the workspace keeps the original
//! of every artifact until the pipeline explicitly tears it down. Each copy
//! lands in a temporary file inside the destination first and is renamed into
//! place, which keeps readers from ever seeing a half-written artifact.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// File in the destination area recording the names written by the last publish.
pub const MANIFEST_FILE_NAME: &str = ".samudra-manifest.json";

/// Handle to a named file produced by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Artifact {
    name: String,
    path: PathBuf,
}

impl Artifact {
    /// Create a handle for `name` inside `dir`.
    pub fn in_dir(dir: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        let path = dir.join(&name);
        Self { name, path }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Outcome of a publish call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Names copied into the destination area, in publish order.
    pub copied: Vec<String>,
    /// Names that were not present in the workspace and were skipped.
    pub skipped: Vec<String>,
}

/// Persisted record of the most recent publish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishManifest {
    /// RFC 3339 timestamp of the publish.
    pub published_at: String,
    /// Artifact names written to the destination area.
    pub artifacts: Vec<String>,
}

/// Owner of the workspace, auxiliary output directory, and destination area.
#[derive(Debug, Clone)]
pub struct OutputStaging {
    workspace: PathBuf,
    aux_dir: PathBuf,
    destination: PathBuf,
}

impl OutputStaging {
    pub fn new(
        workspace: impl Into<PathBuf>,
        aux_dir_name: &str,
        destination: impl Into<PathBuf>,
    ) -> Self {
        let workspace = workspace.into();
        let aux_dir = workspace.join(aux_dir_name);
        Self {
            workspace,
            aux_dir,
            destination: destination.into(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn aux_dir(&self) -> &Path {
        &self.aux_dir
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Handle for `name` inside the workspace.
    pub fn workspace_artifact(&self, name: impl Into<String>) -> Artifact {
        Artifact::in_dir(&self.workspace, name)
    }

    /// Create the workspace, auxiliary, and destination directories if needed.
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.workspace, &self.aux_dir, &self.destination] {
            fs::create_dir_all(dir).map_err(|err| Error::filesystem("create directory", dir, err))?;
        }
        Ok(())
    }

    /// Delete each named file from the workspace and the destination area.
    ///
    /// Missing files are not an error. Returns the number of files removed.
    pub fn reset<I, S>(&self, names: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut removed = 0;
        for name in names {
            let name = checked_name(name.as_ref())?;
            for dir in [&self.workspace, &self.destination] {
                let path = dir.join(name);
                match fs::remove_file(&path) {
                    Ok(()) => {
                        debug!(path = %path.display(), "removed stale artifact");
                        removed += 1;
                    }
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => return Err(Error::filesystem("remove", path, err)),
                }
            }
        }
        Ok(removed)
    }

    /// Confirm every named artifact exists in the workspace.
    ///
    /// Fails with [`Error::IncompleteOutput`] listing all missing names.
    pub fn verify_present<I, S>(&self, names: I) -> Result<Vec<Artifact>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut present = Vec::new();
        let mut missing = Vec::new();
        for name in names {
            let name = checked_name(name.as_ref())?;
            let artifact = self.workspace_artifact(name);
            if artifact.exists() {
                present.push(artifact);
            } else {
                missing.push(name.to_string());
            }
        }

        if !missing.is_empty() {
            return Err(Error::IncompleteOutput { missing });
        }
        Ok(present)
    }

    /// Copy each existing artifact into the destination area, keeping its name.
    ///
    /// Artifacts that do not exist are skipped, not treated as failures.
    pub fn publish(&self, artifacts: &[Artifact]) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        for artifact in artifacts {
            checked_name(artifact.name())?;
            if !artifact.exists() {
                debug!(artifact = artifact.name(), "artifact absent, skipping publish");
                report.skipped.push(artifact.name().to_string());
                continue;
            }
            self.copy_into_destination(artifact)?;
            report.copied.push(artifact.name().to_string());
        }
        Ok(report)
    }

    /// Publish every regular file found directly inside `dir`, in name order.
    pub fn publish_directory(&self, dir: &Path) -> Result<PublishReport> {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "auxiliary output directory does not exist");
            return Ok(PublishReport::default());
        }
        let artifacts = list_files(dir)?;
        self.publish(&artifacts)
    }

    /// Remove `dir` recursively and recreate it empty.
    pub fn teardown_workspace_dir(&self, dir: &Path) -> Result<()> {
        match fs::remove_dir_all(dir) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(Error::filesystem("remove directory", dir, err)),
        }
        fs::create_dir_all(dir).map_err(|err| Error::filesystem("create directory", dir, err))?;
        debug!(dir = %dir.display(), "workspace directory reset");
        Ok(())
    }

    /// Atomically record the names written by the latest publish.
    pub fn write_manifest(&self, artifacts: &[String]) -> Result<()> {
        let manifest = PublishManifest {
            published_at: chrono::Utc::now().to_rfc3339(),
            artifacts: artifacts.to_vec(),
        };
        let target = self.destination.join(MANIFEST_FILE_NAME);
        let mut staged = NamedTempFile::new_in(&self.destination)
            .map_err(|err| Error::filesystem("create temporary file in", &self.destination, err))?;
        serde_json::to_writer_pretty(&mut staged, &manifest)?;
        staged
            .flush()
            .map_err(|err| Error::filesystem("write", staged.path().to_path_buf(), err))?;
        staged
            .persist(&target)
            .map_err(|err| Error::filesystem("persist", &target, err.error))?;
        info!(artifacts = artifacts.len(), "publish manifest written");
        Ok(())
    }

    /// Names recorded by the previous publish.
    ///
    /// A missing manifest reads as empty; an unreadable one is logged and
    /// also treated as empty so a corrupt file never blocks a new run.
    pub fn read_manifest(&self) -> Vec<String> {
        let path = self.destination.join(MANIFEST_FILE_NAME);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read publish manifest");
                return Vec::new();
            }
        };

        match serde_json::from_str::<PublishManifest>(&contents) {
            Ok(manifest) => manifest
                .artifacts
                .into_iter()
                .filter(|name| checked_name(name).is_ok())
                .collect(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring corrupt publish manifest");
                Vec::new()
            }
        }
    }

    fn copy_into_destination(&self, artifact: &Artifact) -> Result<()> {
        let target = self.destination.join(artifact.name());
        let mut staged = NamedTempFile::new_in(&self.destination)
            .map_err(|err| Error::filesystem("create temporary file in", &self.destination, err))?;
        let mut source = fs::File::open(artifact.path())
            .map_err(|err| Error::filesystem("open", artifact.path(), err))?;
        io::copy(&mut source, &mut staged)
            .map_err(|err| Error::filesystem("copy", artifact.path(), err))?;
        staged
            .persist(&target)
            .map_err(|err| Error::filesystem("persist", &target, err.error))?;
        debug!(artifact = artifact.name(), target = %target.display(), "published artifact");
        Ok(())
    }
}

/// Regular files directly inside `dir`, sorted by name.
pub(crate) fn list_files(dir: &Path) -> Result<Vec<Artifact>> {
    let entries = fs::read_dir(dir).map_err(|err| Error::filesystem("list", dir, err))?;
    let mut names = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|err| Error::filesystem("list", dir, err))?;
        let file_type = entry
            .file_type()
            .map_err(|err| Error::filesystem("inspect", entry.path(), err))?;
        if !file_type.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => {
                names.insert(name);
            }
            Err(raw) => warn!(name = ?raw, "skipping artifact with non UTF-8 name"),
        }
    }
    Ok(names
        .into_iter()
        .map(|name| Artifact::in_dir(dir, name))
        .collect())
}

fn checked_name(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(Error::InvalidArtifactName {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn staging() -> (TempDir, OutputStaging) {
        let root = TempDir::new().unwrap();
        let staging = OutputStaging::new(
            root.path().join("work"),
            "output",
            root.path().join("public"),
        );
        staging.prepare().unwrap();
        (root, staging)
    }

    #[test]
    fn reset_removes_from_workspace_and_destination() {
        let (_root, staging) = staging();
        fs::write(staging.workspace().join("results.csv"), "1,2\n").unwrap();
        fs::write(staging.destination().join("results.csv"), "1,2\n").unwrap();

        let removed = staging.reset(["results.csv", "path_fuel.csv"]).unwrap();
        assert_eq!(removed, 2);
        assert!(!staging.workspace().join("results.csv").exists());
        assert!(!staging.destination().join("results.csv").exists());

        // Second call is a no-op.
        assert_eq!(staging.reset(["results.csv"]).unwrap(), 0);
    }

    #[test]
    fn reset_rejects_path_like_names() {
        let (_root, staging) = staging();
        for name in ["../escape.csv", "nested/file.csv", "/etc/passwd", ""] {
            assert!(
                matches!(staging.reset([name]), Err(Error::InvalidArtifactName { .. })),
                "{name} accepted"
            );
        }
    }

    #[test]
    fn verify_present_reports_all_missing() {
        let (_root, staging) = staging();
        fs::write(staging.workspace().join("path_safe.csv"), "1,2\n").unwrap();

        let err = staging
            .verify_present(["path_fuel.csv", "path_safe.csv", "path_short.csv"])
            .unwrap_err();
        match err {
            Error::IncompleteOutput { missing } => {
                assert_eq!(missing, vec!["path_fuel.csv", "path_short.csv"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn verify_present_returns_handles() {
        let (_root, staging) = staging();
        fs::write(staging.workspace().join("path_safe.csv"), "1,2\n").unwrap();
        let artifacts = staging.verify_present(["path_safe.csv"]).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].name(), "path_safe.csv");
        assert_eq!(artifacts[0].path(), staging.workspace().join("path_safe.csv"));
    }

    #[test]
    fn teardown_recreates_missing_directory() {
        let (_root, staging) = staging();
        let scratch = staging.workspace().join("scratch");
        staging.teardown_workspace_dir(&scratch).unwrap();
        assert!(scratch.is_dir());

        fs::create_dir_all(scratch.join("nested")).unwrap();
        fs::write(scratch.join("nested/data.csv"), "x").unwrap();
        staging.teardown_workspace_dir(&scratch).unwrap();
        assert!(scratch.is_dir());
        assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[test]
    fn publish_directory_skips_subdirectories() {
        let (_root, staging) = staging();
        fs::write(staging.aux_dir().join("path_1_smoothed.csv"), "1,2\n").unwrap();
        fs::create_dir_all(staging.aux_dir().join("plots")).unwrap();

        let report = staging.publish_directory(staging.aux_dir()).unwrap();
        assert_eq!(report.copied, vec!["path_1_smoothed.csv"]);
        assert!(!staging.destination().join("plots").exists());
    }

    #[test]
    fn manifest_round_trip_and_corruption() {
        let (_root, staging) = staging();
        assert!(staging.read_manifest().is_empty());

        staging
            .write_manifest(&["path_1_smoothed.csv".to_string(), "results.csv".to_string()])
            .unwrap();
        assert_eq!(
            staging.read_manifest(),
            vec!["path_1_smoothed.csv", "results.csv"]
        );

        fs::write(staging.destination().join(MANIFEST_FILE_NAME), "{not json").unwrap();
        assert!(staging.read_manifest().is_empty());
    }
}
