//! Profile reference resolution
//!
//! Only local filesystem profiles are supported: `./relative` references are
//! resolved against the working directory, `/absolute` ones are used as is.
//! A missing extension is retried as `.yaml` then `.yml`.

use crate::error::{ContainmeError, ContainmeResult};
use crate::spec::profile::ProfileSpec;
use std::path::{Path, PathBuf};
use tracing::debug;

const PROFILE_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// A resolved profile document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLocation {
    /// Profile file on the local filesystem
    Local(PathBuf),
}

impl ProfileLocation {
    /// Load and parse the profile
    pub async fn load(&self) -> ContainmeResult<ProfileSpec> {
        match self {
            Self::Local(path) => ProfileSpec::from_file(path).await,
        }
    }
}

/// Map a profile reference to its document
pub fn resolve_reference(reference: &str, cwd: &Path) -> ContainmeResult<ProfileLocation> {
    let path = if let Some(relative) = reference.strip_prefix("./") {
        cwd.join(relative)
    } else if reference.starts_with('/') {
        PathBuf::from(reference)
    } else {
        return Err(ContainmeError::ProfileStrategy(reference.to_string()));
    };

    if path.is_file() {
        debug!("Resolved profile {} to {}", reference, path.display());
        return Ok(ProfileLocation::Local(path));
    }

    for ext in PROFILE_EXTENSIONS {
        let mut candidate = path.clone().into_os_string();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            debug!("Resolved profile {} to {}", reference, candidate.display());
            return Ok(ProfileLocation::Local(candidate));
        }
    }

    Err(ContainmeError::ProfileNotFound(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn relative_reference_with_extension_fallback() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("profiles")).unwrap();
        let file = temp.path().join("profiles/java.yml");
        fs::write(&file, "image: maven:3\n").unwrap();

        let location = resolve_reference("./profiles/java", temp.path()).unwrap();
        assert_eq!(location, ProfileLocation::Local(file));
    }

    #[test]
    fn yaml_preferred_over_yml() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("go.yaml"), "image: golang\n").unwrap();
        fs::write(temp.path().join("go.yml"), "image: golang\n").unwrap();

        let reference = temp.path().join("go");
        let location = resolve_reference(reference.to_str().unwrap(), Path::new("/")).unwrap();
        assert_eq!(location, ProfileLocation::Local(temp.path().join("go.yaml")));
    }

    #[test]
    fn verbatim_path_wins() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("node.profile");
        fs::write(&file, "image: node\n").unwrap();

        let location = resolve_reference(file.to_str().unwrap(), Path::new("/")).unwrap();
        assert_eq!(location, ProfileLocation::Local(file));
    }

    #[test]
    fn missing_profile_names_attempted_path() {
        let temp = TempDir::new().unwrap();
        let err = resolve_reference("./nope", temp.path()).unwrap_err();
        match err {
            ContainmeError::ProfileNotFound(path) => assert_eq!(path, temp.path().join("nope")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bare_reference_is_unsupported() {
        let err = resolve_reference("containme/profiles/example", Path::new("/")).unwrap_err();
        assert!(matches!(err, ContainmeError::ProfileStrategy(_)));
    }

    #[tokio::test]
    async fn load_local_profile() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("ruby.yaml"), "image: ruby:3\nworkspace: /app\n").unwrap();

        let profile = resolve_reference("./ruby", temp.path())
            .unwrap()
            .load()
            .await
            .unwrap();
        assert_eq!(profile.image, "ruby:3");
        assert_eq!(profile.workspace, "/app");
    }
}
