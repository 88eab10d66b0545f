//! Corrective note generation for incomplete package records.
//!
//! Note text is pure: it depends only on a package's fields, so generating
//! a note twice yields identical text and deduplication is safe.

use crate::model::Package;

/// Message recorded when a layer yields no packages. `{layer}` is
/// substituted with the layer identifier.
const NO_PACKAGES: &str = "Unable to recover packages for layer {layer}. \
Consider entering them manually or extending the knowledge base.";

const NO_VERSION: &str = "No version for package {package}. \
Consider entering it manually or extending the knowledge base.";

const NO_LICENSE: &str = "No license for package {package}. \
Consider entering it manually or extending the knowledge base.";

const NO_SOURCE_URL: &str = "No source url for package {package}. \
Consider entering it manually or extending the knowledge base.";

const BUILD_FAILED: &str = "Docker build failed: {build_fail_msg}\n\
Since the image cannot be built, packages will be retrieved from the Dockerfile\n\
itself.";

/// Placeholder layer identifier for RUN instructions that matched no
/// history entry.
pub const UNATTRIBUTED_LAYER: &str = "unknown";

/// Fallback narrative recorded when the image build failed.
pub fn build_failure_note(build_fail_msg: &str) -> String {
    BUILD_FAILED.replace("{build_fail_msg}", build_fail_msg)
}

/// Note for a layer no packages could be recovered for.
pub fn no_packages_note(layer: &str) -> String {
    NO_PACKAGES.replace("{layer}", layer)
}

/// One note per missing field, in version / license / source-url order.
///
/// Idempotent: the output depends only on the package's fields.
pub fn missing_field_notes(package: &Package) -> Vec<String> {
    let mut notes = Vec::new();
    if package.version.is_none() {
        notes.push(NO_VERSION.replace("{package}", &package.name));
    }
    if package.license.is_none() {
        notes.push(NO_LICENSE.replace("{package}", &package.name));
    }
    if package.source_url.is_none() {
        notes.push(NO_SOURCE_URL.replace("{package}", &package.name));
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_package_generates_no_notes() {
        let pkg = Package {
            name: "bash".to_string(),
            version: Some("5.0".to_string()),
            license: Some("GPL".to_string()),
            source_url: Some("https://www.gnu.org/software/bash/".to_string()),
        };
        assert!(missing_field_notes(&pkg).is_empty());
    }

    #[test]
    fn test_one_note_per_missing_field() {
        let notes = missing_field_notes(&Package::bare("curl"));
        assert_eq!(notes.len(), 3);
        assert!(notes[0].starts_with("No version for package curl."));
        assert!(notes[1].starts_with("No license for package curl."));
        assert!(notes[2].starts_with("No source url for package curl."));
        for note in &notes {
            assert!(note.contains("curl"));
        }
    }

    #[test]
    fn test_single_missing_field() {
        let pkg = Package {
            name: "wget".to_string(),
            version: Some("1.21".to_string()),
            license: None,
            source_url: Some("https://www.gnu.org/software/wget/".to_string()),
        };
        let notes = missing_field_notes(&pkg);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("No license for package wget."));
    }

    #[test]
    fn test_notes_are_idempotent() {
        let pkg = Package::bare("curl");
        assert_eq!(missing_field_notes(&pkg), missing_field_notes(&pkg));
    }

    #[test]
    fn test_no_packages_note_substitutes_layer() {
        let note = no_packages_note("sha256:abcdef");
        assert!(note.contains("for layer sha256:abcdef."));
        assert!(!note.contains("{layer}"));
    }

    #[test]
    fn test_build_failure_note_substitutes_message() {
        let note = build_failure_note("context deadline exceeded");
        assert!(note.starts_with("Docker build failed: context deadline exceeded\n"));
        assert!(note.contains("retrieved from the Dockerfile"));
        assert!(!note.contains("{build_fail_msg}"));
    }
}
