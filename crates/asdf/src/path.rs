//! Slash-separated object paths.
//!
//! A path names an object by the link names leading to it from the root
//! group. A leading `/` is optional, `""` and `"/"` name the root, and `.`
//! segments are ignored. Empty segments are malformed.

use crate::error::{Error, Result};

/// Longest link name a container accepts, in bytes.
pub const MAX_NAME_LEN: usize = 1024;

/// Join `name` onto `path` with a single separator.
///
/// ```
/// use asdf::extend_path;
///
/// assert_eq!(extend_path("Waveforms", "AAA"), "Waveforms/AAA");
/// assert_eq!(extend_path("/Waveforms/", "AAA"), "/Waveforms/AAA");
/// assert_eq!(extend_path("", "QuakeML"), "QuakeML");
/// ```
pub fn extend_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else if path.ends_with('/') {
        format!("{path}{name}")
    } else {
        format!("{path}/{name}")
    }
}

/// Link names along `path`, root first.
pub(crate) fn components(path: &str) -> Result<Vec<&str>> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment.contains('\0') {
            return Err(Error::MalformedPath(path.to_string()));
        }
        if segment != "." {
            parts.push(segment);
        }
    }
    Ok(parts)
}

/// Check a name for a new link.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name.contains('/')
        || name.contains('\0')
        || name.len() > MAX_NAME_LEN
    {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Reject text that cannot be stored NUL-terminated.
pub(crate) fn reject_nul(what: &str, text: &str) -> Result<()> {
    if text.contains('\0') {
        return Err(Error::EmbeddedNul(what.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_forms() {
        assert!(components("").unwrap().is_empty());
        assert!(components("/").unwrap().is_empty());
    }

    #[test]
    fn absolute_and_relative_agree() {
        assert_eq!(components("/Waveforms/AAA").unwrap(), vec!["Waveforms", "AAA"]);
        assert_eq!(components("Waveforms/AAA").unwrap(), vec!["Waveforms", "AAA"]);
        assert_eq!(components("./Waveforms/./AAA").unwrap(), vec!["Waveforms", "AAA"]);
    }

    #[test]
    fn empty_segments_are_malformed() {
        for bad in ["//Waveforms", "Waveforms//AAA", "Waveforms/", "a\0b"] {
            assert!(
                matches!(components(bad), Err(Error::MalformedPath(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn names() {
        assert!(validate_name("AAA").is_ok());
        assert!(validate_name("XX.STA").is_ok());
        for bad in ["", ".", "a/b", "a\0"] {
            assert!(matches!(validate_name(bad), Err(Error::InvalidName(_))));
        }
        assert!(validate_name(&"n".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn extend() {
        assert_eq!(extend_path("/", "Waveforms"), "/Waveforms");
        assert_eq!(extend_path("Waveforms/AAA", "data"), "Waveforms/AAA/data");
    }

    #[test]
    fn nul_detection() {
        assert!(reject_nul("QuakeML", "<q/>").is_ok());
        assert!(matches!(reject_nul("QuakeML", "<q\0/>"), Err(Error::EmbeddedNul(_))));
    }
}
