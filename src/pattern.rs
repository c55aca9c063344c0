//! Route pattern compiler.
//!
//! A pattern is split on `/` and every piece is classified:
//!
//! ```text
//!  Syntax                Segment
//!  users                 Static("users")
//!  (repos|repo)          Group(["repos", "repo"])
//!  :id   {id}            Param { name: "id", validator: None }
//!  {id:number}           Param { name: "id", validator: Some("number") }
//!  *rest                 CatchAll("rest")
//!  *                     CatchAll("path")
//! ```

use crate::error::RouteError;

/// Capture name used by a bare `*`.
pub(crate) const DEFAULT_CATCH_ALL: &str = "path";

/// One compiled path segment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Segment {
    Static(String),
    Group(Vec<String>),
    Param { name: String, validator: Option<String> },
    CatchAll(String),
}

/// Compiles `pattern` into its segment list. The root pattern `/` compiles
/// to an empty list.
pub(crate) fn compile(pattern: &str) -> Result<Vec<Segment>, RouteError> {
    let invalid = |reason| RouteError::InvalidPattern { pattern: pattern.to_owned(), reason };

    if !pattern.starts_with('/') {
        return Err(invalid("patterns must begin with `/`"));
    }

    let trimmed = normalize(pattern);
    if trimmed == "/" {
        return Ok(Vec::new());
    }

    let pieces: Vec<&str> = trimmed[1..].split('/').collect();
    let mut segments = Vec::with_capacity(pieces.len());

    for (i, piece) in pieces.iter().enumerate() {
        let segment = classify(piece).map_err(invalid)?;
        if matches!(segment, Segment::CatchAll(_)) && i + 1 != pieces.len() {
            return Err(RouteError::InvalidCatchAll { pattern: pattern.to_owned() });
        }
        segments.push(segment);
    }

    Ok(segments)
}

/// Trims trailing slashes down to a minimum length of one.
pub(crate) fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { &path[..path.len().min(1)] } else { trimmed }
}

fn classify(piece: &str) -> Result<Segment, &'static str> {
    if piece.is_empty() {
        return Err("empty path segment");
    }

    if let Some(name) = piece.strip_prefix('*') {
        let name = if name.is_empty() { DEFAULT_CATCH_ALL } else { name };
        return Ok(Segment::CatchAll(name.to_owned()));
    }

    if let Some(name) = piece.strip_prefix(':') {
        if name.is_empty() {
            return Err("parameters must be registered with a name");
        }
        return Ok(Segment::Param { name: name.to_owned(), validator: None });
    }

    if let Some(inner) = piece.strip_prefix('{') {
        let inner = inner.strip_suffix('}').ok_or("unterminated `{` parameter")?;
        let (name, validator) = match inner.split_once(':') {
            Some((name, validator)) => {
                if validator.is_empty() {
                    return Err("empty validator name");
                }
                (name, Some(validator.to_owned()))
            }
            None => (inner, None),
        };
        if name.is_empty() {
            return Err("parameters must be registered with a name");
        }
        return Ok(Segment::Param { name: name.to_owned(), validator });
    }

    if let Some(inner) = piece.strip_prefix('(') {
        let inner = inner.strip_suffix(')').ok_or("unterminated `(` group")?;
        let alternatives: Vec<String> = inner.split('|').map(str::to_owned).collect();
        if alternatives.iter().any(String::is_empty) {
            return Err("empty alternative in group");
        }
        return Ok(Segment::Group(alternatives));
    }

    Ok(Segment::Static(piece.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, validator: Option<&str>) -> Segment {
        Segment::Param { name: name.to_owned(), validator: validator.map(str::to_owned) }
    }

    #[test]
    fn compiles_every_segment_kind() {
        let segments = compile("/(repos|repo)/:owner/{id:number}/files/*").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Group(vec!["repos".into(), "repo".into()]),
                param("owner", None),
                param("id", Some("number")),
                Segment::Static("files".into()),
                Segment::CatchAll("path".into()),
            ]
        );
    }

    #[test]
    fn root_and_trailing_slashes() {
        assert!(compile("/").unwrap().is_empty());
        assert!(compile("///").unwrap().is_empty());
        assert_eq!(compile("/users/").unwrap(), vec![Segment::Static("users".into())]);
        assert_eq!(compile("/{id}").unwrap(), vec![param("id", None)]);
    }

    #[test]
    fn catch_all_must_be_last() {
        assert_eq!(
            compile("/assets/*rest/more"),
            Err(RouteError::InvalidCatchAll { pattern: "/assets/*rest/more".into() })
        );
        assert_eq!(compile("/assets/*rest").unwrap()[1], Segment::CatchAll("rest".into()));
    }

    #[test]
    fn rejects_malformed_patterns() {
        for pattern in ["users", "/a//b", "/:", "/{}", "/{id", "/{id:}", "/(a|)", "/(a|b"] {
            assert!(
                matches!(compile(pattern), Err(RouteError::InvalidPattern { .. })),
                "`{pattern}` should be rejected"
            );
        }
    }

    #[test]
    fn normalize_keeps_root() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("//"), "/");
        assert_eq!(normalize("/a/b//"), "/a/b");
        assert_eq!(normalize(""), "");
    }
}
