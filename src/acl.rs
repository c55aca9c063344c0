//! Route-level access control.
//!
//! A route registered with [`Router::secure`](crate::Router::secure) carries a
//! permission set. The caller passes when its [`Identity`] exposes at least
//! one of those permissions. A route with an empty set is public.
//!
//! Who the caller is comes from your own middleware (session cookie, bearer
//! token, mTLS header from the proxy):
//!
//! ```rust
//! use switchyard::{Principal, Request, Response, Router};
//! use http::Method;
//!
//! fn authenticate(req: &mut Request) -> Option<Response> {
//!     if req.header("x-user").is_some() {
//!         req.set_identity(Principal::new("alice", ["admin", "billing"]));
//!     }
//!     None
//! }
//!
//! # async fn purge(_: Request) -> Response { Response::text("") }
//! let router = Router::new()
//!     .middleware(authenticate)
//!     .secure(Method::POST, "/cache/purge", ["admin"], purge);
//! ```

use http::StatusCode;

/// The caller of the current request, as seen by the access check.
pub trait Identity: Send + Sync {
    /// Permission identifiers granted to this caller.
    fn permissions(&self) -> &[String];
}

/// A plain identity: an id and the permissions it holds.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Principal {
    pub id: String,
    pub permissions: Vec<String>,
}

impl Principal {
    pub fn new<I, P>(id: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self { id: id.into(), permissions: permissions.into_iter().map(Into::into).collect() }
    }
}

impl Identity for Principal {
    fn permissions(&self) -> &[String] {
        &self.permissions
    }
}

/// Why the gate said no.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Denied {
    /// No identity on the request.
    Anonymous,
    /// An identity, but none of the required permissions.
    Forbidden,
}

impl Denied {
    /// `401` / `403` by default; a configured status replaces both.
    pub(crate) fn status(self, configured: Option<StatusCode>) -> StatusCode {
        configured.unwrap_or(match self {
            Self::Anonymous => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        })
    }
}

/// Checks `identity` against the route's `required` set.
pub(crate) fn authorize(required: &[String], identity: Option<&dyn Identity>) -> Result<(), Denied> {
    if required.is_empty() {
        return Ok(());
    }
    let identity = identity.ok_or(Denied::Anonymous)?;
    if identity.permissions().iter().any(|granted| required.contains(granted)) {
        Ok(())
    } else {
        Err(Denied::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(perms: &[&str]) -> Vec<String> {
        perms.iter().map(|p| (*p).to_owned()).collect()
    }

    #[test]
    fn empty_set_is_public() {
        assert_eq!(authorize(&[], None), Ok(()));
    }

    #[test]
    fn intersection_decides() {
        let admin = required(&["admin"]);
        let nobody = Principal::new("n", Vec::<String>::new());
        let other = Principal::new("o", ["billing"]);
        let root = Principal::new("r", ["billing", "admin"]);

        assert_eq!(authorize(&admin, None), Err(Denied::Anonymous));
        assert_eq!(authorize(&admin, Some(&nobody)), Err(Denied::Forbidden));
        assert_eq!(authorize(&admin, Some(&other)), Err(Denied::Forbidden));
        assert_eq!(authorize(&admin, Some(&root)), Ok(()));
    }

    #[test]
    fn configured_status_overrides() {
        assert_eq!(Denied::Anonymous.status(None), StatusCode::UNAUTHORIZED);
        assert_eq!(Denied::Forbidden.status(None), StatusCode::FORBIDDEN);
        assert_eq!(Denied::Anonymous.status(Some(StatusCode::NOT_FOUND)), StatusCode::NOT_FOUND);
    }
}
