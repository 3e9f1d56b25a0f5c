//! Where the stable identity behind the client id comes from.
//!
//! The core only needs a string that stays the same across launches.
//! Persisting it is the host's concern.

use std::sync::Arc;

pub trait IdentityProvider: Send + Sync {
    fn stable_id(&self) -> String;
}

/// An identity fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity(String);

impl StaticIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl IdentityProvider for StaticIdentity {
    fn stable_id(&self) -> String {
        self.0.clone()
    }
}

impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    fn stable_id(&self) -> String {
        (**self).stable_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity() {
        let identity = StaticIdentity::new("6F9619FF-8B86-D011-B42D-00C04FC964FF");
        assert_eq!(identity.stable_id(), "6F9619FF-8B86-D011-B42D-00C04FC964FF");

        let shared: Arc<dyn IdentityProvider> = Arc::new(identity);
        assert_eq!(shared.stable_id(), "6F9619FF-8B86-D011-B42D-00C04FC964FF");
    }
}
