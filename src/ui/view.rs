//! The page-object contract.

use async_trait::async_trait;

use crate::browser::Session;
use crate::error::Result;

/// One screen of the admin portal.
///
/// A view is built for a specific entity, which fixes its path for the
/// lifetime of the instance. Views form a tree through [`View::prerequisite`];
/// roots return `None`.
#[async_trait]
pub trait View: Send + Sync {
    /// Type name, used in logs and navigation errors.
    fn name(&self) -> &'static str;

    /// Bound path of this view.
    fn path(&self) -> &str;

    /// Session the view drives.
    fn session(&self) -> &Session;

    /// The view displayed immediately before this one.
    fn prerequisite(&self) -> Option<Box<dyn View>>;

    /// Whether the browser currently shows this view.
    ///
    /// Implementations combine the frame check, the location check and the
    /// view's signature widgets, and must not change browser state.
    async fn is_displayed(&self) -> bool;

    /// Drives the browser from the prerequisite onto this view.
    ///
    /// Views reached through an action on their prerequisite override this;
    /// the default loads the bound path.
    async fn step(&self) -> Result<()> {
        self.session().open(self.path()).await
    }
}

/// Substitutes `{name}` placeholders in `pattern`.
pub fn bind_path(pattern: &str, params: &[(&str, String)]) -> String {
    params
        .iter()
        .fold(pattern.to_string(), |path, (name, value)| {
            path.replace(&format!("{{{}}}", name), value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_replaces_named_placeholders() {
        assert_eq!(
            bind_path(
                "/apiconfig/services/{product_id}/backend_usages",
                &[("product_id", "12".to_string())]
            ),
            "/apiconfig/services/12/backend_usages"
        );
    }

    #[test]
    fn bind_leaves_static_paths_alone() {
        assert_eq!(bind_path("/apiconfig/services/new", &[]), "/apiconfig/services/new");
    }
}
