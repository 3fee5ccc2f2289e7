//! Typed wrappers over UI elements.
//!
//! A widget is a locator bound to a [`Session`] and, optionally, to a parent
//! element it is resolved inside. Locating happens on every call, so a widget
//! never holds a stale element. Actions on missing or hidden elements fail
//! with [`Error::ElementNotFound`] or [`Error::NotInteractable`].

mod button;
mod input;
pub mod table;

pub use button::Button;
pub use input::{Dropdown, RadioGroup, TextInput};
pub use table::{Row, Table};

use crate::browser::{ElementRef, Locator, Session};
use crate::error::{Error, Result};
use crate::wait::poll_until;

/// A located element with no kind-specific behavior.
#[derive(Clone)]
pub struct GenericWidget {
    session: Session,
    locator: Locator,
    scope: Option<ElementRef>,
}

impl GenericWidget {
    /// Widget found from the document root.
    pub fn new(session: &Session, locator: Locator) -> Self {
        Self {
            session: session.clone(),
            locator,
            scope: None,
        }
    }

    /// Widget found inside `scope`.
    pub fn scoped(session: &Session, locator: Locator, scope: ElementRef) -> Self {
        Self {
            session: session.clone(),
            locator,
            scope: Some(scope),
        }
    }

    /// The session this widget acts through.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The locator.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// First matching element, if any.
    pub async fn find(&self) -> Result<Option<ElementRef>> {
        let found = self
            .session
            .browser()
            .find_all(self.scope.as_ref(), &self.locator)
            .await?;
        Ok(found.into_iter().next())
    }

    /// First matching element; missing is an error.
    pub async fn require(&self) -> Result<ElementRef> {
        self.find()
            .await?
            .ok_or_else(|| Error::ElementNotFound(self.locator.to_string()))
    }

    /// First matching element that is rendered; hidden is an error.
    pub async fn require_visible(&self) -> Result<ElementRef> {
        let element = self.require().await?;
        if !self.session.browser().is_displayed(&element).await? {
            return Err(Error::NotInteractable(self.locator.to_string()));
        }
        Ok(element)
    }

    /// Whether the element is present and visible. Never fails.
    pub async fn is_displayed(&self) -> bool {
        match self.find().await {
            Ok(Some(element)) => self
                .session
                .browser()
                .is_displayed(&element)
                .await
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Waits until the element is displayed.
    pub async fn wait_displayed(&self) -> Result<()> {
        let what = format!("{} to be displayed", self.locator);
        poll_until(self.session.wait(), &what, || self.is_displayed()).await
    }

    /// Rendered text.
    pub async fn text(&self) -> Result<String> {
        let element = self.require().await?;
        self.session.browser().text(&element).await
    }

    /// Clicks the element, accepting the confirmation dialog when
    /// `handle_alert` is set.
    pub async fn click(&self, handle_alert: bool) -> Result<()> {
        let element = self.require_visible().await?;
        tracing::debug!(locator = %self.locator, "click");
        self.session.browser().click(&element).await?;
        if handle_alert {
            self.session.browser().accept_alert().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ClickEffect, MockBrowser, MockNode};
    use crate::wait::WaitConfig;
    use std::sync::Arc;
    use std::time::Duration;

    fn session(browser: Arc<MockBrowser>) -> Session {
        Session::new(browser, "https://admin.test").with_wait(WaitConfig {
            timeout: Duration::from_millis(30),
            initial_poll: Duration::from_millis(5),
            max_poll: Duration::from_millis(5),
        })
    }

    #[tokio::test]
    async fn missing_widget_fails_instead_of_noop() {
        let browser = Arc::new(MockBrowser::new("https://admin.test"));
        let session = session(browser);
        session.open("/empty").await.unwrap();

        let widget = GenericWidget::new(&session, Locator::id("absent"));
        assert!(!widget.is_displayed().await);
        assert!(matches!(
            widget.click(false).await,
            Err(Error::ElementNotFound(_))
        ));
        assert!(matches!(
            widget.wait_displayed().await,
            Err(Error::Timeout(..))
        ));
    }

    #[tokio::test]
    async fn click_with_alert_accepts_dialog() {
        let browser = Arc::new(MockBrowser::new("https://admin.test"));
        browser.page(
            "/p",
            vec![MockNode::new(Locator::id("rm")).on_click(ClickEffect::Confirm(vec![
                ClickEffect::Navigate("/gone".to_string()),
            ]))],
        );
        let session = session(browser.clone());
        session.open("/p").await.unwrap();

        GenericWidget::new(&session, Locator::id("rm"))
            .click(true)
            .await
            .unwrap();

        assert!(!browser.alert_open());
        assert_eq!(browser.current_path(), "/gone");
    }
}
