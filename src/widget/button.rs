//! Buttons and links.

use crate::browser::{Locator, Session};
use crate::error::Result;
use crate::wait::poll_until;

use super::GenericWidget;

/// A clickable control; delete buttons also confirm the browser dialog.
#[derive(Clone)]
pub struct Button {
    widget: GenericWidget,
    confirm: bool,
}

impl Button {
    /// A button or link found by `locator`.
    pub fn new(session: &Session, locator: Locator) -> Self {
        Self {
            widget: GenericWidget::new(session, locator),
            confirm: false,
        }
    }

    /// A navigation link.
    pub fn link(session: &Session, locator: Locator) -> Self {
        Self::new(session, locator)
    }

    /// The form submit control labelled `label`.
    pub fn submit(session: &Session, label: &str) -> Self {
        Self::new(
            session,
            Locator::xpath(format!(
                "//*[@type='submit' and (contains(@value, '{label}') or contains(text(), '{label}'))]"
            )),
        )
    }

    /// The "Create" submit button.
    pub fn create(session: &Session) -> Self {
        Self::submit(session, "Create")
    }

    /// The "Update" submit button.
    pub fn update(session: &Session) -> Self {
        Self::submit(session, "Update")
    }

    /// The "Delete" button; clicking it confirms the dialog it opens.
    pub fn delete(session: &Session) -> Self {
        Self {
            widget: GenericWidget::new(
                session,
                Locator::xpath("//*[contains(@class, 'delete') and contains(text(), 'Delete')]"),
            ),
            confirm: true,
        }
    }

    /// The underlying widget.
    pub fn widget(&self) -> &GenericWidget {
        &self.widget
    }

    /// Whether the button is rendered.
    pub async fn is_displayed(&self) -> bool {
        self.widget.is_displayed().await
    }

    /// Clicks the button.
    pub async fn click(&self) -> Result<()> {
        self.widget.click(self.confirm).await
    }

    /// Clicks the button and waits for the browser to leave the current URL.
    pub async fn click_and_wait(&self) -> Result<()> {
        let session = self.widget.session();
        let before = session.current_url().await?;
        self.click().await?;

        let what = format!("navigation away from {}", before);
        let before = &before;
        poll_until(session.wait(), &what, || async move {
            session
                .current_url()
                .await
                .map(|url| url != *before)
                .unwrap_or(false)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ClickEffect, MockBrowser, MockNode};
    use crate::error::Error;
    use crate::wait::WaitConfig;
    use std::sync::Arc;
    use std::time::Duration;

    fn fast(session: Session) -> Session {
        session.with_wait(WaitConfig {
            timeout: Duration::from_millis(30),
            initial_poll: Duration::from_millis(5),
            max_poll: Duration::from_millis(5),
        })
    }

    #[tokio::test]
    async fn click_and_wait_observes_navigation() {
        let browser = Arc::new(MockBrowser::new("https://admin.test"));
        let session = fast(Session::new(browser.clone(), "https://admin.test"));
        browser.page(
            "/form",
            vec![MockNode::new(Button::create(&session).widget().locator().clone())
                .on_click(ClickEffect::Navigate("/done".to_string()))],
        );
        session.open("/form").await.unwrap();

        Button::create(&session).click_and_wait().await.unwrap();
        assert_eq!(browser.current_path(), "/done");
    }

    #[tokio::test]
    async fn click_and_wait_times_out_when_page_stays() {
        let browser = Arc::new(MockBrowser::new("https://admin.test"));
        let session = fast(Session::new(browser.clone(), "https://admin.test"));
        browser.page(
            "/form",
            vec![MockNode::new(Button::update(&session).widget().locator().clone())],
        );
        session.open("/form").await.unwrap();

        assert!(matches!(
            Button::update(&session).click_and_wait().await,
            Err(Error::Timeout(..))
        ));
    }
}
