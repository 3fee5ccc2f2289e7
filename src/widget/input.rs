//! Form inputs: text fields, dropdowns and radio groups.

use crate::browser::{Locator, Session};
use crate::error::{Error, Result};

use super::GenericWidget;

/// A text field.
#[derive(Clone)]
pub struct TextInput {
    widget: GenericWidget,
}

impl TextInput {
    /// Field found by `locator`.
    pub fn new(session: &Session, locator: Locator) -> Self {
        Self {
            widget: GenericWidget::new(session, locator),
        }
    }

    /// Field found by its id attribute.
    pub fn by_id(session: &Session, id: &str) -> Self {
        Self::new(session, Locator::id(id))
    }

    /// Replaces the content with `value`.
    pub async fn fill(&self, value: &str) -> Result<()> {
        let element = self.widget.require_visible().await?;
        let browser = self.widget.session().browser();
        browser.clear(&element).await?;
        browser.send_keys(&element, value).await
    }

    /// Current content.
    pub async fn read(&self) -> Result<String> {
        let element = self.widget.require().await?;
        let value = self
            .widget
            .session()
            .browser()
            .property(&element, "value")
            .await?;
        Ok(value.unwrap_or_default())
    }

    /// Whether the field is rendered.
    pub async fn is_displayed(&self) -> bool {
        self.widget.is_displayed().await
    }

    /// Waits until the field is rendered.
    pub async fn wait_displayed(&self) -> Result<()> {
        self.widget.wait_displayed().await
    }
}

/// A `<select>` element.
#[derive(Clone)]
pub struct Dropdown {
    widget: GenericWidget,
}

impl Dropdown {
    /// Dropdown found by `locator`.
    pub fn new(session: &Session, locator: Locator) -> Self {
        Self {
            widget: GenericWidget::new(session, locator),
        }
    }

    /// Chooses the option whose value attribute is `value`.
    ///
    /// Fails when no such option exists or the selection did not take.
    pub async fn select_by_value(&self, value: &str) -> Result<()> {
        let select = self.widget.require_visible().await?;
        let browser = self.widget.session().browser();

        let option = browser
            .find_all(
                Some(&select),
                &Locator::option_value(value),
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::OptionNotFound {
                locator: self.widget.locator().to_string(),
                value: value.to_string(),
            })?;
        browser.click(&option).await?;

        let selected = self.selected_value().await?;
        if selected != value {
            return Err(Error::NotInteractable(format!(
                "{} kept '{}' after selecting '{}'",
                self.widget.locator(),
                selected,
                value
            )));
        }
        Ok(())
    }

    /// Value of the selected option.
    pub async fn selected_value(&self) -> Result<String> {
        let select = self.widget.require().await?;
        let value = self
            .widget
            .session()
            .browser()
            .property(&select, "value")
            .await?;
        Ok(value.unwrap_or_default())
    }

    /// Whether the dropdown is rendered.
    pub async fn is_displayed(&self) -> bool {
        self.widget.is_displayed().await
    }
}

/// A group of radio inputs with known option values.
#[derive(Clone)]
pub struct RadioGroup {
    widget: GenericWidget,
    options: Vec<String>,
}

impl RadioGroup {
    /// Group rooted at `locator` offering `options`.
    pub fn new(session: &Session, locator: Locator, options: &[&str]) -> Self {
        Self {
            widget: GenericWidget::new(session, locator),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    fn option_locator(value: &str) -> Locator {
        Locator::input_value(value)
    }

    /// Clicks each of `options` in order; any missing option is an error.
    pub async fn select(&self, options: &[&str]) -> Result<()> {
        let group = self.widget.require_visible().await?;
        let browser = self.widget.session().browser();

        for option in options {
            let input = browser
                .find_all(Some(&group), &Self::option_locator(option))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    Error::ElementNotFound(format!(
                        "radio option '{}' in {}",
                        option,
                        self.widget.locator()
                    ))
                })?;
            browser.click(&input).await?;
        }
        Ok(())
    }

    /// The checked option, if any.
    pub async fn selected(&self) -> Result<Option<String>> {
        let group = self.widget.require().await?;
        let browser = self.widget.session().browser();

        for option in &self.options {
            let inputs = browser
                .find_all(Some(&group), &Self::option_locator(option))
                .await?;
            if let Some(input) = inputs.first() {
                if browser.property(input, "checked").await?.as_deref() == Some("true") {
                    return Ok(Some(option.clone()));
                }
            }
        }
        Ok(None)
    }

    /// Whether the group is rendered.
    pub async fn is_displayed(&self) -> bool {
        self.widget.is_displayed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{MockBrowser, MockNode};
    use std::sync::Arc;

    async fn session_on(nodes: Vec<MockNode>) -> Session {
        let browser = Arc::new(MockBrowser::new("https://admin.test"));
        browser.page("/form", nodes);
        let session = Session::new(browser, "https://admin.test");
        session.open("/form").await.unwrap();
        session
    }

    #[tokio::test]
    async fn fill_replaces_existing_content() {
        let session =
            session_on(vec![MockNode::new(Locator::id("service_name")).value("old")]).await;
        let input = TextInput::by_id(&session, "service_name");

        input.fill("new name").await.unwrap();
        assert_eq!(input.read().await.unwrap(), "new name");
    }

    #[tokio::test]
    async fn fill_on_hidden_field_is_not_interactable() {
        let session = session_on(vec![MockNode::new(Locator::id("service_name")).hidden()]).await;
        let input = TextInput::by_id(&session, "service_name");

        assert!(!input.is_displayed().await);
        assert!(matches!(
            input.fill("x").await,
            Err(Error::NotInteractable(_))
        ));
    }

    #[tokio::test]
    async fn dropdown_selects_existing_value() {
        let session = session_on(vec![MockNode::new(Locator::id("backend"))
            .value("1")
            .child(MockNode::option("1", "First"))
            .child(MockNode::option("2", "Second"))])
        .await;
        let dropdown = Dropdown::new(&session, Locator::id("backend"));

        dropdown.select_by_value("2").await.unwrap();
        assert_eq!(dropdown.selected_value().await.unwrap(), "2");
    }

    #[tokio::test]
    async fn dropdown_missing_value_fails_and_keeps_selection() {
        let session = session_on(vec![MockNode::new(Locator::id("backend"))
            .value("1")
            .child(MockNode::option("1", "First"))])
        .await;
        let dropdown = Dropdown::new(&session, Locator::id("backend"));

        let err = dropdown.select_by_value("9").await.unwrap_err();
        assert!(matches!(err, Error::OptionNotFound { ref value, .. } if value == "9"));
        assert_eq!(dropdown.selected_value().await.unwrap(), "1");
    }

    #[tokio::test]
    async fn dropdown_values_with_quotes_are_matched_exactly() {
        let session = session_on(vec![MockNode::new(Locator::id("backend"))
            .value("1")
            .child(MockNode::option("1", "First"))
            .child(MockNode::option(r#"say "hi""#, "Quoted"))])
        .await;
        let dropdown = Dropdown::new(&session, Locator::id("backend"));

        dropdown.select_by_value(r#"say "hi""#).await.unwrap();
        assert_eq!(dropdown.selected_value().await.unwrap(), r#"say "hi""#);

        let err = dropdown.select_by_value(r#"1"]"#).await.unwrap_err();
        assert!(matches!(err, Error::OptionNotFound { ref value, .. } if value == r#"1"]"#));
    }

    #[tokio::test]
    async fn radio_select_switches_choice() {
        let session = session_on(vec![MockNode::new(Locator::id("deployment"))
            .child(MockNode::radio("hosted").checked())
            .child(MockNode::radio("self_managed"))])
        .await;
        let radio = RadioGroup::new(
            &session,
            Locator::id("deployment"),
            &["hosted", "self_managed"],
        );

        assert_eq!(radio.selected().await.unwrap().as_deref(), Some("hosted"));
        radio.select(&["self_managed"]).await.unwrap();
        assert_eq!(
            radio.selected().await.unwrap().as_deref(),
            Some("self_managed")
        );
    }

    #[tokio::test]
    async fn radio_unknown_option_fails() {
        let session = session_on(vec![
            MockNode::new(Locator::id("deployment")).child(MockNode::radio("hosted"))
        ])
        .await;
        let radio = RadioGroup::new(&session, Locator::id("deployment"), &["hosted"]);

        assert!(matches!(
            radio.select(&["service_mesh_istio"]).await,
            Err(Error::ElementNotFound(_))
        ));
    }
}
