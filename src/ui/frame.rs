//! Portal chrome and the entry views every navigation starts from.

use async_trait::async_trait;

use crate::browser::{Locator, Session};
use crate::entity::Product;
use crate::error::Result;
use crate::widget::{Button, GenericWidget, Table, TextInput};

use super::View;

/// Id of the account menu rendered on every admin page.
pub const ADMIN_MENU_ID: &str = "user_widget";

/// Id of the side navigation rendered on every product page.
pub const PRODUCT_NAV_ID: &str = "mainmenu";

/// Whether the admin portal chrome is rendered.
pub async fn admin_frame_displayed(session: &Session) -> bool {
    GenericWidget::new(session, Locator::id(ADMIN_MENU_ID))
        .is_displayed()
        .await
}

/// Whether the admin chrome and the product side navigation are rendered.
pub async fn product_frame_displayed(session: &Session) -> bool {
    admin_frame_displayed(session).await
        && GenericWidget::new(session, Locator::id(PRODUCT_NAV_ID))
            .is_displayed()
            .await
}

/// The sign-in page.
pub struct LoginView {
    session: Session,
    username: TextInput,
    password: TextInput,
    sign_in: Button,
}

impl LoginView {
    pub const PATH: &'static str = "/p/login";

    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            username: TextInput::by_id(session, "session_username"),
            password: TextInput::by_id(session, "session_password"),
            sign_in: Button::submit(session, "Sign in"),
        }
    }

    /// Signs in.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.username.fill(username).await?;
        self.password.fill(password).await?;
        self.sign_in.click().await
    }
}

#[async_trait]
impl View for LoginView {
    fn name(&self) -> &'static str {
        "LoginView"
    }

    fn path(&self) -> &str {
        Self::PATH
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        None
    }

    async fn is_displayed(&self) -> bool {
        self.session.at_path(Self::PATH).await
            && self.username.is_displayed().await
            && self.password.is_displayed().await
    }
}

/// The admin dashboard; root of the admin view tree.
pub struct DashboardView {
    session: Session,
}

impl DashboardView {
    pub const PATH: &'static str = "/p/admin/dashboard";

    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
        }
    }
}

#[async_trait]
impl View for DashboardView {
    fn name(&self) -> &'static str {
        "DashboardView"
    }

    fn path(&self) -> &str {
        Self::PATH
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        None
    }

    async fn is_displayed(&self) -> bool {
        admin_frame_displayed(&self.session).await && self.session.at_path(Self::PATH).await
    }
}

/// The product list.
pub struct ProductsView {
    session: Session,
    create_link: Button,
    table: Table,
}

impl ProductsView {
    pub const PATH: &'static str = "/apiconfig/services";

    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            create_link: Button::link(
                session,
                Locator::xpath("//a[@href='/apiconfig/services/new']"),
            ),
            table: Table::new(session, Locator::xpath("//*[@id='products']"))
                .with_column_widget(0, Locator::xpath("./a")),
        }
    }

    /// The product table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Opens the new-product form.
    pub async fn create_product(&self) -> Result<()> {
        self.create_link.click().await
    }

    /// Opens the detail page of `product`.
    pub async fn detail(&self, product: &Product) -> Result<()> {
        self.table
            .row_with_text(0, &product.name)
            .await?
            .require_widget(0)
            .await?
            .click(false)
            .await
    }
}

#[async_trait]
impl View for ProductsView {
    fn name(&self) -> &'static str {
        "ProductsView"
    }

    fn path(&self) -> &str {
        Self::PATH
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        Some(Box::new(DashboardView::new(&self.session)))
    }

    async fn is_displayed(&self) -> bool {
        admin_frame_displayed(&self.session).await
            && self.session.at_path(Self::PATH).await
            && self.table.is_displayed().await
    }
}
