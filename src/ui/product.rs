//! Product screens of the admin portal.
//!
//! Every view here is bound to one product (or one of its application plans)
//! at construction. Views that are reached by clicking something on their
//! prerequisite step through that action; the rest load their URL.

use async_trait::async_trait;

use crate::browser::{Locator, Session};
use crate::entity::{ApplicationPlan, Backend, Product};
use crate::error::Result;
use crate::widget::{Button, Dropdown, RadioGroup, Table, TextInput};

use super::frame::{admin_frame_displayed, product_frame_displayed, ProductsView};
use super::{bind_path, View};

pub const EDIT_LINK_XPATH: &str = "//*[@id='content']/section/div/a";
pub const ADD_BACKEND_LINK_XPATH: &str = "//*[contains(@href,'/backend_usages/new')]";
pub const BACKENDS_TABLE_XPATH: &str = "//*[@id='backend_api_configs']";
pub const REMOVE_BACKEND_XPATH: &str = "./a[contains(@class, 'delete')]";
pub const BACKEND_SELECT_XPATH: &str = "//*[@id='backend_api_config_backend_api_id']";
pub const DEPLOYMENT_RADIO_XPATH: &str = "//*[@id=\"service_deployment_option_input\"]";
pub const PLANS_TABLE_XPATH: &str = ".//*[@id='plans']";
pub const PLAN_METRICS_XPATH: &str = ".//*[@id='metrics']";
pub const NAME_LINK_XPATH: &str = "./a";

fn product_path(pattern: &str, product: &Product) -> String {
    bind_path(pattern, &[("product_id", product.entity_id.to_string())])
}

/// Product chrome is up and the browser is at `path`.
async fn on_product_screen(session: &Session, path: &str) -> bool {
    product_frame_displayed(session).await && session.at_path(path).await
}

/// Where a product's gateway runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentOption {
    Hosted,
    SelfManaged,
    ServiceMeshIstio,
}

impl DeploymentOption {
    pub const ALL: [DeploymentOption; 3] = [
        DeploymentOption::Hosted,
        DeploymentOption::SelfManaged,
        DeploymentOption::ServiceMeshIstio,
    ];

    /// Value of the matching radio input.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentOption::Hosted => "hosted",
            DeploymentOption::SelfManaged => "self_managed",
            DeploymentOption::ServiceMeshIstio => "service_mesh_istio",
        }
    }
}

/// Overview page of one product.
pub struct ProductDetailView {
    session: Session,
    product: Product,
    path: String,
    edit_link: Button,
}

impl ProductDetailView {
    pub const PATH_PATTERN: &'static str = "/apiconfig/services/{product_id}";

    pub fn new(session: &Session, product: &Product) -> Self {
        Self {
            session: session.clone(),
            product: product.clone(),
            path: product_path(Self::PATH_PATTERN, product),
            edit_link: Button::link(session, Locator::xpath(EDIT_LINK_XPATH)),
        }
    }

    /// Opens the edit form.
    pub async fn edit(&self) -> Result<()> {
        self.edit_link.click().await
    }
}

#[async_trait]
impl View for ProductDetailView {
    fn name(&self) -> &'static str {
        "ProductDetailView"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        Some(Box::new(ProductsView::new(&self.session)))
    }

    async fn is_displayed(&self) -> bool {
        on_product_screen(&self.session, &self.path).await && self.edit_link.is_displayed().await
    }

    async fn step(&self) -> Result<()> {
        ProductsView::new(&self.session).detail(&self.product).await
    }
}

/// Form creating a product.
pub struct ProductNewView {
    session: Session,
    name: TextInput,
    system_name: TextInput,
    description: TextInput,
    create_button: Button,
}

impl ProductNewView {
    pub const PATH: &'static str = "/apiconfig/services/new";

    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            name: TextInput::by_id(session, "service_name"),
            system_name: TextInput::by_id(session, "service_system_name"),
            description: TextInput::by_id(session, "service_description"),
            create_button: Button::create(session),
        }
    }

    /// Fills the form and submits it.
    pub async fn create(&self, name: &str, system_name: &str, description: &str) -> Result<()> {
        self.name.fill(name).await?;
        self.system_name.fill(system_name).await?;
        self.description.fill(description).await?;
        self.create_button.click().await
    }
}

#[async_trait]
impl View for ProductNewView {
    fn name(&self) -> &'static str {
        "ProductNewView"
    }

    fn path(&self) -> &str {
        Self::PATH
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        Some(Box::new(ProductsView::new(&self.session)))
    }

    async fn is_displayed(&self) -> bool {
        admin_frame_displayed(&self.session).await
            && self.session.at_path(Self::PATH).await
            && self.name.is_displayed().await
            && self.system_name.is_displayed().await
    }

    async fn step(&self) -> Result<()> {
        ProductsView::new(&self.session).create_product().await
    }
}

/// Form editing or deleting a product.
pub struct ProductEditView {
    session: Session,
    product: Product,
    path: String,
    name: TextInput,
    description: TextInput,
    update_button: Button,
    delete_button: Button,
}

impl ProductEditView {
    pub const PATH_PATTERN: &'static str = "/apiconfig/services/{product_id}/edit";

    pub fn new(session: &Session, product: &Product) -> Self {
        Self {
            session: session.clone(),
            product: product.clone(),
            path: product_path(Self::PATH_PATTERN, product),
            name: TextInput::by_id(session, "service_name"),
            description: TextInput::by_id(session, "service_description"),
            update_button: Button::update(session),
            delete_button: Button::delete(session),
        }
    }

    /// Updates the product; empty arguments leave their field untouched.
    pub async fn update(&self, name: &str, description: &str) -> Result<()> {
        if !name.is_empty() {
            self.name.fill(name).await?;
        }
        if !description.is_empty() {
            self.description.fill(description).await?;
        }
        self.update_button.click().await
    }

    /// Deletes the product, confirming the dialog.
    pub async fn delete(&self) -> Result<()> {
        tracing::info!(product = %self.product.name, "deleting product through the UI");
        self.delete_button.click().await
    }
}

#[async_trait]
impl View for ProductEditView {
    fn name(&self) -> &'static str {
        "ProductEditView"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        Some(Box::new(ProductDetailView::new(&self.session, &self.product)))
    }

    async fn is_displayed(&self) -> bool {
        on_product_screen(&self.session, &self.path).await
            && self.name.is_displayed().await
            && self.description.is_displayed().await
    }

    async fn step(&self) -> Result<()> {
        ProductDetailView::new(&self.session, &self.product)
            .edit()
            .await
    }
}

/// Gateway and deployment settings of a product.
pub struct ProductSettingsView {
    session: Session,
    product: Product,
    path: String,
    staging_url: TextInput,
    production_url: TextInput,
    deployment: RadioGroup,
    update_button: Button,
}

impl ProductSettingsView {
    pub const PATH_PATTERN: &'static str = "/apiconfig/services/{product_id}/settings";

    pub fn new(session: &Session, product: &Product) -> Self {
        let options: Vec<&str> = DeploymentOption::ALL.iter().map(|o| o.as_str()).collect();
        Self {
            session: session.clone(),
            product: product.clone(),
            path: product_path(Self::PATH_PATTERN, product),
            staging_url: TextInput::by_id(session, "service_proxy_attributes_sandbox_endpoint"),
            production_url: TextInput::by_id(session, "service_proxy_attributes_endpoint"),
            deployment: RadioGroup::new(session, Locator::xpath(DEPLOYMENT_RADIO_XPATH), &options),
            update_button: Button::update(session),
        }
    }

    /// Sets the gateway URLs; empty arguments leave their field untouched.
    pub async fn update_gateway(&self, staging: &str, production: &str) -> Result<()> {
        if !staging.is_empty() {
            self.staging_url.fill(staging).await?;
        }
        if !production.is_empty() {
            self.production_url.fill(production).await?;
        }
        self.update_button.click().await
    }

    /// Switches the deployment option and saves.
    pub async fn change_deployment(&self, option: DeploymentOption) -> Result<()> {
        self.deployment.select(&[option.as_str()]).await?;
        self.update_button.click().await
    }

    /// Currently checked deployment option value.
    pub async fn deployment(&self) -> Result<Option<String>> {
        self.deployment.selected().await
    }
}

#[async_trait]
impl View for ProductSettingsView {
    fn name(&self) -> &'static str {
        "ProductSettingsView"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        Some(Box::new(ProductDetailView::new(&self.session, &self.product)))
    }

    async fn is_displayed(&self) -> bool {
        on_product_screen(&self.session, &self.path).await && self.deployment.is_displayed().await
    }
}

/// Backends used by a product.
pub struct ProductBackendsView {
    session: Session,
    product: Product,
    path: String,
    add_link: Button,
    backends: Table,
}

impl ProductBackendsView {
    pub const PATH_PATTERN: &'static str = "/apiconfig/services/{product_id}/backend_usages";

    /// Column holding the remove icon.
    pub const REMOVE_COLUMN: usize = 3;

    pub fn new(session: &Session, product: &Product) -> Self {
        Self {
            session: session.clone(),
            product: product.clone(),
            path: product_path(Self::PATH_PATTERN, product),
            add_link: Button::link(session, Locator::xpath(ADD_BACKEND_LINK_XPATH)),
            backends: Table::new(session, Locator::xpath(BACKENDS_TABLE_XPATH))
                .with_column_widget(Self::REMOVE_COLUMN, Locator::xpath(REMOVE_BACKEND_XPATH)),
        }
    }

    /// The backend usage table.
    pub fn table(&self) -> &Table {
        &self.backends
    }

    /// Opens the add-backend form.
    pub async fn add_backend(&self) -> Result<()> {
        self.add_link.click().await
    }

    /// Removes `backend` from the product, confirming the dialog.
    pub async fn remove_backend(&self, backend: &Backend) -> Result<()> {
        let row = self.backends.row_with_text(0, &backend.name).await?;
        tracing::info!(product = %self.product.name, backend = %backend.name, "removing backend usage");
        row.require_widget(Self::REMOVE_COLUMN)
            .await?
            .click(true)
            .await
    }
}

#[async_trait]
impl View for ProductBackendsView {
    fn name(&self) -> &'static str {
        "ProductBackendsView"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        Some(Box::new(ProductDetailView::new(&self.session, &self.product)))
    }

    async fn is_displayed(&self) -> bool {
        on_product_screen(&self.session, &self.path).await && self.backends.is_displayed().await
    }
}

/// Form attaching a backend to a product.
pub struct ProductAddBackendView {
    session: Session,
    product: Product,
    path: String,
    backend: Dropdown,
    backend_path: TextInput,
    add_button: Button,
}

impl ProductAddBackendView {
    pub const PATH_PATTERN: &'static str = "/apiconfig/services/{product_id}/backend_usages/new";

    pub fn new(session: &Session, product: &Product) -> Self {
        Self {
            session: session.clone(),
            product: product.clone(),
            path: product_path(Self::PATH_PATTERN, product),
            backend: Dropdown::new(session, Locator::xpath(BACKEND_SELECT_XPATH)),
            backend_path: TextInput::by_id(session, "backend_api_config_path"),
            add_button: Button::create(session),
        }
    }

    /// Attaches `backend` under `path` and submits.
    pub async fn add_backend(&self, backend: &Backend, path: &str) -> Result<()> {
        self.backend
            .select_by_value(&backend.entity_id.to_string())
            .await?;
        self.backend_path.fill(path).await?;
        self.add_button.click().await
    }
}

#[async_trait]
impl View for ProductAddBackendView {
    fn name(&self) -> &'static str {
        "ProductAddBackendView"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        Some(Box::new(ProductBackendsView::new(&self.session, &self.product)))
    }

    async fn is_displayed(&self) -> bool {
        on_product_screen(&self.session, &self.path).await
            && self.backend.is_displayed().await
            && self.backend_path.is_displayed().await
    }

    async fn step(&self) -> Result<()> {
        ProductBackendsView::new(&self.session, &self.product)
            .add_backend()
            .await
    }
}

/// Integration (configuration) page of a product.
pub struct ProductConfigurationView {
    session: Session,
    product: Product,
    path: String,
}

impl ProductConfigurationView {
    pub const PATH_PATTERN: &'static str = "/apiconfig/services/{product_id}/integration";

    pub fn new(session: &Session, product: &Product) -> Self {
        Self {
            session: session.clone(),
            product: product.clone(),
            path: product_path(Self::PATH_PATTERN, product),
        }
    }
}

#[async_trait]
impl View for ProductConfigurationView {
    fn name(&self) -> &'static str {
        "ProductConfigurationView"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        Some(Box::new(ProductDetailView::new(&self.session, &self.product)))
    }

    async fn is_displayed(&self) -> bool {
        on_product_screen(&self.session, &self.path).await
    }
}

/// Application plans of a product.
pub struct ApplicationPlansView {
    session: Session,
    product: Product,
    path: String,
    plans: Table,
}

impl ApplicationPlansView {
    pub const PATH_PATTERN: &'static str = "/apiconfig/services/{product_id}/application_plans";

    pub fn new(session: &Session, product: &Product) -> Self {
        Self {
            session: session.clone(),
            product: product.clone(),
            path: product_path(Self::PATH_PATTERN, product),
            plans: Table::new(session, Locator::xpath(PLANS_TABLE_XPATH))
                .with_column_widget(0, Locator::xpath(NAME_LINK_XPATH)),
        }
    }

    /// The plan table.
    pub fn table(&self) -> &Table {
        &self.plans
    }

    /// Opens the detail page of `plan`.
    pub async fn detail(&self, plan: &ApplicationPlan) -> Result<()> {
        self.plans
            .row_with_text(0, &plan.name)
            .await?
            .require_widget(0)
            .await?
            .click(false)
            .await
    }
}

#[async_trait]
impl View for ApplicationPlansView {
    fn name(&self) -> &'static str {
        "ApplicationPlansView"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        Some(Box::new(ProductDetailView::new(&self.session, &self.product)))
    }

    async fn is_displayed(&self) -> bool {
        on_product_screen(&self.session, &self.path).await && self.plans.is_displayed().await
    }
}

/// Edit page of one application plan.
pub struct ApplicationPlanDetailView {
    session: Session,
    product: Product,
    plan: ApplicationPlan,
    path: String,
    product_level: Table,
}

impl ApplicationPlanDetailView {
    pub const PATH_PATTERN: &'static str = "/apiconfig/application_plans/{application_plan_id}/edit";

    /// Plan paths carry no product id, but the prerequisite plan list does.
    pub fn new(session: &Session, product: &Product, plan: &ApplicationPlan) -> Self {
        Self {
            session: session.clone(),
            product: product.clone(),
            plan: plan.clone(),
            path: bind_path(
                Self::PATH_PATTERN,
                &[("application_plan_id", plan.entity_id.to_string())],
            ),
            product_level: Table::new(session, Locator::xpath(PLAN_METRICS_XPATH)),
        }
    }

    /// Product-level metrics and methods table.
    pub fn product_level(&self) -> &Table {
        &self.product_level
    }
}

#[async_trait]
impl View for ApplicationPlanDetailView {
    fn name(&self) -> &'static str {
        "ApplicationPlanDetailView"
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn prerequisite(&self) -> Option<Box<dyn View>> {
        Some(Box::new(ApplicationPlansView::new(&self.session, &self.product)))
    }

    async fn is_displayed(&self) -> bool {
        on_product_screen(&self.session, &self.path).await
    }

    async fn step(&self) -> Result<()> {
        ApplicationPlansView::new(&self.session, &self.product)
            .detail(&self.plan)
            .await
    }
}
