//! Tests against a real deployment.
//!
//! These need a running WebDriver, a reachable admin portal and an `oc`
//! session, configured through `TESTSUITE_*` variables. Run with
//! `cargo test --test live_environment -- --ignored`.

use std::sync::Arc;

use apim_testsuite::ui::frame::{LoginView, ProductsView};
use apim_testsuite::{navigate, Cluster, MailClient, OcCli, Session, SuiteConfig, View, WebDriverBrowser};

#[tokio::test]
#[ignore] // Requires a WebDriver and an admin portal
async fn products_are_listed_after_login() {
    apim_testsuite::init_test_tracing();
    let config = SuiteConfig::from_env().unwrap();
    let driver = Arc::new(
        WebDriverBrowser::connect(&config.browser.webdriver_url, &config.browser.browser_name)
            .await
            .unwrap(),
    );
    let session = Session::new(driver.clone(), config.admin.url.clone()).with_wait(config.browser.wait());

    let login = navigate(LoginView::new(&session)).await.unwrap();
    login
        .login(
            &config.admin.username,
            config.admin.password.as_deref().unwrap_or_default(),
        )
        .await
        .unwrap();

    let products = navigate(ProductsView::new(&session)).await.unwrap();
    assert!(products.is_displayed().await);

    driver.quit().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires an oc session with Mailhog deployed
async fn mailhog_is_reachable_through_its_route() {
    apim_testsuite::init_test_tracing();
    let config = SuiteConfig::from_env().unwrap();
    let cluster = OcCli::from_config(&config.cluster);

    let host = cluster.route_host(&config.mailhog.service_name).await.unwrap();
    assert!(!host.is_empty());

    let client = MailClient::for_service(&cluster, &config.mailhog.service_name)
        .await
        .unwrap();
    client.messages(0, 1).await.unwrap();
}
