use serial_test::serial;
use std::time::Duration;
use trawl_engine::extract::parse_selectors;
use trawl_engine::page::{Page, PageError, PageLauncher, SelectorState};
use trawl_engine::scrape::scrape_url;
use trawl_h::ChromiumLauncher;

const HTML: &str = "<html><body>\
<div class='item'>Title A<br>Price 1</div>\
<div class='item'>Title A<br>Price 1</div>\
<div class='item card'>Title B<br>Price 2</div>\
<div class='item'>   </div>\
<input id='email' value='old'>\
</body></html>";

fn data_url() -> String {
    format!("data:text/html,{}", HTML)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();
}

#[tokio::test]
#[serial]
async fn test_headless_scrape_and_close() {
    init_tracing();

    let page = match ChromiumLauncher::new(false).launch().await {
        Ok(page) => page,
        Err(e) => {
            eprintln!("Failed to launch browser (is Chromium installed?): {}", e);
            return;
        }
    };

    let url = data_url();
    let batch = scrape_url(
        page.as_ref(),
        &url,
        &parse_selectors("item"),
        false,
        Duration::from_secs(5),
    )
    .await
    .expect("Scrape failed");

    let contents: Vec<_> = batch.items.iter().map(|r| r.content().to_vec()).collect();
    assert_eq!(contents, [vec!["Title A", "Price 1"], vec!["Title B", "Price 2"]]);

    page.wait_for_selector(".card", Duration::from_secs(1), SelectorState::Visible)
        .await
        .expect("card should be visible");
    let missing = page
        .wait_for_selector(".sold-out", Duration::from_millis(300), SelectorState::Attached)
        .await;
    assert!(matches!(missing, Err(PageError::Timeout { .. })));

    page.fill("#email", "ada@example.com").await.expect("Fill failed");
    let inputs = page.query_all("#email").await.unwrap();
    assert_eq!(inputs.len(), 1);

    page.close().await.unwrap();
    page.close().await.unwrap();
    assert!(page.is_closed());
    assert!(matches!(
        page.wait(Duration::from_millis(1)).await,
        Err(PageError::Closed)
    ));
}
