use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trawl_engine::auth::LoginConfig;
use trawl_engine::config::loader::ConfigLoader;
use trawl_engine::config::schema::TrawlConfig;
use trawl_engine::extract::parse_selectors;
use trawl_engine::model::Batch;
use trawl_engine::page::PageLauncher;
use trawl_engine::scrape::scrape_url;
use trawl_engine::session::{SessionController, SessionRequest, SessionSettings};
use trawl_engine::store::JsonFileStore;
use trawl_h::ChromiumLauncher;

#[derive(Parser)]
#[command(name = "trawl", version, about = "Incremental browser scraper")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to ./trawl.yaml, then ~/.trawl/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long, global = true)]
    headless: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape continuously, printing one JSON batch per visited page
    Watch {
        url: String,
        /// Comma-separated container class names, e.g. "item, card big"
        selectors: String,
        /// Also capture images inside each container
        #[arg(long)]
        images: bool,
        #[command(flatten)]
        login: LoginArgs,
    },
    /// Scrape a page once and print the batch
    Once {
        url: String,
        selectors: String,
        #[arg(long)]
        images: bool,
        /// How long to wait for each container to appear
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[derive(Args)]
struct LoginArgs {
    /// Log in here before opening the target page
    #[arg(long)]
    login_url: Option<String>,
    #[arg(long, requires = "login_url")]
    email: Option<String>,
    #[arg(long, env = "TRAWL_PASSWORD", hide_env_values = true, requires = "login_url")]
    password: Option<String>,
    #[arg(long, requires = "login_url")]
    email_selector: Option<String>,
    #[arg(long, requires = "login_url")]
    password_selector: Option<String>,
    #[arg(long, requires = "login_url")]
    submit_selector: Option<String>,
    /// Separate page where the password is entered
    #[arg(long, requires = "login_url")]
    password_page_url: Option<String>,
}

impl LoginArgs {
    fn into_config(self) -> Option<LoginConfig> {
        Some(LoginConfig {
            login_url: self.login_url?,
            email: self.email,
            password: self.password,
            email_selector: self.email_selector,
            password_selector: self.password_selector,
            submit_selector: self.submit_selector,
            password_page_url: self.password_page_url,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the batches.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::load_default().await?,
    };
    let launcher = Arc::new(ChromiumLauncher::new(config.browser.visible && !cli.headless));

    match cli.command {
        Command::Watch {
            url,
            selectors,
            images,
            login,
        } => {
            let mut request = SessionRequest::new(url, &selectors).with_images(images);
            if let Some(login) = login.into_config() {
                request = request.with_login(login);
            }
            watch(&config, launcher, request).await
        }
        Command::Once {
            url,
            selectors,
            images,
            timeout_ms,
        } => {
            let timeout = Duration::from_millis(
                timeout_ms.unwrap_or(config.single_shot.container_timeout_ms),
            );
            once(launcher.as_ref(), &url, &selectors, images, timeout).await
        }
    }
}

async fn watch(
    config: &TrawlConfig,
    launcher: Arc<ChromiumLauncher>,
    request: SessionRequest,
) -> anyhow::Result<()> {
    let store = Arc::new(JsonFileStore::new(&config.output.path));
    let settings = SessionSettings::from(config);
    let poll = settings.poll_interval;
    let controller = SessionController::new(launcher, store, settings);

    controller.start(request).await?;
    info!(
        "Session started; writing to {} (Ctrl-C to stop)",
        config.output.path.display()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Stopping session");
                controller.stop().await;
                break;
            }
            _ = tokio::time::sleep(poll) => {
                print_batches(&controller.drain_all())?;
                if !controller.status().is_active {
                    info!("Browser closed; session ended");
                    controller.join().await;
                    break;
                }
            }
        }
    }
    print_batches(&controller.drain_all())
}

async fn once(
    launcher: &dyn PageLauncher,
    url: &str,
    selectors: &str,
    images: bool,
    timeout: Duration,
) -> anyhow::Result<()> {
    let page = launcher.launch().await?;
    let result = scrape_url(
        page.as_ref(),
        url,
        &parse_selectors(selectors),
        images,
        timeout,
    )
    .await;
    if let Err(e) = page.close().await {
        tracing::debug!("Closing page: {}", e);
    }
    print_batches(&[result?])
}

fn print_batches(batches: &[Batch]) -> anyhow::Result<()> {
    for batch in batches {
        println!("{}", serde_json::to_string(batch)?);
    }
    Ok(())
}
