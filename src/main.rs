//! APIM Testsuite CLI
//!
//! Operator helpers for the environment the suite runs against.

use apim_testsuite::mail::{MailClient, Messages, DEFAULT_LIMIT};
use apim_testsuite::{Cluster, OcCli, SuiteConfig};

const USAGE: &str = "\
Usage: apim-testsuite <command>

Commands:
  mail list [start] [limit]   Print captured mail
  mail clear                  Delete all captured mail
  route <service>             Print the route host of a cluster service
  wait <deployment>           Wait until a deployment is ready

Environment variables:
  TESTSUITE_CONFIG            Path to a YAML or TOML suite configuration
  TESTSUITE_MAILHOG_URL       Mailhog base URL (skips route lookup)";

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    if let Err(e) = run(&args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: &[&str]) -> apim_testsuite::Result<()> {
    let config = SuiteConfig::from_env()?;
    let cluster = OcCli::from_config(&config.cluster);

    match args {
        ["mail", rest @ ..] => {
            let client = match &config.mailhog.url {
                Some(url) => MailClient::new(url)?,
                None => MailClient::for_service(&cluster, &config.mailhog.service_name).await?,
            };
            match rest {
                ["list", paging @ ..] => {
                    let start = parse_number(paging.first(), 0)?;
                    let limit = parse_number(paging.get(1), DEFAULT_LIMIT)?;
                    print_messages(&client.messages(start, limit).await?);
                }
                ["clear"] => {
                    client.delete().await?;
                    println!("Cleared {}", client.url());
                }
                _ => usage(),
            }
        }
        ["route", service] => {
            println!("{}", cluster.route_host(service).await?);
        }
        ["wait", deployment] => {
            let timeout = config.cluster.deployment_timeout_duration();
            cluster.wait_for_deployment(deployment, timeout).await?;
            println!("{} is ready", deployment);
        }
        _ => usage(),
    }
    Ok(())
}

fn parse_number(arg: Option<&&str>, default: usize) -> apim_testsuite::Result<usize> {
    match arg {
        Some(value) => value.parse().map_err(|_| {
            apim_testsuite::Error::Config(format!("expected a number, got '{}'", value))
        }),
        None => Ok(default),
    }
}

fn print_messages(messages: &Messages) {
    println!(
        "{} of {} message(s), starting at {}",
        messages.count, messages.total, messages.start
    );
    for message in &messages.items {
        let to: Vec<String> = message.to.iter().map(|p| p.address()).collect();
        println!(
            "{}  {} -> {}  {}",
            message.created,
            message.from.address(),
            to.join(", "),
            message.subject().unwrap_or("(no subject)")
        );
    }
}

fn usage() -> ! {
    eprintln!("{}", USAGE);
    std::process::exit(2);
}
