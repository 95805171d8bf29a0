use clap::Parser;
use notcatd::app;
use notcatd::config::Config;
use tracing::error;

#[tokio::main]
async fn main() {
    // Healthcheck subcommand (for container healthchecks)
    if std::env::args().nth(1).as_deref() == Some("healthcheck") {
        match notcatd::healthcheck().await {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }

    let settings = match Config::parse().into_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("notcatd: {e}");
            std::process::exit(2);
        }
    };

    app::logging::init(settings.log_format);

    if let Err(e) = app::run(settings).await {
        error!("daemon error: {e}");
        std::process::exit(1);
    }
}
