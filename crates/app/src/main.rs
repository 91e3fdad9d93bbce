use clap::Parser;

use stockledger_app::cli::{self, Cli};
use stockledger_app::AppServices;
use stockledger_infra::InfraConfig;

fn main() -> anyhow::Result<()> {
    stockledger_observability::init();

    let cli = Cli::parse();
    let mut config = InfraConfig::from_env();
    if let Some(dir) = cli.staging_dir {
        config.staging_dir = dir;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let services = AppServices::build(config)?;
    let alerts = services.subscribe_alerts();

    let stdout = std::io::stdout();
    let errors = cli::run(&services, cli.command, &mut stdout.lock())?;

    for alert in alerts.drain() {
        tracing::info!(
            alert_id = %alert.alert_id(),
            source = alert.source(),
            kind = %alert.kind(),
            detail = %alert.detail(),
            "alert"
        );
    }
    services.shutdown();

    if errors > 0 {
        tracing::warn!(errors, "finished with failed operations");
        std::process::exit(1);
    }
    Ok(())
}
