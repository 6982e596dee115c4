use crate::config::{Config, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;

/// Holds the sentry client alive for the duration of the process.
pub struct Guards {
    _sentry: Option<sentry::ClientInitGuard>,
}

pub fn init(config: &Config) -> Guards {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let sentry_guard = config.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    if let Some(metrics_config) = &config.metrics
        && let Err(err) = install_statsd(metrics_config)
    {
        eprintln!("could not install statsd recorder: {err}");
    }

    Guards {
        _sentry: sentry_guard,
    }
}

fn install_statsd(config: &MetricsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some("flagops"))?;
    if metrics::set_global_recorder(recorder).is_err() {
        eprintln!("a metrics recorder was already installed");
    }
    Ok(())
}
