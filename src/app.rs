use color_eyre::Result;
use eyre::Context as _;
use std::future::Future;
use tirex_exporter_collector::{
    MetricSet,
    Sampler,
    TirexStatusCommand,
};
use tirex_exporter_config::Config;
use tokio::sync::watch;

/// Wires the sampler and the `/metrics` endpoint around one shared [`MetricSet`].
pub struct App {
    config: Config,
    metrics: MetricSet,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let metrics = MetricSet::new().wrap_err("Failed to register tirex metrics")?;
        Ok(Self { config, metrics })
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    /// Runs until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let config = self.config;
        info!(
            listen_address = %config.listen_address,
            command = %config.command,
            command_args = ?config.command_args,
            interval = ?config.interval,
            command_timeout = ?config.command_timeout,
            config_dir = %config.config_dir().display(),
            "tirex_exporter started"
        );

        let listener = tirex_exporter_http::bind(config.listen_address).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let source = TirexStatusCommand::new(
            config.command.clone(),
            config.command_args.clone(),
            config.command_timeout,
        );
        let sampler = Sampler::new(source, self.metrics.clone(), config.interval);
        let sampler_task = tokio::spawn({
            let shutdown_rx = shutdown_rx.clone();
            async move { sampler.run(shutdown_rx).await }
        });

        let router = tirex_exporter_http::create_router(self.metrics.clone());
        let mut server_task = tokio::spawn(tirex_exporter_http::start_server(
            listener,
            router,
            stopped(shutdown_rx),
        ));

        let server_result = tokio::select! {
            signal = shutdown => {
                signal?;
                info!("shutdown requested");
                None
            }
            result = &mut server_task => {
                warn!("metrics endpoint stopped unexpectedly");
                Some(result)
            }
        };

        let _ = shutdown_tx.send(true);
        sampler_task.await?;
        let server_result = match server_result {
            Some(result) => result,
            None => server_task.await,
        };
        server_result??;

        info!("tirex_exporter stopped");
        Ok(())
    }
}

async fn stopped(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;
    Ok(())
}
