use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};

use sphere_link::{
    agent, ConnectionManager, ExitCode, InterfaceStatus, Journal, LoopbackConnector,
    NetworkError, Reachability, ReconnectPolicy, Session,
};
use sphered::{gpio, logging, Cli, Config};
use spherep_device::SimulatedClimate;

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            log::warn!("Unable to listen for SIGTERM {e:}");
            tokio::signal::ctrl_c().await.ok();
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

async fn run(config: Config) -> ExitCode {
    let twin = match gpio::bind_leds(&config) {
        Ok(twin) => twin,
        Err(code) => return code,
    };

    let network = InterfaceStatus::new(&config.interface);
    if let Err(NetworkError::NotReady) = network.is_connected_to_internet() {
        log::warn!(
            "Interface {} is not ready yet, the agent will keep polling it",
            network.iface()
        );
    }

    let connector = LoopbackConnector::new(Journal::default())
        .failing_first(config.loopback_failures);
    let connection = ConnectionManager::new(
        Box::new(connector),
        config.provisioning.clone(),
        ReconnectPolicy::default(),
    );

    let mut session = Session::new(
        connection,
        twin,
        Box::new(network),
        Box::new(SimulatedClimate::default()),
    )
    .with_telemetry_interval(config.telemetry_polls);

    if let Some(gpio) = config.button_gpio {
        match gpio::open_button(gpio) {
            Ok(button) => session = session.with_button(button, config.button_poll),
            Err(e) => {
                log::error!("Unable to open button {e:}");
                session.close();
                return ExitCode::InitMessageButton;
            }
        }
    }

    let code = agent::run(&mut session, shutdown_signal()).await;
    session.close();
    code
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let _guard = match logging::init(cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e:}");
            return ExitCode::InitLogging.into();
        }
    };

    log::info!("Sphere agent starting, version {}", env!("CARGO_PKG_VERSION"));

    let config = match cli.validate() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e:}");
            log::error!("{}", Cli::usage());
            return e.exit_code().into();
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Could not create event loop {e:}");
            return ExitCode::InitEventLoop.into();
        }
    };

    let code = runtime.block_on(run(config));
    log::info!("Application exiting with {code:?}");
    code.into()
}
