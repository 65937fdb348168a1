// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::let_unit_value)]

#[tokio::main]
async fn main() {
    logging_init();

    if let Err(err) = main_inner().await {
        log::error!("{}", err);

        let mut source = err.source();
        while let Some(err) = source {
            log::error!("caused by: {}", err);
            source = err.source();
        }

        std::process::exit(1);
    }
}

fn logging_init() {
    if let Err(err) = logger::try_init() {
        eprintln!("could not initialize logger: {err}");
    }
}

async fn main_inner() -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Starting keygend service...");
    log::info!(
        "Version - {}",
        option_env!("PACKAGE_VERSION").unwrap_or("dev build"),
    );

    let config_path: std::path::PathBuf = std::env::var_os("KEYGEND_CONFIG")
        .map_or_else(|| "/etc/keygend/config.toml".into(), Into::into);

    let config_directory_path: std::path::PathBuf = std::env::var_os("KEYGEND_CONFIG_DIR")
        .map_or_else(|| "/etc/keygend/config.d".into(), Into::into);

    let config: keygend_config::Config =
        config_common::read_config(&config_path, &config_directory_path)?;

    let (connector, service) = keygend::main(config).await?;

    log::info!("Starting server at {}...", connector);

    let incoming = connector.incoming().await?;
    let server =
        hyper::Server::builder(incoming).serve(hyper::service::make_service_fn(move |_| {
            let service = service.clone();
            futures_util::future::ok::<_, std::convert::Infallible>(service)
        }));
    let () = server.await?;

    log::info!("Stopped server.");

    Ok(())
}
