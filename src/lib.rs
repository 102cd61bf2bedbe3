//! Coupons is a microservice issuing reward coupons and redeeming them for consumers.
//! The layered structure of the app is
//!
//! `Application -> Controller -> Service -> Repo -> Ledger`
//!
//! Each layer can throw Error with context or cover occurred error with
//! Error in the context. When error is not covered with Error it will
//! be translated to code 500 in the http answer "Internal server error" of microservice.

#![recursion_limit = "128"]
extern crate chrono;
extern crate config as config_crate;
#[macro_use]
extern crate failure;
extern crate futures;
extern crate futures_cpupool;
extern crate hyper;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate mime;
extern crate num_traits;
extern crate rand;
extern crate regex;
extern crate reqwest;
extern crate rust_decimal;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
extern crate tokio_core;
extern crate tokio_signal;
extern crate tracing;
extern crate tracing_log;
extern crate tracing_subscriber;
extern crate url;
extern crate validator;
#[macro_use]
extern crate validator_derive;
#[macro_use]
extern crate sentry;

pub mod config;
pub mod controller;
pub mod errors;
pub mod logging;
pub mod models;
pub mod repos;
pub mod sentry_integration;
pub mod services;

use std::process;
use std::sync::Arc;

use failure::Error as FailureError;
use futures::{future, Future, Stream};
use futures_cpupool::CpuPool;
use hyper::server::Http;
use tokio_core::reactor::Core;

use config::{Config, LedgerBackend};
use controller::context::StaticContext;
use controller::{Application, ControllerImpl};
use repos::ledger::rows::{header_row, CLAIMS_HEADER, COUPONS_HEADER};
use repos::{Ledger, LocalLedger, ReposFactoryImpl, SheetLedger};

/// Ledger holding the coupon and claim tables, picked by `ledger.backend`
pub fn create_ledger(config: &Config, cpu_pool: CpuPool) -> Result<Arc<Ledger>, FailureError> {
    let ledger_config = &config.ledger;
    match ledger_config.backend {
        LedgerBackend::Remote => {
            let url = ledger_config
                .url
                .clone()
                .ok_or_else(|| format_err!("Ledger url must be set for the remote backend"))?;
            info!("Using remote ledger at {}.", url);
            Ok(Arc::new(SheetLedger::new(url, reqwest::async::Client::new())))
        }
        LedgerBackend::Local => {
            let ledger = match ledger_config.local_path {
                Some(ref path) => {
                    info!("Using local ledger file {}.", path);
                    LocalLedger::with_file(path, cpu_pool)?
                }
                None => {
                    warn!("Using in-memory ledger, coupons are lost on restart.");
                    LocalLedger::in_memory(cpu_pool)
                }
            };
            Ok(Arc::new(
                ledger
                    .with_header(&ledger_config.coupons_table, header_row(&COUPONS_HEADER))
                    .with_header(&ledger_config.claims_table, header_row(&CLAIMS_HEADER)),
            ))
        }
    }
}

/// Starts new web service from provided `Config`
pub fn start_server<F: FnOnce() + 'static>(config: Config, port: &Option<String>, callback: F) {
    // Prepare reactor
    let mut core = Core::new().expect("Unexpected error creating event loop core");
    let handle = Arc::new(core.handle());

    let thread_count = config.server.thread_count;

    // Prepare CPU pool
    let cpu_pool = CpuPool::new(thread_count);

    // Prepare server
    let address = {
        let port = port.as_ref().unwrap_or(&config.server.port);
        format!("{}:{}", config.server.host, port).parse().expect("Could not parse address")
    };

    // Prepare ledger
    let ledger = create_ledger(&config, cpu_pool).unwrap_or_else(|why| {
        error!("Ledger Initialization Error: {}", why);
        process::exit(1);
    });

    // Repo factory
    let repo_factory = ReposFactoryImpl::new(ledger, &config);

    let context = StaticContext::new(Arc::new(config), repo_factory);

    let serve = Http::new()
        .serve_addr_handle(&address, &handle, move || {
            // Prepare application
            let controller = ControllerImpl::new(context.clone());
            let app = Application::new(controller);

            Ok(app)
        }).unwrap_or_else(|why| {
            error!("Http Server Initialization Error: {}", why);
            process::exit(1);
        });

    let handle_arc2 = handle.clone();
    handle.spawn(
        serve
            .for_each(move |conn| {
                handle_arc2.spawn(conn.map(|_| ()).map_err(|why| error!("Server Error: {}", why)));
                Ok(())
            }).map_err(|_| ()),
    );

    info!("Listening on http://{}, threads: {}", address, thread_count);
    handle.spawn_fn(move || {
        callback();
        future::ok(())
    });

    core.run(tokio_signal::ctrl_c().flatten_stream().take(1u64).for_each(|()| {
        info!("Ctrl+C received. Exit");

        Ok(())
    })).unwrap();
}
