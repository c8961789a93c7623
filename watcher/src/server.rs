use crate::metrics;
use crate::Error;
use prometheus::Registry;
use slog::{crit, info, Logger};
use std::future::Future;
use std::net::{SocketAddr, SocketAddrV4};
use warp::{http::Response, Filter};

/// Content type of the Prometheus text exposition format.
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Creates a server exposing `registry` on `GET /metrics`.
///
/// The server will shut down gracefully when the `shutdown` future resolves.
///
/// ## Returns
///
/// This function will bind the server to the provided address and then return a tuple of:
///
/// - `SocketAddr`: the address that the HTTP server will listen on.
/// - `Future`: the actual server future that will need to be awaited.
///
/// ## Errors
///
/// Returns an error if the server is unable to bind.
pub fn start_server(
    registry: Registry,
    listen_addr: SocketAddrV4,
    shutdown: impl Future<Output = ()> + Send + Sync + 'static,
    log: Logger,
) -> Result<(SocketAddr, impl Future<Output = ()>), Error> {
    let inner_log = log.clone();
    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .map(move || match metrics::gather(&registry) {
            Ok(body) => Response::builder()
                .status(200)
                .header("Content-Type", METRICS_CONTENT_TYPE)
                .body(body),
            Err(e) => {
                crit!(inner_log, "Unable to gather metrics"; "error" => &e);
                Response::builder()
                    .status(500)
                    .header("Content-Type", "text/plain")
                    .body(e)
            }
        });

    let routes = warp::get()
        .and(metrics)
        .map(|reply| warp::reply::with_header(reply, "Server", "validator-watcher"));

    let (listening_socket, server) =
        warp::serve(routes).try_bind_with_graceful_shutdown(listen_addr, shutdown)?;

    info!(
        log,
        "Metrics server started";
        "listen_address" => listening_socket.to_string(),
    );

    Ok((listening_socket, server))
}
