use crate::alert::{Alert, Slack};
use crate::beacon::BeaconApi;
use crate::labels::{load_labels_from_file, load_pubkeys_from_file, LabelRegistry};
use crate::relays::Relays;
use crate::server;
use crate::validators::OurValidators;
use crate::{Config, Error, Watcher};
use eth2::types::Slot;
use eth2::{BeaconNodeHttpClient, Timeouts, Url};
use prometheus::Registry;
use slog::{info, Logger};
use slot_clock::{SlotClock, SystemTimeSlotClock};
use std::net::SocketAddrV4;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;

/// The validators endpoint may return a large response, give it more time than the others.
const VALIDATORS_TIMEOUT_MULTIPLIER: u32 = 4;

/// Processes each slot a third of the way in, once its block has most likely been
/// propagated.
const SLOT_PROCESSING_DELAY_DIVISOR: u32 = 3;

/// Runs the watcher until a fatal error occurs or the process receives Ctrl-C.
pub async fn run(config: Config, log: Logger) -> Result<(), Error> {
    let slot_duration = Duration::from_secs(config.seconds_per_slot);
    let beacon = beacon_node(&config, slot_duration)?;

    info!(
        log,
        "Starting validator watcher";
        "beacon_node" => %beacon,
        "relays" => config.relay_urls.len(),
        "slack_alerts" => config.slack_channel.is_some(),
    );

    let genesis = beacon.genesis().await?;
    let slot_clock = SystemTimeSlotClock::new(
        Slot::new(0),
        Duration::from_secs(genesis.genesis_time),
        slot_duration,
    );

    let validators = load_validators(&config)?;
    let relays = Relays::new(&config.relay_urls)?;
    let alert = slack(&config)?;

    let registry = Registry::new();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let (_, server) = server::start_server(
        registry.clone(),
        SocketAddrV4::new(config.metrics_listen_addr, config.metrics_listen_port),
        async {
            let _ = shutdown_rx.await;
        },
        log.clone(),
    )?;
    let server_handle = tokio::spawn(server);

    let mut watcher = Watcher::new(
        beacon,
        validators,
        relays,
        alert,
        registry,
        config.slots_per_epoch,
        log.clone(),
    )?;
    watcher.initialize().await?;

    let result = tokio::select! {
        result = poll(&mut watcher, &slot_clock) => result,
        _ = tokio::signal::ctrl_c() => {
            info!(log, "Shutting down"; "reason" => "ctrl-c");
            Ok(())
        }
    };

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    result
}

fn beacon_node(config: &Config, slot_duration: Duration) -> Result<BeaconNodeHttpClient, Error> {
    let url = Url::parse(&config.beacon_node_url)
        .map_err(|e| Error::Config(format!("Invalid beacon node URL: {:?}", e)))?;

    let mut timeouts = Timeouts::set_all(slot_duration);
    timeouts.validators = slot_duration * VALIDATORS_TIMEOUT_MULTIPLIER;

    Ok(BeaconNodeHttpClient::new(url, timeouts))
}

/// Our validators are those of the public keys file together with the labelled ones.
fn load_validators(config: &Config) -> Result<OurValidators, Error> {
    let pubkeys = match &config.pubkeys_file {
        Some(path) => load_pubkeys_from_file(path)?,
        None => vec![],
    };

    let labels = match &config.labels_file {
        Some(path) => load_labels_from_file(path, config.drop_pubkey_label)?,
        None => LabelRegistry::default(),
    };

    Ok(OurValidators::new(pubkeys, labels))
}

fn slack(config: &Config) -> Result<Option<Box<dyn Alert>>, Error> {
    match (&config.slack_channel, &config.slack_token) {
        (Some(channel), Some(token)) => {
            let slack = Slack::new(channel.clone(), token.clone())
                .map_err(|e| Error::Alert(e.to_string()))?;
            Ok(Some(Box::new(slack)))
        }
        _ => Ok(None),
    }
}

/// Processes every slot as it comes, one at a time.
async fn poll<B: BeaconApi, S: SlotClock>(
    watcher: &mut Watcher<B>,
    slot_clock: &S,
) -> Result<(), Error> {
    loop {
        sleep(duration_to_next_tick(slot_clock)?).await;

        let slot = slot_clock
            .now()
            .ok_or_else(|| Error::SlotClock("Unable to read current slot".to_string()))?;

        watcher.process_slot(slot).await?;
    }
}

/// Returns the delay until a third of the next slot has elapsed.
fn duration_to_next_tick<S: SlotClock>(slot_clock: &S) -> Result<Duration, Error> {
    let to_next_slot = slot_clock
        .duration_to_next_slot()
        .ok_or_else(|| Error::SlotClock("Unable to determine time to next slot".to_string()))?;

    Ok(to_next_slot + slot_clock.slot_duration() / SLOT_PROCESSING_DELAY_DIVISOR)
}
