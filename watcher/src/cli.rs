use crate::config::Config;
use clap::{App, Arg, ArgMatches};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;

pub const CONFIG: &str = "config";
pub const BEACON_URL: &str = "beacon-url";
pub const PUBKEYS_FILE: &str = "pubkeys-file";
pub const LABELS_FILE: &str = "labels-file";
pub const DROP_PUBKEY_LABEL: &str = "drop-pubkey-label";
pub const RELAY_URL: &str = "relay-url";
pub const SLACK_CHANNEL: &str = "slack-channel";
pub const SLACK_TOKEN: &str = "slack-token";
pub const METRICS_ADDRESS: &str = "metrics-address";
pub const METRICS_PORT: &str = "metrics-port";
pub const DEBUG_LEVEL: &str = "debug-level";
pub const LOG_FORMAT: &str = "log-format";
pub const SLOTS_PER_EPOCH: &str = "slots-per-epoch";
pub const SECONDS_PER_SLOT: &str = "seconds-per-slot";

/// Read when `--slack-token` is not given, to keep the token off the command line.
pub const SLACK_TOKEN_ENV: &str = "SLACK_TOKEN";

pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("validator_watcher")
        .author("Sigma Prime <contact@sigmaprime.io>")
        .about("Watches a beacon chain for block proposals, sync committee duties and rewards of \
                a set of validators, and exposes them as Prometheus metrics.")
        .setting(clap::AppSettings::ColoredHelp)
        .arg(
            Arg::with_name(CONFIG)
                .long(CONFIG)
                .value_name("PATH_TO_CONFIG")
                .help("Path to a YAML configuration file. Flags override its values.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(BEACON_URL)
                .long(BEACON_URL)
                .value_name("URL")
                .help("URL of the beacon node HTTP API.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(PUBKEYS_FILE)
                .long(PUBKEYS_FILE)
                .value_name("FILE")
                .help("File listing the public keys of our validators, one per line.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(LABELS_FILE)
                .long(LABELS_FILE)
                .value_name("FILE")
                .help("CSV file of labels of our validators. The header row names the labels \
                       and must include a `validator_pubkey` column.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(DROP_PUBKEY_LABEL)
                .long(DROP_PUBKEY_LABEL)
                .help("Do not use the public key of a validator as one of its labels.")
                .takes_value(false),
        )
        .arg(
            Arg::with_name(RELAY_URL)
                .long(RELAY_URL)
                .value_name("URL")
                .help("URL of a MEV relay. May be given several times.")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name(SLACK_CHANNEL)
                .long(SLACK_CHANNEL)
                .value_name("CHANNEL")
                .help("Slack channel alerts are posted to.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(SLACK_TOKEN)
                .long(SLACK_TOKEN)
                .value_name("TOKEN")
                .help("Slack token used to post alerts. Defaults to the SLACK_TOKEN environment \
                       variable.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(METRICS_ADDRESS)
                .long(METRICS_ADDRESS)
                .value_name("ADDRESS")
                .help("Listen address of the metrics server.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(METRICS_PORT)
                .long(METRICS_PORT)
                .value_name("PORT")
                .help("Listen port of the metrics server.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(DEBUG_LEVEL)
                .long(DEBUG_LEVEL)
                .value_name("LEVEL")
                .help("The verbosity level for emitting logs.")
                .takes_value(true)
                .possible_values(&["info", "debug", "trace", "warn", "error", "crit"]),
        )
        .arg(
            Arg::with_name(LOG_FORMAT)
                .long(LOG_FORMAT)
                .value_name("FORMAT")
                .help("Specifies the log format used when emitting logs to the terminal.")
                .possible_values(&["JSON"])
                .takes_value(true),
        )
        .arg(
            Arg::with_name(SLOTS_PER_EPOCH)
                .long(SLOTS_PER_EPOCH)
                .value_name("SLOTS")
                .help("Number of slots per epoch of the network.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name(SECONDS_PER_SLOT)
                .long(SECONDS_PER_SLOT)
                .value_name("SECONDS")
                .help("Duration of a slot of the network.")
                .takes_value(true),
        )
}

fn parse_optional<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>, String>
where
    T::Err: std::fmt::Display,
{
    matches
        .value_of(name)
        .map(|value| {
            value
                .parse()
                .map_err(|e| format!("Unable to parse --{}: {}", name, e))
        })
        .transpose()
}

/// Builds the configuration from the configuration file, if any, overridden by flags.
pub fn parse_config(matches: &ArgMatches) -> Result<Config, String> {
    let mut config = match matches.value_of(CONFIG) {
        Some(path) => Config::load_from_file(path.to_string())?,
        None => Config::default(),
    };

    if let Some(url) = matches.value_of(BEACON_URL) {
        config.beacon_node_url = url.to_string();
    }
    if let Some(path) = matches.value_of(PUBKEYS_FILE) {
        config.pubkeys_file = Some(PathBuf::from(path));
    }
    if let Some(path) = matches.value_of(LABELS_FILE) {
        config.labels_file = Some(PathBuf::from(path));
    }
    if matches.is_present(DROP_PUBKEY_LABEL) {
        config.drop_pubkey_label = true;
    }
    if let Some(urls) = matches.values_of(RELAY_URL) {
        config.relay_urls = urls.map(String::from).collect();
    }
    if let Some(channel) = matches.value_of(SLACK_CHANNEL) {
        config.slack_channel = Some(channel.to_string());
    }
    if let Some(token) = matches.value_of(SLACK_TOKEN) {
        config.slack_token = Some(token.to_string());
    } else if config.slack_token.is_none() {
        config.slack_token = std::env::var(SLACK_TOKEN_ENV).ok();
    }
    if let Some(addr) = parse_optional::<Ipv4Addr>(matches, METRICS_ADDRESS)? {
        config.metrics_listen_addr = addr;
    }
    if let Some(port) = parse_optional::<u16>(matches, METRICS_PORT)? {
        config.metrics_listen_port = port;
    }
    if let Some(level) = matches.value_of(DEBUG_LEVEL) {
        config.debug_level = level.to_string();
    }
    if let Some(format) = matches.value_of(LOG_FORMAT) {
        config.log_format = Some(format.to_string());
    }
    if let Some(slots_per_epoch) = parse_optional::<u64>(matches, SLOTS_PER_EPOCH)? {
        config.slots_per_epoch = slots_per_epoch;
    }
    if let Some(seconds_per_slot) = parse_optional::<u64>(matches, SECONDS_PER_SLOT)? {
        config.seconds_per_slot = seconds_per_slot;
    }

    // A token without a channel to post to is of no use.
    if config.slack_channel.is_none() {
        config.slack_token = None;
    }

    config.validate()?;
    Ok(config)
}
