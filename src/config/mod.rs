mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{ConnectionSettings, LogSettings, ServerSettings, Settings};

/// Prefix of the environment variables read by [`load_config`], e.g.
/// `TOPICHUB__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "TOPICHUB";

/// Loads the configuration from `config/default` and environment variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Loads the configuration from an optional file at `path` (any extension
/// the `config` crate understands) overlaid with `TOPICHUB__*` environment
/// variables, then merges the result over [`Settings::default`].
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    let server = partial.server.as_ref();
    let connection = partial.connection.as_ref();

    let settings = Settings {
        server: ServerSettings {
            host: server
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server.and_then(|s| s.port).unwrap_or(default.server.port),
        },
        connection: ConnectionSettings {
            write_wait_ms: connection
                .and_then(|c| c.write_wait_ms)
                .unwrap_or(default.connection.write_wait_ms),
            pong_wait_ms: connection
                .and_then(|c| c.pong_wait_ms)
                .unwrap_or(default.connection.pong_wait_ms),
            max_message_size: connection
                .and_then(|c| c.max_message_size)
                .unwrap_or(default.connection.max_message_size),
            send_buffer: connection
                .and_then(|c| c.send_buffer)
                .unwrap_or(default.connection.send_buffer),
        },
        log: LogSettings {
            level: partial
                .log
                .and_then(|l| l.level)
                .unwrap_or(default.log.level),
        },
    };

    validate(&settings.connection)?;
    Ok(settings)
}

/// Every connection tunable must be non-zero. A zero queue capacity or ping
/// period would panic inside a running connection.
fn validate(connection: &ConnectionSettings) -> Result<(), ConfigError> {
    let fields = [
        ("write_wait_ms", connection.write_wait_ms),
        ("pong_wait_ms", connection.pong_wait_ms),
        ("max_message_size", connection.max_message_size as u64),
        ("send_buffer", connection.send_buffer as u64),
    ];
    for (name, value) in fields {
        if value == 0 {
            return Err(ConfigError::Message(format!(
                "connection.{name} must be greater than zero"
            )));
        }
    }
    Ok(())
}
