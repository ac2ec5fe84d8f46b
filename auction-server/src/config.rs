use {
    crate::auction::entities::AuctionDefaults,
    anyhow::Result,
    auction_api_types::BidAmount,
    clap::{
        crate_authors,
        crate_description,
        crate_name,
        crate_version,
        Args,
        Parser,
    },
    std::fs,
    time::{
        macros::datetime,
        OffsetDateTime,
    },
};

mod server;

// `Options` is a structup definition to provide clean command-line args for the auction server.
#[derive(Parser, Debug)]
#[command(name = crate_name!())]
#[command(author = crate_authors!())]
#[command(about = crate_description!())]
#[command(version = crate_version!())]
#[allow(clippy::large_enum_variant)]
pub enum Options {
    /// Run the auction server service.
    Run(RunOptions),
    /// Run db migrations and exit.
    Migrate(MigrateOptions),
}

#[derive(Args, Clone, Debug)]
pub struct RunOptions {
    /// Server Options
    #[command(flatten)]
    pub server: server::Options,

    #[command(flatten)]
    pub config: ConfigOptions,
}

#[derive(Args, Clone, Debug)]
pub struct MigrateOptions {
    /// database url for persistent storage.
    #[arg(long = "database-url")]
    #[arg(env = "DATABASE_URL")]
    pub database_url: String,
}

#[derive(Args, Clone, Debug)]
#[command(next_help_heading = "Config Options")]
#[group(id = "Config")]
pub struct ConfigOptions {
    /// Path to a configuration file with the values of the auction created when none is stored.
    /// The built-in defaults are used when no file is given.
    #[arg(long = "config")]
    #[arg(env = "AUCTION_CONFIG")]
    pub config: Option<String>,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auction: ConfigAuction,
}

impl Config {
    pub fn load(path: &str) -> Result<Config> {
        // Open and read the YAML file
        let yaml_content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&yaml_content)?;
        Ok(config)
    }
}

/// Values of the auction created when none is stored. Changing them has no
/// effect on an auction that already exists.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConfigAuction {
    #[serde(default = "default_item")]
    pub item:        String,
    #[serde(default = "default_minimum_bid")]
    pub minimum_bid: BidAmount,
    #[serde(default = "default_closes_at", with = "time::serde::rfc3339")]
    pub closes_at:   OffsetDateTime,
}

fn default_item() -> String {
    "Produto Exemplo".to_string()
}

fn default_minimum_bid() -> BidAmount {
    100.0
}

fn default_closes_at() -> OffsetDateTime {
    datetime!(2024-09-02 23:59:59 -3)
}

impl Default for ConfigAuction {
    fn default() -> Self {
        Self {
            item:        default_item(),
            minimum_bid: default_minimum_bid(),
            closes_at:   default_closes_at(),
        }
    }
}

impl From<ConfigAuction> for AuctionDefaults {
    fn from(config: ConfigAuction) -> Self {
        Self {
            item:        config.item,
            minimum_bid: config.minimum_bid,
            closes_at:   config.closes_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config: Config = serde_yaml::from_str(
            r#"
auction:
  item: Bicicleta
  minimum_bid: 250.5
  closes_at: "2027-09-02T23:59:59-03:00"
"#,
        )
        .unwrap();
        assert_eq!(
            config.auction,
            ConfigAuction {
                item:        "Bicicleta".to_string(),
                minimum_bid: 250.5,
                closes_at:   datetime!(2027-09-02 23:59:59 -3),
            }
        );
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: Config = serde_yaml::from_str("auction:\n  minimum_bid: 10\n").unwrap();
        assert_eq!(config.auction.item, "Produto Exemplo");
        assert_eq!(config.auction.minimum_bid, 10.0);
        assert_eq!(config.auction.closes_at, datetime!(2024-09-02 23:59:59 -3));

        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.auction, ConfigAuction::default());
    }

    #[test]
    fn test_invalid_closing_time_is_rejected() {
        let result = serde_yaml::from_str::<Config>("auction:\n  closes_at: tomorrow\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_command_line() {
        let options = Options::try_parse_from([
            "auction-server",
            "run",
            "--database-url",
            "postgres://localhost/auction",
            "--static-dir",
            "public",
        ])
        .unwrap();
        match options {
            Options::Run(run_options) => {
                assert_eq!(run_options.server.listen_addr.to_string(), "127.0.0.1:9000");
                assert_eq!(
                    run_options.server.requester_ip_header_name,
                    "X-Forwarded-For"
                );
                assert_eq!(
                    run_options.server.static_dir,
                    Some(std::path::PathBuf::from("public"))
                );
            }
            Options::Migrate(_) => panic!("expected the run subcommand"),
        }
    }
}
