use {
    clap::Args,
    std::{
        net::SocketAddr,
        path::PathBuf,
    },
};

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9000";
const DEFAULT_METRICS_ADDR: &str = "127.0.0.1:9001";
const DEFAULT_REQUESTER_IP_HEADER_NAME: &str = "X-Forwarded-For";

#[derive(Args, Clone, Debug)]
#[command(next_help_heading = "Server Options")]
#[group(id = "Server")]
pub struct Options {
    /// Address and port the server will bind to.
    #[arg(long = "listen-addr")]
    #[arg(default_value = DEFAULT_LISTEN_ADDR)]
    #[arg(env = "LISTEN_ADDR")]
    pub listen_addr:              SocketAddr,
    /// database url for persistent storage.
    #[arg(long = "database-url")]
    #[arg(env = "DATABASE_URL")]
    pub database_url:             String,
    /// Address and port the metrics will bind to.
    #[arg(long = "metrics-addr")]
    #[arg(default_value = DEFAULT_METRICS_ADDR)]
    #[arg(env = "METRICS_ADDR")]
    pub metrics_addr:             SocketAddr,
    /// The header name carrying the ip of the requester, used to limit the websocket connections per ip.
    #[arg(long = "requester-ip-header-name")]
    #[arg(default_value = DEFAULT_REQUESTER_IP_HEADER_NAME)]
    #[arg(env = "REQUESTER_IP_HEADER_NAME")]
    pub requester_ip_header_name: String,
    /// Directory with the browser client, served for every path the api does not handle.
    #[arg(long = "static-dir")]
    #[arg(env = "STATIC_DIR")]
    pub static_dir:               Option<PathBuf>,
}
