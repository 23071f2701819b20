pub(crate) const DEFAULT_USER_AGENT: &str = concat!("loadtester/", env!("CARGO_PKG_VERSION"));

pub(crate) const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

pub(crate) const DEFAULT_DB_PATH: &str = "loadtester.db";
