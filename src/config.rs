use std::{env, net::SocketAddr, path::PathBuf};

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory holding the profile-scoped JSON records.
    pub data_path: PathBuf,
    /// Directory holding `day-{n}.md` lesson files.
    pub content_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let data_path = lookup("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));
        let content_path = lookup("APP_CONTENT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("content/days"));

        Self {
            port,
            data_path,
            content_path,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
