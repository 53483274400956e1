// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `SessionFactory` for SQL Server.
//!
//! Builds a tiberius `Config` per database from the resolved server settings,
//! resolves named instances through the SQL Browser service, and follows a
//! single routing redirect if the server sends one.

use crate::config::{AppConfig, Endpoint, DEFAULT_SQL_PORT};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::sqlserver::session::{SqlClient, SqlServerSession};
use crate::ports::session_port::{DatabaseSession, SessionFactory};
use log::{debug, info};
use std::sync::Arc;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, SqlBrowser};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::TokioAsyncWriteCompatExt;

const APPLICATION_NAME: &str = "wincc_views_exporter";

/// How to log in.
#[derive(Debug, Clone)]
enum Credentials {
    /// Windows integrated authentication of the current user.
    Integrated,
    SqlLogin { username: String, password: String },
}

pub struct SqlServerConnector {
    server: String,
    endpoint: Endpoint,
    credentials: Credentials,
    encrypt: bool,
    trust_server_certificate: bool,
    runtime: Arc<Runtime>,
}

impl SqlServerConnector {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let server = config.server_address();
        let mut endpoint = Endpoint::parse(&server)?;
        if endpoint.port.is_none() {
            endpoint.port = config.server.port;
        }

        let credentials = if config.server.trusted_connection {
            Credentials::Integrated
        } else {
            Credentials::SqlLogin {
                username: config.server.username.clone().unwrap_or_default(),
                password: config.password().unwrap_or_default(),
            }
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;

        Ok(Self {
            server,
            endpoint,
            credentials,
            encrypt: config.server.encrypt,
            trust_server_certificate: config.server.trust_server_certificate,
            runtime: Arc::new(runtime),
        })
    }

    fn tiberius_config(&self, database: &str) -> Result<Config> {
        let mut config = Config::new();
        config.host(&self.endpoint.host);
        // An explicit port is the TDS port; the instance is then only a label.
        match (&self.endpoint.instance, self.endpoint.port) {
            (Some(instance), None) => config.instance_name(instance),
            (_, port) => config.port(port.unwrap_or(DEFAULT_SQL_PORT)),
        }
        config.database(database);
        config.application_name(APPLICATION_NAME);
        config.authentication(self.auth_method()?);
        config.encryption(if self.encrypt {
            EncryptionLevel::Required
        } else {
            EncryptionLevel::Off
        });
        if self.trust_server_certificate {
            config.trust_cert();
        }
        Ok(config)
    }

    /// Whether the TDS port has to be looked up through the SQL Browser.
    fn uses_browser(&self) -> bool {
        self.endpoint.instance.is_some() && self.endpoint.port.is_none()
    }

    fn auth_method(&self) -> Result<AuthMethod> {
        match &self.credentials {
            Credentials::Integrated => integrated_auth(),
            Credentials::SqlLogin { username, password } => {
                Ok(AuthMethod::sql_server(username, password))
            }
        }
    }

    fn connection_error(&self, database: &str, reason: impl ToString) -> ExportError {
        ExportError::ConnectionError {
            server: self.server.clone(),
            database: database.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(windows)]
fn integrated_auth() -> Result<AuthMethod> {
    Ok(AuthMethod::Integrated)
}

#[cfg(not(windows))]
fn integrated_auth() -> Result<AuthMethod> {
    Err(ExportError::ConfigError(
        "Trusted connections need Windows; set trusted_connection: false and a username".into(),
    ))
}

async fn open_tcp(config: &Config, browse: bool) -> tiberius::Result<TcpStream> {
    let tcp = if browse {
        TcpStream::connect_named(config).await?
    } else {
        TcpStream::connect(config.get_addr()).await?
    };
    tcp.set_nodelay(true)?;
    Ok(tcp)
}

async fn connect(config: Config, browse: bool) -> tiberius::Result<SqlClient> {
    let tcp = open_tcp(&config, browse).await?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        Err(tiberius::error::Error::Routing { host, port }) => {
            debug!("Server redirected the connection to {}:{}", host, port);
            let mut config = config;
            config.host(&host);
            config.port(port);
            let tcp = open_tcp(&config, false).await?;
            Client::connect(config, tcp.compat_write()).await
        }
        other => other,
    }
}

impl SessionFactory for SqlServerConnector {
    fn server(&self) -> &str {
        &self.server
    }

    fn open(&self, database: &str) -> Result<Box<dyn DatabaseSession>> {
        let config = self.tiberius_config(database)?;
        info!("Connecting to {} on {}", database, self.server);
        let client = self
            .runtime
            .block_on(connect(config, self.uses_browser()))
            .map_err(|e| self.connection_error(database, e))?;
        Ok(Box::new(SqlServerSession::new(
            self.runtime.clone(),
            client,
            database,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_login_config(address: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.server.address = Some(address.to_string());
        config.server.trusted_connection = false;
        config.server.username = Some("remote".into());
        config.server.password = Some("secret".into());
        config
    }

    #[test]
    fn test_named_instance_endpoint() {
        let connector = SqlServerConnector::new(&sql_login_config(r"172.16.0.244\WINCC")).unwrap();
        assert_eq!(connector.server(), r"172.16.0.244\WINCC");
        assert_eq!(connector.endpoint.instance.as_deref(), Some("WINCC"));
        assert!(connector.tiberius_config("master").is_ok());
    }

    #[test]
    fn test_explicit_port_from_settings() {
        let mut config = sql_login_config("db.plant.local");
        config.server.port = Some(1533);
        let connector = SqlServerConnector::new(&config).unwrap();
        assert_eq!(connector.endpoint.port, Some(1533));

        let tiberius_config = connector.tiberius_config("CC_ALG_1").unwrap();
        assert_eq!(tiberius_config.get_addr(), "db.plant.local:1533");
    }

    #[test]
    fn test_instance_with_port_connects_directly() {
        let connector = SqlServerConnector::new(&sql_login_config(r"db.plant.local\WINCC,1500")).unwrap();
        assert!(!connector.uses_browser());
        let tiberius_config = connector.tiberius_config("master").unwrap();
        assert_eq!(tiberius_config.get_addr(), "db.plant.local:1500");

        let mut config = sql_login_config(r"db.plant.local\WINCC");
        config.server.port = Some(1600);
        let connector = SqlServerConnector::new(&config).unwrap();
        assert!(!connector.uses_browser());
        assert_eq!(
            connector.tiberius_config("master").unwrap().get_addr(),
            "db.plant.local:1600"
        );
    }

    #[test]
    fn test_instance_without_port_uses_browser() {
        let connector = SqlServerConnector::new(&sql_login_config(r"db.plant.local\WINCC")).unwrap();
        assert!(connector.uses_browser());
    }

    #[test]
    fn test_unreachable_named_instance_is_connection_error() {
        let connector = SqlServerConnector::new(&sql_login_config(r"127.0.0.1\WINCC")).unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            connector.open("master").map(|_| ())
        }));
        match result {
            Ok(Err(ExportError::ConnectionError { database, .. })) => assert_eq!(database, "master"),
            Ok(other) => panic!("expected a connection error, got {:?}", other),
            Err(_) => panic!("opening a named instance panicked"),
        }
    }

    #[test]
    fn test_connection_error_names_target() {
        let connector = SqlServerConnector::new(&sql_login_config("db.plant.local")).unwrap();
        let err = connector.connection_error("CC_ALG_1", "timed out");
        assert!(matches!(err, ExportError::ConnectionError { ref database, .. } if database == "CC_ALG_1"));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_trusted_connection_requires_windows() {
        let mut config = AppConfig::default();
        config.server.address = Some("db.plant.local".into());
        let connector = SqlServerConnector::new(&config).unwrap();
        assert!(matches!(
            connector.tiberius_config("master"),
            Err(ExportError::ConfigError(_))
        ));
    }
}
