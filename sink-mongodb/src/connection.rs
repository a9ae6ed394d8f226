//! Connection descriptor for the MongoDB sink
//!
//! Formats the connection URI from validated settings. No connection is
//! opened here; the write path owns the client.

use std::fmt;
use std::str::FromStr;

use tracing::debug;
use url::Url;

use crate::config::{schema, Password, ValidatedConfig};
use crate::error::{SinkError, SinkResult};

pub const URI_SCHEME: &str = "mongodb";

/// Characters MongoDB does not allow in database names, plus URI delimiters
const FORBIDDEN_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$', '?', '#', '\0'];

/// Known MongoDB authentication mechanisms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanism {
    Gssapi,
    Plain,
    MongodbX509,
    MongodbCr,
    ScramSha1,
    ScramSha256,
}

impl AuthMechanism {
    /// Canonical mechanism names, as accepted by `mongodb.auth.mode`
    pub const NAMES: &'static [&'static str] = &[
        "GSSAPI",
        "PLAIN",
        "MONGODB-X509",
        "MONGODB-CR",
        "SCRAM-SHA-1",
        "SCRAM-SHA-256",
    ];

    /// The only mechanism this sink can authenticate with
    pub const SUPPORTED: AuthMechanism = AuthMechanism::ScramSha1;

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMechanism::Gssapi => "GSSAPI",
            AuthMechanism::Plain => "PLAIN",
            AuthMechanism::MongodbX509 => "MONGODB-X509",
            AuthMechanism::MongodbCr => "MONGODB-CR",
            AuthMechanism::ScramSha1 => "SCRAM-SHA-1",
            AuthMechanism::ScramSha256 => "SCRAM-SHA-256",
        }
    }
}

impl FromStr for AuthMechanism {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mechanism = match s.to_ascii_uppercase().as_str() {
            "GSSAPI" => AuthMechanism::Gssapi,
            "PLAIN" => AuthMechanism::Plain,
            "MONGODB-X509" => AuthMechanism::MongodbX509,
            "MONGODB-CR" => AuthMechanism::MongodbCr,
            "SCRAM-SHA-1" => AuthMechanism::ScramSha1,
            "SCRAM-SHA-256" => AuthMechanism::ScramSha256,
            _ => {
                return Err(SinkError::invalid_config(
                    schema::AUTH_MODE,
                    s,
                    "unknown authentication mechanism",
                ))
            }
        };
        Ok(mechanism)
    }
}

impl fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials embedded in the URI when authentication is active
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Password,
    pub auth_db: String,
    pub mechanism: AuthMechanism,
}

/// Everything needed to reach the sink collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// URI scheme, always [`URI_SCHEME`]
    pub scheme: &'static str,
    pub credentials: Option<Credentials>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub collection: String,
    /// Opaque write concern (`w=`), e.g. "1", "majority" or a tag set name
    pub write_concern: String,
}

impl ConnectionDescriptor {
    /// Build the descriptor, enforcing authentication preconditions
    pub fn from_config(config: &ValidatedConfig) -> SinkResult<Self> {
        let credentials = if config.auth_active() {
            debug!("authentication active");

            if config.auth_mechanism() != AuthMechanism::SUPPORTED {
                return Err(SinkError::UnsupportedAuthMechanism {
                    mechanism: config.auth_mechanism().to_string(),
                    supported: AuthMechanism::SUPPORTED.as_str(),
                });
            }
            if config.username().is_empty() {
                return Err(SinkError::MissingCredentials {
                    key: schema::USERNAME,
                });
            }
            if config.password().is_empty() {
                return Err(SinkError::MissingCredentials {
                    key: schema::PASSWORD,
                });
            }

            Some(Credentials {
                username: config.username().to_string(),
                password: config.password().clone(),
                auth_db: config.auth_db().to_string(),
                mechanism: config.auth_mechanism(),
            })
        } else {
            debug!("authentication not active");
            None
        };

        check_database_name(config.database())?;

        let descriptor = Self {
            scheme: URI_SCHEME,
            credentials,
            host: config.host().to_string(),
            port: config.port(),
            database: config.database().to_string(),
            collection: config.collection().to_string(),
            write_concern: config.write_concern().to_string(),
        };

        // fails here on hosts the URI grammar cannot carry
        let uri = descriptor.redacted_uri()?;
        debug!("returning connection descriptor for {}", uri);

        Ok(descriptor)
    }

    /// Connection URI, credentials included in clear text
    pub fn uri(&self) -> SinkResult<String> {
        self.render(false)
    }

    /// Connection URI with the password masked, safe for logs
    pub fn redacted_uri(&self) -> SinkResult<String> {
        self.render(true)
    }

    fn render(&self, redact: bool) -> SinkResult<String> {
        let base = format!("{}://{}:{}/", self.scheme, self.host, self.port);
        let mut url = Url::parse(&base).map_err(|e| {
            SinkError::invalid_config(schema::HOST, &self.host, format!("cannot form a URI: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                SinkError::invalid_config(schema::HOST, &self.host, "URI has no path to carry the database")
            })?
            .pop_if_empty()
            .push(&self.database);

        if let Some(credentials) = &self.credentials {
            url.set_username(&credentials.username).map_err(|_| {
                SinkError::invalid_config(schema::USERNAME, &credentials.username, "cannot be set on the URI")
            })?;
            let password = if redact {
                "****"
            } else {
                credentials.password.value()
            };
            url.set_password(Some(password)).map_err(|_| {
                SinkError::invalid_config(schema::PASSWORD, "[hidden]", "cannot be set on the URI")
            })?;
            url.query_pairs_mut()
                .append_pair("authSource", &credentials.auth_db);
        }
        url.query_pairs_mut().append_pair("w", &self.write_concern);

        Ok(url.to_string())
    }
}

fn check_database_name(database: &str) -> SinkResult<()> {
    if database.is_empty() {
        return Err(SinkError::invalid_config(
            schema::DATABASE,
            database,
            "database name must not be empty",
        ));
    }
    if let Some(c) = database.chars().find(|c| FORBIDDEN_DATABASE_CHARS.contains(c)) {
        return Err(SinkError::invalid_config(
            schema::DATABASE,
            database,
            format!("database name must not contain {:?}", c),
        ));
    }
    Ok(())
}
