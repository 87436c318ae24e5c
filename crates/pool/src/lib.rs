use std::sync::Mutex;

use http::uri::{Authority, Scheme};
use log::info;
use url::Url;

#[derive(Debug)]
pub enum PoolError {
    InvalidTarget {
        raw: String,
        source: url::ParseError,
    },
    UnsupportedTarget {
        raw: String,
    },
    EmptyPool,
}

impl std::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolError::InvalidTarget { raw, source } => {
                write!(f, "invalid backend URL '{raw}': {source}")
            }
            PoolError::UnsupportedTarget { raw } => {
                write!(f, "unsupported backend URL '{raw}': expected http(s)://host[/path]")
            }
            PoolError::EmptyPool => write!(f, "no backends configured"),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::InvalidTarget { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One upstream target. Parsed once at insertion; dispatch never re-parses.
#[derive(Debug, Clone)]
pub struct Backend {
    url: Url,
    scheme: Scheme,
    authority: Authority,
}

impl Backend {
    pub fn parse(raw: &str) -> Result<Self, PoolError> {
        let url = Url::parse(raw).map_err(|source| PoolError::InvalidTarget {
            raw: raw.to_string(),
            source,
        })?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            _ => {
                return Err(PoolError::UnsupportedTarget {
                    raw: raw.to_string(),
                });
            }
        };

        let host = url
            .host_str()
            .ok_or_else(|| PoolError::UnsupportedTarget {
                raw: raw.to_string(),
            })?;

        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority =
            authority
                .parse::<Authority>()
                .map_err(|_| PoolError::UnsupportedTarget {
                    raw: raw.to_string(),
                })?;

        Ok(Self {
            url,
            scheme,
            authority,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Host[:port] string, used in logs and the stats listing.
    pub fn host(&self) -> &str {
        self.authority.as_str()
    }

    /// Path prefix configured on the target URL ("/" when none was given).
    pub fn path_prefix(&self) -> &str {
        self.url.path()
    }
}

struct PoolInner {
    entries: Vec<Backend>,
    cursor: usize,
}

/// Ordered backend list plus the rotation cursor. `next` and `add_server`
/// serialize on one mutex; the lock is never held across network I/O.
pub struct BackendPool {
    inner: Mutex<PoolInner>,
}

impl BackendPool {
    /// All-or-nothing construction: the first invalid target fails the whole
    /// pool and nothing is built.
    pub fn new<S: AsRef<str>>(targets: &[S]) -> Result<Self, PoolError> {
        let mut entries = Vec::with_capacity(targets.len());
        for target in targets {
            entries.push(Backend::parse(target.as_ref())?);
        }

        Ok(Self {
            inner: Mutex::new(PoolInner { entries, cursor: 0 }),
        })
    }

    /// Returns the backend at the cursor and advances it, as one critical
    /// section. The returned backend is a clone, so callers forward to it
    /// without touching the lock.
    pub fn next(&self) -> Result<Backend, PoolError> {
        let mut inner = self.inner.lock().expect("pool mutex poisoned");

        if inner.entries.is_empty() {
            return Err(PoolError::EmptyPool);
        }

        let backend = inner.entries[inner.cursor].clone();
        inner.cursor = (inner.cursor + 1) % inner.entries.len();

        info!(
            "Selected backend {} (next cursor: {})",
            backend.host(),
            inner.cursor
        );

        Ok(backend)
    }

    /// Appends a backend. A parse failure leaves the pool exactly as it was.
    pub fn add_server(&self, target: &str) -> Result<(), PoolError> {
        let backend = Backend::parse(target)?;

        let mut inner = self.inner.lock().expect("pool mutex poisoned");
        let host = backend.host().to_string();
        inner.entries.push(backend);

        info!("Added backend {} (pool size: {})", host, inner.entries.len());

        Ok(())
    }

    /// Independent copy of the current entries. Mutating the returned vec
    /// never touches pool internals.
    pub fn snapshot(&self) -> Vec<Backend> {
        let inner = self.inner.lock().expect("pool mutex poisoned");
        inner.entries.clone()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("pool mutex poisoned");
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
