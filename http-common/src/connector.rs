// Copyright (c) Microsoft. All rights reserved.

/// A listener endpoint, parsed from a `http://` or `unix://` URI in the
/// daemon config.
#[derive(Clone, Debug, PartialEq)]
pub enum Connector {
    Http {
        host: std::sync::Arc<str>,
        port: u16,
    },
    Unix {
        socket_path: std::sync::Arc<std::path::Path>,
    },
}

#[derive(Debug)]
pub enum Incoming {
    Http(tokio::net::TcpListener),
    Unix(tokio::net::UnixListener),
}

#[derive(Debug)]
pub enum AsyncStream {
    Http(tokio::net::TcpStream),
    Unix(tokio::net::UnixStream),
}

impl Connector {
    pub fn new(uri: &url::Url) -> Result<Self, ConnectorError> {
        match uri.scheme() {
            "http" => {
                let host = uri
                    .host_str()
                    .ok_or_else(|| ConnectorError {
                        uri: uri.clone(),
                        inner: "http URI does not have a host".into(),
                    })?
                    .into();
                let port = uri.port().unwrap_or(80);
                Ok(Connector::Http { host, port })
            }

            "unix" => {
                let socket_path = uri
                    .to_file_path()
                    .map_err(|()| ConnectorError {
                        uri: uri.clone(),
                        inner: "unix URI could not be converted to a file path".into(),
                    })?
                    .into();
                Ok(Connector::Unix { socket_path })
            }

            scheme => Err(ConnectorError {
                uri: uri.clone(),
                inner: format!("unrecognized scheme {scheme:?}").into(),
            }),
        }
    }

    pub async fn incoming(&self) -> std::io::Result<Incoming> {
        match self {
            Connector::Http { host, port } => {
                let listener = tokio::net::TcpListener::bind((&**host, *port)).await?;
                Ok(Incoming::Http(listener))
            }

            Connector::Unix { socket_path } => {
                // A leftover socket file from a previous run would make bind fail.
                match std::fs::remove_file(&**socket_path) {
                    Ok(()) => (),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => (),
                    Err(err) => return Err(err),
                }

                let listener = tokio::net::UnixListener::bind(&**socket_path)?;
                Ok(Incoming::Unix(listener))
            }
        }
    }
}

impl std::fmt::Display for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connector::Http { host, port } => write!(f, "http://{host}:{port}"),
            Connector::Unix { socket_path } => {
                write!(f, "unix://{}", socket_path.display())
            }
        }
    }
}

#[derive(Debug)]
pub struct ConnectorError {
    uri: url::Url,
    inner: Box<dyn std::error::Error + Send + Sync>,
}

impl std::fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed URI {:?}", self.uri.to_string())
    }
}

impl std::error::Error for ConnectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.inner)
    }
}

impl hyper::server::accept::Accept for Incoming {
    type Conn = AsyncStream;
    type Error = std::io::Error;

    fn poll_accept(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Result<Self::Conn, Self::Error>>> {
        loop {
            let stream = match &mut *self {
                Incoming::Http(listener) => match listener.poll_accept(cx) {
                    std::task::Poll::Ready(Ok((stream, _))) => Ok(AsyncStream::Http(stream)),
                    std::task::Poll::Ready(Err(err)) => Err(err),
                    std::task::Poll::Pending => return std::task::Poll::Pending,
                },

                Incoming::Unix(listener) => match listener.poll_accept(cx) {
                    std::task::Poll::Ready(Ok((stream, _))) => Ok(AsyncStream::Unix(stream)),
                    std::task::Poll::Ready(Err(err)) => Err(err),
                    std::task::Poll::Pending => return std::task::Poll::Pending,
                },
            };

            match stream {
                Ok(stream) => return std::task::Poll::Ready(Some(Ok(stream))),
                Err(err) => match err.kind() {
                    // Transient client-side errors; keep accepting.
                    std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset => (),

                    _ => return std::task::Poll::Ready(Some(Err(err))),
                },
            }
        }
    }
}

impl tokio::io::AsyncRead for AsyncStream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            AsyncStream::Http(inner) => std::pin::Pin::new(inner).poll_read(cx, buf),
            AsyncStream::Unix(inner) => std::pin::Pin::new(inner).poll_read(cx, buf),
        }
    }
}

impl tokio::io::AsyncWrite for AsyncStream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        match self.get_mut() {
            AsyncStream::Http(inner) => std::pin::Pin::new(inner).poll_write(cx, buf),
            AsyncStream::Unix(inner) => std::pin::Pin::new(inner).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            AsyncStream::Http(inner) => std::pin::Pin::new(inner).poll_flush(cx),
            AsyncStream::Unix(inner) => std::pin::Pin::new(inner).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            AsyncStream::Http(inner) => std::pin::Pin::new(inner).poll_shutdown(cx),
            AsyncStream::Unix(inner) => std::pin::Pin::new(inner).poll_shutdown(cx),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Connector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = Connector;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("an endpoint URI")
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let uri: url::Url = s.parse().map_err(serde::de::Error::custom)?;
                let connector = Connector::new(&uri).map_err(serde::de::Error::custom)?;
                Ok(connector)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

impl serde::Serialize for Connector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let url = match self {
            Connector::Http { host, port } => {
                let mut url: url::Url = "http://foo"
                    .parse()
                    .expect("hard-coded URL parses successfully");
                url.set_host(Some(host)).map_err(|err| {
                    serde::ser::Error::custom(format!("could not set host {host:?}: {err:?}"))
                })?;
                if *port != 80 {
                    url.set_port(Some(*port)).map_err(|()| {
                        serde::ser::Error::custom(format!("could not set port {port:?}"))
                    })?;
                }
                url
            }

            Connector::Unix { socket_path } => {
                let socket_path = socket_path.to_str().ok_or_else(|| {
                    serde::ser::Error::custom(format!(
                        "socket path {} cannot be serialized as a utf-8 string",
                        socket_path.display()
                    ))
                })?;

                let mut url: url::Url = "unix:///foo"
                    .parse()
                    .expect("hard-coded URL parses successfully");
                url.set_path(socket_path);
                url
            }
        };
        url.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::Connector;

    #[test]
    fn connector_from_uri() {
        let connector =
            Connector::new(&"http://localhost:8765".parse().unwrap()).unwrap();
        assert_eq!(
            connector,
            Connector::Http {
                host: "localhost".into(),
                port: 8765,
            },
        );

        let connector =
            Connector::new(&"unix:///run/keygend/keygend.sock".parse().unwrap()).unwrap();
        assert_eq!(
            connector,
            Connector::Unix {
                socket_path: std::path::Path::new("/run/keygend/keygend.sock").into(),
            },
        );

        let _ = Connector::new(&"ftp://localhost".parse().unwrap()).unwrap_err();
    }

    #[test]
    fn connector_roundtrips_through_serde() {
        for uri in ["http://localhost:8765/", "unix:///run/keygend/keygend.sock"] {
            let connector: Connector = serde_json::from_value(uri.into()).unwrap();
            let serialized = serde_json::to_value(&connector).unwrap();
            assert_eq!(serialized, serde_json::Value::from(uri));
        }
    }
}
