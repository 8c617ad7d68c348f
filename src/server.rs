use std::{
    io::{self, BufReader, BufWriter},
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
};

use tracing::{debug, info, info_span, warn};

use crate::{serve, App};

/// Where the fixture listens when nothing else is asked for.
pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";

/// Accepts connections one after another and serves each to completion
/// before taking the next one off the backlog.
pub struct Server {
    listener: TcpListener,
    nodelay: bool,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        Default::default()
    }

    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Server> {
        Self::builder().try_bind(addr)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves forever. Only a failure to accept on the listener itself is
    /// ever skipped over; errors on a connection just end that connection.
    pub fn serve<A: App>(self, mut app: A) -> io::Result<()> {
        info!(addr = ?self.listener.local_addr().ok(), "serving");

        for conn in self.listener.incoming() {
            match conn {
                Ok(stream) => self.handle_connection(stream, &mut app),
                Err(err) => warn!(error = %err, "failed to accept connection"),
            }
        }

        Ok(())
    }

    /// Serves exactly `count` connections and returns the app.
    pub fn serve_connections<A: App>(self, mut app: A, count: usize) -> io::Result<A> {
        for _ in 0..count {
            let (stream, _addr) = self.listener.accept()?;
            self.handle_connection(stream, &mut app);
        }

        Ok(app)
    }

    fn handle_connection<A: App>(&self, stream: TcpStream, app: &mut A) {
        let peer = stream.peer_addr().ok();
        let _span = info_span!("connection", peer = ?peer).entered();
        debug!("accepted connection");

        if let Err(err) = self.serve_stream(stream, app) {
            warn!(error = %err, "dropping connection");
        }
    }

    fn serve_stream<A: App>(&self, stream: TcpStream, app: &mut A) -> io::Result<()> {
        if self.nodelay {
            stream.set_nodelay(true)?;
        }

        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        serve(&mut reader, &mut writer, app)
    }
}

#[derive(Default)]
pub struct ServerBuilder {
    nodelay: bool,
}

impl ServerBuilder {
    /// Disables Nagle's algorithm on accepted connections.
    pub fn nodelay(self, nodelay: bool) -> Self {
        Self { nodelay }
    }

    pub fn from_listener(self, listener: TcpListener) -> Server {
        Server {
            listener,
            nodelay: self.nodelay,
        }
    }

    pub fn try_bind<A: ToSocketAddrs>(self, addr: A) -> io::Result<Server> {
        let listener = TcpListener::bind(addr)?;
        Ok(self.from_listener(listener))
    }
}
