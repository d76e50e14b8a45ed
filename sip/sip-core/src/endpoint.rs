use crate::config::SipConfig;
use crate::event::SipEvent;
use crate::manager::Transactions;
use crate::negotiator::Negotiator;
use crate::session::SessionId;
use crate::timer::TimerExpired;
use crate::transport::{Outgoing, ReceivedMessage, Udp};
use crate::{Error, Result};
use sip_types::uri::SipUri;
use tokio::net::ToSocketAddrs;
use tokio::select;
use tokio::sync::{mpsc, oneshot};

/// Call control operation sent from an [`EndpointHandle`] to the running [`Endpoint`]
#[derive(Debug)]
pub enum Command {
    StartCall {
        callee: SipUri,
        reply: oneshot::Sender<Result<SessionId>>,
    },
    AcceptCall {
        session: SessionId,
        reply: oneshot::Sender<Result<()>>,
    },
    RejectCall {
        session: SessionId,
        reply: oneshot::Sender<Result<()>>,
    },
    EndCall {
        session: SessionId,
        reply: oneshot::Sender<Result<()>>,
    },
    CancelCall {
        session: SessionId,
        reply: oneshot::Sender<Result<()>>,
    },
    EndAllCalls,
    Register {
        registrar: Option<SipUri>,
        reply: oneshot::Sender<Result<()>>,
    },
    Unregister,
    /// End all calls, remove registrations and stop the event loop
    Shutdown,
}

/// Drives [`Transactions`] with messages from the UDP transport, timer
/// expiries and commands, and sends whatever it produces
pub struct Endpoint {
    transactions: Transactions,
    udp: Udp,

    inbound: mpsc::UnboundedReceiver<ReceivedMessage>,
    timers: mpsc::UnboundedReceiver<TimerExpired>,
    commands: mpsc::UnboundedReceiver<Command>,
}

/// Cloneable handle to control a running [`Endpoint`]
#[derive(Debug, Clone)]
pub struct EndpointHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl Endpoint {
    /// Bind the UDP transport to `addr`
    ///
    /// The local address written into Via and Contact headers is taken from
    /// [`SipConfig::local_address`] or else the bound socket address.
    pub async fn bind<A, N>(
        config: SipConfig,
        addr: A,
        negotiator: N,
    ) -> Result<(Self, EndpointHandle, mpsc::UnboundedReceiver<SipEvent>)>
    where
        A: ToSocketAddrs,
        N: Negotiator,
    {
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (timers_tx, timers) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();

        let udp = Udp::bind(addr, inbound_tx).await?;

        let local = match &config.local_address {
            Some(local_address) => SipUri::from_host_port(local_address)?,
            None => SipUri::from_host_port(&udp.bound().to_string())?,
        };

        log::info!("endpoint listening on {udp}, local address {local}");

        let transactions =
            Transactions::new(config, local, Box::new(negotiator), events_tx, timers_tx);

        let endpoint = Self {
            transactions,
            udp,
            inbound,
            timers,
            commands,
        };

        Ok((
            endpoint,
            EndpointHandle {
                commands: commands_tx,
            },
            events,
        ))
    }

    pub fn udp(&self) -> &Udp {
        &self.udp
    }

    pub fn transactions(&self) -> &Transactions {
        &self.transactions
    }

    /// Process events until [`Command::Shutdown`] or until every handle is dropped
    pub async fn run(mut self) {
        if self.transactions.config().registrar.is_some() {
            if let Err(e) = self.transactions.register(None) {
                log::warn!("failed to start registration, {e}");
            }
            self.flush().await;
        }

        loop {
            select! {
                Some(received) = self.inbound.recv() => {
                    self.transactions.receive(received.message, received.source);
                }
                Some(expired) = self.timers.recv() => {
                    self.transactions.on_timer(expired);
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };

                    if !self.handle_command(command) {
                        break;
                    }
                }
            }

            self.flush().await;
        }

        log::info!("shutting down endpoint");

        self.transactions.end_all_calls();
        self.transactions.unregister_all();
        self.flush().await;
    }

    /// Returns false on shutdown
    fn handle_command(&mut self, command: Command) -> bool {
        let transactions = &mut self.transactions;

        match command {
            Command::StartCall { callee, reply } => {
                let _ = reply.send(transactions.start_call(callee));
            }
            Command::AcceptCall { session, reply } => {
                let _ = reply.send(transactions.accept_call(session));
            }
            Command::RejectCall { session, reply } => {
                let _ = reply.send(transactions.reject_call(session));
            }
            Command::EndCall { session, reply } => {
                let _ = reply.send(transactions.end_call(session));
            }
            Command::CancelCall { session, reply } => {
                let _ = reply.send(transactions.cancel_call(session));
            }
            Command::EndAllCalls => transactions.end_all_calls(),
            Command::Register { registrar, reply } => {
                let _ = reply.send(transactions.register(registrar));
            }
            Command::Unregister => transactions.unregister_all(),
            Command::Shutdown => return false,
        }

        true
    }

    async fn flush(&mut self) {
        for outgoing in self.transactions.take_outgoing() {
            if let Err(e) = self.send(&outgoing).await {
                log::warn!("failed to send message to {}, {e}", outgoing.destination);
            }
        }
    }

    async fn send(&mut self, outgoing: &Outgoing) -> Result<()> {
        let target = outgoing.destination.resolve().await?;
        let bytes = outgoing.message.to_bytes();

        log::trace!("sending {} bytes to {target}", bytes.len());

        self.udp.send(&bytes, target).await?;

        Ok(())
    }
}

impl EndpointHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();

        self.commands
            .send(command(reply))
            .map_err(|_| Error::EndpointClosed)?;

        response.await.map_err(|_| Error::EndpointClosed)?
    }

    fn notify(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::EndpointClosed)
    }

    pub async fn start_call(&self, callee: SipUri) -> Result<SessionId> {
        self.request(|reply| Command::StartCall { callee, reply })
            .await
    }

    pub async fn accept_call(&self, session: SessionId) -> Result<()> {
        self.request(|reply| Command::AcceptCall { session, reply })
            .await
    }

    pub async fn reject_call(&self, session: SessionId) -> Result<()> {
        self.request(|reply| Command::RejectCall { session, reply })
            .await
    }

    pub async fn end_call(&self, session: SessionId) -> Result<()> {
        self.request(|reply| Command::EndCall { session, reply })
            .await
    }

    pub async fn cancel_call(&self, session: SessionId) -> Result<()> {
        self.request(|reply| Command::CancelCall { session, reply })
            .await
    }

    pub fn end_all_calls(&self) -> Result<()> {
        self.notify(Command::EndAllCalls)
    }

    pub async fn register(&self, registrar: Option<SipUri>) -> Result<()> {
        self.request(|reply| Command::Register { registrar, reply })
            .await
    }

    pub fn unregister(&self) -> Result<()> {
        self.notify(Command::Unregister)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.notify(Command::Shutdown)
    }
}
