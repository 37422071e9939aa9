//! Driver event loop.
//!
//! Wires the production collaborators (REST client, WebSocket transport,
//! in-memory credentials, system clock) into a store, then multiplexes stdin
//! commands and state changes with `tokio::select!`.

use std::{
    io::{self, Write},
    sync::Arc,
};

use parley_app::{AppAction, AppReducer, AppState, Dependencies};
use parley_client::{
    AccountApi, ChatApi, CredentialStore, MemoryCredentials, SocketAdapter, SocketHandle,
    rest::RestClient, ws::WsTransport,
};
use parley_core::{Store, StoreHandle, SystemEnv};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
    task::JoinHandle,
};

use crate::{ClientConfig, CliError, Command, command::HELP, render::render};

/// Running store plus its stdin/stdout front end.
pub struct Runtime {
    store: StoreHandle<AppState, AppAction>,
    task: JoinHandle<AppState>,
    socket: SocketHandle,
}

impl Runtime {
    /// Build the collaborators and spawn the store.
    ///
    /// Must be called inside a tokio runtime. Nothing touches the network
    /// until the first command needs it.
    pub fn new(config: ClientConfig) -> Self {
        let credentials = Arc::new(MemoryCredentials::new(config.token.clone()));
        let rest = Arc::new(RestClient::new(config.api_url.clone(), credentials.clone()));

        let mut transport = WsTransport::new(config.socket_url.clone());
        if let Some(token) = &config.token {
            transport = transport.with_token(token.clone());
        }
        let socket = SocketAdapter::spawn(transport);

        let chat: Arc<dyn ChatApi> = rest.clone();
        let accounts: Arc<dyn AccountApi> = rest;
        let credentials: Arc<dyn CredentialStore> = credentials;
        let deps = Dependencies {
            env: SystemEnv::new(),
            chat,
            accounts,
            socket: socket.clone(),
            credentials,
        };

        let reducer = AppReducer::new(deps, config.chat());
        let (store, task) = Store::spawn(reducer, AppState::default(), SystemEnv::new());
        Self { store, task, socket }
    }

    /// Read commands until `/quit` or end of input.
    ///
    /// The store is shut down and the socket closed on every exit path.
    pub async fn run(self) -> Result<(), CliError> {
        let outcome = self.serve().await;

        self.store.shutdown();
        self.socket.disconnect();
        let state = self.task.await.map_err(|e| io::Error::other(e.to_string()))?;
        tracing::info!(teardowns = state.teardowns, "parley stopped");
        outcome
    }

    async fn serve(&self) -> Result<(), CliError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut states = self.store.subscribe();
        let mut shown = Vec::new();

        write_lines(&["type /help for commands"])?;
        self.store.send(AppAction::Start)?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        return Ok(());
                    };
                    match Command::parse(&line) {
                        Ok(Some(Command::Quit)) => return Ok(()),
                        Ok(Some(Command::Help)) => write_lines(&[HELP])?,
                        Ok(Some(Command::Status)) => write_lines(&render(&self.store.state()))?,
                        Ok(Some(command)) => {
                            tracing::debug!(?command, "dispatching");
                            for action in command.into_actions() {
                                self.store.send(action)?;
                            }
                        },
                        Ok(None) => {},
                        Err(e) => write_lines(&[e.to_string()])?,
                    }
                },
                changed = states.changed() => {
                    if changed.is_err() {
                        tracing::warn!("store stopped");
                        return Ok(());
                    }
                    shown = show_if_changed(&mut states, shown)?;
                },
            }
        }
    }
}

fn show_if_changed(
    states: &mut watch::Receiver<AppState>,
    shown: Vec<String>,
) -> Result<Vec<String>, CliError> {
    let lines = render(&states.borrow_and_update());
    if lines == shown {
        return Ok(shown);
    }
    write_lines(&lines)?;
    Ok(lines)
}

fn write_lines<S: AsRef<str>>(lines: &[S]) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    for line in lines {
        writeln!(out, "{}", line.as_ref())?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
