use flume::{Receiver, Sender};
use once_cell::unsync::OnceCell;
use std::cell::{Ref, RefCell, RefMut};
use std::path::Path;

use crate::{
    config::Config,
    error::{Error, Fallible},
    event::{Event, EventBus},
};

/// A handle representing a planner session.
///
/// A session holds the configuration and the event bus connecting the
/// headless core to its frontend. Most functions exposed by this crate take
/// a session as their first argument.
#[derive(Debug)]
pub struct Session {
    config: RefCell<Config>,

    /// Full duplex channel for event transmission back and forth, created
    /// on first use.
    event_bus: OnceCell<EventBus>,
}

impl Session {
    /// Create a new session using the default configuration locations.
    pub fn new() -> Fallible<Session> {
        Ok(Session {
            config: RefCell::new(Config::load()?),
            event_bus: OnceCell::new(),
        })
    }

    /// Create a new session with explicit data and configuration
    /// directories.
    pub fn new_with<P, Q>(data_dir: P, conf_dir: Q) -> Fallible<Session>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        Ok(Session {
            config: RefCell::new(Config::load_with(data_dir, conf_dir)?),
            event_bus: OnceCell::new(),
        })
    }

    /// Create a session around an already-built configuration.
    pub fn with_config(config: Config) -> Session {
        Session {
            config: RefCell::new(config),
            event_bus: OnceCell::new(),
        }
    }

    /// Get an immutable reference to the config held by the session.
    pub fn config(&self) -> Ref<Config> {
        self.config.borrow()
    }

    /// Get a mutable reference to the config held by the session.
    pub fn config_mut(&self) -> Fallible<RefMut<Config>> {
        self.config
            .try_borrow_mut()
            .map_err(|_| Error::Custom("config is borrowed elsewhere".to_owned()))
    }

    /// Get the event bus for the session.
    ///
    /// The event bus is used for transmitting [`events`][1] between the
    /// session backend and the caller frontend.
    ///
    /// [1]: crate::Event
    pub fn event_bus(&self) -> &EventBus {
        self.event_bus.get_or_init(EventBus::new)
    }

    /// Get an outbound sender to emit events, if a frontend is listening.
    pub(crate) fn emitter(&self) -> Option<Sender<Event>> {
        self.event_bus.get().map(|bus| bus.inner_sender())
    }

    /// Get the inbound receiver carrying prompt answers.
    pub(crate) fn answers(&self) -> Option<Receiver<Event>> {
        self.event_bus.get().map(|bus| bus.inner_receiver())
    }

    /// Emit an event, dropping it silently when no frontend is attached.
    pub(crate) fn emit(&self, event: Event) {
        if let Some(tx) = self.emitter() {
            let _ = tx.send(event);
        }
    }

    /// Ask the frontend a yes/no question.
    ///
    /// Assume-yes and assume-no short-circuit without emitting the prompt.
    /// With no frontend attached the `default` answer is used, which keeps
    /// the planner testable headlessly.
    pub(crate) fn confirm(&self, prompt: Event, default: bool) -> bool {
        if let Some(assumed) = self.config().flags.assume {
            return assumed;
        }
        self.prompt(prompt, default)
    }

    /// Like [`Session::confirm`], but ignores assume-yes. Used for the
    /// destructive prompts that must not be waved through, such as
    /// autoremove confirmation.
    pub(crate) fn confirm_destructive(&self, prompt: Event, default: bool) -> bool {
        if let Some(false) = self.config().flags.assume {
            return false;
        }
        self.prompt(prompt, default)
    }

    fn prompt(&self, prompt: Event, default: bool) -> bool {
        let tx = match self.emitter() {
            Some(tx) => tx,
            None => return default,
        };
        if tx.send(prompt).is_err() {
            return default;
        }

        let rx = match self.answers() {
            Some(rx) => rx,
            None => return default,
        };
        while let Ok(event) = rx.recv() {
            if let Event::PromptResult(answer) = event {
                return answer;
            }
        }
        default
    }
}
