//! Dependent fields: a source control whose value drives the option set of a
//! target control (state selection loading its cities, for example).
//!
//! [`DependentFieldLink`] is the state machine. It issues [`FetchTicket`]s
//! carrying a monotonically increasing id and applies a response only when
//! its id is the latest issued, so the last selection always wins regardless
//! of the order responses arrive in. [`DependentFieldCoordinator`] drives a
//! link with an [`OptionsFetcher`], running fetches concurrently.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use crate::error::{FormError, LookupError, Result};
use crate::group::FormGroup;
use crate::schema::Choice;

/// State of a dependent link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Not attached to a group yet.
    Idle,
    /// Waiting for the options of the latest source value.
    Loading,
    /// Options are populated and the target is enabled.
    Loaded,
    /// The source is empty, or loading failed; the target is disabled.
    Disabled,
}

/// A request for the options keyed by a source value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    /// Identity of the request; only the latest one is applied.
    pub id: u64,
    /// The source value to look options up by.
    pub key: String,
}

/// External lookup of the options belonging to a source value.
pub trait OptionsFetcher: Send + Sync {
    /// Fetches the options for `key`.
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, std::result::Result<Vec<Choice>, LookupError>>;
}

/// Binds a source control to a target control.
#[derive(Debug, Clone)]
pub struct DependentFieldLink {
    source: String,
    target: String,
    state: LinkState,
    latest: u64,
    options: Vec<Choice>,
    last_error: Option<LookupError>,
}

impl DependentFieldLink {
    /// Creates an unattached link.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            state: LinkState::Idle,
            latest: 0,
            options: Vec::new(),
            last_error: None,
        }
    }

    /// Name of the source control.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Name of the target control.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Current state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Whether the latest request is still outstanding.
    pub fn is_loading(&self) -> bool {
        self.state == LinkState::Loading
    }

    /// Options of the target, sorted by label.
    pub fn options(&self) -> &[Choice] {
        &self.options
    }

    /// Why the latest load failed, if it did.
    pub fn last_error(&self) -> Option<&LookupError> {
        self.last_error.as_ref()
    }

    /// Starts observing the group. The target keeps its current value.
    ///
    /// Ends in `Disabled` for an empty source and `Loading` otherwise.
    pub fn attach(&mut self, group: &mut FormGroup) -> Result<Option<FetchTicket>> {
        self.begin(group, false)
    }

    /// Reacts to a new source value: clears and disables the target and
    /// requests the options of the new value.
    pub fn source_changed(&mut self, group: &mut FormGroup) -> Result<Option<FetchTicket>> {
        self.begin(group, true)
    }

    /// Re-requests the options after a failed load.
    pub fn retry(&mut self, group: &mut FormGroup) -> Result<Option<FetchTicket>> {
        if self.last_error.is_none() {
            return Ok(None);
        }
        self.begin(group, false)
    }

    fn begin(&mut self, group: &mut FormGroup, reset_target: bool) -> Result<Option<FetchTicket>> {
        let key = group
            .value_of(&self.source)
            .ok_or_else(|| FormError::UnknownField(self.source.clone()))?
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        if reset_target {
            group.clear(&self.target)?;
        }
        group.disable(&self.target)?;

        self.latest += 1;
        self.options.clear();
        self.last_error = None;

        if key.is_empty() {
            self.transition(LinkState::Disabled);
            return Ok(None);
        }

        self.transition(LinkState::Loading);
        Ok(Some(FetchTicket {
            id: self.latest,
            key,
        }))
    }

    /// Applies the response to a ticket.
    ///
    /// Responses to superseded tickets are dropped and `false` is returned.
    /// A failed load leaves the target disabled and empty; see
    /// [`retry`](Self::retry).
    pub fn resolve(
        &mut self,
        group: &mut FormGroup,
        ticket_id: u64,
        response: std::result::Result<Vec<Choice>, LookupError>,
    ) -> Result<bool> {
        if ticket_id != self.latest || self.state != LinkState::Loading {
            debug!(
                source = %self.source,
                ticket = ticket_id,
                latest = self.latest,
                "Discarding superseded options"
            );
            return Ok(false);
        }

        match response {
            Ok(mut choices) => {
                choices.sort_by_cached_key(|c| collation_key(&c.label));
                self.options = choices;
                let current = group.text_of(&self.target);
                if !current.is_empty() && !self.options.iter().any(|c| c.value == current) {
                    debug!(field = %self.target, value = current, "Dropping value outside the new options");
                    group.clear(&self.target)?;
                }
                group.enable(&self.target)?;
                self.transition(LinkState::Loaded);
            }
            Err(e) => {
                warn!(source = %self.source, error = %e, "Could not load dependent options");
                self.options.clear();
                self.last_error = Some(e);
                self.transition(LinkState::Disabled);
            }
        }
        Ok(true)
    }

    fn transition(&mut self, next: LinkState) {
        debug!(
            source = %self.source,
            target = %self.target,
            from = ?self.state,
            to = ?next,
            "Dependent field transition"
        );
        self.state = next;
    }
}

/// Sort key that orders accented Portuguese labels next to their base letter.
pub fn collation_key(label: &str) -> String {
    label
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

type InFlight = BoxFuture<'static, (u64, std::result::Result<Vec<Choice>, LookupError>)>;

/// Drives a [`DependentFieldLink`] with an [`OptionsFetcher`].
pub struct DependentFieldCoordinator {
    link: DependentFieldLink,
    fetcher: Arc<dyn OptionsFetcher>,
    in_flight: FuturesUnordered<InFlight>,
}

impl fmt::Debug for DependentFieldCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependentFieldCoordinator")
            .field("link", &self.link)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl DependentFieldCoordinator {
    /// Creates a coordinator for `source` → `target`.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        fetcher: Arc<dyn OptionsFetcher>,
    ) -> Self {
        Self {
            link: DependentFieldLink::new(source, target),
            fetcher,
            in_flight: FuturesUnordered::new(),
        }
    }

    /// The underlying link.
    pub fn link(&self) -> &DependentFieldLink {
        &self.link
    }

    /// Attaches to the group, starting a fetch when the source has a value.
    pub fn attach(&mut self, group: &mut FormGroup) -> Result<()> {
        let ticket = self.link.attach(group)?;
        self.issue(ticket);
        Ok(())
    }

    /// Sets the source value and reacts to the change.
    pub fn select(&mut self, group: &mut FormGroup, value: &str) -> Result<()> {
        group.set_value(self.link.source(), value)?;
        self.source_changed(group)
    }

    /// Reacts to a source value already written to the group.
    pub fn source_changed(&mut self, group: &mut FormGroup) -> Result<()> {
        let ticket = self.link.source_changed(group)?;
        self.issue(ticket);
        Ok(())
    }

    /// Retries after a failed load.
    pub fn retry(&mut self, group: &mut FormGroup) -> Result<()> {
        let ticket = self.link.retry(group)?;
        self.issue(ticket);
        Ok(())
    }

    fn issue(&mut self, ticket: Option<FetchTicket>) {
        let Some(ticket) = ticket else {
            return;
        };
        let fetcher = Arc::clone(&self.fetcher);
        self.in_flight.push(Box::pin(async move {
            let response = fetcher.fetch(&ticket.key).await;
            (ticket.id, response)
        }));
    }

    /// Waits for the next fetch to finish and applies it.
    ///
    /// Returns `None` when nothing is in flight, otherwise whether the
    /// response was applied.
    pub async fn next_response(&mut self, group: &mut FormGroup) -> Result<Option<bool>> {
        match self.in_flight.next().await {
            Some((id, response)) => self.link.resolve(group, id, response).map(Some),
            None => Ok(None),
        }
    }

    /// Waits for every in-flight fetch.
    pub async fn settle(&mut self, group: &mut FormGroup) -> Result<()> {
        while self.next_response(group).await?.is_some() {}
        Ok(())
    }
}
