//! Per-connection display names.
//!
//! Every process holds one [`IdentityReplicator`] per connection it knows
//! about. Only the instance whose local connection matches the player
//! is the owner; it writes the name once from local input and the
//! authority relays it to everyone else. The authority keeps its own
//! instances in an [`IdentityDirectory`], which doubles as the connection
//! registry used to resolve names.

use std::collections::BTreeMap;

use coinrush_protocol::{ClientRequest, DisplayName, NameEntry, PlayerId};
use tracing::{debug, trace};

use crate::ReplicationError;
use crate::field::ReplicatedField;
use crate::observer::{Observers, SubscriptionId};

// ---------------------------------------------------------------------------
// IdentityReplicator
// ---------------------------------------------------------------------------

/// The replicated name of one connection, as seen by one process.
#[derive(Debug)]
pub struct IdentityReplicator {
    field: ReplicatedField<DisplayName>,
    /// The connection this process speaks for, if any. The authority
    /// speaks for nobody.
    local: Option<PlayerId>,
    rendered: Option<DisplayName>,
    initialized: bool,
    observers: Observers<DisplayName>,
}

impl IdentityReplicator {
    /// The authority's instance for `player_id`. Never the owner.
    pub fn authoritative(player_id: PlayerId) -> Self {
        Self::with_local(player_id, None)
    }

    /// An observer's instance for `player_id`, seen from the connection
    /// `local`. Owner exactly when `local == player_id`.
    pub fn replica(player_id: PlayerId, local: PlayerId) -> Self {
        Self::with_local(player_id, Some(local))
    }

    fn with_local(player_id: PlayerId, local: Option<PlayerId>) -> Self {
        Self {
            field: ReplicatedField::new(player_id, DisplayName::default()),
            local,
            rendered: None,
            initialized: false,
            observers: Observers::new(),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.field.owner()
    }

    pub fn is_owner(&self) -> bool {
        self.local == Some(self.field.owner())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// First activation.
    ///
    /// The owning instance writes `local_input_name` and returns the
    /// request it must send to the authority. Every instance then renders
    /// the current value and notifies its callbacks. Later calls do
    /// nothing and return `None`.
    pub fn initialize(&mut self, local_input_name: &str) -> Option<ClientRequest> {
        if self.initialized {
            return None;
        }
        self.initialized = true;

        let request = if self.is_owner() {
            let name = DisplayName::new(local_input_name);
            self.field.apply_remote(name.clone());
            Some(ClientRequest::DisplayNameWrite {
                player_id: self.player_id(),
                name,
            })
        } else {
            None
        };

        let current = self.field.get().clone();
        self.rendered = Some(current.clone());
        self.observers.notify(&current);
        trace!(player_id = %self.player_id(), name = %current, "identity initialized");
        request
    }

    /// Applies a write relayed by the authority.
    pub fn receive(&mut self, next: DisplayName) {
        let previous = self.field.apply_remote(next.clone());
        self.on_replicated_value_changed(&previous, &next);
    }

    /// Owner-gated write. Used by the authority to apply a
    /// [`ClientRequest::DisplayNameWrite`] on behalf of `writer`.
    ///
    /// Returns the previous name.
    pub fn write(
        &mut self,
        writer: PlayerId,
        name: DisplayName,
    ) -> Result<DisplayName, ReplicationError> {
        let previous = self.field.write(writer, name.clone())?;
        self.on_replicated_value_changed(&previous, &name);
        Ok(previous)
    }

    /// Runs on every replicated write: refreshes the local render and
    /// re-invokes callbacks with `next`.
    pub fn on_replicated_value_changed(&mut self, previous: &DisplayName, next: &DisplayName) {
        trace!(player_id = %self.player_id(), %previous, %next, "display name changed");
        self.rendered = Some(next.clone());
        self.observers.notify(next);
    }

    pub fn display_name(&self) -> &DisplayName {
        self.field.get()
    }

    /// The last value rendered, `None` before the first activation.
    pub fn rendered(&self) -> Option<&DisplayName> {
        self.rendered.as_ref()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&DisplayName) + Send + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}

// ---------------------------------------------------------------------------
// NameLookup
// ---------------------------------------------------------------------------

/// Read-only, best-effort name resolution.
pub trait NameLookup {
    /// The name of a live connection, or `None` if it is gone.
    fn lookup(&self, player_id: PlayerId) -> Option<DisplayName>;

    /// Like [`lookup`](Self::lookup), falling back to `"Unknown"`.
    fn resolve(&self, player_id: PlayerId) -> DisplayName {
        self.lookup(player_id).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// IdentityDirectory
// ---------------------------------------------------------------------------

/// The authority's registry of live connections and their names.
///
/// Ordered by [`PlayerId`], which is also connection order.
#[derive(Debug, Default)]
pub struct IdentityDirectory {
    entries: BTreeMap<PlayerId, IdentityReplicator>,
}

impl IdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection. Returns `false` if it was already present.
    pub fn connect(&mut self, player_id: PlayerId) -> bool {
        if self.entries.contains_key(&player_id) {
            return false;
        }
        let mut replicator = IdentityReplicator::authoritative(player_id);
        replicator.initialize(DisplayName::UNKNOWN);
        self.entries.insert(player_id, replicator);
        debug!(%player_id, connected = self.entries.len(), "identity registered");
        true
    }

    /// Forgets a connection. Returns `false` if it was not present.
    pub fn disconnect(&mut self, player_id: PlayerId) -> bool {
        let removed = self.entries.remove(&player_id).is_some();
        if removed {
            debug!(%player_id, connected = self.entries.len(), "identity removed");
        }
        removed
    }

    pub fn is_connected(&self, player_id: PlayerId) -> bool {
        self.entries.contains_key(&player_id)
    }

    /// Applies a name write from connection `source` to `target`'s field.
    ///
    /// # Errors
    /// [`ReplicationError::UnknownPlayer`] if `target` is not connected,
    /// [`ReplicationError::NotOwner`] if `source` is not `target`.
    pub fn write(
        &mut self,
        source: PlayerId,
        target: PlayerId,
        name: DisplayName,
    ) -> Result<DisplayName, ReplicationError> {
        let replicator = self
            .entries
            .get_mut(&target)
            .ok_or(ReplicationError::UnknownPlayer(target))?;
        replicator.write(source, name)
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&IdentityReplicator> {
        self.entries.get(&player_id)
    }

    pub fn get_mut(&mut self, player_id: PlayerId) -> Option<&mut IdentityReplicator> {
        self.entries.get_mut(&player_id)
    }

    /// The earliest still-connected player.
    pub fn host(&self) -> Option<PlayerId> {
        self.entries.keys().next().copied()
    }

    pub fn names(&self) -> Vec<NameEntry> {
        self.entries
            .iter()
            .map(|(player_id, replicator)| NameEntry {
                player_id: *player_id,
                name: replicator.display_name().clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NameLookup for IdentityDirectory {
    fn lookup(&self, player_id: PlayerId) -> Option<DisplayName> {
        self.entries
            .get(&player_id)
            .map(|replicator| replicator.display_name().clone())
    }
}
