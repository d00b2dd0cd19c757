//! Change Signal
//!
//! Minimal observer list: callbacks are invoked synchronously, in
//! registration order, on the thread that calls [`Signal::emit`].
//! No queueing and no retry.

/// Handle returned by [`Signal::connect`], used to disconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

type Slot<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Ordered list of callbacks receiving a `T` payload
pub struct Signal<T> {
    slots: Vec<(ConnectionId, Slot<T>)>,
    next_id: u64,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a callback, it runs after every callback registered before it
    pub fn connect<F>(&mut self, callback: F) -> ConnectionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        self.slots.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback, returns false if it was not connected
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(slot_id, _)| *slot_id != id);
        self.slots.len() != before
    }

    /// Call every connected callback with `payload`
    pub fn emit(&self, payload: &T) {
        for (_, callback) in &self.slots {
            callback(payload);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.slots.len())
            .finish()
    }
}
